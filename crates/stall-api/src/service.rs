//! [`Marketplace`]: the orchestrator behind every endpoint.
//!
//! Handlers only translate HTTP into calls here. Each product mutation follows
//! the same order:
//!
//! 1. load the product, `NotFound` if absent;
//! 2. check ownership, `Forbidden` for anyone but the owner;
//! 3. validate the submitted attributes;
//! 4. ingest the new image, if any;
//! 5. persist;
//! 6. reconcile the asset the record no longer references.
//!
//! Step 6 only runs after step 5 succeeded, so a record never points at a
//! deleted asset.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use stall_core::{
  ValidationErrors,
  identity::{Credentials, Identity, NewIdentity, PublicProfile, Registration, User},
  product::{ImageRef, Product, ProductDraft},
  query::{Page, PageRequest, ProductFilter, Sort},
  store::MarketStore,
};
use stall_media::{MediaPipeline, ObjectStore};
use uuid::Uuid;

use crate::{
  auth::{hash_password, verify_password},
  error::{Error, Result},
  token::{Subject, TokenService},
};

const PRODUCT_NOT_FOUND: &str = "Product not found";
const USER_NOT_FOUND: &str = "User not found";

/// An image part of a product submission.
#[derive(Debug, Clone)]
pub struct Upload {
  pub bytes:        Bytes,
  pub content_type: String,
}

/// The response to a successful register or login.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
  pub user:  User,
  pub token: String,
}

pub struct Marketplace<S, O> {
  store:  S,
  media:  MediaPipeline<O>,
  tokens: Arc<TokenService>,
}

impl<S, O> Marketplace<S, O>
where
  S: MarketStore,
  O: ObjectStore,
{
  pub fn new(store: S, media: MediaPipeline<O>, tokens: Arc<TokenService>) -> Self {
    Self { store, media, tokens }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn media(&self) -> &MediaPipeline<O> { &self.media }

  // ── Identities ────────────────────────────────────────────────────────

  pub async fn register(&self, registration: Registration) -> Result<Session> {
    let registration = registration.validate()?;
    let credential_hash = hash_password(&registration.password)?;

    let identity = self
      .store
      .create_identity(NewIdentity {
        display_name: registration.display_name,
        email: registration.email,
        credential_hash,
      })
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::Validation(ValidationErrors::single("email", "Email already in use")))?;

    tracing::info!(identity_id = %identity.id, "registered identity");
    self.session_for(&identity)
  }

  /// Unknown email and wrong password are indistinguishable to the caller.
  pub async fn login(&self, credentials: Credentials) -> Result<Session> {
    let credentials = credentials.validate()?;
    let identity = self
      .store
      .find_identity_by_email(&credentials.email)
      .await
      .map_err(Error::store)?
      .ok_or(Error::InvalidCredentials)?;

    if !verify_password(&credentials.password, &identity.credential_hash) {
      return Err(Error::InvalidCredentials);
    }
    self.session_for(&identity)
  }

  pub async fn profile(&self, id: Uuid) -> Result<PublicProfile> {
    self
      .store
      .find_identity(id)
      .await
      .map_err(Error::store)?
      .map(|identity| identity.profile())
      .ok_or(Error::NotFound(USER_NOT_FOUND))
  }

  fn session_for(&self, identity: &Identity) -> Result<Session> {
    let token = self
      .tokens
      .issue(&Subject { id: identity.id, email: identity.email.clone() })?;
    Ok(Session { user: identity.user(), token })
  }

  // ── Products: reads ───────────────────────────────────────────────────

  /// Public listing across every owner.
  pub async fn list(
    &self,
    filter: &ProductFilter,
    sort: Sort,
    request: PageRequest,
  ) -> Result<Page<Product>> {
    let (items, total) = self
      .store
      .find_products(filter, sort, request.offset(), request.limit())
      .await
      .map_err(Error::store)?;
    Ok(Page::new(items, total, request))
  }

  pub async fn get(&self, id: Uuid) -> Result<Product> {
    self.load(id).await
  }

  async fn load(&self, id: Uuid) -> Result<Product> {
    self
      .store
      .find_product(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(PRODUCT_NOT_FOUND))
  }

  /// Load a product for mutation by `subject`.
  async fn load_owned(&self, subject: &Subject, id: Uuid) -> Result<Product> {
    let product = self.load(id).await?;
    if !product.is_owned_by(subject.id) {
      return Err(Error::Forbidden);
    }
    Ok(product)
  }

  // ── Products: writes ──────────────────────────────────────────────────

  pub async fn create(
    &self,
    subject: &Subject,
    draft: ProductDraft,
    upload: Option<Upload>,
  ) -> Result<Product> {
    let mut input = draft.into_new(subject.id)?;
    input.image = self.ingest(upload).await?;
    let new_asset = input.image.as_ref().map(|i| i.asset_id.clone());

    let product = match self.store.create_product(input).await {
      Ok(product) => product,
      Err(e) => {
        if let Some(asset_id) = &new_asset {
          self.media.discard(asset_id).await;
        }
        return Err(Error::store(e));
      }
    };

    tracing::info!(product_id = %product.id, owner_id = %subject.id, "created product");
    Ok(product)
  }

  /// Partial update. Omitted attributes keep their stored value.
  pub async fn update(
    &self,
    subject: &Subject,
    id: Uuid,
    draft: ProductDraft,
    upload: Option<Upload>,
  ) -> Result<Product> {
    let current = self.load_owned(subject, id).await?;
    let mut patch = draft.into_patch()?;
    patch.image = self.ingest(upload).await?;
    let new_asset = patch.image.as_ref().map(|i| i.asset_id.clone());

    let persisted = self.store.update_product(id, patch).await;
    let updated = match persisted {
      Ok(Some(product)) => product,
      outcome => {
        if let Some(asset_id) = &new_asset {
          self.media.discard(asset_id).await;
        }
        return Err(match outcome {
          Err(e) => Error::store(e),
          _ => Error::NotFound(PRODUCT_NOT_FOUND),
        });
      }
    };

    if new_asset.is_some()
      && let Some(previous) = current.asset_id()
      && updated.asset_id() != Some(previous)
    {
      self.media.reconcile(previous).await;
    }

    tracing::info!(product_id = %id, "updated product");
    Ok(updated)
  }

  /// Remove the record first; its asset is cleaned up afterwards.
  pub async fn delete(&self, subject: &Subject, id: Uuid) -> Result<()> {
    let current = self.load_owned(subject, id).await?;

    let removed = self.store.delete_product(id).await.map_err(Error::store)?;
    if !removed {
      return Err(Error::NotFound(PRODUCT_NOT_FOUND));
    }

    if let Some(asset_id) = current.asset_id() {
      self.media.reconcile(asset_id).await;
    }
    tracing::info!(product_id = %id, "deleted product");
    Ok(())
  }

  async fn ingest(&self, upload: Option<Upload>) -> Result<Option<ImageRef>> {
    match upload {
      Some(upload) => Ok(Some(self.media.ingest(upload.bytes, &upload.content_type).await?)),
      None => Ok(None),
    }
  }
}
