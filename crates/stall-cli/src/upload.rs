//! Submitting product forms, with one fallback attempt when the network
//! drops the request before the server sees it.
//!
//! A submission moves through four states:
//!
//! 1. **Preflight**: no stored token means [`ClientError::Unauthenticated`]
//!    and nothing is sent.
//! 2. **Primary**: the form goes out through the middleware chain over the
//!    primary transport, with a 60 second deadline.
//! 3. **Fallback**: only on [`TransportError::Connect`]. The token is read
//!    again, `Accept` and `Authorization` are set on the request directly,
//!    and the same form is sent over the fallback transport. There is no
//!    third attempt.
//! 4. **Done**: any reply the server produced, success or error envelope,
//!    is final.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use reqwest::{
  Method,
  header::{ACCEPT, AUTHORIZATION, HeaderValue},
};
use serde::Deserialize;
use stall_core::{
  price::parse_price,
  product::{Product, ProductDraft},
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  error::{ClientError, Result},
  middleware::{Chain, bearer_header},
  session::Session,
  transport::{FilePart, Form, Outgoing, Reply, Transport, UPLOAD_TIMEOUT},
};

// ─── Form input ──────────────────────────────────────────────────────────────

/// Where an `--image` argument points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
  /// Already hosted somewhere; never re-uploaded.
  Remote(String),
  Local(PathBuf),
}

impl ImageSource {
  pub fn parse(raw: &str) -> Self {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
      return Self::Remote(raw.to_owned());
    }
    let path = raw
      .strip_prefix("file://")
      .or_else(|| raw.strip_prefix("file:"))
      .unwrap_or(raw);
    Self::Local(PathBuf::from(path))
  }
}

/// Content type declared for a local image, from its extension.
pub fn content_type_for(path: &Path) -> &'static str {
  match path
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_ascii_lowercase)
    .as_deref()
  {
    Some("png") => "image/png",
    Some("webp") => "image/webp",
    _ => "image/jpeg",
  }
}

/// Product attributes as typed on the command line.
#[derive(Debug, Clone, Default)]
pub struct ProductInput {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub price:       Option<String>,
  pub is_active:   Option<bool>,
  pub image:       Option<String>,
}

impl ProductInput {
  fn draft(&self) -> ProductDraft {
    ProductDraft {
      title:       self.title.clone(),
      description: self.description.clone(),
      price:       self.price.clone(),
      is_active:   self.is_active.map(|a| a.to_string()),
    }
  }

  /// Title, description and price are all required.
  pub fn check_create(&self) -> Result<()> {
    self.draft().into_new(Uuid::nil())?;
    Ok(())
  }

  /// Anything provided must be valid.
  pub fn check_update(&self) -> Result<()> {
    if self.draft().into_patch()?.is_empty() && self.image.is_none() {
      return Err(ClientError::Invalid("nothing to update".into()));
    }
    Ok(())
  }

  /// Build the multipart form, reading a local image from disk.
  pub async fn into_form(self) -> Result<Form> {
    let mut form = Form::default();
    if let Some(title) = self.title {
      form = form.text("title", title.trim());
    }
    if let Some(description) = self.description {
      form = form.text("description", description.trim());
    }
    if let Some(price) = self.price {
      let price = parse_price(&price).map_err(|e| ClientError::Invalid(e.to_string()))?;
      form = form.text("price", price.to_string());
    }
    if let Some(active) = self.is_active {
      form = form.text("isActive", active.to_string());
    }

    match self.image.as_deref().map(ImageSource::parse) {
      Some(ImageSource::Local(path)) => form.file = Some(read_image(&path).await?),
      Some(ImageSource::Remote(url)) => info!(%url, "image is already remote; not attaching"),
      None => {}
    }
    Ok(form)
  }
}

async fn read_image(path: &Path) -> Result<FilePart> {
  let bytes = tokio::fs::read(path)
    .await
    .map_err(|e| ClientError::Invalid(format!("reading {}: {e}", path.display())))?;
  let file_name = path
    .file_name()
    .and_then(|n| n.to_str())
    .unwrap_or("image")
    .to_owned();
  Ok(FilePart {
    field: "image".to_owned(),
    file_name,
    content_type: content_type_for(path).to_owned(),
    bytes: Bytes::from(bytes),
  })
}

// ─── Uploader ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ProductBody {
  product: Product,
}

fn decode_product(reply: Reply) -> Result<Product> {
  Ok(reply.decode::<ProductBody>()?.product)
}

pub struct ResilientUploader<P, F> {
  primary:  P,
  fallback: F,
  chain:    Chain,
  session:  Session,
}

impl<P: Transport, F: Transport> ResilientUploader<P, F> {
  pub fn new(primary: P, fallback: F, chain: Chain, session: Session) -> Self {
    Self { primary, fallback, chain, session }
  }

  pub fn primary(&self) -> &P { &self.primary }

  pub fn chain(&self) -> &Chain { &self.chain }

  pub fn session(&self) -> &Session { &self.session }

  pub async fn submit(&self, method: Method, url: String, form: Form) -> Result<Product> {
    if self.session.bearer()?.is_none() {
      return Err(ClientError::Unauthenticated);
    }

    let request = Outgoing::new(method, url).form(form).timeout(UPLOAD_TIMEOUT);
    let failure = match self.chain.send(&self.primary, request.clone()).await? {
      Ok(reply) => return decode_product(reply),
      Err(e) if e.is_retryable() => e,
      Err(e) => return Err(e.into()),
    };

    warn!(url = %request.url, error = %failure, "primary transport failed, retrying over fallback");
    let bearer = self.session.bearer()?.ok_or(ClientError::Unauthenticated)?;
    let mut retry = request;
    retry
      .headers
      .insert(ACCEPT, HeaderValue::from_static("application/json"));
    retry.headers.insert(AUTHORIZATION, bearer_header(&bearer)?);

    let reply = self.chain.dispatch(&self.fallback, &retry).await?;
    decode_product(reply)
  }
}
