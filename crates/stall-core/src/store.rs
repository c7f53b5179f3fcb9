//! The `MarketStore` trait.
//!
//! Implemented by storage backends (e.g. `stall-store-sqlite`). The server
//! layer depends on this abstraction, not on any concrete backend.
//!
//! The store is ownership-agnostic: it never checks who is asking. Callers
//! perform the ownership check before any update or delete.

use std::future::Future;

use uuid::Uuid;

use crate::{
  identity::{Identity, NewIdentity},
  product::{NewProduct, Product, ProductPatch},
  query::{ProductFilter, Sort},
};

/// Abstraction over a marketplace store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait MarketStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Identities ────────────────────────────────────────────────────────

  /// Persist a new identity. Returns `None` if the email (compared
  /// case-insensitively) is already registered.
  fn create_identity(
    &self,
    input: NewIdentity,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  fn find_identity(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  /// Look up an identity by email, case-insensitively.
  fn find_identity_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + 'a;

  // ── Products ──────────────────────────────────────────────────────────

  /// Return one window of the products matching `filter`, ordered by `sort`,
  /// together with the total number of matches.
  fn find_products<'a>(
    &'a self,
    filter: &'a ProductFilter,
    sort:   Sort,
    offset: u64,
    limit:  u32,
  ) -> impl Future<Output = Result<(Vec<Product>, u64), Self::Error>> + Send + 'a;

  fn find_product(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Product>, Self::Error>> + Send + '_;

  /// Persist a new product. `id`, `created_at` and `updated_at` are assigned
  /// by the store.
  fn create_product(
    &self,
    input: NewProduct,
  ) -> impl Future<Output = Result<Product, Self::Error>> + Send + '_;

  /// Apply `patch` and bump `updated_at`. Returns `None` if the product does
  /// not exist.
  fn update_product(
    &self,
    id: Uuid,
    patch: ProductPatch,
  ) -> impl Future<Output = Result<Option<Product>, Self::Error>> + Send + '_;

  /// Hard-delete a product. Returns `false` if it did not exist.
  fn delete_product(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
