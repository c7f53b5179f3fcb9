//! The `ObjectStore` trait: the remote side of the media pipeline.

use std::future::Future;

use bytes::Bytes;

use crate::Result;

/// The result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
  /// Public URL the object is served from.
  pub url:      String,
  /// Opaque handle used to delete the object later.
  pub asset_id: String,
}

/// A remote store for normalized images.
///
/// Failures are reported as [`Error::Upstream`](crate::Error::Upstream).
pub trait ObjectStore: Send + Sync {
  fn upload<'a>(
    &'a self,
    folder: &'a str,
    content_type: &'a str,
    bytes: Bytes,
  ) -> impl Future<Output = Result<StoredObject>> + Send + 'a;

  /// Delete an object. Deleting an object that no longer exists succeeds.
  fn delete<'a>(&'a self, asset_id: &'a str) -> impl Future<Output = Result<()>> + Send + 'a;
}
