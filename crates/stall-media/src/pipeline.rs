//! [`MediaPipeline`]: check, normalize, upload, and clean up.

use bytes::Bytes;
use stall_core::product::ImageRef;

use crate::{Error, MediaConfig, MediaPolicy, ObjectStore, Result};

/// Turns raw uploads into stored images referenced by products.
///
/// The pipeline never touches product records. Its caller persists the
/// returned [`ImageRef`] and only then calls [`reconcile`](Self::reconcile)
/// on the asset it replaced.
#[derive(Clone)]
pub struct MediaPipeline<O> {
  store:  O,
  policy: MediaPolicy,
  folder: String,
}

impl<O: ObjectStore> MediaPipeline<O> {
  pub fn new(store: O, policy: MediaPolicy, folder: impl Into<String>) -> Self {
    Self { store, policy, folder: folder.into() }
  }

  pub fn from_config(store: O, config: &MediaConfig) -> Self {
    Self::new(store, MediaPolicy::from_config(config), config.folder.clone())
  }

  pub fn policy(&self) -> &MediaPolicy { &self.policy }

  pub fn store(&self) -> &O { &self.store }

  /// Validate, normalize and upload one image.
  pub async fn ingest(&self, raw: Bytes, mime: &str) -> Result<ImageRef> {
    self.policy.check(mime, raw.len())?;

    let policy = self.policy;
    let normalized = tokio::task::spawn_blocking(move || policy.normalize(&raw))
      .await
      .map_err(|e| Error::invalid(format!("Image processing failed: {e}")))??;

    let stored = self
      .store
      .upload(&self.folder, normalized.content_type, normalized.bytes)
      .await?;

    tracing::info!(
      asset_id = %stored.asset_id,
      width = normalized.width,
      height = normalized.height,
      "stored image"
    );
    Ok(ImageRef { url: stored.url, asset_id: stored.asset_id })
  }

  /// Delete an asset that a product no longer references.
  ///
  /// Failures are logged and swallowed.
  pub async fn reconcile(&self, previous_asset_id: &str) {
    match self.store.delete(previous_asset_id).await {
      Ok(()) => tracing::debug!(asset_id = previous_asset_id, "removed superseded image"),
      Err(e) => tracing::warn!(
        asset_id = previous_asset_id,
        error = %e,
        "failed to remove superseded image"
      ),
    }
  }

  /// Delete a freshly uploaded asset whose product could not be saved.
  pub async fn discard(&self, orphan_asset_id: &str) {
    if let Err(e) = self.store.delete(orphan_asset_id).await {
      tracing::warn!(asset_id = orphan_asset_id, error = %e, "failed to discard orphaned image");
    }
  }
}

#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use image::{DynamicImage, ImageFormat};

  use super::*;
  use crate::memory::MemoryStore;

  fn png(width: u32, height: u32) -> Bytes {
    let mut buf = Vec::new();
    DynamicImage::new_rgb8(width, height)
      .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
      .unwrap();
    Bytes::from(buf)
  }

  fn pipeline() -> (MemoryStore, MediaPipeline<MemoryStore>) {
    let store = MemoryStore::new("memory://media");
    (store.clone(), MediaPipeline::from_config(store, &MediaConfig::default()))
  }

  #[tokio::test]
  async fn ingest_uploads_normalized_jpeg_under_folder() {
    let (store, pipeline) = pipeline();
    let image = pipeline.ingest(png(1600, 400), "image/png").await.unwrap();

    assert!(image.asset_id.starts_with("marketplace/"));
    assert!(image.url.contains(&image.asset_id));
    let stored = store.get(&image.asset_id).unwrap();
    let decoded = image::load_from_memory(&stored).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (1200, 300));
  }

  #[tokio::test]
  async fn rejected_media_never_reaches_the_store() {
    let (store, pipeline) = pipeline();

    let err = pipeline.ingest(png(10, 10), "image/gif").await.unwrap_err();
    assert!(matches!(err, Error::InvalidMedia(_)));

    let err = pipeline
      .ingest(Bytes::from_static(b"not an image"), "image/jpeg")
      .await
      .unwrap_err();
    assert!(matches!(err, Error::InvalidMedia(_)));
    assert!(store.is_empty());
  }

  #[tokio::test]
  async fn upload_failure_is_upstream() {
    let (store, pipeline) = pipeline();
    store.fail_uploads(true);
    let err = pipeline.ingest(png(10, 10), "image/png").await.unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));
  }

  #[tokio::test]
  async fn reconcile_deletes_previous_asset() {
    let (store, pipeline) = pipeline();
    let old = pipeline.ingest(png(10, 10), "image/png").await.unwrap();
    let new = pipeline.ingest(png(10, 10), "image/png").await.unwrap();

    pipeline.reconcile(&old.asset_id).await;
    assert!(!store.contains(&old.asset_id));
    assert!(store.contains(&new.asset_id));
  }

  #[tokio::test]
  async fn reconcile_failure_is_swallowed() {
    let (store, pipeline) = pipeline();
    let old = pipeline.ingest(png(10, 10), "image/png").await.unwrap();
    store.fail_deletes(true);

    pipeline.reconcile(&old.asset_id).await;
    pipeline.discard(&old.asset_id).await;
    assert!(store.contains(&old.asset_id));
  }
}
