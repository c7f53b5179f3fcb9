//! Runtime selection of the object store.

use bytes::Bytes;

use crate::{
  BackendKind, Error, MediaConfig, ObjectStore, Result, StoredObject,
  cloudinary::CloudinaryStore, memory::MemoryStore,
};

/// The object store chosen by `media.backend`.
#[derive(Clone)]
pub enum Backend {
  Memory(MemoryStore),
  Cloudinary(CloudinaryStore),
}

impl Backend {
  pub fn from_config(config: &MediaConfig) -> Result<Self> {
    match config.backend {
      BackendKind::Memory => Ok(Self::Memory(MemoryStore::new("memory://media"))),
      BackendKind::Cloudinary => {
        let cloudinary = config.cloudinary.clone().ok_or_else(|| {
          Error::Config("backend is `cloudinary` but [media.cloudinary] is missing".into())
        })?;
        Ok(Self::Cloudinary(CloudinaryStore::new(cloudinary)?))
      }
    }
  }
}

impl ObjectStore for Backend {
  async fn upload(&self, folder: &str, content_type: &str, bytes: Bytes) -> Result<StoredObject> {
    match self {
      Self::Memory(s) => s.upload(folder, content_type, bytes).await,
      Self::Cloudinary(s) => s.upload(folder, content_type, bytes).await,
    }
  }

  async fn delete(&self, asset_id: &str) -> Result<()> {
    match self {
      Self::Memory(s) => s.delete(asset_id).await,
      Self::Cloudinary(s) => s.delete(asset_id).await,
    }
  }
}
