//! In-process object store for development and tests.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
  },
};

use bytes::Bytes;
use uuid::Uuid;

use crate::{Error, ObjectStore, Result, StoredObject};

#[derive(Default)]
struct Inner {
  objects:      Mutex<HashMap<String, Bytes>>,
  fail_uploads: AtomicBool,
  fail_deletes: AtomicBool,
}

/// Keeps objects in a shared map. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
  base_url: String,
  inner:    Arc<Inner>,
}

impl MemoryStore {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self { base_url: base_url.into(), inner: Arc::default() }
  }

  pub fn contains(&self, asset_id: &str) -> bool {
    self.objects().contains_key(asset_id)
  }

  pub fn get(&self, asset_id: &str) -> Option<Bytes> {
    self.objects().get(asset_id).cloned()
  }

  pub fn len(&self) -> usize { self.objects().len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  /// Make every following upload fail with an upstream error.
  pub fn fail_uploads(&self, fail: bool) {
    self.inner.fail_uploads.store(fail, Ordering::SeqCst);
  }

  /// Make every following delete fail with an upstream error.
  pub fn fail_deletes(&self, fail: bool) {
    self.inner.fail_deletes.store(fail, Ordering::SeqCst);
  }

  fn objects(&self) -> std::sync::MutexGuard<'_, HashMap<String, Bytes>> {
    // A poisoned map is still a valid map.
    self
      .inner
      .objects
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl ObjectStore for MemoryStore {
  async fn upload(&self, folder: &str, _content_type: &str, bytes: Bytes) -> Result<StoredObject> {
    if self.inner.fail_uploads.load(Ordering::SeqCst) {
      return Err(Error::upstream("memory store: upload refused"));
    }
    let asset_id = format!("{folder}/{}", Uuid::new_v4().simple());
    let url = format!("{}/{asset_id}.jpg", self.base_url.trim_end_matches('/'));
    self.objects().insert(asset_id.clone(), bytes);
    Ok(StoredObject { url, asset_id })
  }

  async fn delete(&self, asset_id: &str) -> Result<()> {
    if self.inner.fail_deletes.load(Ordering::SeqCst) {
      return Err(Error::upstream("memory store: delete refused"));
    }
    self.objects().remove(asset_id);
    Ok(())
  }
}
