//! Test doubles: a scripted [`Transport`] and an in-memory
//! [`CredentialStore`].

use std::{
  collections::VecDeque,
  sync::{Mutex, MutexGuard},
};

use bytes::Bytes;

use crate::{
  credentials::CredentialStore,
  error::{Result as ClientResult, TransportError},
  transport::{Outgoing, Reply, Transport},
};

#[derive(Debug, Default)]
pub struct MemoryCredentials {
  token: Mutex<Option<String>>,
}

impl MemoryCredentials {
  pub fn with_token(token: &str) -> Self { Self { token: Mutex::new(Some(token.to_owned())) } }

  fn slot(&self) -> MutexGuard<'_, Option<String>> {
    self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl CredentialStore for MemoryCredentials {
  fn get(&self) -> ClientResult<Option<String>> { Ok(self.slot().clone()) }

  fn set(&self, token: &str) -> ClientResult<()> {
    *self.slot() = Some(token.to_owned());
    Ok(())
  }

  fn delete(&self) -> ClientResult<()> {
    *self.slot() = None;
    Ok(())
  }
}

pub struct Scripted {
  replies: Mutex<VecDeque<Result<Reply, TransportError>>>,
  sent:    Mutex<Vec<Outgoing>>,
}

impl Scripted {
  pub fn new(replies: impl IntoIterator<Item = Result<Reply, TransportError>>) -> Self {
    Self {
      replies: Mutex::new(replies.into_iter().collect()),
      sent:    Mutex::new(Vec::new()),
    }
  }

  pub fn ok(status: u16, body: &str) -> Result<Reply, TransportError> {
    Ok(Reply { status, body: Bytes::from(body.to_owned()) })
  }

  pub fn unreachable() -> Result<Reply, TransportError> {
    Err(TransportError::Connect("connection refused".into()))
  }

  pub fn sent(&self) -> Vec<Outgoing> { self.sent.lock().unwrap().clone() }
}

impl Transport for Scripted {
  async fn send(&self, request: &Outgoing) -> Result<Reply, TransportError> {
    self.sent.lock().unwrap().push(request.clone());
    self
      .replies
      .lock()
      .unwrap()
      .pop_front()
      .unwrap_or_else(|| Err(TransportError::Other("no scripted reply left".into())))
  }
}

/// A `{product}` response body as the server sends it.
pub fn product_body(title: &str) -> String {
  serde_json::json!({
    "product": {
      "id": "6f1c55d0-3a59-4a43-9d0b-8f6e2b7c2a11",
      "title": title,
      "description": "Solid oak",
      "price": "49.99",
      "ownerId": "0b7e8a64-45a8-49e5-9b0c-51f4b9f0c6d2",
      "isActive": true,
      "createdAt": "2026-01-05T10:00:00Z",
      "updatedAt": "2026-01-05T10:00:00Z",
    }
  })
  .to_string()
}
