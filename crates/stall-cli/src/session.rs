//! The CLI's view of who is logged in.

use std::sync::Arc;

use crate::{credentials::CredentialStore, error::Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
  Anonymous,
  Authenticated { token: String },
}

impl SessionState {
  /// A blank stored token counts as no token.
  pub fn from_token(token: Option<String>) -> Self {
    match token {
      Some(token) if !token.trim().is_empty() => Self::Authenticated { token: token.trim().to_owned() },
      _ => Self::Anonymous,
    }
  }

  pub fn bearer(&self) -> Option<String> {
    match self {
      Self::Anonymous => None,
      Self::Authenticated { token } => Some(format!("Bearer {token}")),
    }
  }
}

/// Session context backed by a [`CredentialStore`]. Every read goes back to
/// the store, so a token written by another invocation is picked up.
#[derive(Clone)]
pub struct Session {
  credentials: Arc<dyn CredentialStore>,
}

impl Session {
  pub fn new(credentials: Arc<dyn CredentialStore>) -> Self { Self { credentials } }

  pub fn state(&self) -> Result<SessionState> {
    Ok(SessionState::from_token(self.credentials.get()?))
  }

  /// The `Authorization` header value, if logged in.
  pub fn bearer(&self) -> Result<Option<String>> { Ok(self.state()?.bearer()) }

  pub fn start(&self, token: &str) -> Result<()> { self.credentials.set(token) }

  pub fn end(&self) -> Result<()> { self.credentials.delete() }
}
