//! Errors surfaced to the `stall` user.

use stall_core::{FieldError, ValidationErrors};
use thiserror::Error;

/// A failure below the HTTP layer: nothing usable came back.
#[derive(Debug, Error)]
pub enum TransportError {
  /// The connection could not be established. The server never saw the
  /// request.
  #[error("network unreachable: {0}")]
  Connect(String),

  /// No response within the deadline. The request may have been processed.
  #[error("request timed out: {0}")]
  Timeout(String),

  /// Anything else, including a connection dropped after the request went
  /// out. The request may have been processed.
  #[error("transport error: {0}")]
  Other(String),
}

impl TransportError {
  /// Only failures that provably never reached the server are worth
  /// resubmitting.
  pub fn is_retryable(&self) -> bool { matches!(self, Self::Connect(_)) }
}

impl From<reqwest::Error> for TransportError {
  fn from(e: reqwest::Error) -> Self {
    // A connect timeout is a connect failure: nothing was sent.
    if e.is_connect() {
      Self::Connect(e.to_string())
    } else if e.is_timeout() {
      Self::Timeout(e.to_string())
    } else {
      Self::Other(e.to_string())
    }
  }
}

#[derive(Debug, Error)]
pub enum ClientError {
  /// No stored session; nothing was sent.
  #[error("not logged in (run `stall login`)")]
  Unauthenticated,

  #[error(transparent)]
  Transport(#[from] TransportError),

  /// The server answered with an error envelope.
  #[error("{message}")]
  Api {
    status:  u16,
    message: String,
    errors:  Vec<FieldError>,
  },

  /// Rejected locally before any request was made.
  #[error("{0}")]
  Invalid(String),

  #[error("credential store: {0}")]
  Credentials(String),

  #[error("unexpected response: {0}")]
  Decode(#[from] serde_json::Error),
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

impl From<ValidationErrors> for ClientError {
  fn from(e: ValidationErrors) -> Self { Self::Invalid(e.to_string()) }
}
