//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure leaves the server in one envelope:
//! `{"status":"error","message":…,"errors":[{field,message}]?}`.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use stall_core::ValidationErrors;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// Missing, malformed, or expired bearer token.
  #[error("{0}")]
  Unauthenticated(&'static str),

  #[error("Invalid credentials")]
  InvalidCredentials,

  #[error("Forbidden")]
  Forbidden,

  #[error("{0}")]
  NotFound(&'static str),

  #[error("Validation failed")]
  Validation(ValidationErrors),

  #[error("{0}")]
  InvalidMedia(String),

  #[error("image storage unavailable: {0}")]
  UpstreamStorage(#[source] BoxError),

  #[error("store error: {0}")]
  Store(#[source] BoxError),

  /// Password hashing or token signing failed.
  #[error("internal error: {0}")]
  Internal(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Error::Unauthenticated(_) | Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
      Error::Forbidden => StatusCode::FORBIDDEN,
      Error::NotFound(_) => StatusCode::NOT_FOUND,
      Error::Validation(_) | Error::InvalidMedia(_) => StatusCode::BAD_REQUEST,
      Error::UpstreamStorage(_) => StatusCode::BAD_GATEWAY,
      Error::Store(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<ValidationErrors> for Error {
  fn from(errors: ValidationErrors) -> Self { Self::Validation(errors) }
}

impl From<stall_core::Error> for Error {
  fn from(e: stall_core::Error) -> Self {
    match e {
      stall_core::Error::Validation(errors) => Self::Validation(errors),
      stall_core::Error::InvalidPrice(_) => {
        Self::Validation(ValidationErrors::single("price", "price must be a non-negative number"))
      }
    }
  }
}

impl From<stall_media::Error> for Error {
  fn from(e: stall_media::Error) -> Self {
    match e {
      stall_media::Error::InvalidMedia(message) => Self::InvalidMedia(message),
      stall_media::Error::Upstream(source) => Self::UpstreamStorage(source),
      other @ stall_media::Error::Config(_) => Self::UpstreamStorage(Box::new(other)),
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = match &self {
      Error::Validation(errors) => json!({
        "status": "error",
        "message": self.to_string(),
        "errors": errors,
      }),
      Error::Store(_) | Error::Internal(_) => {
        tracing::error!(error = %self, "request failed");
        json!({ "status": "error", "message": "Internal Server Error" })
      }
      Error::UpstreamStorage(_) => {
        tracing::error!(error = %self, "object store failed");
        json!({ "status": "error", "message": self.to_string() })
      }
      _ => json!({ "status": "error", "message": self.to_string() }),
    };
    (status, Json(body)).into_response()
  }
}
