//! Error type for `stall-media`.

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// The upload is not an acceptable image: wrong type, too large, or not
  /// decodable.
  #[error("{0}")]
  InvalidMedia(String),

  /// The remote object store failed or rejected the request.
  #[error("object store error: {0}")]
  Upstream(#[source] BoxError),

  #[error("media configuration: {0}")]
  Config(String),
}

impl Error {
  pub fn invalid(message: impl Into<String>) -> Self { Self::InvalidMedia(message.into()) }

  pub fn upstream(err: impl Into<BoxError>) -> Self { Self::Upstream(err.into()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
