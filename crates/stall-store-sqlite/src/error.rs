//! Error type for `stall-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("decimal parse error: {0}")]
  Decimal(#[from] rust_decimal::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A row carried an image URL without an asset id, or the reverse.
  #[error("product {0} has a half-set image reference")]
  HalfSetImage(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
