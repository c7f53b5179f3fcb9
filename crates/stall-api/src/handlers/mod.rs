//! axum handlers, one module per resource.
//!
//! | Method   | Path              | Auth   |
//! |----------|-------------------|--------|
//! | `POST`   | `/auth/register`  |        |
//! | `POST`   | `/auth/login`     |        |
//! | `GET`    | `/users/:id`      |        |
//! | `GET`    | `/products`       |        |
//! | `GET`    | `/products/:id`   |        |
//! | `POST`   | `/products`       | bearer |
//! | `PUT`    | `/products/:id`   | bearer |
//! | `DELETE` | `/products/:id`   | bearer |

pub mod auth;
pub mod products;
pub mod users;

use axum::{Json, extract::rejection::JsonRejection};
use stall_core::ValidationErrors;
use uuid::Uuid;

use crate::Error;

/// Unwrap a JSON body, reporting a malformed one through the error envelope.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Error> {
  body
    .map(|Json(value)| value)
    .map_err(|rejection| Error::Validation(ValidationErrors::single("body", rejection.body_text())))
}

/// Parse a path id. A malformed id is reported exactly like a missing one.
fn parse_id(raw: &str, not_found: &'static str) -> Result<Uuid, Error> {
  Uuid::parse_str(raw).map_err(|_| Error::NotFound(not_found))
}

/// `404` for any route that does not exist.
pub async fn fallback() -> Error { Error::NotFound("Route not found") }
