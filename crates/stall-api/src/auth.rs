//! Password hashing and the bearer-token session guard.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use rand_core::OsRng;
use stall_core::store::MarketStore;
use stall_media::ObjectStore;

use crate::{
  AppState,
  error::{Error, Result},
  token::{Subject, TokenService},
};

/// Hash a password into an argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Internal(format!("argon2 error: {e}")))
}

/// Check `password` against a stored PHC string. An unparseable hash never
/// matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
  PasswordHash::new(hash).is_ok_and(|parsed| {
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  })
}

/// The identity behind a request that passed the session guard.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Subject);

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|token| !token.is_empty())
    .ok_or(Error::Unauthenticated("Unauthorized"))
}

/// Resolve the request's bearer token to a subject.
pub fn verify_bearer(headers: &HeaderMap, tokens: &TokenService) -> Result<Subject> {
  tokens.verify(bearer_token(headers)?)
}

impl<S, O> FromRequestParts<AppState<S, O>> for Authenticated
where
  S: MarketStore + 'static,
  O: ObjectStore + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, O>,
  ) -> Result<Self, Self::Rejection> {
    let subject = verify_bearer(&parts.headers, &state.tokens)?;
    Ok(Authenticated(subject))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::{HeaderValue, Request};
  use chrono::Duration;
  use uuid::Uuid;

  fn tokens() -> TokenService { TokenService::new(b"secret", Duration::minutes(60)) }

  fn headers(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    headers
  }

  fn alice() -> Subject { Subject { id: Uuid::new_v4(), email: "alice@example.com".into() } }

  #[test]
  fn password_roundtrip() {
    let hash = hash_password("correct horse").unwrap();
    assert!(hash.starts_with("$argon2id$"));
    assert!(verify_password("correct horse", &hash));
    assert!(!verify_password("wrong horse", &hash));
    assert!(!verify_password("correct horse", "not-a-phc-string"));
  }

  #[test]
  fn valid_bearer_resolves_subject() {
    let tokens = tokens();
    let subject = alice();
    let token = tokens.issue(&subject).unwrap();
    let resolved = verify_bearer(&headers(&format!("Bearer {token}")), &tokens).unwrap();
    assert_eq!(resolved, subject);
  }

  #[test]
  fn missing_header() {
    let err = verify_bearer(&HeaderMap::new(), &tokens()).unwrap_err();
    assert!(matches!(err, Error::Unauthenticated("Unauthorized")));
  }

  #[test]
  fn wrong_scheme() {
    let err = verify_bearer(&headers("Basic dXNlcjpwYXNz"), &tokens()).unwrap_err();
    assert!(matches!(err, Error::Unauthenticated(_)));
    let err = verify_bearer(&headers("Bearer "), &tokens()).unwrap_err();
    assert!(matches!(err, Error::Unauthenticated(_)));
  }

  #[test]
  fn invalid_token() {
    let err = verify_bearer(&headers("Bearer abc.def.ghi"), &tokens()).unwrap_err();
    assert!(matches!(err, Error::Unauthenticated("Invalid token")));
  }

  #[tokio::test]
  async fn extractor_reads_state_tokens() {
    let state = crate::tests::state().await;
    let subject = alice();
    let token = state.tokens.issue(&subject).unwrap();

    let req = Request::builder()
      .header(header::AUTHORIZATION, format!("Bearer {token}"))
      .body(axum::body::Body::empty())
      .unwrap();
    let (mut parts, _) = req.into_parts();
    let Authenticated(resolved) = Authenticated::from_request_parts(&mut parts, &state)
      .await
      .unwrap();
    assert_eq!(resolved, subject);

    let req = Request::builder().body(axum::body::Body::empty()).unwrap();
    let (mut parts, _) = req.into_parts();
    assert!(Authenticated::from_request_parts(&mut parts, &state).await.is_err());
  }
}
