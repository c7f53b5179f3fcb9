//! Signed session tokens (HS256 JWT).
//!
//! A token carries `{sub, email, iat, exp}` and nothing else. Verification is
//! purely cryptographic plus an expiry check; no server-side state is kept.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Default validity window of an issued token.
pub const DEFAULT_TTL_MINUTES: i64 = 60;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
  sub:   Uuid,
  email: String,
  iat:   i64,
  exp:   i64,
}

/// The identity a verified token speaks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
  pub id:    Uuid,
  pub email: String,
}

pub struct TokenService {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
  ttl:        Duration,
}

impl TokenService {
  pub fn new(secret: &[u8], ttl: Duration) -> Self {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);
    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      validation,
      ttl,
    }
  }

  pub fn ttl(&self) -> Duration { self.ttl }

  /// Mint a token for `subject`, valid from now for the configured window.
  pub fn issue(&self, subject: &Subject) -> Result<String> {
    self.issue_at(subject, Utc::now())
  }

  pub fn issue_at(&self, subject: &Subject, issued_at: DateTime<Utc>) -> Result<String> {
    let claims = Claims {
      sub:   subject.id,
      email: subject.email.clone(),
      iat:   issued_at.timestamp(),
      exp:   (issued_at + self.ttl).timestamp(),
    };
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(|e| Error::Internal(format!("token signing failed: {e}")))
  }

  /// Resolve a token to its subject. Bad signatures, malformed tokens and
  /// expired tokens are all rejected the same way.
  pub fn verify(&self, token: &str) -> Result<Subject> {
    let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
      .map_err(|_| Error::Unauthenticated("Invalid token"))?;
    Ok(Subject { id: data.claims.sub, email: data.claims.email })
  }
}
