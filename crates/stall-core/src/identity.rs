//! Identities: the accounts that own products.
//!
//! An [`Identity`] carries the credential hash and therefore never leaves the
//! server as-is. Responses use the [`User`] (self) and [`PublicProfile`]
//! (anyone) projections instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ValidationErrors;

/// Minimum accepted password length at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum length of an email address (RFC 5321).
pub const MAX_EMAIL_LEN: usize = 254;

// ─── Stored identity ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Identity {
  pub id:              Uuid,
  pub display_name:    String,
  /// Always stored lower-cased; see [`normalize_email`].
  pub email:           String,
  /// argon2 PHC string.
  pub credential_hash: String,
  pub avatar_url:      Option<String>,
  pub created_at:      DateTime<Utc>,
}

impl Identity {
  pub fn user(&self) -> User {
    User {
      id:           self.id,
      display_name: self.display_name.clone(),
      email:        self.email.clone(),
      avatar_url:   self.avatar_url.clone(),
    }
  }

  pub fn profile(&self) -> PublicProfile {
    PublicProfile {
      id:           self.id,
      display_name: self.display_name.clone(),
      avatar_url:   self.avatar_url.clone(),
    }
  }
}

/// Input for [`MarketStore::create_identity`](crate::store::MarketStore::create_identity).
#[derive(Debug, Clone)]
pub struct NewIdentity {
  pub display_name:    String,
  pub email:           String,
  pub credential_hash: String,
}

// ─── Projections ─────────────────────────────────────────────────────────────

/// The identity as shown to its own session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id:           Uuid,
  pub display_name: String,
  pub email:        String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar_url:   Option<String>,
}

/// The identity as shown to everyone else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
  pub id:           Uuid,
  pub display_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub avatar_url:   Option<String>,
}

// ─── Submissions ─────────────────────────────────────────────────────────────

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
  #[serde(default)]
  pub display_name: String,
  #[serde(default)]
  pub email:        String,
  #[serde(default)]
  pub password:     String,
}

impl Registration {
  /// Check every field and return the registration with its display name
  /// trimmed and its email normalized.
  pub fn validate(self) -> Result<Self, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let display_name = self.display_name.trim().to_owned();
    if display_name.is_empty() {
      errors.push("displayName", "displayName required");
    }

    let email = normalize_email(&self.email);
    if !is_valid_email(&email) {
      errors.push("email", "Valid email required");
    }

    if self.password.chars().count() < MIN_PASSWORD_LEN {
      errors.push("password", format!("Password min length {MIN_PASSWORD_LEN}"));
    }

    errors.finish(Self { display_name, email, password: self.password })
  }
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
  #[serde(default)]
  pub email:    String,
  #[serde(default)]
  pub password: String,
}

impl Credentials {
  pub fn validate(self) -> Result<Self, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let email = normalize_email(&self.email);
    if !is_valid_email(&email) {
      errors.push("email", "Valid email required");
    }
    if self.password.is_empty() {
      errors.push("password", "Password required");
    }

    errors.finish(Self { email, password: self.password })
  }
}

// ─── Email helpers ───────────────────────────────────────────────────────────

/// Emails are compared case-insensitively; the canonical form is trimmed and
/// lower-cased.
pub fn normalize_email(raw: &str) -> String { raw.trim().to_lowercase() }

/// Structural check: one `@`, non-empty local part, dotted domain, no
/// whitespace.
pub fn is_valid_email(email: &str) -> bool {
  if email.is_empty() || email.len() > MAX_EMAIL_LEN {
    return false;
  }
  if email.chars().any(char::is_whitespace) {
    return false;
  }
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };
  if local.is_empty() || domain.contains('@') {
    return false;
  }
  domain
    .split_once('.')
    .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty() && !tail.ends_with('.'))
}
