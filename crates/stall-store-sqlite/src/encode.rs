//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that lexical order equals chronological order. Prices are stored as
//! normalized decimal strings. UUIDs are stored as hyphenated lowercase
//! strings.

use std::str::FromStr as _;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use stall_core::{
  identity::Identity,
  product::{ImageRef, Product},
  query::{SortDirection, SortField},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_price(price: Decimal) -> String { price.normalize().to_string() }

pub fn decode_price(s: &str) -> Result<Decimal> { Ok(Decimal::from_str(s)?) }

/// Escape `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'`
/// pattern, and wrap the term for substring matching.
pub fn like_pattern(term: &str) -> String {
  let mut out = String::with_capacity(term.len() + 2);
  out.push('%');
  for c in term.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

// ─── Sort ────────────────────────────────────────────────────────────────────

/// The `ORDER BY` clause for a sort. `rowid` breaks ties in the same
/// direction so equal keys keep a stable order across pages.
pub fn order_by(field: SortField, direction: SortDirection) -> String {
  let column = match field {
    SortField::CreatedAt => "created_at",
    SortField::UpdatedAt => "updated_at",
    SortField::Price => "CAST(price AS REAL)",
    SortField::Title => "title COLLATE NOCASE",
  };
  let dir = match direction {
    SortDirection::Asc => "ASC",
    SortDirection::Desc => "DESC",
  };
  format!("ORDER BY {column} {dir}, rowid {dir}")
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawProduct::from_row`].
pub const PRODUCT_COLUMNS: &str = "id, title, description, price, image_url, \
                                   image_asset_id, owner_id, is_active, \
                                   created_at, updated_at";

/// Raw values read directly from a `products` row.
pub struct RawProduct {
  pub id:             String,
  pub title:          String,
  pub description:    String,
  pub price:          String,
  pub image_url:      Option<String>,
  pub image_asset_id: Option<String>,
  pub owner_id:       String,
  pub is_active:      bool,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawProduct {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      title:          row.get(1)?,
      description:    row.get(2)?,
      price:          row.get(3)?,
      image_url:      row.get(4)?,
      image_asset_id: row.get(5)?,
      owner_id:       row.get(6)?,
      is_active:      row.get(7)?,
      created_at:     row.get(8)?,
      updated_at:     row.get(9)?,
    })
  }

  pub fn into_product(self) -> Result<Product> {
    let id = decode_uuid(&self.id)?;
    let image = match (self.image_url, self.image_asset_id) {
      (Some(url), Some(asset_id)) => Some(ImageRef { url, asset_id }),
      (None, None) => None,
      _ => return Err(Error::HalfSetImage(id)),
    };

    Ok(Product {
      id,
      title: self.title,
      description: self.description,
      price: decode_price(&self.price)?,
      image,
      owner_id: decode_uuid(&self.owner_id)?,
      is_active: self.is_active,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Column list matching [`RawIdentity::from_row`].
pub const IDENTITY_COLUMNS: &str =
  "id, display_name, email, credential_hash, avatar_url, created_at";

/// Raw values read directly from an `identities` row.
pub struct RawIdentity {
  pub id:              String,
  pub display_name:    String,
  pub email:           String,
  pub credential_hash: String,
  pub avatar_url:      Option<String>,
  pub created_at:      String,
}

impl RawIdentity {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      display_name:    row.get(1)?,
      email:           row.get(2)?,
      credential_hash: row.get(3)?,
      avatar_url:      row.get(4)?,
      created_at:      row.get(5)?,
    })
  }

  pub fn into_identity(self) -> Result<Identity> {
    Ok(Identity {
      id:              decode_uuid(&self.id)?,
      display_name:    self.display_name,
      email:           self.email,
      credential_hash: self.credential_hash,
      avatar_url:      self.avatar_url,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let a = DateTime::parse_from_rfc3339("2024-01-01T00:00:00.5Z").unwrap().with_timezone(&Utc);
    let b = DateTime::parse_from_rfc3339("2024-01-01T00:00:00.123Z").unwrap().with_timezone(&Utc);
    assert!(encode_dt(b) < encode_dt(a));
    assert_eq!(decode_dt(&encode_dt(a)).unwrap(), a);
  }

  #[test]
  fn like_pattern_escapes_wildcards() {
    assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
  }
}
