//! Listing query types: filter, sort and pagination.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Page size used when the client does not ask for one.
pub const DEFAULT_LIMIT: u32 = 20;
/// Largest page size a client may request.
pub const MAX_LIMIT: u32 = 100;

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Predicate over products. The default lists active products only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFilter {
  /// Free text matched against title and description.
  pub search:    Option<String>,
  /// Inclusive lower bound.
  pub min_price: Option<Decimal>,
  /// Inclusive upper bound.
  pub max_price: Option<Decimal>,
  /// `None` matches both active and inactive products.
  pub is_active: Option<bool>,
}

impl Default for ProductFilter {
  fn default() -> Self {
    Self { search: None, min_price: None, max_price: None, is_active: Some(true) }
  }
}

impl ProductFilter {
  /// Whitespace-separated search terms; a product matches if any term occurs.
  pub fn search_terms(&self) -> Vec<&str> {
    self
      .search
      .as_deref()
      .map(|s| s.split_whitespace().collect())
      .unwrap_or_default()
  }
}

// ─── Sort ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
pub enum SortField {
  #[default]
  CreatedAt,
  UpdatedAt,
  Price,
  Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortDirection {
  Asc,
  #[default]
  Desc,
}

/// Field and direction; defaults to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sort {
  pub field:     SortField,
  pub direction: SortDirection,
}

impl Sort {
  /// Parse `field[:direction]`, e.g. `price:asc`.
  ///
  /// An unknown field yields the default ordering rather than an error, so a
  /// bad client-provided value never breaks a listing. Any direction other
  /// than `asc` sorts descending.
  pub fn parse(raw: &str) -> Self {
    let (field, direction) = raw.trim().split_once(':').unwrap_or((raw.trim(), ""));
    let Ok(field) = field.parse::<SortField>() else {
      return Self::default();
    };
    let direction = match direction.parse::<SortDirection>() {
      Ok(SortDirection::Asc) => SortDirection::Asc,
      _ => SortDirection::Desc,
    };
    Self { field, direction }
  }
}

// ─── Pagination ──────────────────────────────────────────────────────────────

/// A clamped, 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  page:  u32,
  limit: u32,
}

impl Default for PageRequest {
  fn default() -> Self { Self { page: 1, limit: DEFAULT_LIMIT } }
}

impl PageRequest {
  /// Clamp `page` to at least 1 and `limit` to `1..=MAX_LIMIT`.
  pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
    let page = page.unwrap_or(1).clamp(1, i64::from(u32::MAX));
    let limit = limit
      .unwrap_or(i64::from(DEFAULT_LIMIT))
      .clamp(1, i64::from(MAX_LIMIT));
    // Both values are within u32 range after clamping.
    Self { page: page as u32, limit: limit as u32 }
  }

  pub fn page(&self) -> u32 { self.page }

  pub fn limit(&self) -> u32 { self.limit }

  pub fn offset(&self) -> u64 { u64::from(self.page - 1) * u64::from(self.limit) }
}

/// One page of results in the single list envelope
/// `{data, page, totalPages, total}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
  pub data:        Vec<T>,
  pub page:        u32,
  pub total_pages: u32,
  pub total:       u64,
}

impl<T> Page<T> {
  pub fn new(data: Vec<T>, total: u64, request: PageRequest) -> Self {
    Self {
      data,
      page: request.page(),
      total_pages: total_pages(total, request.limit()),
      total,
    }
  }
}

/// `ceil(total / limit)`, but never less than 1.
pub fn total_pages(total: u64, limit: u32) -> u32 {
  let limit = u64::from(limit.max(1));
  let pages = total.div_ceil(limit).max(1);
  u32::try_from(pages).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sort_parses_field_and_direction() {
    assert_eq!(
      Sort::parse("price:asc"),
      Sort { field: SortField::Price, direction: SortDirection::Asc }
    );
    assert_eq!(
      Sort::parse("title"),
      Sort { field: SortField::Title, direction: SortDirection::Desc }
    );
    assert_eq!(
      Sort::parse("updatedAt:sideways"),
      Sort { field: SortField::UpdatedAt, direction: SortDirection::Desc }
    );
  }

  #[test]
  fn unknown_sort_field_falls_back_to_default() {
    assert_eq!(Sort::parse("passwordHash:asc"), Sort::default());
    assert_eq!(Sort::parse(""), Sort::default());
    assert_eq!(Sort::default().field, SortField::CreatedAt);
    assert_eq!(Sort::default().direction, SortDirection::Desc);
  }

  #[test]
  fn page_request_is_clamped() {
    let r = PageRequest::new(Some(0), Some(500));
    assert_eq!((r.page(), r.limit()), (1, MAX_LIMIT));
    let r = PageRequest::new(Some(-3), Some(0));
    assert_eq!((r.page(), r.limit()), (1, 1));
    let r = PageRequest::new(None, None);
    assert_eq!((r.page(), r.limit()), (1, DEFAULT_LIMIT));
    assert_eq!(PageRequest::new(Some(3), Some(20)).offset(), 40);
  }

  #[test]
  fn total_pages_is_at_least_one() {
    assert_eq!(total_pages(0, 20), 1);
    assert_eq!(total_pages(20, 20), 1);
    assert_eq!(total_pages(21, 20), 2);
    assert_eq!(total_pages(45, 20), 3);
  }

  #[test]
  fn search_terms_split_on_whitespace() {
    let f = ProductFilter { search: Some("  red  bike ".into()), ..Default::default() };
    assert_eq!(f.search_terms(), ["red", "bike"]);
    assert!(ProductFilter::default().search_terms().is_empty());
  }

  #[test]
  fn page_envelope_uses_camel_case() {
    let page = Page::new(vec![1, 2], 2, PageRequest::default());
    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["totalPages"], 1);
    assert_eq!(json["total"], 2);
    assert_eq!(json["page"], 1);
  }
}
