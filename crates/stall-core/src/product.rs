//! Products: the listings owned by an identity.
//!
//! A product references at most one current remote image through
//! [`ImageRef`]. URL and asset id travel together, so a product can never
//! carry one without the other.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ValidationErrors, price::parse_price};

// ─── Image reference ─────────────────────────────────────────────────────────

/// A remote image: its public URL and the opaque handle used to delete it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
  #[serde(rename = "imageUrl")]
  pub url:      String,
  #[serde(rename = "imageAssetId")]
  pub asset_id: String,
}

// ─── Product ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id:          Uuid,
  pub title:       String,
  pub description: String,
  pub price:       Decimal,
  #[serde(flatten)]
  pub image:       Option<ImageRef>,
  /// Set at creation, never changed.
  pub owner_id:    Uuid,
  pub is_active:   bool,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl Product {
  pub fn is_owned_by(&self, identity_id: Uuid) -> bool { self.owner_id == identity_id }

  pub fn asset_id(&self) -> Option<&str> {
    self.image.as_ref().map(|i| i.asset_id.as_str())
  }
}

/// A validated product ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewProduct {
  pub title:       String,
  pub description: String,
  pub price:       Decimal,
  pub owner_id:    Uuid,
  pub is_active:   bool,
  pub image:       Option<ImageRef>,
}

/// A validated partial update. `None` fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub price:       Option<Decimal>,
  pub is_active:   Option<bool>,
  /// Replaces the current image. There is no way to clear an image without
  /// replacing it.
  pub image:       Option<ImageRef>,
}

impl ProductPatch {
  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.description.is_none()
      && self.price.is_none()
      && self.is_active.is_none()
      && self.image.is_none()
  }
}

// ─── Draft ───────────────────────────────────────────────────────────────────

/// Raw product attributes exactly as they arrived in a form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDraft {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub price:       Option<String>,
  pub is_active:   Option<String>,
}

impl ProductDraft {
  /// Validate a creation: title, description and price are required.
  pub fn into_new(self, owner_id: Uuid) -> Result<NewProduct, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let title = required_text(&mut errors, "title", self.title);
    let description = required_text(&mut errors, "description", self.description);
    let price = match self.price {
      Some(raw) => price_field(&mut errors, &raw),
      None => {
        errors.push("price", "price is required");
        None
      }
    };
    let is_active = self
      .is_active
      .and_then(|raw| flag_field(&mut errors, &raw))
      .unwrap_or(true);

    match (title, description, price) {
      (Some(title), Some(description), Some(price)) if errors.is_empty() => Ok(NewProduct {
        title,
        description,
        price,
        owner_id,
        is_active,
        image: None,
      }),
      _ => Err(errors),
    }
  }

  /// Validate an update: every field is optional, but any provided field must
  /// be valid.
  pub fn into_patch(self) -> Result<ProductPatch, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let title = self
      .title
      .and_then(|t| required_text(&mut errors, "title", Some(t)));
    let description = self
      .description
      .and_then(|d| required_text(&mut errors, "description", Some(d)));
    let price = self.price.and_then(|raw| price_field(&mut errors, &raw));
    let is_active = self.is_active.and_then(|raw| flag_field(&mut errors, &raw));

    errors.finish(ProductPatch { title, description, price, is_active, image: None })
  }
}

fn required_text(
  errors: &mut ValidationErrors,
  field:  &str,
  value:  Option<String>,
) -> Option<String> {
  match value.map(|v| v.trim().to_owned()) {
    Some(v) if !v.is_empty() => Some(v),
    _ => {
      errors.push(field, format!("{field} must not be empty"));
      None
    }
  }
}

fn price_field(errors: &mut ValidationErrors, raw: &str) -> Option<Decimal> {
  match parse_price(raw) {
    Ok(price) => Some(price),
    Err(_) => {
      errors.push("price", "price must be a non-negative number");
      None
    }
  }
}

fn flag_field(errors: &mut ValidationErrors, raw: &str) -> Option<bool> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "true" | "1" => Some(true),
    "false" | "0" => Some(false),
    _ => {
      errors.push("isActive", "isActive must be true or false");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use super::*;

  fn draft(title: &str, description: &str, price: &str) -> ProductDraft {
    ProductDraft {
      title:       Some(title.into()),
      description: Some(description.into()),
      price:       Some(price.into()),
      is_active:   None,
    }
  }

  #[test]
  fn new_product_is_trimmed_and_active() {
    let owner = Uuid::new_v4();
    let p = draft(" Chair ", " Comfy ", "29,90").into_new(owner).unwrap();
    assert_eq!(p.title, "Chair");
    assert_eq!(p.description, "Comfy");
    assert_eq!(p.price, Decimal::from_str("29.90").unwrap());
    assert_eq!(p.owner_id, owner);
    assert!(p.is_active);
    assert!(p.image.is_none());
  }

  #[test]
  fn new_product_requires_all_fields() {
    let errors = ProductDraft::default().into_new(Uuid::new_v4()).unwrap_err();
    assert_eq!(errors.fields().len(), 3);
  }

  #[test]
  fn patch_keeps_omitted_fields() {
    let patch = ProductDraft { price: Some("5".into()), ..Default::default() }
      .into_patch()
      .unwrap();
    assert!(patch.title.is_none());
    assert_eq!(patch.price, Some(Decimal::from(5)));
  }

  #[test]
  fn patch_rejects_provided_empty_title() {
    let errors = ProductDraft { title: Some("  ".into()), ..Default::default() }
      .into_patch()
      .unwrap_err();
    assert_eq!(errors.fields()[0].field, "title");
  }

  #[test]
  fn patch_parses_active_flag() {
    let patch = ProductDraft { is_active: Some("false".into()), ..Default::default() }
      .into_patch()
      .unwrap();
    assert_eq!(patch.is_active, Some(false));

    let errors = ProductDraft { is_active: Some("maybe".into()), ..Default::default() }
      .into_patch()
      .unwrap_err();
    assert_eq!(errors.fields()[0].field, "isActive");
  }

  #[test]
  fn image_fields_serialize_together() {
    let now = Utc::now();
    let mut product = Product {
      id:          Uuid::new_v4(),
      title:       "t".into(),
      description: "d".into(),
      price:       Decimal::from(1),
      image:       None,
      owner_id:    Uuid::new_v4(),
      is_active:   true,
      created_at:  now,
      updated_at:  now,
    };
    let json = serde_json::to_value(&product).unwrap();
    assert!(json.get("imageUrl").is_none());
    assert!(json.get("imageAssetId").is_none());

    product.image = Some(ImageRef { url: "https://cdn/x.jpg".into(), asset_id: "x".into() });
    let json = serde_json::to_value(&product).unwrap();
    assert_eq!(json["imageUrl"], "https://cdn/x.jpg");
    assert_eq!(json["imageAssetId"], "x");
    assert_eq!(json["ownerId"], product.owner_id.to_string());

    let back: Product = serde_json::from_value(json).unwrap();
    assert_eq!(back.image, product.image);
  }
}
