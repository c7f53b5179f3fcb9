//! Handlers for `/products` endpoints.
//!
//! Writes take `multipart/form-data` with the text fields `title`,
//! `description`, `price`, `isActive` and an optional `image` file part.

use axum::{
  Json,
  extract::{
    Multipart, Path, Query, State,
    multipart::{MultipartError, MultipartRejection},
  },
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use stall_core::{
  ValidationErrors,
  price::parse_price,
  product::{Product, ProductDraft},
  query::{Page, PageRequest, ProductFilter, Sort},
  store::MarketStore,
};
use stall_media::ObjectStore;

use crate::{
  AppState, Error,
  auth::Authenticated,
  error::Result,
  handlers::parse_id,
  service::Upload,
};

const NOT_FOUND: &str = "Product not found";

#[derive(Debug, Serialize)]
pub struct ProductBody {
  pub product: Product,
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
  pub page:      Option<String>,
  pub limit:     Option<String>,
  pub search:    Option<String>,
  pub min_price: Option<String>,
  pub max_price: Option<String>,
  pub sort:      Option<String>,
}

impl ListParams {
  /// Validate the raw parameters. `page` and `limit` must be integers and
  /// are then clamped; an unknown sort field falls back to the default.
  pub fn parse(self) -> Result<(ProductFilter, Sort, PageRequest), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let page = integer(&mut errors, "page", self.page);
    let limit = integer(&mut errors, "limit", self.limit);
    let min_price = decimal(&mut errors, "minPrice", self.min_price);
    let max_price = decimal(&mut errors, "maxPrice", self.max_price);

    let filter = ProductFilter {
      search: self.search.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()),
      min_price,
      max_price,
      ..ProductFilter::default()
    };
    let sort = self.sort.as_deref().map(Sort::parse).unwrap_or_default();

    errors.finish((filter, sort, PageRequest::new(page, limit)))
  }
}

fn integer(errors: &mut ValidationErrors, field: &str, raw: Option<String>) -> Option<i64> {
  let raw = raw?;
  match raw.trim().parse::<i64>() {
    Ok(n) => Some(n),
    Err(_) => {
      errors.push(field, format!("{field} must be an integer"));
      None
    }
  }
}

fn decimal(
  errors: &mut ValidationErrors,
  field:  &str,
  raw:    Option<String>,
) -> Option<rust_decimal::Decimal> {
  let raw = raw.filter(|r| !r.trim().is_empty())?;
  match parse_price(&raw) {
    Ok(d) => Some(d),
    Err(_) => {
      errors.push(field, format!("{field} must be a non-negative number"));
      None
    }
  }
}

/// `GET /products?page&limit&search&minPrice&maxPrice&sort`
pub async fn list<S, O>(
  State(state): State<AppState<S, O>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Page<Product>>>
where
  S: MarketStore + 'static,
  O: ObjectStore + 'static,
{
  let (filter, sort, request) = params.parse()?;
  Ok(Json(state.market.list(&filter, sort, request).await?))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /products/:id`
pub async fn get_one<S, O>(
  State(state): State<AppState<S, O>>,
  Path(id): Path<String>,
) -> Result<Json<ProductBody>>
where
  S: MarketStore + 'static,
  O: ObjectStore + 'static,
{
  let id = parse_id(&id, NOT_FOUND)?;
  let product = state.market.get(id).await?;
  Ok(Json(ProductBody { product }))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /products` (multipart): title, description and price required.
pub async fn create<S, O>(
  State(state): State<AppState<S, O>>,
  Authenticated(subject): Authenticated,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse>
where
  S: MarketStore + 'static,
  O: ObjectStore + 'static,
{
  let (draft, upload) = read_form(multipart).await?;
  let product = state.market.create(&subject, draft, upload).await?;
  Ok((StatusCode::CREATED, Json(ProductBody { product })))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /products/:id` (multipart): every field optional.
pub async fn update<S, O>(
  State(state): State<AppState<S, O>>,
  Authenticated(subject): Authenticated,
  Path(id): Path<String>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProductBody>>
where
  S: MarketStore + 'static,
  O: ObjectStore + 'static,
{
  let id = parse_id(&id, NOT_FOUND)?;
  let (draft, upload) = read_form(multipart).await?;
  let product = state.market.update(&subject, id, draft, upload).await?;
  Ok(Json(ProductBody { product }))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /products/:id`
pub async fn delete<S, O>(
  State(state): State<AppState<S, O>>,
  Authenticated(subject): Authenticated,
  Path(id): Path<String>,
) -> Result<Json<serde_json::Value>>
where
  S: MarketStore + 'static,
  O: ObjectStore + 'static,
{
  let id = parse_id(&id, NOT_FOUND)?;
  state.market.delete(&subject, id).await?;
  Ok(Json(json!({ "success": true })))
}

// ─── Form parsing ────────────────────────────────────────────────────────────

async fn read_form(
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<(ProductDraft, Option<Upload>)> {
  let mut multipart = multipart.map_err(|rejection| {
    Error::Validation(ValidationErrors::single("body", rejection.body_text()))
  })?;

  let mut draft = ProductDraft::default();
  let mut upload = None;

  while let Some(field) = multipart.next_field().await.map_err(form_error)? {
    let Some(name) = field.name().map(str::to_owned) else {
      continue;
    };
    match name.as_str() {
      "image" => {
        let content_type = field.content_type().unwrap_or_default().to_owned();
        let bytes = field.bytes().await.map_err(form_error)?;
        // An empty file part means no file was chosen.
        if !bytes.is_empty() {
          upload = Some(Upload { bytes, content_type });
        }
      }
      "title" => draft.title = Some(field.text().await.map_err(form_error)?),
      "description" => draft.description = Some(field.text().await.map_err(form_error)?),
      "price" => draft.price = Some(field.text().await.map_err(form_error)?),
      "isActive" => draft.is_active = Some(field.text().await.map_err(form_error)?),
      _ => {}
    }
  }
  Ok((draft, upload))
}

fn form_error(e: MultipartError) -> Error {
  if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
    Error::InvalidMedia("File too large".to_owned())
  } else {
    Error::Validation(ValidationErrors::single("body", e.body_text()))
  }
}
