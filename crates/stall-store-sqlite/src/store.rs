//! [`SqliteStore`]: the SQLite implementation of [`MarketStore`].

use std::path::Path;

use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::{OptionalExtension as _, types::Value};
use uuid::Uuid;

use stall_core::{
  identity::{Identity, NewIdentity},
  product::{NewProduct, Product, ProductPatch},
  query::{ProductFilter, Sort},
  store::MarketStore,
};

use crate::{
  Result,
  encode::{
    IDENTITY_COLUMNS, PRODUCT_COLUMNS, RawIdentity, RawProduct, encode_dt,
    encode_price, encode_uuid, like_pattern, order_by,
  },
  functions,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A marketplace store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        functions::register(conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// The current time at the precision timestamps are stored with.
fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

/// Build the `WHERE` clause and its positional arguments for a filter.
fn where_clause(filter: &ProductFilter) -> (String, Vec<Value>) {
  let mut conds: Vec<String> = vec![];
  let mut args: Vec<Value> = vec![];

  if let Some(active) = filter.is_active {
    conds.push("is_active = ?".to_owned());
    args.push(Value::Integer(i64::from(active)));
  }

  if let Some(min) = filter.min_price {
    conds.push("price_cmp(price, ?) >= 0".to_owned());
    args.push(Value::Text(encode_price(min)));
  }
  if let Some(max) = filter.max_price {
    conds.push("price_cmp(price, ?) <= 0".to_owned());
    args.push(Value::Text(encode_price(max)));
  }

  let terms = filter.search_terms();
  if !terms.is_empty() {
    let mut any = Vec::with_capacity(terms.len());
    for term in terms {
      any.push("(fold(title) LIKE ? ESCAPE '\\' OR fold(description) LIKE ? ESCAPE '\\')");
      let pattern = like_pattern(&term.to_lowercase());
      args.push(Value::Text(pattern.clone()));
      args.push(Value::Text(pattern));
    }
    conds.push(format!("({})", any.join(" OR ")));
  }

  let clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  (clause, args)
}

// ─── MarketStore impl ────────────────────────────────────────────────────────

impl MarketStore for SqliteStore {
  type Error = crate::Error;

  // ── Identities ────────────────────────────────────────────────────────────

  async fn create_identity(&self, input: NewIdentity) -> Result<Option<Identity>> {
    let identity = Identity {
      id:              Uuid::new_v4(),
      display_name:    input.display_name,
      email:           input.email,
      credential_hash: input.credential_hash,
      avatar_url:      None,
      created_at:      now(),
    };

    let id_str = encode_uuid(identity.id);
    let name   = identity.display_name.clone();
    let email  = identity.email.clone();
    let hash   = identity.credential_hash.clone();
    let at_str = encode_dt(identity.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO identities (id, display_name, email, credential_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, name, email, hash, at_str],
        );
        match result {
          Ok(_) => Ok(true),
          Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
          {
            Ok(false)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(inserted.then_some(identity))
  }

  async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE id = ?1"),
            rusqlite::params![id_str],
            RawIdentity::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>> {
    let email = email.to_owned();

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        // The column is declared COLLATE NOCASE.
        Ok(conn
          .query_row(
            &format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE email = ?1"),
            rusqlite::params![email],
            RawIdentity::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  // ── Products ──────────────────────────────────────────────────────────────

  async fn find_products(
    &self,
    filter: &ProductFilter,
    sort:   Sort,
    offset: u64,
    limit:  u32,
  ) -> Result<(Vec<Product>, u64)> {
    let (where_sql, args) = where_clause(filter);
    let order_sql = order_by(sort.field, sort.direction);
    let offset = i64::try_from(offset).unwrap_or(i64::MAX);

    let (raws, total): (Vec<RawProduct>, i64) = self
      .conn
      .call(move |conn| {
        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM products {where_sql}"),
          rusqlite::params_from_iter(args.iter()),
          |r| r.get(0),
        )?;

        let mut page_args = args;
        page_args.push(Value::Integer(i64::from(limit)));
        page_args.push(Value::Integer(offset));

        let mut stmt = conn.prepare(&format!(
          "SELECT {PRODUCT_COLUMNS} FROM products {where_sql} {order_sql} LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(page_args.iter()), RawProduct::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((rows, total))
      })
      .await?;

    let products = raws
      .into_iter()
      .map(RawProduct::into_product)
      .collect::<Result<Vec<_>>>()?;
    Ok((products, u64::try_from(total).unwrap_or(0)))
  }

  async fn find_product(&self, id: Uuid) -> Result<Option<Product>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawProduct> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
            rusqlite::params![id_str],
            RawProduct::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProduct::into_product).transpose()
  }

  async fn create_product(&self, input: NewProduct) -> Result<Product> {
    let now = now();
    let product = Product {
      id:          Uuid::new_v4(),
      title:       input.title,
      description: input.description,
      price:       input.price.normalize(),
      image:       input.image,
      owner_id:    input.owner_id,
      is_active:   input.is_active,
      created_at:  now,
      updated_at:  now,
    };

    let id_str    = encode_uuid(product.id);
    let title     = product.title.clone();
    let desc      = product.description.clone();
    let price     = encode_price(product.price);
    let image_url = product.image.as_ref().map(|i| i.url.clone());
    let asset_id  = product.image.as_ref().map(|i| i.asset_id.clone());
    let owner_str = encode_uuid(product.owner_id);
    let is_active = product.is_active;
    let at_str    = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO products (
             id, title, description, price, image_url, image_asset_id,
             owner_id, is_active, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
          rusqlite::params![
            id_str, title, desc, price, image_url, asset_id, owner_str, is_active, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(product)
  }

  async fn update_product(&self, id: Uuid, patch: ProductPatch) -> Result<Option<Product>> {
    let id_str    = encode_uuid(id);
    let title     = patch.title;
    let desc      = patch.description;
    let price     = patch.price.map(encode_price);
    let is_active = patch.is_active;
    let image_url = patch.image.as_ref().map(|i| i.url.clone());
    let asset_id  = patch.image.map(|i| i.asset_id);
    let at_str    = encode_dt(now());

    // A single statement keeps the partial update atomic; concurrent writers
    // resolve last-write-wins per column.
    let raw: Option<RawProduct> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "UPDATE products SET
                 title          = COALESCE(?1, title),
                 description    = COALESCE(?2, description),
                 price          = COALESCE(?3, price),
                 is_active      = COALESCE(?4, is_active),
                 image_url      = COALESCE(?5, image_url),
                 image_asset_id = COALESCE(?6, image_asset_id),
                 updated_at     = ?7
               WHERE id = ?8
               RETURNING {PRODUCT_COLUMNS}"
            ),
            rusqlite::params![title, desc, price, is_active, image_url, asset_id, at_str, id_str],
            RawProduct::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProduct::into_product).transpose()
  }

  async fn delete_product(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM products WHERE id = ?1", rusqlite::params![id_str])?)
      })
      .await?;

    Ok(affected > 0)
  }
}
