//! Demo data for a fresh database.

use std::str::FromStr as _;

use rust_decimal::Decimal;
use stall_core::{identity::NewIdentity, product::NewProduct, store::MarketStore};

use crate::{auth::hash_password, error::{Error, Result}};

pub const DEMO_PASSWORD: &str = "password123";

struct Demo {
  name:        &'static str,
  email:       &'static str,
  title:       &'static str,
  description: &'static str,
  price:       &'static str,
}

const DEMOS: [Demo; 2] = [
  Demo {
    name:        "Alice",
    email:       "alice@example.com",
    title:       "Vintage Chair",
    description: "A comfy vintage chair in good condition.",
    price:       "49.99",
  },
  Demo {
    name:        "Bob",
    email:       "bob@example.com",
    title:       "Mountain Bike",
    description: "Lightly used mountain bike, great for trails.",
    price:       "299.00",
  },
];

/// Insert the demo identities with one product each. Identities whose email
/// already exists are skipped along with their product, so running twice is
/// harmless. Returns the number of identities created.
pub async fn seed<S: MarketStore>(store: &S) -> Result<usize> {
  let credential_hash = hash_password(DEMO_PASSWORD)?;
  let mut created = 0;

  for demo in &DEMOS {
    let identity = store
      .create_identity(NewIdentity {
        display_name:    demo.name.to_owned(),
        email:           demo.email.to_owned(),
        credential_hash: credential_hash.clone(),
      })
      .await
      .map_err(Error::store)?;

    let Some(identity) = identity else {
      tracing::info!(email = demo.email, "demo identity exists, skipping");
      continue;
    };

    let price = Decimal::from_str(demo.price)
      .map_err(|e| Error::Internal(format!("demo price {}: {e}", demo.price)))?;
    store
      .create_product(NewProduct {
        title: demo.title.to_owned(),
        description: demo.description.to_owned(),
        price,
        owner_id: identity.id,
        is_active: true,
        image: None,
      })
      .await
      .map_err(Error::store)?;

    tracing::info!(email = demo.email, product = demo.title, "seeded demo identity");
    created += 1;
  }
  Ok(created)
}

#[cfg(test)]
mod tests {
  use stall_core::query::{ProductFilter, Sort};
  use stall_store_sqlite::SqliteStore;

  use super::*;
  use crate::auth::verify_password;

  #[tokio::test]
  async fn seeding_is_idempotent() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    assert_eq!(seed(&store).await.unwrap(), 2);
    assert_eq!(seed(&store).await.unwrap(), 0);

    let (products, total) = store
      .find_products(&ProductFilter::default(), Sort::default(), 0, 20)
      .await
      .unwrap();
    assert_eq!(total, 2);
    assert!(products.iter().any(|p| p.title == "Vintage Chair"));

    let alice = store.find_identity_by_email("alice@example.com").await.unwrap().unwrap();
    assert!(verify_password(DEMO_PASSWORD, &alice.credential_hash));
  }
}
