//! HTTP API for the Stall marketplace.
//!
//! Exposes an axum [`Router`] backed by any [`MarketStore`] for records and
//! any [`ObjectStore`] for product images.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = stall_api::app(state); // everything under /api
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod seed;
pub mod service;
pub mod token;

pub use config::ServerConfig;
pub use error::{Error, Result};
pub use service::Marketplace;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use stall_core::store::MarketStore;
use stall_media::ObjectStore;
use tower_http::trace::TraceLayer;

use handlers::{auth as auth_routes, products, users};
use token::TokenService;

/// Room left in a product form for everything but the image.
pub const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, O> {
  pub market: Arc<Marketplace<S, O>>,
  pub tokens: Arc<TokenService>,
}

impl<S, O> Clone for AppState<S, O> {
  fn clone(&self) -> Self {
    Self { market: Arc::clone(&self.market), tokens: Arc::clone(&self.tokens) }
  }
}

impl<S, O> AppState<S, O>
where
  S: MarketStore,
  O: ObjectStore,
{
  pub fn new(market: Marketplace<S, O>, tokens: Arc<TokenService>) -> Self {
    Self { market: Arc::new(market), tokens }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The API routes, unprefixed.
pub fn api_router<S, O>(state: AppState<S, O>) -> Router<()>
where
  S: MarketStore + 'static,
  O: ObjectStore + 'static,
{
  let upload_limit =
    DefaultBodyLimit::max(state.market.media().policy().max_bytes + FORM_OVERHEAD_BYTES);

  Router::new()
    // Auth
    .route("/auth/register", post(auth_routes::register::<S, O>))
    .route("/auth/login", post(auth_routes::login::<S, O>))
    // Users
    .route("/users/{id}", get(users::profile::<S, O>))
    // Products
    .route(
      "/products",
      get(products::list::<S, O>)
        .post(products::create::<S, O>)
        .layer(upload_limit),
    )
    .route(
      "/products/{id}",
      get(products::get_one::<S, O>)
        .put(products::update::<S, O>)
        .delete(products::delete::<S, O>)
        .layer(upload_limit),
    )
    .with_state(state)
}

/// The complete application: routes under `/api`, a JSON 404 fallback, and
/// request tracing.
pub fn app<S, O>(state: AppState<S, O>) -> Router
where
  S: MarketStore + 'static,
  O: ObjectStore + 'static,
{
  Router::new()
    .nest("/api", api_router(state))
    .fallback(handlers::fallback)
    .layer(TraceLayer::new_for_http())
}
