//! Handlers for `/users` endpoints.

use axum::{
  Json,
  extract::{Path, State},
};
use stall_core::{identity::PublicProfile, store::MarketStore};
use stall_media::ObjectStore;

use crate::{AppState, error::Result, handlers::parse_id};

/// `GET /users/:id`
pub async fn profile<S, O>(
  State(state): State<AppState<S, O>>,
  Path(id): Path<String>,
) -> Result<Json<PublicProfile>>
where
  S: MarketStore + 'static,
  O: ObjectStore + 'static,
{
  let id = parse_id(&id, "User not found")?;
  Ok(Json(state.market.profile(id).await?))
}
