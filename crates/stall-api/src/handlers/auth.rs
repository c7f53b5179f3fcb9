//! Handlers for `/auth` endpoints.

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use stall_core::{
  identity::{Credentials, Registration},
  store::MarketStore,
};
use stall_media::ObjectStore;

use crate::{AppState, error::Result, handlers::json_body, service::Session};

/// `POST /auth/register` with body `{"displayName","email","password"}`
pub async fn register<S, O>(
  State(state): State<AppState<S, O>>,
  body: Result<Json<Registration>, JsonRejection>,
) -> Result<impl IntoResponse>
where
  S: MarketStore + 'static,
  O: ObjectStore + 'static,
{
  let session = state.market.register(json_body(body)?).await?;
  Ok((StatusCode::CREATED, Json(session)))
}

/// `POST /auth/login` with body `{"email","password"}`
pub async fn login<S, O>(
  State(state): State<AppState<S, O>>,
  body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<Session>>
where
  S: MarketStore + 'static,
  O: ObjectStore + 'static,
{
  Ok(Json(state.market.login(json_body(body)?).await?))
}
