//! Handlers for `/pnls` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/pnls` | |
//! | `POST`   | `/pnls` | Body: `{"name", "description"?}` |
//! | `GET`    | `/pnls/{id}` | 404 if not found |
//! | `PUT`    | `/pnls/{id}` | Body: `{"name"?, "description"?}` |
//! | `DELETE` | `/pnls/{id}` | Cascades to Sub-PnLs and metrics |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use qalytics_core::{
  Id,
  entity::{NewUnit, Pnl, UnitChanges},
  store::MetricsStore,
};

use crate::{AppState, auth::CurrentUser, error::ApiError};

/// Reject blank names on create and rename.
pub(crate) fn check_name(name: &str) -> Result<(), ApiError> {
  if name.trim().is_empty() {
    return Err(ApiError::BadRequest("name must not be empty".to_owned()));
  }
  Ok(())
}

/// `GET /pnls`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
) -> Result<Json<Vec<Pnl>>, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  let pnls = state.store.list_pnls().await.map_err(ApiError::store)?;
  Ok(Json(pnls))
}

/// `POST /pnls`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Json(body): Json<NewUnit>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  check_name(&body.name)?;
  let pnl = state.store.create_pnl(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(pnl)))
}

/// `GET /pnls/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Path(id): Path<Id>,
) -> Result<Json<Pnl>, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  let pnl = state
    .store
    .get_pnl(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("PnL not found: {id}")))?;
  Ok(Json(pnl))
}

/// `PUT /pnls/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Path(id): Path<Id>,
  Json(body): Json<UnitChanges>,
) -> Result<Json<Pnl>, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  if let Some(name) = &body.name {
    check_name(name)?;
  }
  let pnl = state.store.update_pnl(id, body).await.map_err(ApiError::store)?;
  Ok(Json(pnl))
}

/// `DELETE /pnls/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Path(id): Path<Id>,
) -> Result<StatusCode, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  state.store.delete_pnl(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
