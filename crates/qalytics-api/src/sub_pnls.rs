//! Handlers for Sub-PnL endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/pnls/{id}/sub-pnls` | Each with summary metrics |
//! | `POST`   | `/pnls/{id}/sub-pnls` | 404 if the PnL is missing |
//! | `GET`    | `/sub-pnls/{id}` | With detail metrics |
//! | `PUT`    | `/sub-pnls/{id}` | Body: `{"name"?, "description"?}` |
//! | `DELETE` | `/sub-pnls/{id}` | Re-aggregates the parent PnL |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use qalytics_core::{
  Id,
  entity::{NewUnit, SubPnl, UnitChanges},
  store::MetricsStore,
  view::{SubPnlWithDetail, SubPnlWithMetrics},
};

use crate::{AppState, auth::CurrentUser, error::ApiError, pnls::check_name};

/// `GET /pnls/{id}/sub-pnls`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Path(pnl_id): Path<Id>,
) -> Result<Json<Vec<SubPnlWithMetrics>>, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  let subs = state
    .store
    .list_sub_pnls(pnl_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(subs))
}

/// `POST /pnls/{id}/sub-pnls`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Path(pnl_id): Path<Id>,
  Json(body): Json<NewUnit>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  check_name(&body.name)?;
  let sub = state
    .store
    .create_sub_pnl(pnl_id, body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(sub)))
}

/// `GET /sub-pnls/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Path(id): Path<Id>,
) -> Result<Json<SubPnlWithDetail>, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  let sub_pnl = state
    .store
    .get_sub_pnl(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("Sub-PnL not found: {id}")))?;

  let detail_metrics = state
    .store
    .ensure_detail_metrics(id)
    .await
    .map_err(ApiError::store)?
    .into_inner();

  Ok(Json(SubPnlWithDetail { sub_pnl, detail_metrics }))
}

/// `PUT /sub-pnls/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Path(id): Path<Id>,
  Json(body): Json<UnitChanges>,
) -> Result<Json<SubPnl>, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  if let Some(name) = &body.name {
    check_name(name)?;
  }
  let sub = state
    .store
    .update_sub_pnl(id, body)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(sub))
}

/// `DELETE /sub-pnls/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Path(id): Path<Id>,
) -> Result<StatusCode, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  state.store.delete_sub_pnl(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
