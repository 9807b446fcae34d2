//! Handlers for the metrics endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/pnls/{id}/metrics` | Re-aggregated from Sub-PnLs on read |
//! | `PUT`  | `/pnls/{id}/metrics` | Manual override until the next aggregation |
//! | `GET`  | `/sub-pnls/{id}/metrics` | |
//! | `PUT`  | `/sub-pnls/{id}/metrics` | Re-aggregates the parent PnL |
//! | `GET`  | `/sub-pnls/{id}/detail-metrics` | |
//! | `PUT`  | `/sub-pnls/{id}/detail-metrics` | Optional `expected_version`; 409 if stale |
//!
//! Every `PUT` is a partial update: absent fields keep their stored values and
//! the write is recorded in the metrics history under the calling user.

use axum::{
  Json,
  extract::{Path, State},
};
use qalytics_core::{
  Id,
  metrics::{
    DetailMetricsUpdate, PnlMetrics, SubPnlDetailMetrics, SubPnlMetrics,
    SummaryMetricsUpdate,
  },
  store::MetricsStore,
};

use crate::{AppState, auth::CurrentUser, error::ApiError};

// ─── PnL ─────────────────────────────────────────────────────────────────────

/// `GET /pnls/{id}/metrics`
pub async fn get_pnl<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Path(pnl_id): Path<Id>,
) -> Result<Json<PnlMetrics>, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  let metrics = state
    .store
    .refresh_pnl_metrics(pnl_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(metrics))
}

/// `PUT /pnls/{id}/metrics`
pub async fn put_pnl<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path(pnl_id): Path<Id>,
  Json(body): Json<SummaryMetricsUpdate>,
) -> Result<Json<PnlMetrics>, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  let metrics = state
    .store
    .update_pnl_metrics(pnl_id, body, Some(user.id))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(metrics))
}

// ─── Sub-PnL summary ─────────────────────────────────────────────────────────

/// `GET /sub-pnls/{id}/metrics`
pub async fn get_sub_pnl<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Path(sub_pnl_id): Path<Id>,
) -> Result<Json<SubPnlMetrics>, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  let metrics = state
    .store
    .ensure_sub_pnl_metrics(sub_pnl_id)
    .await
    .map_err(ApiError::store)?
    .into_inner();
  Ok(Json(metrics))
}

/// `PUT /sub-pnls/{id}/metrics`
pub async fn put_sub_pnl<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path(sub_pnl_id): Path<Id>,
  Json(body): Json<SummaryMetricsUpdate>,
) -> Result<Json<SubPnlMetrics>, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  let metrics = state
    .store
    .update_sub_pnl_metrics(sub_pnl_id, body, Some(user.id))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(metrics))
}

// ─── Sub-PnL detail ──────────────────────────────────────────────────────────

/// `GET /sub-pnls/{id}/detail-metrics`
pub async fn get_detail<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Path(sub_pnl_id): Path<Id>,
) -> Result<Json<SubPnlDetailMetrics>, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  let detail = state
    .store
    .ensure_detail_metrics(sub_pnl_id)
    .await
    .map_err(ApiError::store)?
    .into_inner();
  Ok(Json(detail))
}

/// `PUT /sub-pnls/{id}/detail-metrics`
pub async fn put_detail<S>(
  State(state): State<AppState<S>>,
  CurrentUser(user): CurrentUser,
  Path(sub_pnl_id): Path<Id>,
  Json(body): Json<DetailMetricsUpdate>,
) -> Result<Json<SubPnlDetailMetrics>, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  let detail = state
    .store
    .update_detail_metrics(sub_pnl_id, body, Some(user.id))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(detail))
}
