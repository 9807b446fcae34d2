//! Handlers for metrics history endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/metrics-history` | `?entity_type=&entity_id=&limit=` (default 50) |
//! | `GET`    | `/metrics-history/{id}` | 404 if not found |
//! | `DELETE` | `/metrics-history/{id}` | Rolls live metrics back if it was the newest |
//! | `GET`    | `/pnls/{id}/metrics-history` | `pnl` entries, all unless `?limit=` |
//! | `GET`    | `/sub-pnls/{id}/metrics-history` | `sub_pnl` and `sub_pnl_detail` entries, all unless `?limit=` |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use qalytics_core::{
  Id,
  history::{
    DEFAULT_HISTORY_LIMIT, EntityType, HistoryDeletion, HistoryQuery,
    MetricsHistory,
  },
  store::MetricsStore,
};
use serde::Deserialize;

use crate::{AppState, auth::CurrentUser, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub entity_type: Option<String>,
  pub entity_id:   Option<Id>,
  pub limit:       Option<usize>,
}

/// `GET /metrics-history[?entity_type=&entity_id=&limit=]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<MetricsHistory>>, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  let entity_types = match params.entity_type.as_deref() {
    Some(raw) => vec![
      raw
        .parse::<EntityType>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?,
    ],
    None => Vec::new(),
  };

  let query = HistoryQuery {
    entity_types,
    entity_id: params.entity_id,
    limit: Some(params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT)),
  };
  let history = state
    .store
    .list_history(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(history))
}

// ─── Single entry ────────────────────────────────────────────────────────────

/// `GET /metrics-history/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Path(id): Path<Id>,
) -> Result<Json<MetricsHistory>, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  let entry = state
    .store
    .get_history(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("metrics history entry not found: {id}")))?;
  Ok(Json(entry))
}

/// `DELETE /metrics-history/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Path(id): Path<Id>,
) -> Result<Json<HistoryDeletion>, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  let deletion = state
    .store
    .delete_history(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(deletion))
}

// ─── Per entity ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct EntityParams {
  pub limit: Option<usize>,
}

/// `GET /pnls/{id}/metrics-history`
pub async fn for_pnl<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Path(pnl_id): Path<Id>,
  Query(params): Query<EntityParams>,
) -> Result<Json<Vec<MetricsHistory>>, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  state
    .store
    .get_pnl(pnl_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("PnL not found: {pnl_id}")))?;

  let query = HistoryQuery {
    entity_types: vec![EntityType::Pnl],
    entity_id:    Some(pnl_id),
    limit:        params.limit,
  };
  let history = state
    .store
    .list_history(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(history))
}

/// `GET /sub-pnls/{id}/metrics-history`
pub async fn for_sub_pnl<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
  Path(sub_pnl_id): Path<Id>,
  Query(params): Query<EntityParams>,
) -> Result<Json<Vec<MetricsHistory>>, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  state
    .store
    .get_sub_pnl(sub_pnl_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("Sub-PnL not found: {sub_pnl_id}")))?;

  let query = HistoryQuery {
    entity_types: vec![EntityType::SubPnl, EntityType::SubPnlDetail],
    entity_id:    Some(sub_pnl_id),
    limit:        params.limit,
  };
  let history = state
    .store
    .list_history(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(history))
}
