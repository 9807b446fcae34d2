//! `GET /dashboard`: every PnL with its Sub-PnL count and aggregated metrics.

use axum::{Json, extract::State};
use qalytics_core::{store::MetricsStore, view::PnlOverview};

use crate::{AppState, auth::CurrentUser, error::ApiError};

/// `GET /dashboard`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  _user: CurrentUser,
) -> Result<Json<Vec<PnlOverview>>, ApiError>
where
  S: MetricsStore + Clone + 'static,
{
  let overview = state.store.dashboard().await.map_err(ApiError::store)?;
  Ok(Json(overview))
}
