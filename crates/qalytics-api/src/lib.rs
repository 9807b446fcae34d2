//! JSON REST API for QAlytics.
//!
//! Exposes an axum [`Router`] backed by any
//! [`qalytics_core::store::MetricsStore`]. Every route except `/`, `/health`
//! and `/auth/*` requires a bearer token issued by `/auth/login`.

pub mod account;
pub mod auth;
pub mod dashboard;
pub mod error;
pub mod history;
pub mod metrics;
pub mod pnls;
pub mod sub_pnls;

use std::{path::PathBuf, sync::Arc};

use axum::{Json, Router, routing::{get, post}};
use chrono::Utc;
use qalytics_core::store::MetricsStore;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

pub use auth::{CurrentUser, KeyError, TokenKeys};
pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `QALYTICS_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  #[serde(default = "default_database_path")]
  pub database_path:   PathBuf,
  /// HMAC key for bearer tokens.
  pub token_secret:    String,
  #[serde(default = "default_token_ttl_hours")]
  pub token_ttl_hours: i64,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8000 }
fn default_database_path() -> PathBuf { PathBuf::from("qalytics.db") }
fn default_token_ttl_hours() -> i64 { 24 }

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: MetricsStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub tokens: Arc<TokenKeys>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full API router for `state`, wrapped in a request trace layer.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: MetricsStore + Clone + 'static,
{
  Router::new()
    .route("/", get(root))
    .route("/health", get(health))
    // Accounts
    .route("/auth/signup", post(account::signup::<S>))
    .route("/auth/login", post(account::login::<S>))
    .route("/dashboard", get(dashboard::handler::<S>))
    // PnLs
    .route("/pnls", get(pnls::list::<S>).post(pnls::create::<S>))
    .route(
      "/pnls/{id}",
      get(pnls::get_one::<S>)
        .put(pnls::update::<S>)
        .delete(pnls::delete::<S>),
    )
    .route(
      "/pnls/{id}/sub-pnls",
      get(sub_pnls::list::<S>).post(sub_pnls::create::<S>),
    )
    // Sub-PnLs
    .route(
      "/sub-pnls/{id}",
      get(sub_pnls::get_one::<S>)
        .put(sub_pnls::update::<S>)
        .delete(sub_pnls::delete::<S>),
    )
    // Metrics
    .route(
      "/pnls/{id}/metrics",
      get(metrics::get_pnl::<S>).put(metrics::put_pnl::<S>),
    )
    .route(
      "/sub-pnls/{id}/metrics",
      get(metrics::get_sub_pnl::<S>).put(metrics::put_sub_pnl::<S>),
    )
    .route(
      "/sub-pnls/{id}/detail-metrics",
      get(metrics::get_detail::<S>).put(metrics::put_detail::<S>),
    )
    // History
    .route("/metrics-history", get(history::list::<S>))
    .route(
      "/metrics-history/{id}",
      get(history::get_one::<S>).delete(history::delete::<S>),
    )
    .route("/pnls/{id}/metrics-history", get(history::for_pnl::<S>))
    .route("/sub-pnls/{id}/metrics-history", get(history::for_sub_pnl::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// `GET /`
async fn root() -> Json<Value> {
  Json(json!({ "message": "QAlytics API - Hierarchical PnL Quality Analytics" }))
}

/// `GET /health`
async fn health() -> Json<Value> {
  Json(json!({ "status": "healthy", "timestamp": Utc::now() }))
}
