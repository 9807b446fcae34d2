//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use qalytics_core::{DomainError, Error as CoreError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  BadRequest(String),

  #[error("not authenticated")]
  Unauthorized,

  #[error("{0}")]
  Conflict(String),

  #[error("internal error: {0}")]
  Internal(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a store error by the domain error it carries.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + DomainError + Send + Sync + 'static,
  {
    let mapped = match e.domain() {
      Some(
        d @ (CoreError::PnlNotFound(_)
        | CoreError::SubPnlNotFound(_)
        | CoreError::HistoryNotFound(_)),
      ) => Some(ApiError::NotFound(d.to_string())),
      Some(CoreError::DuplicateEmail(_)) => {
        Some(ApiError::BadRequest("Email already registered".to_owned()))
      }
      Some(d @ CoreError::InvalidMetric { .. }) => {
        Some(ApiError::BadRequest(d.to_string()))
      }
      Some(d @ CoreError::VersionConflict { .. }) => {
        Some(ApiError::Conflict(d.to_string()))
      }
      _ => None,
    };
    mapped.unwrap_or_else(|| ApiError::Store(Box::new(e)))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unauthorized => {
        (StatusCode::UNAUTHORIZED, "Could not validate credentials".to_owned())
      }
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Internal(_) | ApiError::Store(_) => {
        tracing::error!(error = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
      }
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    res
  }
}
