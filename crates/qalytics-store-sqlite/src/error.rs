//! Error type for `qalytics-store-sqlite`.

use qalytics_core::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0}")]
  Core(#[from] qalytics_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl DomainError for Error {
  fn domain(&self) -> Option<&qalytics_core::Error> {
    match self {
      Error::Core(e) => Some(e),
      _ => None,
    }
  }
}
