//! Error types for `qalytics-core`.

use thiserror::Error;

use crate::Id;

#[derive(Debug, Error)]
pub enum Error {
  #[error("PnL not found: {0}")]
  PnlNotFound(Id),

  #[error("Sub-PnL not found: {0}")]
  SubPnlNotFound(Id),

  #[error("metrics history entry not found: {0}")]
  HistoryNotFound(Id),

  #[error("email already registered: {0}")]
  DuplicateEmail(String),

  #[error("invalid value for {field}: {reason}")]
  InvalidMetric { field: String, reason: &'static str },

  #[error("detail metrics version conflict: expected {expected}, found {actual}")]
  VersionConflict { expected: i64, actual: i64 },

  #[error("unknown entity type: {0:?}")]
  UnknownEntityType(String),

  #[error("unknown change type: {0:?}")]
  UnknownChangeType(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Recovers the domain error carried by a storage backend's error type, if
/// any. The HTTP layer uses this to choose a status code.
pub trait DomainError {
  fn domain(&self) -> Option<&Error>;
}

impl DomainError for Error {
  fn domain(&self) -> Option<&Error> { Some(self) }
}
