//! The `MetricsStore` trait.
//!
//! Implemented by storage backends (e.g. `qalytics-store-sqlite`). The HTTP
//! layer depends on this abstraction, not on a concrete backend.
//!
//! Every method is one unit of work: a backend must apply all of its writes
//! (metrics row, history entry, parent re-aggregation) atomically or not at
//! all.

use std::future::Future;

use crate::{
  DomainError, Id,
  entity::{NewUnit, NewUser, Pnl, SubPnl, UnitChanges, User, UserCredentials},
  history::{HistoryDeletion, HistoryQuery, MetricsHistory},
  metrics::{
    DetailMetricsUpdate, Ensured, PnlMetrics, SubPnlDetailMetrics,
    SubPnlMetrics, SummaryMetricsUpdate,
  },
  view::{PnlOverview, SubPnlWithMetrics},
};

/// Abstraction over a QAlytics store backend.
///
/// Missing parents are reported through the backend error's
/// [`DomainError`] view (`PnlNotFound`, `SubPnlNotFound`, ...), except for the
/// plain `get_*` lookups which return `None`.
pub trait MetricsStore: Send + Sync {
  type Error: std::error::Error + DomainError + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a new user. Fails with `DuplicateEmail` if the address is
  /// taken.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Look up a user and their password hash by email.
  fn find_credentials<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<UserCredentials>, Self::Error>> + Send + 'a;

  fn get_user(
    &self,
    id: Id,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  // ── PnLs ──────────────────────────────────────────────────────────────

  /// Create a PnL together with its default (zero) metrics row.
  fn create_pnl(
    &self,
    input: NewUnit,
  ) -> impl Future<Output = Result<Pnl, Self::Error>> + Send + '_;

  fn list_pnls(
    &self,
  ) -> impl Future<Output = Result<Vec<Pnl>, Self::Error>> + Send + '_;

  fn get_pnl(
    &self,
    id: Id,
  ) -> impl Future<Output = Result<Option<Pnl>, Self::Error>> + Send + '_;

  fn update_pnl(
    &self,
    id: Id,
    changes: UnitChanges,
  ) -> impl Future<Output = Result<Pnl, Self::Error>> + Send + '_;

  /// Delete a PnL and, by cascade, its Sub-PnLs and all their metrics.
  fn delete_pnl(
    &self,
    id: Id,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Every PnL with its Sub-PnL count and freshly aggregated metrics. The
  /// aggregated rows are written back.
  fn dashboard(
    &self,
  ) -> impl Future<Output = Result<Vec<PnlOverview>, Self::Error>> + Send + '_;

  // ── Sub-PnLs ──────────────────────────────────────────────────────────

  /// Create a Sub-PnL with default summary and detail metrics rows.
  fn create_sub_pnl(
    &self,
    pnl_id: Id,
    input: NewUnit,
  ) -> impl Future<Output = Result<SubPnl, Self::Error>> + Send + '_;

  /// The Sub-PnLs of a PnL, each with its (ensured) summary metrics.
  fn list_sub_pnls(
    &self,
    pnl_id: Id,
  ) -> impl Future<Output = Result<Vec<SubPnlWithMetrics>, Self::Error>> + Send + '_;

  fn get_sub_pnl(
    &self,
    id: Id,
  ) -> impl Future<Output = Result<Option<SubPnl>, Self::Error>> + Send + '_;

  fn update_sub_pnl(
    &self,
    id: Id,
    changes: UnitChanges,
  ) -> impl Future<Output = Result<SubPnl, Self::Error>> + Send + '_;

  /// Delete a Sub-PnL and its metrics, then re-aggregate the parent PnL.
  fn delete_sub_pnl(
    &self,
    id: Id,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Metrics ───────────────────────────────────────────────────────────

  /// Return the PnL's metrics row, creating a zero row if absent.
  fn ensure_pnl_metrics(
    &self,
    pnl_id: Id,
  ) -> impl Future<Output = Result<Ensured<PnlMetrics>, Self::Error>> + Send + '_;

  /// Recompute the PnL's metrics from its Sub-PnLs and store the result.
  /// Writes no history.
  fn refresh_pnl_metrics(
    &self,
    pnl_id: Id,
  ) -> impl Future<Output = Result<PnlMetrics, Self::Error>> + Send + '_;

  /// Manually overwrite PnL metrics and record history. The values last
  /// until the next aggregation.
  fn update_pnl_metrics(
    &self,
    pnl_id: Id,
    update: SummaryMetricsUpdate,
    actor: Option<Id>,
  ) -> impl Future<Output = Result<PnlMetrics, Self::Error>> + Send + '_;

  fn ensure_sub_pnl_metrics(
    &self,
    sub_pnl_id: Id,
  ) -> impl Future<Output = Result<Ensured<SubPnlMetrics>, Self::Error>> + Send + '_;

  /// Update Sub-PnL summary metrics, record history, and re-aggregate the
  /// parent PnL.
  fn update_sub_pnl_metrics(
    &self,
    sub_pnl_id: Id,
    update: SummaryMetricsUpdate,
    actor: Option<Id>,
  ) -> impl Future<Output = Result<SubPnlMetrics, Self::Error>> + Send + '_;

  fn ensure_detail_metrics(
    &self,
    sub_pnl_id: Id,
  ) -> impl Future<Output = Result<Ensured<SubPnlDetailMetrics>, Self::Error>>
  + Send
  + '_;

  /// Update detail metrics, bump their version, and record history. Fails
  /// with `VersionConflict` if `update.expected_version` is stale.
  fn update_detail_metrics(
    &self,
    sub_pnl_id: Id,
    update: DetailMetricsUpdate,
    actor: Option<Id>,
  ) -> impl Future<Output = Result<SubPnlDetailMetrics, Self::Error>> + Send + '_;

  // ── History ───────────────────────────────────────────────────────────

  /// History entries matching `query`, newest first.
  fn list_history<'a>(
    &'a self,
    query: &'a HistoryQuery,
  ) -> impl Future<Output = Result<Vec<MetricsHistory>, Self::Error>> + Send + 'a;

  fn get_history(
    &self,
    id: Id,
  ) -> impl Future<Output = Result<Option<MetricsHistory>, Self::Error>> + Send + '_;

  /// Delete an entry. If it was the newest for its entity, roll the live
  /// metrics back to the new newest entry or reset them to zero.
  fn delete_history(
    &self,
    id: Id,
  ) -> impl Future<Output = Result<HistoryDeletion, Self::Error>> + Send + '_;
}
