//! [`SqliteStore`], the SQLite implementation of [`MetricsStore`].

use std::path::Path;

use qalytics_core::{
  Id,
  entity::{NewUnit, NewUser, Pnl, SubPnl, UnitChanges, User, UserCredentials},
  history::{HistoryDeletion, HistoryQuery, MetricsHistory},
  metrics::{
    DetailMetricsUpdate, Ensured, PnlMetrics, SubPnlDetailMetrics,
    SubPnlMetrics, SummaryMetricsUpdate,
  },
  store::MetricsStore,
  view::{PnlOverview, SubPnlWithMetrics},
};

use crate::{Error, Result, ops, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A QAlytics store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` inside one transaction. Commits only if `f` succeeds; any
  /// error, including a domain error, rolls every write back.
  async fn run<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
  {
    let out: Result<T> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let out = f(&tx);
        if out.is_ok() {
          tx.commit()?;
        }
        Ok(out)
      })
      .await
      .map_err(Error::from)?;
    out
  }
}

// ─── MetricsStore impl ───────────────────────────────────────────────────────

impl MetricsStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let user = self.run(move |conn| ops::create_user(conn, &input)).await?;
    tracing::info!(user_id = user.id, "user registered");
    Ok(user)
  }

  async fn find_credentials<'a>(
    &'a self,
    email: &'a str,
  ) -> Result<Option<UserCredentials>> {
    let email = email.to_owned();
    self.run(move |conn| ops::find_credentials(conn, &email)).await
  }

  async fn get_user(&self, id: Id) -> Result<Option<User>> {
    self.run(move |conn| ops::get_user(conn, id)).await
  }

  // ── PnLs ──────────────────────────────────────────────────────────────────

  async fn create_pnl(&self, input: NewUnit) -> Result<Pnl> {
    let pnl = self.run(move |conn| ops::create_pnl(conn, &input)).await?;
    tracing::info!(pnl_id = pnl.id, "PnL created");
    Ok(pnl)
  }

  async fn list_pnls(&self) -> Result<Vec<Pnl>> {
    self.run(ops::list_pnls).await
  }

  async fn get_pnl(&self, id: Id) -> Result<Option<Pnl>> {
    self.run(move |conn| ops::get_pnl(conn, id)).await
  }

  async fn update_pnl(&self, id: Id, changes: UnitChanges) -> Result<Pnl> {
    self.run(move |conn| ops::update_pnl(conn, id, &changes)).await
  }

  async fn delete_pnl(&self, id: Id) -> Result<()> {
    self.run(move |conn| ops::delete_pnl(conn, id)).await?;
    tracing::info!(pnl_id = id, "PnL deleted");
    Ok(())
  }

  async fn dashboard(&self) -> Result<Vec<PnlOverview>> {
    self.run(ops::dashboard).await
  }

  // ── Sub-PnLs ──────────────────────────────────────────────────────────────

  async fn create_sub_pnl(&self, pnl_id: Id, input: NewUnit) -> Result<SubPnl> {
    let sub = self
      .run(move |conn| ops::create_sub_pnl(conn, pnl_id, &input))
      .await?;
    tracing::info!(pnl_id, sub_pnl_id = sub.id, "Sub-PnL created");
    Ok(sub)
  }

  async fn list_sub_pnls(&self, pnl_id: Id) -> Result<Vec<SubPnlWithMetrics>> {
    self
      .run(move |conn| {
        ops::require_pnl(conn, pnl_id)?;
        ops::list_sub_pnls(conn, pnl_id)?
          .into_iter()
          .map(|sub_pnl| {
            let metrics = ops::ensure_sub_pnl_metrics(conn, sub_pnl.id)?.into_inner();
            Ok(SubPnlWithMetrics { sub_pnl, metrics })
          })
          .collect()
      })
      .await
  }

  async fn get_sub_pnl(&self, id: Id) -> Result<Option<SubPnl>> {
    self.run(move |conn| ops::get_sub_pnl(conn, id)).await
  }

  async fn update_sub_pnl(&self, id: Id, changes: UnitChanges) -> Result<SubPnl> {
    self
      .run(move |conn| ops::update_sub_pnl(conn, id, &changes))
      .await
  }

  async fn delete_sub_pnl(&self, id: Id) -> Result<()> {
    self.run(move |conn| ops::delete_sub_pnl(conn, id)).await?;
    tracing::info!(sub_pnl_id = id, "Sub-PnL deleted");
    Ok(())
  }

  // ── Metrics ───────────────────────────────────────────────────────────────

  async fn ensure_pnl_metrics(&self, pnl_id: Id) -> Result<Ensured<PnlMetrics>> {
    self
      .run(move |conn| ops::ensure_pnl_metrics(conn, pnl_id))
      .await
  }

  async fn refresh_pnl_metrics(&self, pnl_id: Id) -> Result<PnlMetrics> {
    self.run(move |conn| ops::aggregate_pnl(conn, pnl_id)).await
  }

  async fn update_pnl_metrics(
    &self,
    pnl_id: Id,
    update: SummaryMetricsUpdate,
    actor: Option<Id>,
  ) -> Result<PnlMetrics> {
    let metrics = self
      .run(move |conn| ops::update_pnl_metrics(conn, pnl_id, &update, actor))
      .await?;
    tracing::info!(pnl_id, ?actor, "PnL metrics updated");
    Ok(metrics)
  }

  async fn ensure_sub_pnl_metrics(
    &self,
    sub_pnl_id: Id,
  ) -> Result<Ensured<SubPnlMetrics>> {
    self
      .run(move |conn| ops::ensure_sub_pnl_metrics(conn, sub_pnl_id))
      .await
  }

  async fn update_sub_pnl_metrics(
    &self,
    sub_pnl_id: Id,
    update: SummaryMetricsUpdate,
    actor: Option<Id>,
  ) -> Result<SubPnlMetrics> {
    let metrics = self
      .run(move |conn| {
        ops::update_sub_pnl_metrics(conn, sub_pnl_id, &update, actor)
      })
      .await?;
    tracing::info!(sub_pnl_id, ?actor, "Sub-PnL metrics updated");
    Ok(metrics)
  }

  async fn ensure_detail_metrics(
    &self,
    sub_pnl_id: Id,
  ) -> Result<Ensured<SubPnlDetailMetrics>> {
    self
      .run(move |conn| ops::ensure_detail_metrics(conn, sub_pnl_id))
      .await
  }

  async fn update_detail_metrics(
    &self,
    sub_pnl_id: Id,
    update: DetailMetricsUpdate,
    actor: Option<Id>,
  ) -> Result<SubPnlDetailMetrics> {
    let detail = self
      .run(move |conn| {
        ops::update_detail_metrics(conn, sub_pnl_id, &update, actor)
      })
      .await?;
    tracing::info!(
      sub_pnl_id,
      version = detail.version,
      ?actor,
      "Sub-PnL detail metrics updated"
    );
    Ok(detail)
  }

  // ── History ───────────────────────────────────────────────────────────────

  async fn list_history<'a>(
    &'a self,
    query: &'a HistoryQuery,
  ) -> Result<Vec<MetricsHistory>> {
    let query = query.clone();
    self.run(move |conn| ops::list_history(conn, &query)).await
  }

  async fn get_history(&self, id: Id) -> Result<Option<MetricsHistory>> {
    self.run(move |conn| ops::get_history(conn, id)).await
  }

  async fn delete_history(&self, id: Id) -> Result<HistoryDeletion> {
    let deletion = self.run(move |conn| ops::delete_history(conn, id)).await?;
    tracing::info!(
      history_id = id,
      entity_type = %deletion.deleted.entity_type,
      entity_id = deletion.deleted.entity_id,
      restoration = ?deletion.restoration,
      "history entry deleted"
    );
    Ok(deletion)
  }
}
