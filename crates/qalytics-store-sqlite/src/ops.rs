//! Synchronous units of work executed on the connection thread.
//!
//! Every function here takes a `&Connection` that the caller has already
//! wrapped in a transaction; none of them commit. Composite operations
//! (metrics write + history entry + parent re-aggregation) are built from
//! these pieces inside a single transaction in [`crate::store`].

use qalytics_core::{
  Error as CoreError, Id,
  aggregate,
  entity::{NewUnit, NewUser, Pnl, SubPnl, UnitChanges, User, UserCredentials},
  history::{
    EntityType, HistoryDeletion, HistoryQuery,
    MetricsHistory, NewHistoryEntry, Restoration, restore_values,
  },
  metrics::{
    DetailMetrics, DetailMetricsUpdate, Ensured, MetricValues, PnlMetrics,
    SubPnlDetailMetrics, SubPnlMetrics, SummaryMetrics, SummaryMetricsUpdate,
    apply_update,
  },
  view::PnlOverview,
};
use rusqlite::{Connection, OptionalExtension as _, params, params_from_iter};
use serde::Serialize;

use crate::{
  Result,
  encode::{
    DETAIL_METRICS, MetricsTable, PNL_METRICS, RawHistory, RawPnl, RawSubPnl,
    RawUser, SUB_PNL_METRICS, bind_values, decode_dt, now, read_values,
  },
};

// ─── Users ───────────────────────────────────────────────────────────────────

pub fn create_user(conn: &Connection, input: &NewUser) -> Result<User> {
  let taken = conn
    .query_row(
      "SELECT 1 FROM users WHERE email = ?1",
      params![input.email],
      |_| Ok(()),
    )
    .optional()?
    .is_some();
  if taken {
    return Err(CoreError::DuplicateEmail(input.email.clone()).into());
  }

  conn.execute(
    "INSERT INTO users (email, password_hash, role, created_at)
     VALUES (?1, ?2, ?3, ?4)",
    params![input.email, input.password_hash, input.role, now()],
  )?;
  let id = conn.last_insert_rowid();
  get_user(conn, id)?.ok_or_else(|| rusqlite::Error::QueryReturnedNoRows.into())
}

pub fn get_user(conn: &Connection, id: Id) -> Result<Option<User>> {
  conn
    .query_row(
      &format!("SELECT {} FROM users WHERE id = ?1", RawUser::COLUMNS),
      params![id],
      RawUser::from_row,
    )
    .optional()?
    .map(RawUser::into_user)
    .transpose()
}

pub fn find_credentials(
  conn: &Connection,
  email: &str,
) -> Result<Option<UserCredentials>> {
  let found = conn
    .query_row(
      &format!(
        "SELECT {}, password_hash FROM users WHERE email = ?1",
        RawUser::COLUMNS
      ),
      params![email],
      |row| Ok((RawUser::from_row(row)?, row.get::<_, String>(4)?)),
    )
    .optional()?;

  found
    .map(|(raw, password_hash)| {
      Ok(UserCredentials { user: raw.into_user()?, password_hash })
    })
    .transpose()
}

// ─── PnLs ────────────────────────────────────────────────────────────────────

pub fn get_pnl(conn: &Connection, id: Id) -> Result<Option<Pnl>> {
  conn
    .query_row(
      &format!("SELECT {} FROM pnls WHERE id = ?1", RawPnl::COLUMNS),
      params![id],
      RawPnl::from_row,
    )
    .optional()?
    .map(RawPnl::into_pnl)
    .transpose()
}

pub fn require_pnl(conn: &Connection, id: Id) -> Result<Pnl> {
  get_pnl(conn, id)?.ok_or_else(|| CoreError::PnlNotFound(id).into())
}

pub fn list_pnls(conn: &Connection) -> Result<Vec<Pnl>> {
  let mut stmt =
    conn.prepare(&format!("SELECT {} FROM pnls ORDER BY id", RawPnl::COLUMNS))?;
  let raws = stmt
    .query_map([], RawPnl::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawPnl::into_pnl).collect()
}

pub fn create_pnl(conn: &Connection, input: &NewUnit) -> Result<Pnl> {
  let at = now();
  conn.execute(
    "INSERT INTO pnls (name, description, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?3)",
    params![input.name, input.description, at],
  )?;
  let id = conn.last_insert_rowid();
  insert_live(conn, &PNL_METRICS, id, &SummaryMetrics::default())?;
  require_pnl(conn, id)
}

pub fn update_pnl(conn: &Connection, id: Id, changes: &UnitChanges) -> Result<Pnl> {
  let n = conn.execute(
    "UPDATE pnls
     SET name = COALESCE(?1, name),
         description = COALESCE(?2, description),
         updated_at = ?3
     WHERE id = ?4",
    params![changes.name, changes.description, now(), id],
  )?;
  if n == 0 {
    return Err(CoreError::PnlNotFound(id).into());
  }
  require_pnl(conn, id)
}

pub fn delete_pnl(conn: &Connection, id: Id) -> Result<()> {
  let n = conn.execute("DELETE FROM pnls WHERE id = ?1", params![id])?;
  if n == 0 {
    return Err(CoreError::PnlNotFound(id).into());
  }
  Ok(())
}

pub fn count_sub_pnls(conn: &Connection, pnl_id: Id) -> Result<usize> {
  let n: i64 = conn.query_row(
    "SELECT COUNT(*) FROM sub_pnls WHERE pnl_id = ?1",
    params![pnl_id],
    |r| r.get(0),
  )?;
  Ok(n as usize)
}

pub fn dashboard(conn: &Connection) -> Result<Vec<PnlOverview>> {
  list_pnls(conn)?
    .into_iter()
    .map(|pnl| {
      let metrics = aggregate_pnl(conn, pnl.id)?;
      let sub_pnls_count = count_sub_pnls(conn, pnl.id)?;
      Ok(PnlOverview { pnl, sub_pnls_count, metrics })
    })
    .collect()
}

// ─── Sub-PnLs ────────────────────────────────────────────────────────────────

pub fn get_sub_pnl(conn: &Connection, id: Id) -> Result<Option<SubPnl>> {
  conn
    .query_row(
      &format!("SELECT {} FROM sub_pnls WHERE id = ?1", RawSubPnl::COLUMNS),
      params![id],
      RawSubPnl::from_row,
    )
    .optional()?
    .map(RawSubPnl::into_sub_pnl)
    .transpose()
}

pub fn require_sub_pnl(conn: &Connection, id: Id) -> Result<SubPnl> {
  get_sub_pnl(conn, id)?.ok_or_else(|| CoreError::SubPnlNotFound(id).into())
}

pub fn list_sub_pnls(conn: &Connection, pnl_id: Id) -> Result<Vec<SubPnl>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM sub_pnls WHERE pnl_id = ?1 ORDER BY id",
    RawSubPnl::COLUMNS
  ))?;
  let raws = stmt
    .query_map(params![pnl_id], RawSubPnl::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawSubPnl::into_sub_pnl).collect()
}

pub fn create_sub_pnl(
  conn: &Connection,
  pnl_id: Id,
  input: &NewUnit,
) -> Result<SubPnl> {
  require_pnl(conn, pnl_id)?;
  let at = now();
  conn.execute(
    "INSERT INTO sub_pnls (pnl_id, name, description, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?4)",
    params![pnl_id, input.name, input.description, at],
  )?;
  let id = conn.last_insert_rowid();
  insert_live(conn, &SUB_PNL_METRICS, id, &SummaryMetrics::default())?;
  insert_live(conn, &DETAIL_METRICS, id, &DetailMetrics::default())?;
  require_sub_pnl(conn, id)
}

pub fn update_sub_pnl(
  conn: &Connection,
  id: Id,
  changes: &UnitChanges,
) -> Result<SubPnl> {
  let n = conn.execute(
    "UPDATE sub_pnls
     SET name = COALESCE(?1, name),
         description = COALESCE(?2, description),
         updated_at = ?3
     WHERE id = ?4",
    params![changes.name, changes.description, now(), id],
  )?;
  if n == 0 {
    return Err(CoreError::SubPnlNotFound(id).into());
  }
  require_sub_pnl(conn, id)
}

pub fn delete_sub_pnl(conn: &Connection, id: Id) -> Result<()> {
  let sub = require_sub_pnl(conn, id)?;
  conn.execute("DELETE FROM sub_pnls WHERE id = ?1", params![id])?;
  aggregate_pnl(conn, sub.pnl_id)?;
  Ok(())
}

// ─── Live metrics rows ───────────────────────────────────────────────────────

/// A metrics row as stored, before it is shaped into a domain row type.
pub struct LiveRow<M> {
  pub id:         Id,
  pub owner_id:   Id,
  pub values:     M,
  pub created_at: String,
  pub updated_at: String,
}

pub fn select_live<M: MetricValues>(
  conn: &Connection,
  table: &MetricsTable,
  owner_id: Id,
) -> Result<Option<LiveRow<M>>> {
  let sql = format!(
    "SELECT id, created_at, updated_at, {} FROM {} WHERE {} = ?1",
    table.column_list(None),
    table.name,
    table.owner,
  );
  let mut stmt = conn.prepare(&sql)?;
  let mut rows = stmt.query(params![owner_id])?;
  let Some(row) = rows.next()? else {
    return Ok(None);
  };
  Ok(Some(LiveRow {
    id: row.get(0)?,
    owner_id,
    created_at: row.get(1)?,
    updated_at: row.get(2)?,
    values: read_values(row, 3, table)?,
  }))
}

pub fn insert_live<M: MetricValues>(
  conn: &Connection,
  table: &MetricsTable,
  owner_id: Id,
  values: &M,
) -> Result<()> {
  let n = table.columns.len();
  let placeholders = (3..n + 3)
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ");
  let sql = format!(
    "INSERT INTO {} ({}, created_at, updated_at, {})
     VALUES (?1, ?2, ?2, {placeholders})",
    table.name,
    table.owner,
    table.column_list(None),
  );

  let mut bound: Vec<rusqlite::types::Value> =
    vec![owner_id.into(), now().into()];
  bound.extend(bind_values(values, table)?);
  conn.execute(&sql, params_from_iter(bound))?;
  Ok(())
}

pub fn write_live<M: MetricValues>(
  conn: &Connection,
  table: &MetricsTable,
  owner_id: Id,
  values: &M,
) -> Result<()> {
  let assignments = table
    .columns
    .iter()
    .enumerate()
    .map(|(i, c)| format!("{c} = ?{}", i + 3))
    .collect::<Vec<_>>()
    .join(", ");
  let sql = format!(
    "UPDATE {} SET updated_at = ?2, {assignments} WHERE {} = ?1",
    table.name, table.owner,
  );

  let mut bound: Vec<rusqlite::types::Value> =
    vec![owner_id.into(), now().into()];
  bound.extend(bind_values(values, table)?);
  conn.execute(&sql, params_from_iter(bound))?;
  Ok(())
}

/// Return the live row for `owner_id`, inserting a zero row if absent. The
/// caller must have checked that the owner exists.
pub fn ensure_live<M: MetricValues>(
  conn: &Connection,
  table: &MetricsTable,
  owner_id: Id,
) -> Result<Ensured<LiveRow<M>>> {
  if let Some(row) = select_live(conn, table, owner_id)? {
    return Ok(Ensured::Found(row));
  }
  tracing::debug!(table = table.name, owner_id, "creating default metrics row");
  insert_live(conn, table, owner_id, &M::default())?;
  let row = select_live(conn, table, owner_id)?
    .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
  Ok(Ensured::Created(row))
}

fn ensured<M, T>(
  live: Ensured<LiveRow<M>>,
  shape: impl FnOnce(LiveRow<M>) -> Result<T>,
) -> Result<Ensured<T>> {
  Ok(match live {
    Ensured::Found(row) => Ensured::Found(shape(row)?),
    Ensured::Created(row) => Ensured::Created(shape(row)?),
  })
}

fn pnl_metrics(row: LiveRow<SummaryMetrics>) -> Result<PnlMetrics> {
  Ok(PnlMetrics {
    id:         row.id,
    pnl_id:     row.owner_id,
    values:     row.values,
    updated_at: decode_dt(&row.updated_at)?,
  })
}

fn sub_pnl_metrics(row: LiveRow<SummaryMetrics>) -> Result<SubPnlMetrics> {
  Ok(SubPnlMetrics {
    id:         row.id,
    sub_pnl_id: row.owner_id,
    values:     row.values,
    updated_at: decode_dt(&row.updated_at)?,
  })
}

fn detail_metrics(
  conn: &Connection,
  row: LiveRow<DetailMetrics>,
) -> Result<SubPnlDetailMetrics> {
  let (version, is_active, description): (i64, bool, Option<String>) = conn
    .query_row(
      "SELECT version, is_active, description
       FROM sub_pnl_detail_metrics WHERE id = ?1",
      params![row.id],
      |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )?;
  Ok(SubPnlDetailMetrics {
    id: row.id,
    sub_pnl_id: row.owner_id,
    values: row.values,
    version,
    is_active,
    description,
    created_at: decode_dt(&row.created_at)?,
    updated_at: decode_dt(&row.updated_at)?,
  })
}

pub fn ensure_pnl_metrics(
  conn: &Connection,
  pnl_id: Id,
) -> Result<Ensured<PnlMetrics>> {
  require_pnl(conn, pnl_id)?;
  ensured(ensure_live(conn, &PNL_METRICS, pnl_id)?, pnl_metrics)
}

pub fn ensure_sub_pnl_metrics(
  conn: &Connection,
  sub_pnl_id: Id,
) -> Result<Ensured<SubPnlMetrics>> {
  require_sub_pnl(conn, sub_pnl_id)?;
  ensured(ensure_live(conn, &SUB_PNL_METRICS, sub_pnl_id)?, sub_pnl_metrics)
}

pub fn ensure_detail_metrics(
  conn: &Connection,
  sub_pnl_id: Id,
) -> Result<Ensured<SubPnlDetailMetrics>> {
  require_sub_pnl(conn, sub_pnl_id)?;
  ensured(ensure_live(conn, &DETAIL_METRICS, sub_pnl_id)?, |row| {
    detail_metrics(conn, row)
  })
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

/// Recompute and store a PnL's metrics from its Sub-PnLs. No history.
pub fn aggregate_pnl(conn: &Connection, pnl_id: Id) -> Result<PnlMetrics> {
  require_pnl(conn, pnl_id)?;

  let sql = format!(
    "SELECT m.id, {}
     FROM sub_pnls s
     LEFT JOIN sub_pnl_metrics m ON m.sub_pnl_id = s.id
     WHERE s.pnl_id = ?1",
    SUB_PNL_METRICS.column_list(Some("m")),
  );
  let mut stmt = conn.prepare(&sql)?;
  let mut rows = stmt.query(params![pnl_id])?;
  let mut children = Vec::new();
  while let Some(row) = rows.next()? {
    let metrics_id: Option<Id> = row.get(0)?;
    children.push(match metrics_id {
      Some(_) => Some(read_values::<SummaryMetrics>(row, 1, &SUB_PNL_METRICS)?),
      None => None,
    });
  }

  let values = aggregate::recompute(&children);
  if ensure_live::<SummaryMetrics>(conn, &PNL_METRICS, pnl_id)?.was_created() {
    tracing::debug!(pnl_id, "PnL metrics row created during aggregation");
  }
  write_live(conn, &PNL_METRICS, pnl_id, &values)?;

  let row = select_live(conn, &PNL_METRICS, pnl_id)?
    .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
  pnl_metrics(row)
}

// ─── Metrics writes ──────────────────────────────────────────────────────────

/// Apply a partial update to a live row (creating it if absent) and append
/// the matching history entry. Returns the stored row.
fn write_with_history<M, U>(
  conn: &Connection,
  table: &MetricsTable,
  entity_type: EntityType,
  owner_id: Id,
  update: &U,
  actor: Option<Id>,
) -> Result<LiveRow<M>>
where
  M: MetricValues,
  U: Serialize,
{
  let existing = select_live::<M>(conn, table, owner_id)?;
  let current = existing
    .as_ref()
    .map(|row| row.values.clone())
    .unwrap_or_default();
  let applied = apply_update(&current, update)?;

  let previous = if existing.is_some() {
    write_live(conn, table, owner_id, &applied.values)?;
    Some(applied.previous)
  } else {
    insert_live(conn, table, owner_id, &applied.values)?;
    None
  };

  let entry = NewHistoryEntry::for_write(
    entity_type,
    owner_id,
    &applied.values,
    previous,
    actor,
  )?;
  insert_history(conn, &entry)?;

  select_live(conn, table, owner_id)?
    .ok_or_else(|| rusqlite::Error::QueryReturnedNoRows.into())
}

pub fn update_pnl_metrics(
  conn: &Connection,
  pnl_id: Id,
  update: &SummaryMetricsUpdate,
  actor: Option<Id>,
) -> Result<PnlMetrics> {
  require_pnl(conn, pnl_id)?;
  let row = write_with_history::<SummaryMetrics, _>(
    conn,
    &PNL_METRICS,
    EntityType::Pnl,
    pnl_id,
    update,
    actor,
  )?;
  pnl_metrics(row)
}

pub fn update_sub_pnl_metrics(
  conn: &Connection,
  sub_pnl_id: Id,
  update: &SummaryMetricsUpdate,
  actor: Option<Id>,
) -> Result<SubPnlMetrics> {
  let sub = require_sub_pnl(conn, sub_pnl_id)?;
  let row = write_with_history::<SummaryMetrics, _>(
    conn,
    &SUB_PNL_METRICS,
    EntityType::SubPnl,
    sub_pnl_id,
    update,
    actor,
  )?;
  aggregate_pnl(conn, sub.pnl_id)?;
  sub_pnl_metrics(row)
}

pub fn update_detail_metrics(
  conn: &Connection,
  sub_pnl_id: Id,
  update: &DetailMetricsUpdate,
  actor: Option<Id>,
) -> Result<SubPnlDetailMetrics> {
  require_sub_pnl(conn, sub_pnl_id)?;

  let stored_version: Option<i64> = conn
    .query_row(
      "SELECT version FROM sub_pnl_detail_metrics WHERE sub_pnl_id = ?1",
      params![sub_pnl_id],
      |r| r.get(0),
    )
    .optional()?;
  match (update.expected_version, stored_version) {
    (Some(expected), Some(actual)) if expected != actual => {
      return Err(CoreError::VersionConflict { expected, actual }.into());
    }
    _ => {}
  }

  let row = write_with_history::<DetailMetrics, _>(
    conn,
    &DETAIL_METRICS,
    EntityType::SubPnlDetail,
    sub_pnl_id,
    &update.values,
    actor,
  )?;

  if stored_version.is_some() {
    conn.execute(
      "UPDATE sub_pnl_detail_metrics SET version = version + 1 WHERE id = ?1",
      params![row.id],
    )?;
  }
  if let Some(description) = &update.description {
    conn.execute(
      "UPDATE sub_pnl_detail_metrics SET description = ?1 WHERE id = ?2",
      params![description, row.id],
    )?;
  }

  detail_metrics(conn, row)
}

// ─── History ─────────────────────────────────────────────────────────────────

const HISTORY_FROM: &str =
  "FROM metrics_history h LEFT JOIN users u ON u.id = h.changed_by";

pub fn insert_history(conn: &Connection, entry: &NewHistoryEntry) -> Result<Id> {
  let metrics_data = serde_json::to_string(&entry.metrics)?;
  let previous_values = entry
    .previous_values
    .as_ref()
    .map(serde_json::to_string)
    .transpose()?;

  conn.execute(
    "INSERT INTO metrics_history (
       entity_type, entity_id, metrics_data, change_type,
       changed_by, change_description, previous_values, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    params![
      entry.entity_type.as_str(),
      entry.entity_id,
      metrics_data,
      entry.change_type.as_str(),
      entry.changed_by,
      entry.description,
      previous_values,
      now(),
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn get_history(conn: &Connection, id: Id) -> Result<Option<MetricsHistory>> {
  conn
    .query_row(
      &format!("SELECT {} {HISTORY_FROM} WHERE h.id = ?1", RawHistory::COLUMNS),
      params![id],
      RawHistory::from_row,
    )
    .optional()?
    .map(RawHistory::into_history)
    .transpose()
}

/// Id of the newest entry for an entity; ties on `created_at` go to the
/// higher id.
fn latest_history_id(
  conn: &Connection,
  entity_type: EntityType,
  entity_id: Id,
) -> Result<Option<Id>> {
  Ok(
    conn
      .query_row(
        "SELECT id FROM metrics_history
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY created_at DESC, id DESC
         LIMIT 1",
        params![entity_type.as_str(), entity_id],
        |r| r.get(0),
      )
      .optional()?,
  )
}

pub fn list_history(
  conn: &Connection,
  query: &HistoryQuery,
) -> Result<Vec<MetricsHistory>> {
  let mut conds: Vec<String> = Vec::new();
  let mut bound: Vec<rusqlite::types::Value> = Vec::new();

  if !query.entity_types.is_empty() {
    let placeholders = query
      .entity_types
      .iter()
      .map(|t| {
        bound.push(t.as_str().to_owned().into());
        format!("?{}", bound.len())
      })
      .collect::<Vec<_>>()
      .join(", ");
    conds.push(format!("h.entity_type IN ({placeholders})"));
  }
  if let Some(id) = query.entity_id {
    bound.push(id.into());
    conds.push(format!("h.entity_id = ?{}", bound.len()));
  }

  let where_clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  let limit_clause = match query.limit {
    Some(limit) => {
      bound.push(i64::try_from(limit).unwrap_or(i64::MAX).into());
      format!("LIMIT ?{}", bound.len())
    }
    None => String::new(),
  };

  let sql = format!(
    "SELECT {} {HISTORY_FROM} {where_clause}
     ORDER BY h.created_at DESC, h.id DESC
     {limit_clause}",
    RawHistory::COLUMNS,
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(params_from_iter(bound), RawHistory::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawHistory::into_history).collect()
}

/// Delete an entry and, if it was the newest for its entity, replay the new
/// newest snapshot onto the live row (or reset it).
pub fn delete_history(conn: &Connection, id: Id) -> Result<HistoryDeletion> {
  let deleted =
    get_history(conn, id)?.ok_or(CoreError::HistoryNotFound(id))?;
  let was_latest =
    latest_history_id(conn, deleted.entity_type, deleted.entity_id)? == Some(id);

  conn.execute("DELETE FROM metrics_history WHERE id = ?1", params![id])?;

  let restoration = if was_latest {
    let next = match latest_history_id(conn, deleted.entity_type, deleted.entity_id)? {
      Some(next_id) => get_history(conn, next_id)?,
      None => None,
    };
    replay_entity(conn, deleted.entity_type, deleted.entity_id, next.as_ref())?
  } else {
    Restoration::Unchanged
  };

  Ok(HistoryDeletion { deleted, restoration })
}

fn replay_entity(
  conn: &Connection,
  entity_type: EntityType,
  entity_id: Id,
  next: Option<&MetricsHistory>,
) -> Result<Restoration> {
  match entity_type {
    EntityType::Pnl => {
      replay::<SummaryMetrics>(conn, &PNL_METRICS, entity_id, next)
    }
    EntityType::SubPnl => {
      let restoration =
        replay::<SummaryMetrics>(conn, &SUB_PNL_METRICS, entity_id, next)?;
      if restoration != Restoration::EntityGone {
        let sub = require_sub_pnl(conn, entity_id)?;
        aggregate_pnl(conn, sub.pnl_id)?;
      }
      Ok(restoration)
    }
    EntityType::SubPnlDetail => {
      replay::<DetailMetrics>(conn, &DETAIL_METRICS, entity_id, next)
    }
  }
}

fn replay<M: MetricValues>(
  conn: &Connection,
  table: &MetricsTable,
  owner_id: Id,
  next: Option<&MetricsHistory>,
) -> Result<Restoration> {
  let owner_exists = conn
    .query_row(
      &format!("SELECT 1 FROM {} WHERE id = ?1", table.parent),
      params![owner_id],
      |_| Ok(()),
    )
    .optional()?
    .is_some();
  if !owner_exists {
    return Ok(Restoration::EntityGone);
  }

  let live = ensure_live::<M>(conn, table, owner_id)?.into_inner();
  let values = restore_values(&live.values, next)?;
  write_live(conn, table, owner_id, &values)?;

  Ok(match next {
    Some(entry) => Restoration::Restored { from: entry.id },
    None => Restoration::Reset,
  })
}
