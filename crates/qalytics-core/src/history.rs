//! The metrics change log.
//!
//! Every client write to a metrics row appends a [`MetricsHistory`] entry
//! holding the full post-write values. Entries are never edited. Deleting the
//! newest entry for an entity rolls the live row back to the entry before it,
//! or to zeros when none is left; see [`restore_values`].

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Id, Result,
  entity::User,
  metrics::{MetricValues, Snapshot},
};

// ─── Discriminants ───────────────────────────────────────────────────────────

/// Which kind of metrics row a history entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
  /// `entity_id` is a PnL id.
  Pnl,
  /// `entity_id` is a Sub-PnL id; the summary metrics row.
  SubPnl,
  /// `entity_id` is a Sub-PnL id; the detail metrics row.
  SubPnlDetail,
}

impl EntityType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pnl => "pnl",
      Self::SubPnl => "sub_pnl",
      Self::SubPnlDetail => "sub_pnl_detail",
    }
  }
}

impl fmt::Display for EntityType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for EntityType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "pnl" => Ok(Self::Pnl),
      "sub_pnl" => Ok(Self::SubPnl),
      "sub_pnl_detail" => Ok(Self::SubPnlDetail),
      other => Err(Error::UnknownEntityType(other.to_owned())),
    }
  }
}

/// Whether the write that produced an entry created the row or changed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
  Create,
  Update,
}

impl ChangeType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Create => "create",
      Self::Update => "update",
    }
  }
}

impl FromStr for ChangeType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "create" => Ok(Self::Create),
      "update" => Ok(Self::Update),
      other => Err(Error::UnknownChangeType(other.to_owned())),
    }
  }
}

// ─── Entries ─────────────────────────────────────────────────────────────────

/// One immutable entry of the change log.
///
/// `metrics_data` and `previous_values` are kept as the JSON text that was
/// stored; use [`MetricsHistory::metrics`] and [`MetricsHistory::previous`]
/// to decode them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsHistory {
  pub id:                 Id,
  pub entity_type:        EntityType,
  pub entity_id:          Id,
  pub metrics_data:       String,
  pub change_type:        ChangeType,
  pub changed_by:         Option<Id>,
  pub change_description: Option<String>,
  pub previous_values:    Option<String>,
  pub created_at:         DateTime<Utc>,
  /// The author, when `changed_by` is set and the account still exists.
  pub user:               Option<User>,
}

impl MetricsHistory {
  /// Decode the post-write snapshot.
  pub fn metrics(&self) -> Result<Snapshot> {
    Ok(serde_json::from_str(&self.metrics_data)?)
  }

  /// Decode the pre-write values of the changed fields, if recorded.
  pub fn previous(&self) -> Result<Option<Snapshot>> {
    self
      .previous_values
      .as_deref()
      .map(serde_json::from_str::<Snapshot>)
      .transpose()
      .map_err(Error::from)
  }
}

/// Everything needed to append an entry; id and timestamp come from the
/// store.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
  pub entity_type:     EntityType,
  pub entity_id:       Id,
  pub metrics:         Snapshot,
  pub change_type:     ChangeType,
  pub changed_by:      Option<Id>,
  pub description:     String,
  /// Only recorded for updates.
  pub previous_values: Option<Snapshot>,
}

impl NewHistoryEntry {
  /// Build the entry for a write to an `entity_type` row. A write with no
  /// previous values is a create.
  pub fn for_write<M: MetricValues>(
    entity_type: EntityType,
    entity_id: Id,
    values: &M,
    previous: Option<Snapshot>,
    changed_by: Option<Id>,
  ) -> Result<Self> {
    let change_type = if previous.is_some() {
      ChangeType::Update
    } else {
      ChangeType::Create
    };
    let subject = match entity_type {
      EntityType::Pnl => "PnL metrics",
      EntityType::SubPnl => "Sub-PnL metrics",
      EntityType::SubPnlDetail => "Sub-PnL detail metrics",
    };
    let verb = match change_type {
      ChangeType::Create => "created",
      ChangeType::Update => "updated",
    };
    Ok(Self {
      entity_type,
      entity_id,
      metrics: values.snapshot()?,
      change_type,
      changed_by,
      description: format!("{subject} {verb}"),
      previous_values: previous,
    })
  }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Page size of `GET /metrics-history` when no `limit` is given.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Parameters for [`crate::store::MetricsStore::list_history`]. Results are
/// always newest first.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
  /// Restrict to these entity types; empty means all.
  pub entity_types: Vec<EntityType>,
  pub entity_id:    Option<Id>,
  /// Maximum number of entries; `None` returns every match.
  pub limit:        Option<usize>,
}

// ─── Replay ──────────────────────────────────────────────────────────────────

/// What deleting a history entry did to the live metrics row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Restoration {
  /// The deleted entry was not the newest; nothing changed.
  Unchanged,
  /// The live row now holds the snapshot of entry `from`.
  Restored { from: Id },
  /// No entries remain; the live row was zeroed.
  Reset,
  /// The owning PnL or Sub-PnL no longer exists.
  EntityGone,
}

impl Restoration {
  pub fn restored(&self) -> bool {
    matches!(self, Self::Restored { .. } | Self::Reset)
  }
}

/// The result of [`crate::store::MetricsStore::delete_history`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryDeletion {
  pub deleted:     MetricsHistory,
  pub restoration: Restoration,
}

/// Compute the live values after the newest entry was deleted: the snapshot
/// of the new newest entry applied over `live`, or all zeros if there is
/// none.
pub fn restore_values<M: MetricValues>(
  live: &M,
  next_latest: Option<&MetricsHistory>,
) -> Result<M> {
  match next_latest {
    Some(entry) => live.overlaid(&entry.metrics()?),
    None => Ok(M::default()),
  }
}
