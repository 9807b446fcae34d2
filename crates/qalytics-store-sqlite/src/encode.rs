//! Encoding and decoding helpers between domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that lexical order is chronological order. Metric values travel through
//! [`Snapshot`] maps and are bound column by column, driven by the
//! [`MetricsTable`] descriptors.

use chrono::{DateTime, SecondsFormat, Utc};
use qalytics_core::{
  Id,
  entity::{Pnl, SubPnl, User},
  history::MetricsHistory,
  metrics::{MetricValues, Snapshot},
};
use rusqlite::{Row, types::ValueRef};
use serde_json::Value;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn now() -> String { encode_dt(Utc::now()) }

// ─── Metric tables ───────────────────────────────────────────────────────────

/// Static description of one live-metrics table.
pub struct MetricsTable {
  pub name:    &'static str,
  /// Column holding the owning entity's id.
  pub owner:   &'static str,
  /// Table the owner id points into.
  pub parent:  &'static str,
  pub columns: &'static [&'static str],
}

const SUMMARY_COLUMNS: &[&str] = &[
  "features_shipped",
  "total_testcases_executed",
  "total_bugs_logged",
  "regression_bugs_found",
  "escaped_bugs",
  "sanity_time_avg_hours",
  "automation_coverage_percent",
  "test_coverage_percent",
  "testcases_per_bug",
  "bugs_per_100_tests",
];

const DETAIL_COLUMNS: &[&str] = &[
  "features_shipped",
  "total_testcases_executed",
  "total_bugs_logged",
  "testcase_peer_review",
  "regression_bugs_found",
  "escaped_bugs",
  "sanity_time_avg_hours",
  "api_test_time_avg_hours",
  "automation_coverage_percent",
  "test_coverage_percent",
  "testcases_per_bug",
  "bugs_per_100_tests",
];

pub const PNL_METRICS: MetricsTable = MetricsTable {
  name:    "pnl_metrics",
  owner:   "pnl_id",
  parent:  "pnls",
  columns: SUMMARY_COLUMNS,
};

pub const SUB_PNL_METRICS: MetricsTable = MetricsTable {
  name:    "sub_pnl_metrics",
  owner:   "sub_pnl_id",
  parent:  "sub_pnls",
  columns: SUMMARY_COLUMNS,
};

pub const DETAIL_METRICS: MetricsTable = MetricsTable {
  name:    "sub_pnl_detail_metrics",
  owner:   "sub_pnl_id",
  parent:  "sub_pnls",
  columns: DETAIL_COLUMNS,
};

impl MetricsTable {
  /// Comma-separated column names for a SELECT list, optionally prefixed with
  /// a table alias.
  pub fn column_list(&self, alias: Option<&str>) -> String {
    self
      .columns
      .iter()
      .map(|c| match alias {
        Some(a) => format!("{a}.{c}"),
        None => (*c).to_owned(),
      })
      .collect::<Vec<_>>()
      .join(", ")
  }
}

/// Read `table.columns` starting at column index `start` into a value set.
pub fn read_values<M: MetricValues>(
  row: &Row<'_>,
  start: usize,
  table: &MetricsTable,
) -> Result<M> {
  let mut map = Snapshot::new();
  for (offset, column) in table.columns.iter().enumerate() {
    let value = match row.get_ref(start + offset)? {
      ValueRef::Integer(i) => Value::from(i),
      ValueRef::Real(f) => Value::from(f),
      _ => Value::from(0),
    };
    map.insert((*column).to_owned(), value);
  }
  Ok(serde_json::from_value(Value::Object(map))?)
}

/// Bind parameters for `table.columns`, in order, from a value set.
pub fn bind_values<M: MetricValues>(
  values: &M,
  table: &MetricsTable,
) -> Result<Vec<rusqlite::types::Value>> {
  use rusqlite::types::Value as Sql;

  let map = values.snapshot()?;
  Ok(
    table
      .columns
      .iter()
      .map(|c| match map.get(*c) {
        Some(v) if v.is_i64() => Sql::Integer(v.as_i64().unwrap_or_default()),
        Some(v) => Sql::Real(v.as_f64().unwrap_or_default()),
        None => Sql::Integer(0),
      })
      .collect(),
  )
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub id:         Id,
  pub email:      String,
  pub role:       String,
  pub created_at: String,
}

impl RawUser {
  pub const COLUMNS: &'static str = "id, email, role, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawUser {
      id:         row.get(0)?,
      email:      row.get(1)?,
      role:       row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:         self.id,
      email:      self.email,
      role:       self.role,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `pnls` row.
pub struct RawPnl {
  pub id:          Id,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawPnl {
  pub const COLUMNS: &'static str =
    "id, name, description, created_at, updated_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawPnl {
      id:          row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
      created_at:  row.get(3)?,
      updated_at:  row.get(4)?,
    })
  }

  pub fn into_pnl(self) -> Result<Pnl> {
    Ok(Pnl {
      id:          self.id,
      name:        self.name,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `sub_pnls` row.
pub struct RawSubPnl {
  pub id:          Id,
  pub pnl_id:      Id,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawSubPnl {
  pub const COLUMNS: &'static str =
    "id, pnl_id, name, description, created_at, updated_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawSubPnl {
      id:          row.get(0)?,
      pnl_id:      row.get(1)?,
      name:        row.get(2)?,
      description: row.get(3)?,
      created_at:  row.get(4)?,
      updated_at:  row.get(5)?,
    })
  }

  pub fn into_sub_pnl(self) -> Result<SubPnl> {
    Ok(SubPnl {
      id:          self.id,
      pnl_id:      self.pnl_id,
      name:        self.name,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values of a `metrics_history` row left-joined with its author.
pub struct RawHistory {
  pub id:                 Id,
  pub entity_type:        String,
  pub entity_id:          Id,
  pub metrics_data:       String,
  pub change_type:        String,
  pub changed_by:         Option<Id>,
  pub change_description: Option<String>,
  pub previous_values:    Option<String>,
  pub created_at:         String,
  // users join
  pub user_email:         Option<String>,
  pub user_role:          Option<String>,
  pub user_created_at:    Option<String>,
}

impl RawHistory {
  /// SELECT list matching [`RawHistory::from_row`]; expects `metrics_history
  /// h LEFT JOIN users u ON u.id = h.changed_by`.
  pub const COLUMNS: &'static str = "h.id, h.entity_type, h.entity_id, \
     h.metrics_data, h.change_type, h.changed_by, h.change_description, \
     h.previous_values, h.created_at, u.email, u.role, u.created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawHistory {
      id:                 row.get(0)?,
      entity_type:        row.get(1)?,
      entity_id:          row.get(2)?,
      metrics_data:       row.get(3)?,
      change_type:        row.get(4)?,
      changed_by:         row.get(5)?,
      change_description: row.get(6)?,
      previous_values:    row.get(7)?,
      created_at:         row.get(8)?,
      user_email:         row.get(9)?,
      user_role:          row.get(10)?,
      user_created_at:    row.get(11)?,
    })
  }

  pub fn into_history(self) -> Result<MetricsHistory> {
    let user = match (self.changed_by, self.user_email, self.user_role, self.user_created_at) {
      (Some(id), Some(email), Some(role), Some(created_at)) => Some(User {
        id,
        email,
        role,
        created_at: decode_dt(&created_at)?,
      }),
      _ => None,
    };

    Ok(MetricsHistory {
      id: self.id,
      entity_type: self.entity_type.parse()?,
      entity_id: self.entity_id,
      metrics_data: self.metrics_data,
      change_type: self.change_type.parse()?,
      changed_by: self.changed_by,
      change_description: self.change_description,
      previous_values: self.previous_values,
      created_at: decode_dt(&self.created_at)?,
      user,
    })
  }
}
