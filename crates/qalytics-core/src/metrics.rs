//! Metric value sets, their persisted rows, and partial updates.
//!
//! Two value shapes exist: [`SummaryMetrics`] (Sub-PnL and PnL level, the
//! input and output of aggregation) and [`DetailMetrics`] (the richer
//! per-Sub-PnL set). Both are flat structs of counters and two-decimal
//! figures, and both round-trip through a flat JSON map ([`Snapshot`]) so the
//! history engine can diff, store, and replay them field by field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{Error, Id, Result};

/// A flat map of metric field name to numeric value.
pub type Snapshot = serde_json::Map<String, Value>;

// ─── Value sets ──────────────────────────────────────────────────────────────

/// Summary metrics carried by every Sub-PnL and rolled up into its PnL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryMetrics {
  pub features_shipped:            i64,
  pub total_testcases_executed:    i64,
  pub total_bugs_logged:           i64,
  pub regression_bugs_found:       i64,
  pub escaped_bugs:                i64,
  pub sanity_time_avg_hours:       f64,
  pub automation_coverage_percent: f64,
  pub test_coverage_percent:       f64,
  /// Derived: executed testcases per logged bug.
  pub testcases_per_bug:           f64,
  /// Derived: logged bugs per hundred executed testcases.
  pub bugs_per_100_tests:          f64,
}

/// The detail-page metric set: the summary fields plus peer review and API
/// test timing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailMetrics {
  pub features_shipped:            i64,
  pub total_testcases_executed:    i64,
  pub total_bugs_logged:           i64,
  pub testcase_peer_review:        i64,
  pub regression_bugs_found:       i64,
  pub escaped_bugs:                i64,
  pub sanity_time_avg_hours:       f64,
  pub api_test_time_avg_hours:     f64,
  pub automation_coverage_percent: f64,
  pub test_coverage_percent:       f64,
  pub testcases_per_bug:           f64,
  pub bugs_per_100_tests:          f64,
}

/// Behaviour shared by both value sets.
///
/// `Default` is the all-zero reset state used when history runs out.
pub trait MetricValues:
  Serialize + DeserializeOwned + Default + Clone + Send + 'static
{
  /// Round decimal fields to two places and recompute the derived ratios
  /// from the counters.
  fn normalize(&mut self);

  /// Encode as a flat field → number map.
  fn snapshot(&self) -> Result<Snapshot> {
    match serde_json::to_value(self)? {
      Value::Object(map) => Ok(map),
      other => Err(Error::Serialization(serde::de::Error::custom(format!(
        "metric values encoded as non-object: {other}"
      )))),
    }
  }

  /// Return a copy with every field present in `patch` overwritten. Keys that
  /// are not fields of `Self` are ignored.
  fn overlaid(&self, patch: &Snapshot) -> Result<Self> {
    let mut base = self.snapshot()?;
    for (key, incoming) in patch {
      if let Some(slot) = base.get_mut(key) {
        *slot = coerce(slot, incoming);
      }
    }
    let mut next: Self = serde_json::from_value(Value::Object(base))?;
    next.normalize();
    Ok(next)
  }
}

impl MetricValues for SummaryMetrics {
  fn normalize(&mut self) {
    self.sanity_time_avg_hours = round2(self.sanity_time_avg_hours);
    self.automation_coverage_percent = round2(self.automation_coverage_percent);
    self.test_coverage_percent = round2(self.test_coverage_percent);
    (self.testcases_per_bug, self.bugs_per_100_tests) =
      ratios(self.total_testcases_executed, self.total_bugs_logged);
  }
}

impl MetricValues for DetailMetrics {
  fn normalize(&mut self) {
    self.sanity_time_avg_hours = round2(self.sanity_time_avg_hours);
    self.api_test_time_avg_hours = round2(self.api_test_time_avg_hours);
    self.automation_coverage_percent = round2(self.automation_coverage_percent);
    self.test_coverage_percent = round2(self.test_coverage_percent);
    (self.testcases_per_bug, self.bugs_per_100_tests) =
      ratios(self.total_testcases_executed, self.total_bugs_logged);
  }
}

/// Snapshots store every number as JSON; a counter that went through a
/// float-normalising writer comes back as e.g. `5.0` and must still land in
/// an integer field.
fn coerce(current: &Value, incoming: &Value) -> Value {
  let is_counter = current.is_i64() || current.is_u64();
  match incoming.as_f64() {
    Some(f) if is_counter && incoming.is_f64() && f.fract() == 0.0 => {
      Value::from(f as i64)
    }
    _ => incoming.clone(),
  }
}

/// Upper bound for a single counter. Sums over any realistic number of
/// children stay well inside `i64`.
pub const MAX_COUNTER: i64 = 1_000_000_000;

/// Upper bound for percentage fields.
pub const MAX_PERCENT: f64 = 100.0;

/// Upper bound for other two-decimal fields, the range of a `DECIMAL(5,2)`.
pub const MAX_DECIMAL: f64 = 999.99;

/// Round to the two decimal places the metric columns are defined with.
pub fn round2(x: f64) -> f64 { (x * 100.0).round() / 100.0 }

/// `(testcases_per_bug, bugs_per_100_tests)`; zero whenever the divisor is.
pub fn ratios(executed: i64, bugs: i64) -> (f64, f64) {
  let per_bug = if bugs > 0 {
    round2(executed as f64 / bugs as f64)
  } else {
    0.0
  };
  let per_100 = if executed > 0 {
    round2(bugs as f64 * 100.0 / executed as f64)
  } else {
    0.0
  };
  (per_bug, per_100)
}

// ─── Persisted rows ──────────────────────────────────────────────────────────

/// The live metrics row of a PnL. Normally produced by aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlMetrics {
  pub id:         Id,
  pub pnl_id:     Id,
  #[serde(flatten)]
  pub values:     SummaryMetrics,
  pub updated_at: DateTime<Utc>,
}

/// The live summary metrics row of a Sub-PnL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPnlMetrics {
  pub id:         Id,
  pub sub_pnl_id: Id,
  #[serde(flatten)]
  pub values:     SummaryMetrics,
  pub updated_at: DateTime<Utc>,
}

/// The live detail metrics row of a Sub-PnL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPnlDetailMetrics {
  pub id:          Id,
  pub sub_pnl_id:  Id,
  #[serde(flatten)]
  pub values:      DetailMetrics,
  /// Starts at 1; bumped on every update.
  pub version:     i64,
  pub is_active:   bool,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Whether an `ensure_*` store call found an existing row or had to create a
/// default one.
#[derive(Debug, Clone, PartialEq)]
pub enum Ensured<T> {
  Found(T),
  Created(T),
}

impl<T> Ensured<T> {
  pub fn was_created(&self) -> bool { matches!(self, Self::Created(_)) }

  pub fn into_inner(self) -> T {
    match self {
      Self::Found(t) | Self::Created(t) => t,
    }
  }
}

// ─── Updates ─────────────────────────────────────────────────────────────────

/// A partial update of summary metrics (PnL or Sub-PnL). Absent fields keep
/// their stored value. Derived ratios are not accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryMetricsUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub features_shipped:            Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub total_testcases_executed:    Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub total_bugs_logged:           Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub regression_bugs_found:       Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub escaped_bugs:                Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sanity_time_avg_hours:       Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub automation_coverage_percent: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub test_coverage_percent:       Option<f64>,
}

/// The metric fields of a detail metrics update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailValuesUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub features_shipped:            Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub total_testcases_executed:    Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub total_bugs_logged:           Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub testcase_peer_review:        Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub regression_bugs_found:       Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub escaped_bugs:                Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sanity_time_avg_hours:       Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub api_test_time_avg_hours:     Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub automation_coverage_percent: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub test_coverage_percent:       Option<f64>,
}

/// A partial update of detail metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailMetricsUpdate {
  #[serde(flatten)]
  pub values:           DetailValuesUpdate,
  pub description:      Option<String>,
  /// When set, the write is rejected unless the stored version matches.
  pub expected_version: Option<i64>,
}

/// The outcome of applying a partial update to a value set.
#[derive(Debug, Clone)]
pub struct Applied<M> {
  /// The full post-update values, normalised.
  pub values:   M,
  /// Pre-update values of exactly the fields the update carried.
  pub previous: Snapshot,
}

/// Validate `update` and apply it on top of `current`.
///
/// Every supplied value must be a finite, non-negative number no larger than
/// [`MAX_COUNTER`], [`MAX_PERCENT`] or [`MAX_DECIMAL`] for its kind.
pub fn apply_update<M, U>(current: &M, update: &U) -> Result<Applied<M>>
where
  M: MetricValues,
  U: Serialize,
{
  let patch = match serde_json::to_value(update)? {
    Value::Object(map) => map,
    _ => Snapshot::new(),
  };
  validate(&patch)?;

  let before = current.snapshot()?;
  let previous = patch
    .keys()
    .filter_map(|k| before.get(k).map(|v| (k.clone(), v.clone())))
    .collect();

  Ok(Applied { values: current.overlaid(&patch)?, previous })
}

fn validate(patch: &Snapshot) -> Result<()> {
  for (field, value) in patch {
    let invalid = |reason| Error::InvalidMetric { field: field.clone(), reason };
    let v = value
      .as_f64()
      .filter(|v| v.is_finite())
      .ok_or_else(|| invalid("must be a finite number"))?;
    if v < 0.0 {
      return Err(invalid("must not be negative"));
    }
    if value.is_i64() || value.is_u64() {
      if v > MAX_COUNTER as f64 {
        return Err(invalid("must not exceed 1000000000"));
      }
    } else if field.ends_with("_percent") {
      if v > MAX_PERCENT {
        return Err(invalid("must not exceed 100"));
      }
    } else if v > MAX_DECIMAL {
      return Err(invalid("must not exceed 999.99"));
    }
  }
  Ok(())
}
