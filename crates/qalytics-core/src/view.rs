//! Read models assembled from several rows.

use serde::{Deserialize, Serialize};

use crate::{
  entity::{Pnl, SubPnl},
  metrics::{PnlMetrics, SubPnlDetailMetrics, SubPnlMetrics},
};

/// A dashboard line: a PnL, how many Sub-PnLs it has, and its freshly
/// aggregated metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlOverview {
  #[serde(flatten)]
  pub pnl:            Pnl,
  pub sub_pnls_count: usize,
  pub metrics:        PnlMetrics,
}

/// A Sub-PnL together with its summary metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPnlWithMetrics {
  #[serde(flatten)]
  pub sub_pnl: SubPnl,
  pub metrics: SubPnlMetrics,
}

/// A Sub-PnL together with its detail metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPnlWithDetail {
  #[serde(flatten)]
  pub sub_pnl:        SubPnl,
  pub detail_metrics: SubPnlDetailMetrics,
}
