//! Rolling Sub-PnL summary metrics up into their parent PnL.

use crate::metrics::{MetricValues as _, SummaryMetrics, round2};

/// Recompute a PnL's metrics from its children.
///
/// Each entry is one child Sub-PnL; `None` means the child has no metrics
/// row. Counters are summed, saturating at `i64::MAX`. Sanity time and the two coverage percentages
/// are averaged over the children that do have a row, with the denominator
/// floored at 1 so an empty PnL aggregates to all zeros. Ratios are derived
/// from the summed counters.
pub fn recompute(children: &[Option<SummaryMetrics>]) -> SummaryMetrics {
  let mut total = SummaryMetrics::default();
  let mut sanity = 0.0;
  let mut automation = 0.0;
  let mut coverage = 0.0;
  let mut with_rows = 0usize;

  for child in children.iter().flatten() {
    for (sum, value) in [
      (&mut total.features_shipped, child.features_shipped),
      (&mut total.total_testcases_executed, child.total_testcases_executed),
      (&mut total.total_bugs_logged, child.total_bugs_logged),
      (&mut total.regression_bugs_found, child.regression_bugs_found),
      (&mut total.escaped_bugs, child.escaped_bugs),
    ] {
      *sum = sum.saturating_add(value);
    }
    sanity += child.sanity_time_avg_hours;
    automation += child.automation_coverage_percent;
    coverage += child.test_coverage_percent;
    with_rows += 1;
  }

  let denominator = with_rows.max(1) as f64;
  total.sanity_time_avg_hours = round2(sanity / denominator);
  total.automation_coverage_percent = round2(automation / denominator);
  total.test_coverage_percent = round2(coverage / denominator);
  total.normalize();
  total
}
