//! Integration tests for `SqliteStore` against an in-memory database.

use qalytics_core::{
  DomainError, Error as CoreError,
  entity::{NewUnit, NewUser, UnitChanges},
  history::{ChangeType, EntityType, HistoryQuery, Restoration},
  metrics::{
    DetailMetrics, DetailMetricsUpdate, DetailValuesUpdate, Ensured,
    MAX_COUNTER, SummaryMetrics, SummaryMetricsUpdate,
  },
  store::MetricsStore,
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn unit(name: &str) -> NewUnit {
  NewUnit { name: name.into(), description: None }
}

fn counters(features: i64, executed: i64, bugs: i64) -> SummaryMetricsUpdate {
  SummaryMetricsUpdate {
    features_shipped: Some(features),
    total_testcases_executed: Some(executed),
    total_bugs_logged: Some(bugs),
    ..Default::default()
  }
}

/// Decode a history entry's snapshot into a full value set.
fn snapshot_values<M: serde::de::DeserializeOwned>(
  entry: &qalytics_core::history::MetricsHistory,
) -> M {
  serde_json::from_value(serde_json::Value::Object(entry.metrics().unwrap()))
    .unwrap()
}

fn domain(err: &Error) -> &CoreError {
  err.domain().expect("domain error")
}

// ─── Users ───────────────────────────────────────────────────────────────────

fn new_user(email: &str) -> NewUser {
  NewUser {
    email:         email.into(),
    password_hash: "$argon2id$stub".into(),
    role:          "user".into(),
  }
}

#[tokio::test]
async fn create_user_and_find_credentials() {
  let s = store().await;
  let user = s.create_user(new_user("qa@example.com")).await.unwrap();
  assert_eq!(user.email, "qa@example.com");

  let creds = s.find_credentials("qa@example.com").await.unwrap().unwrap();
  assert_eq!(creds.user, user);
  assert_eq!(creds.password_hash, "$argon2id$stub");

  assert!(s.find_credentials("nobody@example.com").await.unwrap().is_none());
  assert_eq!(s.get_user(user.id).await.unwrap(), Some(user));
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let s = store().await;
  s.create_user(new_user("qa@example.com")).await.unwrap();
  let err = s.create_user(new_user("qa@example.com")).await.unwrap_err();
  assert!(matches!(domain(&err), CoreError::DuplicateEmail(_)));
}

// ─── PnLs and Sub-PnLs ───────────────────────────────────────────────────────

#[tokio::test]
async fn create_pnl_creates_default_metrics_without_history() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();

  let ensured = s.ensure_pnl_metrics(pnl.id).await.unwrap();
  assert!(matches!(ensured, Ensured::Found(_)));
  assert_eq!(ensured.into_inner().values.features_shipped, 0);

  let history = s.list_history(&HistoryQuery::default()).await.unwrap();
  assert!(history.is_empty());
}

#[tokio::test]
async fn create_sub_pnl_under_missing_pnl_is_not_found() {
  let s = store().await;
  let err = s.create_sub_pnl(42, unit("Checkout")).await.unwrap_err();
  assert!(matches!(domain(&err), CoreError::PnlNotFound(42)));
}

#[tokio::test]
async fn update_pnl_keeps_absent_fields() {
  let s = store().await;
  let pnl = s
    .create_pnl(NewUnit {
      name:        "Payments".into(),
      description: Some("card rails".into()),
    })
    .await
    .unwrap();

  let updated = s
    .update_pnl(pnl.id, UnitChanges { name: Some("Payouts".into()), description: None })
    .await
    .unwrap();
  assert_eq!(updated.name, "Payouts");
  assert_eq!(updated.description.as_deref(), Some("card rails"));

  let err = s.update_pnl(999, UnitChanges::default()).await.unwrap_err();
  assert!(matches!(domain(&err), CoreError::PnlNotFound(999)));
}

#[tokio::test]
async fn delete_pnl_cascades_to_sub_pnls() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  let sub = s.create_sub_pnl(pnl.id, unit("Checkout")).await.unwrap();
  s.update_sub_pnl_metrics(sub.id, counters(1, 10, 2), None)
    .await
    .unwrap();

  s.delete_pnl(pnl.id).await.unwrap();

  assert!(s.get_pnl(pnl.id).await.unwrap().is_none());
  assert!(s.get_sub_pnl(sub.id).await.unwrap().is_none());
  let err = s.ensure_sub_pnl_metrics(sub.id).await.unwrap_err();
  assert!(matches!(domain(&err), CoreError::SubPnlNotFound(_)));

  // History survives its entity.
  let history = s.list_history(&HistoryQuery::default()).await.unwrap();
  assert_eq!(history.len(), 1);

  let err = s.delete_pnl(pnl.id).await.unwrap_err();
  assert!(matches!(domain(&err), CoreError::PnlNotFound(_)));
}

#[tokio::test]
async fn delete_sub_pnl_reaggregates_parent() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  let a = s.create_sub_pnl(pnl.id, unit("Checkout")).await.unwrap();
  let b = s.create_sub_pnl(pnl.id, unit("Refunds")).await.unwrap();
  s.update_sub_pnl_metrics(a.id, counters(5, 0, 0), None).await.unwrap();
  s.update_sub_pnl_metrics(b.id, counters(7, 0, 0), None).await.unwrap();

  s.delete_sub_pnl(b.id).await.unwrap();

  let metrics = s.ensure_pnl_metrics(pnl.id).await.unwrap().into_inner();
  assert_eq!(metrics.values.features_shipped, 5);
}

#[tokio::test]
async fn list_sub_pnls_includes_metrics() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  let sub = s.create_sub_pnl(pnl.id, unit("Checkout")).await.unwrap();
  s.update_sub_pnl_metrics(sub.id, counters(3, 0, 0), None).await.unwrap();

  let listed = s.list_sub_pnls(pnl.id).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].sub_pnl.id, sub.id);
  assert_eq!(listed[0].metrics.values.features_shipped, 3);

  let err = s.list_sub_pnls(999).await.unwrap_err();
  assert!(matches!(domain(&err), CoreError::PnlNotFound(999)));
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn pnl_metrics_sum_sub_pnl_counters() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  let a = s.create_sub_pnl(pnl.id, unit("Checkout")).await.unwrap();
  let b = s.create_sub_pnl(pnl.id, unit("Refunds")).await.unwrap();

  s.update_sub_pnl_metrics(a.id, counters(5, 100, 4), None).await.unwrap();
  s.update_sub_pnl_metrics(b.id, counters(7, 100, 6), None).await.unwrap();

  let metrics = s.refresh_pnl_metrics(pnl.id).await.unwrap();
  assert_eq!(metrics.values.features_shipped, 12);
  assert_eq!(metrics.values.total_testcases_executed, 200);
  assert_eq!(metrics.values.total_bugs_logged, 10);
  assert_eq!(metrics.values.testcases_per_bug, 20.0);
  assert_eq!(metrics.values.bugs_per_100_tests, 5.0);
}

#[tokio::test]
async fn pnl_metrics_average_coverage() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  let a = s.create_sub_pnl(pnl.id, unit("Checkout")).await.unwrap();
  let b = s.create_sub_pnl(pnl.id, unit("Refunds")).await.unwrap();

  for (id, coverage) in [(a.id, 60.0), (b.id, 80.0)] {
    let update = SummaryMetricsUpdate {
      automation_coverage_percent: Some(coverage),
      ..Default::default()
    };
    s.update_sub_pnl_metrics(id, update, None).await.unwrap();
  }

  let metrics = s.refresh_pnl_metrics(pnl.id).await.unwrap();
  assert_eq!(metrics.values.automation_coverage_percent, 70.0);
}

#[tokio::test]
async fn large_sub_pnl_counters_sum_without_overflow() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  let a = s.create_sub_pnl(pnl.id, unit("Checkout")).await.unwrap();
  let b = s.create_sub_pnl(pnl.id, unit("Refunds")).await.unwrap();

  let err = s
    .update_sub_pnl_metrics(a.id, counters(i64::MAX, 0, 0), None)
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), CoreError::InvalidMetric { .. }));

  s.update_sub_pnl_metrics(a.id, counters(MAX_COUNTER, 0, 0), None)
    .await
    .unwrap();
  s.update_sub_pnl_metrics(b.id, counters(MAX_COUNTER, 0, 0), None)
    .await
    .unwrap();

  let metrics = s.refresh_pnl_metrics(pnl.id).await.unwrap();
  assert_eq!(metrics.values.features_shipped, 2 * MAX_COUNTER);
  assert_eq!(s.list_pnls().await.unwrap().len(), 1);
}

#[tokio::test]
async fn out_of_range_decimal_is_rejected_without_writing() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  let sub = s.create_sub_pnl(pnl.id, unit("Checkout")).await.unwrap();

  let update = SummaryMetricsUpdate {
    sanity_time_avg_hours: Some(1e307),
    ..Default::default()
  };
  let err = s.update_sub_pnl_metrics(sub.id, update, None).await.unwrap_err();
  assert!(matches!(
    domain(&err),
    CoreError::InvalidMetric { field, .. } if field == "sanity_time_avg_hours"
  ));
  assert!(s.list_history(&HistoryQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn pnl_without_sub_pnls_aggregates_to_zero() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  s.update_pnl_metrics(pnl.id, counters(9, 9, 9), None).await.unwrap();

  let metrics = s.refresh_pnl_metrics(pnl.id).await.unwrap();
  assert_eq!(metrics.values, Default::default());
}

#[tokio::test]
async fn dashboard_lists_pnls_with_counts() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  s.create_pnl(unit("Lending")).await.unwrap();
  let sub = s.create_sub_pnl(pnl.id, unit("Checkout")).await.unwrap();
  s.create_sub_pnl(pnl.id, unit("Refunds")).await.unwrap();
  s.update_sub_pnl_metrics(sub.id, counters(4, 0, 0), None).await.unwrap();

  let dashboard = s.dashboard().await.unwrap();
  assert_eq!(dashboard.len(), 2);
  assert_eq!(dashboard[0].pnl.id, pnl.id);
  assert_eq!(dashboard[0].sub_pnls_count, 2);
  assert_eq!(dashboard[0].metrics.values.features_shipped, 4);
  assert_eq!(dashboard[1].sub_pnls_count, 0);
}

// ─── Writes and history ──────────────────────────────────────────────────────

#[tokio::test]
async fn update_records_previous_values() {
  let s = store().await;
  let user = s.create_user(new_user("qa@example.com")).await.unwrap();
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  let sub = s.create_sub_pnl(pnl.id, unit("Checkout")).await.unwrap();

  s.update_sub_pnl_metrics(sub.id, counters(5, 0, 0), Some(user.id))
    .await
    .unwrap();
  let written = s
    .update_sub_pnl_metrics(
      sub.id,
      SummaryMetricsUpdate { features_shipped: Some(8), ..Default::default() },
      Some(user.id),
    )
    .await
    .unwrap();
  assert_eq!(written.values.features_shipped, 8);

  let query = HistoryQuery {
    entity_types: vec![EntityType::SubPnl],
    entity_id: Some(sub.id),
    limit: None,
  };
  let history = s.list_history(&query).await.unwrap();
  assert_eq!(history.len(), 2);

  let latest = &history[0];
  assert_eq!(latest.change_type, ChangeType::Update);
  assert_eq!(latest.changed_by, Some(user.id));
  assert_eq!(latest.user.as_ref().map(|u| u.email.as_str()), Some("qa@example.com"));

  let previous = latest.previous().unwrap().unwrap();
  assert_eq!(previous.len(), 1);
  assert_eq!(previous["features_shipped"], 5);
  assert_eq!(latest.metrics().unwrap()["features_shipped"], 8);
}

#[tokio::test]
async fn write_then_read_round_trips() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  let sub = s.create_sub_pnl(pnl.id, unit("Checkout")).await.unwrap();

  let update = SummaryMetricsUpdate {
    sanity_time_avg_hours: Some(1.256),
    test_coverage_percent: Some(88.5),
    ..counters(3, 40, 8)
  };
  let written = s.update_sub_pnl_metrics(sub.id, update, None).await.unwrap();
  let read = s.ensure_sub_pnl_metrics(sub.id).await.unwrap().into_inner();

  assert_eq!(read, written);
  assert_eq!(read.values.sanity_time_avg_hours, 1.26);
  assert_eq!(read.values.testcases_per_bug, 5.0);
  assert_eq!(read.values.bugs_per_100_tests, 20.0);
}

#[tokio::test]
async fn negative_values_are_rejected_without_writing() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  let sub = s.create_sub_pnl(pnl.id, unit("Checkout")).await.unwrap();

  let err = s
    .update_sub_pnl_metrics(sub.id, counters(-1, 0, 0), None)
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), CoreError::InvalidMetric { .. }));

  let history = s.list_history(&HistoryQuery::default()).await.unwrap();
  assert!(history.is_empty());
}

#[tokio::test]
async fn update_on_missing_sub_pnl_is_not_found() {
  let s = store().await;
  let err = s
    .update_sub_pnl_metrics(7, counters(1, 1, 1), None)
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), CoreError::SubPnlNotFound(7)));
}

#[tokio::test]
async fn history_limit_and_filters() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  let sub = s.create_sub_pnl(pnl.id, unit("Checkout")).await.unwrap();
  for n in 1..=3 {
    s.update_sub_pnl_metrics(sub.id, counters(n, 0, 0), None).await.unwrap();
  }
  s.update_pnl_metrics(pnl.id, counters(1, 0, 0), None).await.unwrap();

  let all = s.list_history(&HistoryQuery::default()).await.unwrap();
  assert_eq!(all.len(), 4);

  let limited = s
    .list_history(&HistoryQuery { limit: Some(2), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(limited.len(), 2);
  assert_eq!(limited[0].id, all[0].id);

  let pnl_only = s
    .list_history(&HistoryQuery {
      entity_types: vec![EntityType::Pnl],
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(pnl_only.len(), 1);
  assert_eq!(pnl_only[0].entity_id, pnl.id);
}

#[tokio::test]
async fn entity_history_without_limit_returns_every_entry() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  for n in 0..60 {
    s.update_pnl_metrics(pnl.id, counters(n, 0, 0), None).await.unwrap();
  }

  let mut query = HistoryQuery {
    entity_types: vec![EntityType::Pnl],
    entity_id:    Some(pnl.id),
    limit:        None,
  };
  assert_eq!(s.list_history(&query).await.unwrap().len(), 60);

  query.limit = Some(usize::MAX);
  assert_eq!(s.list_history(&query).await.unwrap().len(), 60);
}

// ─── Detail metrics ──────────────────────────────────────────────────────────

#[tokio::test]
async fn detail_update_bumps_version_and_sets_description() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  let sub = s.create_sub_pnl(pnl.id, unit("Checkout")).await.unwrap();

  let initial = s.ensure_detail_metrics(sub.id).await.unwrap().into_inner();
  assert_eq!(initial.version, 1);
  assert!(initial.is_active);

  let update = DetailMetricsUpdate {
    values: DetailValuesUpdate {
      testcase_peer_review: Some(4),
      api_test_time_avg_hours: Some(2.5),
      ..Default::default()
    },
    description: Some("sprint 12".into()),
    expected_version: Some(1),
  };
  let detail = s.update_detail_metrics(sub.id, update, None).await.unwrap();
  assert_eq!(detail.version, 2);
  assert_eq!(detail.values.testcase_peer_review, 4);
  assert_eq!(detail.values.api_test_time_avg_hours, 2.5);
  assert_eq!(detail.description.as_deref(), Some("sprint 12"));
}

#[tokio::test]
async fn stale_expected_version_conflicts() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  let sub = s.create_sub_pnl(pnl.id, unit("Checkout")).await.unwrap();

  let first = DetailMetricsUpdate { expected_version: Some(1), ..Default::default() };
  s.update_detail_metrics(sub.id, first.clone(), None).await.unwrap();

  let err = s.update_detail_metrics(sub.id, first, None).await.unwrap_err();
  assert!(matches!(
    domain(&err),
    CoreError::VersionConflict { expected: 1, actual: 2 }
  ));

  let detail = s.ensure_detail_metrics(sub.id).await.unwrap().into_inner();
  assert_eq!(detail.version, 2);
}

// ─── Delete and replay ───────────────────────────────────────────────────────

#[tokio::test]
async fn deleting_only_entry_resets_metrics() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  let sub = s.create_sub_pnl(pnl.id, unit("Checkout")).await.unwrap();
  s.update_sub_pnl_metrics(sub.id, counters(5, 50, 5), None).await.unwrap();

  let entry = s.list_history(&HistoryQuery::default()).await.unwrap()[0].clone();
  let deletion = s.delete_history(entry.id).await.unwrap();
  assert_eq!(deletion.restoration, Restoration::Reset);

  let metrics = s.ensure_sub_pnl_metrics(sub.id).await.unwrap().into_inner();
  assert_eq!(metrics.values, Default::default());

  // The parent follows its child back to zero.
  let parent = s.ensure_pnl_metrics(pnl.id).await.unwrap().into_inner();
  assert_eq!(parent.values.features_shipped, 0);
}

#[tokio::test]
async fn deleting_older_entry_leaves_metrics() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  let sub = s.create_sub_pnl(pnl.id, unit("Checkout")).await.unwrap();
  s.update_sub_pnl_metrics(sub.id, counters(5, 0, 0), None).await.unwrap();
  s.update_sub_pnl_metrics(sub.id, counters(8, 0, 0), None).await.unwrap();

  let history = s.list_history(&HistoryQuery::default()).await.unwrap();
  let older = history[1].id;
  let deletion = s.delete_history(older).await.unwrap();
  assert_eq!(deletion.restoration, Restoration::Unchanged);

  let metrics = s.ensure_sub_pnl_metrics(sub.id).await.unwrap().into_inner();
  assert_eq!(metrics.values.features_shipped, 8);
}

#[tokio::test]
async fn deleting_latest_entry_restores_previous_snapshot() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  let sub = s.create_sub_pnl(pnl.id, unit("Checkout")).await.unwrap();
  let first = SummaryMetricsUpdate {
    sanity_time_avg_hours: Some(2.5),
    test_coverage_percent: Some(64.0),
    ..counters(5, 40, 4)
  };
  s.update_sub_pnl_metrics(sub.id, first, None).await.unwrap();
  let second = SummaryMetricsUpdate {
    escaped_bugs: Some(2),
    automation_coverage_percent: Some(30.0),
    ..counters(8, 90, 3)
  };
  s.update_sub_pnl_metrics(sub.id, second, None).await.unwrap();

  let history = s.list_history(&HistoryQuery::default()).await.unwrap();
  let (latest, older) = (history[0].id, &history[1]);

  let deletion = s.delete_history(latest).await.unwrap();
  assert_eq!(deletion.restoration, Restoration::Restored { from: older.id });
  assert_eq!(deletion.deleted.id, latest);

  let expected: SummaryMetrics = snapshot_values(older);
  assert_eq!(expected.features_shipped, 5);
  let metrics = s.ensure_sub_pnl_metrics(sub.id).await.unwrap().into_inner();
  assert_eq!(metrics.values, expected);

  // A single child rolls up unchanged.
  let parent = s.ensure_pnl_metrics(pnl.id).await.unwrap().into_inner();
  assert_eq!(parent.values, expected);
}

#[tokio::test]
async fn deleting_latest_pnl_entry_restores_previous_snapshot() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  let first = SummaryMetricsUpdate {
    regression_bugs_found: Some(3),
    sanity_time_avg_hours: Some(1.75),
    ..counters(2, 50, 5)
  };
  s.update_pnl_metrics(pnl.id, first, None).await.unwrap();
  s.update_pnl_metrics(pnl.id, counters(9, 10, 1), None).await.unwrap();

  let history = s.list_history(&HistoryQuery::default()).await.unwrap();
  let (latest, older) = (history[0].id, &history[1]);
  assert_eq!(older.entity_type, EntityType::Pnl);

  let deletion = s.delete_history(latest).await.unwrap();
  assert_eq!(deletion.restoration, Restoration::Restored { from: older.id });

  let expected: SummaryMetrics = snapshot_values(older);
  assert_eq!(expected.regression_bugs_found, 3);
  let metrics = s.ensure_pnl_metrics(pnl.id).await.unwrap().into_inner();
  assert_eq!(metrics.values, expected);
}

#[tokio::test]
async fn deleting_latest_detail_entry_restores_previous_snapshot() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  let sub = s.create_sub_pnl(pnl.id, unit("Checkout")).await.unwrap();
  let first = DetailMetricsUpdate {
    values: DetailValuesUpdate {
      testcase_peer_review: Some(6),
      api_test_time_avg_hours: Some(3.25),
      total_testcases_executed: Some(120),
      total_bugs_logged: Some(8),
      ..Default::default()
    },
    description: Some("sprint 7".into()),
    ..Default::default()
  };
  s.update_detail_metrics(sub.id, first, None).await.unwrap();
  let second = DetailMetricsUpdate {
    values: DetailValuesUpdate {
      testcase_peer_review: Some(11),
      test_coverage_percent: Some(91.0),
      ..Default::default()
    },
    description: Some("sprint 8".into()),
    ..Default::default()
  };
  s.update_detail_metrics(sub.id, second, None).await.unwrap();

  let history = s.list_history(&HistoryQuery::default()).await.unwrap();
  let (latest, older) = (history[0].id, &history[1]);
  assert_eq!(older.entity_type, EntityType::SubPnlDetail);

  let deletion = s.delete_history(latest).await.unwrap();
  assert_eq!(deletion.restoration, Restoration::Restored { from: older.id });

  let expected: DetailMetrics = snapshot_values(older);
  assert_eq!(expected.testcase_peer_review, 6);
  let detail = s.ensure_detail_metrics(sub.id).await.unwrap().into_inner();
  assert_eq!(detail.values, expected);
  assert_eq!(detail.version, 3);
  assert_eq!(detail.description.as_deref(), Some("sprint 8"));
}

#[tokio::test]
async fn deleting_detail_entry_keeps_version() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  let sub = s.create_sub_pnl(pnl.id, unit("Checkout")).await.unwrap();
  let update = DetailMetricsUpdate {
    values: DetailValuesUpdate { testcase_peer_review: Some(3), ..Default::default() },
    ..Default::default()
  };
  s.update_detail_metrics(sub.id, update, None).await.unwrap();

  let entry = s.list_history(&HistoryQuery::default()).await.unwrap()[0].clone();
  assert_eq!(entry.entity_type, EntityType::SubPnlDetail);
  s.delete_history(entry.id).await.unwrap();

  let detail = s.ensure_detail_metrics(sub.id).await.unwrap().into_inner();
  assert_eq!(detail.values.testcase_peer_review, 0);
  assert_eq!(detail.version, 2);
}

#[tokio::test]
async fn deleting_entry_of_removed_entity_restores_nothing() {
  let s = store().await;
  let pnl = s.create_pnl(unit("Payments")).await.unwrap();
  s.update_pnl_metrics(pnl.id, counters(1, 0, 0), None).await.unwrap();
  s.delete_pnl(pnl.id).await.unwrap();

  let entry = s.list_history(&HistoryQuery::default()).await.unwrap()[0].clone();
  let deletion = s.delete_history(entry.id).await.unwrap();
  assert_eq!(deletion.restoration, Restoration::EntityGone);
  assert!(s.get_history(entry.id).await.unwrap().is_none());
}

#[tokio::test]
async fn deleting_unknown_entry_is_not_found() {
  let s = store().await;
  let err = s.delete_history(123).await.unwrap_err();
  assert!(matches!(domain(&err), CoreError::HistoryNotFound(123)));
}
