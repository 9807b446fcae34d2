//! SQL schema for the QAlytics SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,            -- argon2 PHC string
    role          TEXT NOT NULL DEFAULT 'user',
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pnls (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    description TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sub_pnls (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    pnl_id      INTEGER NOT NULL REFERENCES pnls(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    description TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- Derived by aggregation over sub_pnl_metrics.
CREATE TABLE IF NOT EXISTS pnl_metrics (
    id                          INTEGER PRIMARY KEY AUTOINCREMENT,
    pnl_id                      INTEGER NOT NULL UNIQUE
                                REFERENCES pnls(id) ON DELETE CASCADE,
    features_shipped            INTEGER NOT NULL DEFAULT 0,
    total_testcases_executed    INTEGER NOT NULL DEFAULT 0,
    total_bugs_logged           INTEGER NOT NULL DEFAULT 0,
    regression_bugs_found       INTEGER NOT NULL DEFAULT 0,
    escaped_bugs                INTEGER NOT NULL DEFAULT 0,
    sanity_time_avg_hours       REAL    NOT NULL DEFAULT 0,
    automation_coverage_percent REAL    NOT NULL DEFAULT 0,
    test_coverage_percent       REAL    NOT NULL DEFAULT 0,
    testcases_per_bug           REAL    NOT NULL DEFAULT 0,
    bugs_per_100_tests          REAL    NOT NULL DEFAULT 0,
    created_at                  TEXT    NOT NULL,
    updated_at                  TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS sub_pnl_metrics (
    id                          INTEGER PRIMARY KEY AUTOINCREMENT,
    sub_pnl_id                  INTEGER NOT NULL UNIQUE
                                REFERENCES sub_pnls(id) ON DELETE CASCADE,
    features_shipped            INTEGER NOT NULL DEFAULT 0,
    total_testcases_executed    INTEGER NOT NULL DEFAULT 0,
    total_bugs_logged           INTEGER NOT NULL DEFAULT 0,
    regression_bugs_found       INTEGER NOT NULL DEFAULT 0,
    escaped_bugs                INTEGER NOT NULL DEFAULT 0,
    sanity_time_avg_hours       REAL    NOT NULL DEFAULT 0,
    automation_coverage_percent REAL    NOT NULL DEFAULT 0,
    test_coverage_percent       REAL    NOT NULL DEFAULT 0,
    testcases_per_bug           REAL    NOT NULL DEFAULT 0,
    bugs_per_100_tests          REAL    NOT NULL DEFAULT 0,
    created_at                  TEXT    NOT NULL,
    updated_at                  TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS sub_pnl_detail_metrics (
    id                          INTEGER PRIMARY KEY AUTOINCREMENT,
    sub_pnl_id                  INTEGER NOT NULL UNIQUE
                                REFERENCES sub_pnls(id) ON DELETE CASCADE,
    features_shipped            INTEGER NOT NULL DEFAULT 0,
    total_testcases_executed    INTEGER NOT NULL DEFAULT 0,
    total_bugs_logged           INTEGER NOT NULL DEFAULT 0,
    testcase_peer_review        INTEGER NOT NULL DEFAULT 0,
    regression_bugs_found       INTEGER NOT NULL DEFAULT 0,
    escaped_bugs                INTEGER NOT NULL DEFAULT 0,
    sanity_time_avg_hours       REAL    NOT NULL DEFAULT 0,
    api_test_time_avg_hours     REAL    NOT NULL DEFAULT 0,
    automation_coverage_percent REAL    NOT NULL DEFAULT 0,
    test_coverage_percent       REAL    NOT NULL DEFAULT 0,
    testcases_per_bug           REAL    NOT NULL DEFAULT 0,
    bugs_per_100_tests          REAL    NOT NULL DEFAULT 0,
    version                     INTEGER NOT NULL DEFAULT 1,
    is_active                   INTEGER NOT NULL DEFAULT 1,
    description                 TEXT,
    created_at                  TEXT    NOT NULL,
    updated_at                  TEXT    NOT NULL
);

-- Append-only apart from DELETE, which triggers replay in the store.
-- entity_id is not a foreign key; entries survive their entity.
CREATE TABLE IF NOT EXISTS metrics_history (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_type        TEXT    NOT NULL,   -- 'pnl' | 'sub_pnl' | 'sub_pnl_detail'
    entity_id          INTEGER NOT NULL,
    metrics_data       TEXT    NOT NULL,   -- JSON map of every metric field
    change_type        TEXT    NOT NULL,   -- 'create' | 'update'
    changed_by         INTEGER REFERENCES users(id) ON DELETE SET NULL,
    change_description TEXT,
    previous_values    TEXT,               -- JSON map of changed fields only
    created_at         TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS sub_pnls_pnl_idx        ON sub_pnls(pnl_id);
CREATE INDEX IF NOT EXISTS history_entity_idx      ON metrics_history(entity_type, entity_id);
CREATE INDEX IF NOT EXISTS history_created_idx     ON metrics_history(created_at);
CREATE INDEX IF NOT EXISTS history_changed_by_idx  ON metrics_history(changed_by);

PRAGMA user_version = 1;
";
