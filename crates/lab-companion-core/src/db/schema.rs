//! SQLite schema definition.

/// Complete database schema for the lab companion.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Catalog: panels, test types, aliases
-- ============================================================================

CREATE TABLE IF NOT EXISTS panels (
    key TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    position INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS test_types (
    key TEXT PRIMARY KEY,
    panel_key TEXT NOT NULL REFERENCES panels(key) ON DELETE CASCADE,
    display_name TEXT NOT NULL,
    unit TEXT NOT NULL,
    ref_low REAL,
    ref_high REAL,
    position INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_test_types_panel ON test_types(panel_key, position);

CREATE TABLE IF NOT EXISTS test_aliases (
    alias TEXT PRIMARY KEY,                       -- lower-case, trimmed
    test_key TEXT NOT NULL REFERENCES test_types(key) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_test_aliases_test ON test_aliases(test_key);

-- ============================================================================
-- Users
-- ============================================================================

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

-- ============================================================================
-- Reports
-- ============================================================================

CREATE TABLE IF NOT EXISTS reports (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    original_filename TEXT NOT NULL,
    content_type TEXT NOT NULL DEFAULT '',
    file_sha256 TEXT,
    uploaded_at TEXT NOT NULL,
    raw_text TEXT,
    parsed_success INTEGER NOT NULL DEFAULT 0,
    notes TEXT,
    patient_gender TEXT CHECK (patient_gender IN ('M', 'F')),
    patient_age INTEGER CHECK (patient_age >= 0)
);

CREATE INDEX IF NOT EXISTS idx_reports_user ON reports(user_id, uploaded_at);
CREATE INDEX IF NOT EXISTS idx_reports_sha ON reports(user_id, file_sha256);

-- ============================================================================
-- Test results
-- ============================================================================

CREATE TABLE IF NOT EXISTS test_results (
    id TEXT PRIMARY KEY,
    report_id TEXT NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
    test_key TEXT NOT NULL REFERENCES test_types(key),
    value REAL NOT NULL,
    unit TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL,
    confidence REAL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_results_report ON test_results(report_id);
CREATE INDEX IF NOT EXISTS idx_results_test_time ON test_results(test_key, created_at);
"#;
