//! Test result database operations.
//!
//! Results are ordered by `created_at`, ties broken by insertion order.

use rusqlite::{params, OptionalExtension};

use super::{constraint_context, Database, DbError, DbResult};
use crate::models::{TestResult, TestStatus};

const RESULT_COLUMNS: &str =
    "r.id, r.report_id, r.test_key, r.value, r.unit, r.status, r.confidence, r.created_at";

impl Database {
    /// Insert a result. Report and test type must exist.
    pub fn insert_test_result(&self, result: &TestResult) -> DbResult<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO test_results (
                    id, report_id, test_key, value, unit, status, confidence, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    result.id,
                    result.report_id,
                    result.test_key,
                    result.value,
                    result.unit,
                    result.status.as_str(),
                    result.confidence,
                    result.created_at,
                ],
            )
            .map_err(|e| constraint_context(e, &format!("result for {}", result.test_key)))?;
        Ok(())
    }

    /// Results stored for one report, in insertion order.
    pub fn results_for_report(&self, report_id: &str) -> DbResult<Vec<TestResult>> {
        let sql = format!(
            "SELECT {RESULT_COLUMNS} FROM test_results r WHERE r.report_id = ? ORDER BY r.rowid"
        );
        self.query_results(&sql, params![report_id])
    }

    /// All of a user's results for one test, oldest first.
    pub fn results_for_user_test(&self, user_id: &str, test_key: &str) -> DbResult<Vec<TestResult>> {
        let sql = format!(
            r#"
            SELECT {RESULT_COLUMNS}
            FROM test_results r
            JOIN reports p ON p.id = r.report_id
            WHERE p.user_id = ?1 AND r.test_key = ?2
            ORDER BY r.created_at ASC, r.rowid ASC
            "#
        );
        self.query_results(&sql, params![user_id, test_key])
    }

    /// A user's most recent result for one test.
    pub fn latest_result(&self, user_id: &str, test_key: &str) -> DbResult<Option<TestResult>> {
        let sql = format!(
            r#"
            SELECT {RESULT_COLUMNS}
            FROM test_results r
            JOIN reports p ON p.id = r.report_id
            WHERE p.user_id = ?1 AND r.test_key = ?2
            ORDER BY r.created_at DESC, r.rowid DESC
            LIMIT 1
            "#
        );
        Ok(self.query_results(&sql, params![user_id, test_key])?.pop())
    }

    /// The most recent result strictly earlier than `before`.
    pub fn previous_result(
        &self,
        user_id: &str,
        test_key: &str,
        before: &str,
    ) -> DbResult<Option<TestResult>> {
        let sql = format!(
            r#"
            SELECT {RESULT_COLUMNS}
            FROM test_results r
            JOIN reports p ON p.id = r.report_id
            WHERE p.user_id = ?1 AND r.test_key = ?2 AND r.created_at < ?3
            ORDER BY r.created_at DESC, r.rowid DESC
            LIMIT 1
            "#
        );
        Ok(self.query_results(&sql, params![user_id, test_key, before])?.pop())
    }

    /// Number of results stored for a report.
    pub fn count_results_for_report(&self, report_id: &str) -> DbResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM test_results WHERE report_id = ?",
            [report_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// ID of the report a result belongs to, if the result exists.
    pub fn result_report_id(&self, result_id: &str) -> DbResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT report_id FROM test_results WHERE id = ?",
                [result_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    fn query_results(&self, sql: &str, params: impl rusqlite::Params) -> DbResult<Vec<TestResult>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok(ResultRow {
                id: row.get(0)?,
                report_id: row.get(1)?,
                test_key: row.get(2)?,
                value: row.get(3)?,
                unit: row.get(4)?,
                status: row.get(5)?,
                confidence: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?.try_into()?);
        }
        Ok(results)
    }
}

/// Intermediate row struct for database mapping.
struct ResultRow {
    id: String,
    report_id: String,
    test_key: String,
    value: f64,
    unit: String,
    status: String,
    confidence: Option<f64>,
    created_at: String,
}

impl TryFrom<ResultRow> for TestResult {
    type Error = DbError;

    fn try_from(row: ResultRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<TestStatus>()
            .map_err(|e| DbError::InvalidData(e.to_string()))?;

        Ok(TestResult {
            id: row.id,
            report_id: row.report_id,
            test_key: row.test_key,
            value: row.value,
            unit: row.unit,
            status,
            confidence: row.confidence,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Report, User};

    fn setup_db() -> (Database, User, Report) {
        let db = Database::open_in_memory().unwrap();
        db.seed_reference_data().unwrap();
        let user = User::new("pat@example.com".into());
        db.insert_user(&user).unwrap();
        let report = Report::new(user.id.clone(), "cbc.png".into(), "image/png".into());
        db.insert_report(&report).unwrap();
        (db, user, report)
    }

    fn result_at(report: &Report, key: &str, value: f64, ts: &str) -> TestResult {
        let mut r = TestResult::new(report.id.clone(), key.into(), value, "mg/dL".into(), TestStatus::Normal);
        r.created_at = ts.into();
        r
    }

    #[test]
    fn test_insert_and_list_for_report() {
        let (db, _, report) = setup_db();
        let mut result = TestResult::new(report.id.clone(), "GLUCOSE".into(), 95.0, "mg/dL".into(), TestStatus::Normal);
        result.confidence = Some(0.9);
        db.insert_test_result(&result).unwrap();

        let stored = db.results_for_report(&report.id).unwrap();
        assert_eq!(stored, vec![result]);
        assert_eq!(db.count_results_for_report(&report.id).unwrap(), 1);
    }

    #[test]
    fn test_dangling_references_rejected() {
        let (db, _, report) = setup_db();
        let unknown_test = TestResult::new(report.id.clone(), "TSH".into(), 2.0, "mIU/L".into(), TestStatus::Unknown);
        assert!(matches!(db.insert_test_result(&unknown_test), Err(DbError::Constraint(_))));

        let unknown_report = TestResult::new("ghost".into(), "HDL".into(), 50.0, "mg/dL".into(), TestStatus::Normal);
        assert!(matches!(db.insert_test_result(&unknown_report), Err(DbError::Constraint(_))));
    }

    #[test]
    fn test_history_is_chronological() {
        let (db, user, report) = setup_db();
        db.insert_test_result(&result_at(&report, "GLUCOSE", 110.0, "2024-03-01T00:00:00.000000Z")).unwrap();
        db.insert_test_result(&result_at(&report, "GLUCOSE", 90.0, "2024-01-01T00:00:00.000000Z")).unwrap();
        db.insert_test_result(&result_at(&report, "HDL", 55.0, "2024-02-01T00:00:00.000000Z")).unwrap();

        let values: Vec<_> = db
            .results_for_user_test(&user.id, "GLUCOSE")
            .unwrap()
            .iter()
            .map(|r| r.value)
            .collect();
        assert_eq!(values, vec![90.0, 110.0]);
    }

    #[test]
    fn test_latest_and_previous() {
        let (db, user, report) = setup_db();
        db.insert_test_result(&result_at(&report, "GLUCOSE", 90.0, "2024-01-01T00:00:00.000000Z")).unwrap();
        db.insert_test_result(&result_at(&report, "GLUCOSE", 100.0, "2024-02-01T00:00:00.000000Z")).unwrap();
        db.insert_test_result(&result_at(&report, "GLUCOSE", 120.0, "2024-03-01T00:00:00.000000Z")).unwrap();

        let latest = db.latest_result(&user.id, "GLUCOSE").unwrap().unwrap();
        assert_eq!(latest.value, 120.0);

        let previous = db.previous_result(&user.id, "GLUCOSE", &latest.created_at).unwrap().unwrap();
        assert_eq!(previous.value, 100.0);

        let none = db.previous_result(&user.id, "GLUCOSE", "2024-01-01T00:00:00.000000Z").unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_results_are_scoped_to_user() {
        let (db, _, report) = setup_db();
        db.insert_test_result(&result_at(&report, "HDL", 55.0, "2024-02-01T00:00:00.000000Z")).unwrap();

        let other = User::new("other@example.com".into());
        db.insert_user(&other).unwrap();
        assert!(db.latest_result(&other.id, "HDL").unwrap().is_none());
        assert!(db.results_for_user_test(&other.id, "HDL").unwrap().is_empty());
    }

    #[test]
    fn test_result_report_lookup() {
        let (db, _, report) = setup_db();
        let result = result_at(&report, "HDL", 55.0, "2024-02-01T00:00:00.000000Z");
        db.insert_test_result(&result).unwrap();
        assert_eq!(db.result_report_id(&result.id).unwrap(), Some(report.id.clone()));
        assert!(db.result_report_id("nope").unwrap().is_none());
    }
}
