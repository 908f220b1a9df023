//! Catalog database operations: panels, test types and aliases.

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use tracing::debug;

use super::{constraint_context, Database, DbError, DbResult};
use crate::models::{Panel, TestType};
use crate::parsing::{alias_key, best_fuzzy_alias, default_alias_pairs};
use crate::rules::{reference_panels, reference_tests};

/// Counts of catalog rows after seeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub panels: usize,
    pub test_types: usize,
    pub aliases: usize,
}

/// How a raw test name was matched to a test type.
#[derive(Debug, Clone, PartialEq)]
pub enum NameMatch {
    /// Exact alias or key
    Exact(TestType),
    /// Fuzzy alias match with its Jaro-Winkler score
    Fuzzy(TestType, f64),
}

impl NameMatch {
    pub fn test_type(&self) -> &TestType {
        match self {
            NameMatch::Exact(t) | NameMatch::Fuzzy(t, _) => t,
        }
    }

    pub fn into_test_type(self) -> TestType {
        match self {
            NameMatch::Exact(t) | NameMatch::Fuzzy(t, _) => t,
        }
    }
}

const TEST_TYPE_COLUMNS: &str =
    "key, panel_key, display_name, unit, ref_low, ref_high, position";

fn test_type_from_row(row: &Row<'_>) -> rusqlite::Result<TestType> {
    Ok(TestType {
        key: row.get(0)?,
        panel_key: row.get(1)?,
        display_name: row.get(2)?,
        unit: row.get(3)?,
        ref_low: row.get(4)?,
        ref_high: row.get(5)?,
        position: row.get(6)?,
    })
}

impl Database {
    /// Load the built-in panels, test types and aliases.
    ///
    /// Safe to run repeatedly; existing rows are updated in place.
    pub fn seed_reference_data(&self) -> DbResult<SeedSummary> {
        let tx = self.begin()?;
        for panel in reference_panels() {
            self.upsert_panel(&panel)?;
        }
        for test in reference_tests() {
            self.upsert_test_type(&test)?;
        }
        for (alias, test_key) in default_alias_pairs() {
            self.add_test_alias(alias, test_key)?;
        }
        tx.commit()?;

        let summary = SeedSummary {
            panels: self.count_rows("panels")?,
            test_types: self.count_rows("test_types")?,
            aliases: self.count_rows("test_aliases")?,
        };
        debug!(?summary, "reference data seeded");
        Ok(summary)
    }

    fn count_rows(&self, table: &str) -> DbResult<usize> {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Insert or update a panel.
    pub fn upsert_panel(&self, panel: &Panel) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO panels (key, display_name, position)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                display_name = excluded.display_name,
                position = excluded.position
            "#,
            params![panel.key, panel.display_name, panel.position],
        )?;
        Ok(())
    }

    /// Insert or update a test type. The panel must already exist.
    pub fn upsert_test_type(&self, test: &TestType) -> DbResult<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO test_types (key, panel_key, display_name, unit, ref_low, ref_high, position)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(key) DO UPDATE SET
                    panel_key = excluded.panel_key,
                    display_name = excluded.display_name,
                    unit = excluded.unit,
                    ref_low = excluded.ref_low,
                    ref_high = excluded.ref_high,
                    position = excluded.position
                "#,
                params![
                    test.key,
                    test.panel_key,
                    test.display_name,
                    test.unit,
                    test.ref_low,
                    test.ref_high,
                    test.position,
                ],
            )
            .map_err(|e| constraint_context(e, &format!("test type {}", test.key)))?;
        Ok(())
    }

    /// Register an alias for a test. Existing aliases are left untouched.
    pub fn add_test_alias(&self, alias: &str, test_key: &str) -> DbResult<bool> {
        let rows = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO test_aliases (alias, test_key) VALUES (?1, ?2)",
                params![alias_key(alias), test_key],
            )
            .map_err(|e| constraint_context(e, &format!("alias {alias}")))?;
        Ok(rows > 0)
    }

    /// All panels in listing order.
    pub fn list_panels(&self) -> DbResult<Vec<Panel>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, display_name, position FROM panels ORDER BY position, key")?;
        let rows = stmt.query_map([], |row| {
            Ok(Panel {
                key: row.get(0)?,
                display_name: row.get(1)?,
                position: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Get a panel by key (case-insensitive).
    pub fn get_panel(&self, key: &str) -> DbResult<Option<Panel>> {
        self.conn
            .query_row(
                "SELECT key, display_name, position FROM panels WHERE key = ?",
                [key.trim().to_uppercase()],
                |row| {
                    Ok(Panel {
                        key: row.get(0)?,
                        display_name: row.get(1)?,
                        position: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Tests of a panel in listing order. Fails if the panel does not exist.
    pub fn panel_tests(&self, panel_key: &str) -> DbResult<Vec<TestType>> {
        let panel = self
            .get_panel(panel_key)?
            .ok_or_else(|| DbError::NotFound(format!("panel '{panel_key}'")))?;

        let sql = format!(
            "SELECT {TEST_TYPE_COLUMNS} FROM test_types WHERE panel_key = ? ORDER BY position, key"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([panel.key], test_type_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Get a test type by key (case-insensitive).
    pub fn get_test_type(&self, key: &str) -> DbResult<Option<TestType>> {
        let sql = format!("SELECT {TEST_TYPE_COLUMNS} FROM test_types WHERE key = ?");
        self.conn
            .query_row(&sql, [key.trim().to_uppercase()], test_type_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// All test types, grouped by panel order.
    pub fn list_test_types(&self) -> DbResult<Vec<TestType>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT t.key, t.panel_key, t.display_name, t.unit, t.ref_low, t.ref_high, t.position
            FROM test_types t
            JOIN panels p ON p.key = t.panel_key
            ORDER BY p.position, t.position, t.key
            "#,
        )?;
        let rows = stmt.query_map([], test_type_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// All (alias, test key) pairs.
    pub fn list_test_aliases(&self) -> DbResult<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT alias, test_key FROM test_aliases ORDER BY alias")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Map a raw test name to a test type.
    ///
    /// Tries the alias table, then the test key itself, then (when a
    /// threshold is given) a fuzzy alias match.
    pub fn map_test_name(
        &self,
        raw_name: &str,
        fuzzy_threshold: Option<f64>,
    ) -> DbResult<Option<NameMatch>> {
        let key = alias_key(raw_name);
        if key.is_empty() {
            return Ok(None);
        }

        let aliased: Option<String> = self
            .conn
            .query_row(
                "SELECT test_key FROM test_aliases WHERE alias = ?",
                [&key],
                |row| row.get(0),
            )
            .optional()?;

        let exact = match aliased {
            Some(test_key) => self.get_test_type(&test_key)?,
            None => self.get_test_type(&key)?,
        };
        if let Some(test) = exact {
            return Ok(Some(NameMatch::Exact(test)));
        }

        let Some(threshold) = fuzzy_threshold else {
            return Ok(None);
        };
        let aliases = self.list_test_aliases()?;
        let candidates = aliases.iter().map(|(a, k)| (a.as_str(), k.as_str()));
        match best_fuzzy_alias(&key, candidates, threshold) {
            Some((test_key, score)) => {
                debug!(raw_name, %test_key, score, "fuzzy test name match");
                Ok(self
                    .get_test_type(&test_key)?
                    .map(|t| NameMatch::Fuzzy(t, score)))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.seed_reference_data().unwrap();
        db
    }

    #[test]
    fn test_seed_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let first = db.seed_reference_data().unwrap();
        let second = db.seed_reference_data().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.panels, 3);
        assert_eq!(first.test_types, 18);
        assert_eq!(first.aliases, default_alias_pairs().count());
    }

    #[test]
    fn test_list_panels_in_order() {
        let db = setup_db();
        let keys: Vec<_> = db.list_panels().unwrap().into_iter().map(|p| p.key).collect();
        assert_eq!(keys, vec!["CBC", "METABOLIC", "LIPID"]);
    }

    #[test]
    fn test_panel_tests_case_insensitive() {
        let db = setup_db();
        let tests = db.panel_tests("lipid").unwrap();
        let keys: Vec<_> = tests.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["TC", "LDL", "HDL", "TRIG"]);
    }

    #[test]
    fn test_panel_tests_unknown_panel() {
        let db = setup_db();
        assert!(matches!(db.panel_tests("THYROID"), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_panel_without_tests_is_empty() {
        let db = setup_db();
        db.upsert_panel(&Panel {
            key: "THYROID".into(),
            display_name: "Thyroid Panel".into(),
            position: 3,
        })
        .unwrap();
        assert!(db.panel_tests("THYROID").unwrap().is_empty());
    }

    #[test]
    fn test_test_type_requires_panel() {
        let db = setup_db();
        let orphan = TestType::new("TSH".into(), "THYROID".into(), "TSH".into(), "mIU/L".into());
        assert!(matches!(db.upsert_test_type(&orphan), Err(DbError::Constraint(_))));
    }

    #[test]
    fn test_map_by_alias_and_key() {
        let db = setup_db();
        let m = db.map_test_name("  White Blood Cells ", None).unwrap().unwrap();
        assert_eq!(m.test_type().key, "WBC");
        assert!(matches!(m, NameMatch::Exact(_)));

        let m = db.map_test_name("creatinine", None).unwrap().unwrap();
        assert_eq!(m.test_type().key, "CREATININE");

        let m = db.map_test_name("Trig", None).unwrap().unwrap();
        assert_eq!(m.test_type().key, "TRIG");
    }

    #[test]
    fn test_map_unknown_name() {
        let db = setup_db();
        assert!(db.map_test_name("Ferritin", Some(0.95)).unwrap().is_none());
        assert!(db.map_test_name("   ", Some(0.95)).unwrap().is_none());
    }

    #[test]
    fn test_map_fuzzy_only_when_enabled() {
        let db = setup_db();
        assert!(db.map_test_name("Hemoglobn", None).unwrap().is_none());
        let m = db.map_test_name("Hemoglobn", Some(0.95)).unwrap().unwrap();
        assert_eq!(m.test_type().key, "HGB");
        assert!(matches!(m, NameMatch::Fuzzy(_, score) if score >= 0.95));
    }

    #[test]
    fn test_custom_alias() {
        let db = setup_db();
        assert!(db.add_test_alias("Glucose, Fasting", "GLUCOSE").unwrap());
        assert!(!db.add_test_alias("glucose, fasting", "GLUCOSE").unwrap());
        let m = db.map_test_name("GLUCOSE, FASTING", None).unwrap().unwrap();
        assert_eq!(m.into_test_type().key, "GLUCOSE");
    }
}
