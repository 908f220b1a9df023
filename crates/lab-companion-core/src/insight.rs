//! History charts, latest-result insight and ad-hoc classification.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::db::{Database, DbError};
use crate::models::{
    AgeCategory, Demographics, Guidance, HistoryMetadata, HistoryPoint, LatestInsight, TestHistory, TestStatus,
    TestType,
};
use crate::rules::{compute_status, effective_range, generate_guidance};

/// Insight errors.
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Test type '{0}' not found")]
    UnknownTest(String),

    #[error("No test results found for test '{0}'")]
    NoResults(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl InsightError {
    pub fn status_code(&self) -> u16 {
        match self {
            InsightError::UnknownTest(_)
            | InsightError::NoResults(_)
            | InsightError::Database(DbError::NotFound(_)) => 404,
            InsightError::InvalidInput(_) => 400,
            InsightError::Database(_) => 500,
        }
    }
}

pub type InsightResult<T> = Result<T, InsightError>;

/// Status and guidance for a single value, without storing anything.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub test_key: String,
    pub display_name: String,
    pub value: f64,
    pub unit: String,
    pub status: TestStatus,
    /// Pediatric patients are judged against adult ranges
    pub age_category: AgeCategory,
    /// Bounds the value was judged against
    pub ref_low: Option<f64>,
    pub ref_high: Option<f64>,
    pub guidance: Guidance,
}

/// Read-side queries over stored results.
pub struct InsightService<'a> {
    db: &'a Database,
}

impl<'a> InsightService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn test_type(&self, test_key: &str) -> InsightResult<TestType> {
        self.db
            .get_test_type(test_key)?
            .ok_or_else(|| InsightError::UnknownTest(test_key.trim().to_uppercase()))
    }

    /// Every result of one test for a user, oldest first.
    pub fn test_history(&self, user_id: &str, test_key: &str) -> InsightResult<TestHistory> {
        let test = self.test_type(test_key)?;
        let results = self.db.results_for_user_test(user_id, &test.key)?;

        Ok(TestHistory {
            metadata: HistoryMetadata {
                panel_key: test.panel_key.clone(),
                test_key: test.key.clone(),
                display_name: test.display_name.clone(),
                unit: test.unit.clone(),
                ref_low: test.ref_low,
                ref_high: test.ref_high,
            },
            data: results.iter().map(HistoryPoint::from).collect(),
        })
    }

    /// Latest result with its predecessor and guidance.
    pub fn latest_insight(&self, user_id: &str, test_key: &str) -> InsightResult<LatestInsight> {
        let test = self.test_type(test_key)?;
        let latest = self
            .db
            .latest_result(user_id, &test.key)?
            .ok_or_else(|| InsightError::NoResults(test.key.clone()))?;
        let previous = self
            .db
            .previous_result(user_id, &test.key, &latest.created_at)?;

        // Trend is measured against the range the latest value was judged by.
        let demographics = self
            .db
            .get_report(&latest.report_id)?
            .map(|r| r.demographics())
            .unwrap_or_default();
        let range = effective_range(&test, demographics);

        let guidance = generate_guidance(
            &test,
            latest.value,
            latest.status,
            previous.as_ref().map(|p| p.value),
            range,
        );
        debug!(test = %test.key, status = %latest.status, trend = ?guidance.trend, "insight generated");

        Ok(LatestInsight {
            latest: HistoryPoint::from(&latest),
            previous: previous.as_ref().map(HistoryPoint::from),
            guidance,
        })
    }

    /// Classify a value for a patient without storing it.
    pub fn classify(
        &self,
        test_key: &str,
        value: f64,
        demographics: Demographics,
    ) -> InsightResult<Classification> {
        if !value.is_finite() {
            return Err(InsightError::InvalidInput(format!("value must be a finite number, got {value}")));
        }
        let test = self.test_type(test_key)?;
        let range = effective_range(&test, demographics);
        let status = compute_status(&test, value, demographics);
        let guidance = generate_guidance(&test, value, status, None, range);

        Ok(Classification {
            test_key: test.key,
            display_name: test.display_name,
            value,
            unit: test.unit,
            status,
            age_category: demographics.age_category(),
            ref_low: range.map(|r| r.low),
            ref_high: range.map(|r| r.high),
            guidance,
        })
    }
}
