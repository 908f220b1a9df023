//! Lab Companion Core Library
//!
//! Local-first tracking of blood test results with personalised reference
//! ranges and educational guidance.
//!
//! # Architecture
//!
//! ```text
//! Upload (image/PDF) ──► Extractor (OCR / AI) ──► Lab-text parser
//!                                                       │
//!                                          Name mapping (alias → key → fuzzy)
//!                                                       │
//!                                   Personalised range + status classifier
//!                                                       │
//!                                              [SQLite: test_results]
//!                                                       │
//!                                  ┌────────────────────┴───────────────┐
//!                                  ▼                                    ▼
//!                            History charts                 Latest insight + guidance
//! ```
//!
//! Guidance is educational only. Every message carries a disclaimer and
//! nothing here produces a diagnosis.
//!
//! # Modules
//!
//! - [`db`]: SQLite storage for the catalog, users, reports and results
//! - [`models`]: Domain types (TestType, Report, TestResult, Guidance, etc.)
//! - [`rules`]: Reference ranges, personalisation, classification, guidance
//! - [`parsing`]: OCR text cleanup, lab-line parsing and name aliases
//! - [`ingest`]: Upload validation and the extraction pipeline
//! - [`insight`]: History and latest-result queries
//! - [`config`]: Defaults, TOML file and environment overrides

pub mod config;
pub mod db;
pub mod ingest;
pub mod insight;
pub mod models;
pub mod parsing;
pub mod rules;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use ingest::{ExtractionOutput, IngestRequest, Ingestor, ReportExtractor, UploadedFile};
pub use insight::{Classification, InsightService};
pub use models::{
    Demographics, Gender, Guidance, Panel, Report, ReportSummary, TestHistory, TestResult,
    TestStatus, TestType, Trend, User,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum LabCompanionError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File too large: {0}")]
    FileTooLarge(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<db::DbError> for LabCompanionError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::NotFound(msg) => LabCompanionError::NotFound(msg),
            other => LabCompanionError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ingest::IngestError> for LabCompanionError {
    fn from(e: ingest::IngestError) -> Self {
        match e.status_code() {
            400 => LabCompanionError::InvalidInput(e.to_string()),
            404 => LabCompanionError::NotFound(e.to_string()),
            413 => LabCompanionError::FileTooLarge(e.to_string()),
            _ => LabCompanionError::DatabaseError(e.to_string()),
        }
    }
}

impl From<insight::InsightError> for LabCompanionError {
    fn from(e: insight::InsightError) -> Self {
        match e.status_code() {
            400 => LabCompanionError::InvalidInput(e.to_string()),
            404 => LabCompanionError::NotFound(e.to_string()),
            _ => LabCompanionError::DatabaseError(e.to_string()),
        }
    }
}

impl From<config::ConfigError> for LabCompanionError {
    fn from(e: config::ConfigError) -> Self {
        LabCompanionError::ConfigError(e.to_string())
    }
}

impl From<models::ParseGenderError> for LabCompanionError {
    fn from(e: models::ParseGenderError) -> Self {
        LabCompanionError::InvalidInput(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for LabCompanionError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        LabCompanionError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path and seed the reference data.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<LabCompanionCore>, LabCompanionError> {
    let config = Config::default().with_database_path(&path);
    config.validate()?;
    let db = Database::open(&path)?;
    LabCompanionCore::build(db, config)
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<LabCompanionCore>, LabCompanionError> {
    let db = Database::open_in_memory()?;
    LabCompanionCore::build(db, Config::default())
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct LabCompanionCore {
    db: Arc<Mutex<Database>>,
    config: Config,
}

impl LabCompanionCore {
    fn build(db: Database, config: Config) -> Result<Arc<Self>, LabCompanionError> {
        db.seed_reference_data()?;
        Ok(Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
            config,
        }))
    }
}

fn parse_demographics(
    gender: Option<String>,
    age: Option<u32>,
) -> Result<Demographics, LabCompanionError> {
    let gender = match gender.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(code) => Some(code.parse::<Gender>()?),
    };
    Ok(Demographics::new(gender, age))
}

#[uniffi::export]
impl LabCompanionCore {
    // =========================================================================
    // Catalog Operations
    // =========================================================================

    /// All panels in display order.
    pub fn list_panels(&self) -> Result<Vec<FfiPanel>, LabCompanionError> {
        let db = self.db.lock()?;
        let panels = db.list_panels()?;
        Ok(panels.into_iter().map(|p| p.into()).collect())
    }

    /// Tests of one panel in display order.
    pub fn panel_tests(&self, panel_key: String) -> Result<Vec<FfiTestType>, LabCompanionError> {
        let db = self.db.lock()?;
        let tests = db.panel_tests(&panel_key)?;
        Ok(tests.into_iter().map(|t| t.into()).collect())
    }

    /// Get a test type by key.
    pub fn get_test_type(&self, key: String) -> Result<Option<FfiTestType>, LabCompanionError> {
        let db = self.db.lock()?;
        let test = db.get_test_type(&key)?;
        Ok(test.map(|t| t.into()))
    }

    // =========================================================================
    // User Operations
    // =========================================================================

    /// Create a new user.
    pub fn create_user(&self, email: String) -> Result<FfiUser, LabCompanionError> {
        if email.trim().is_empty() {
            return Err(LabCompanionError::InvalidInput("email cannot be empty".into()));
        }
        let db = self.db.lock()?;
        let user = User::new(email);
        db.insert_user(&user)?;
        Ok(user.into())
    }

    /// Get a user by e-mail.
    pub fn get_user_by_email(&self, email: String) -> Result<Option<FfiUser>, LabCompanionError> {
        let db = self.db.lock()?;
        let user = db.get_user_by_email(&email)?;
        Ok(user.map(|u| u.into()))
    }

    // =========================================================================
    // Report Operations
    // =========================================================================

    /// Ingest report text that was extracted on the device.
    pub fn ingest_text(
        &self,
        user_id: String,
        source_name: String,
        raw_text: String,
        gender: Option<String>,
        age: Option<u32>,
    ) -> Result<FfiReportSummary, LabCompanionError> {
        let demographics = parse_demographics(gender, age)?;
        let db = self.db.lock()?;
        let request = IngestRequest::new(user_id).with_demographics(demographics);
        let summary = Ingestor::new(&db, &self.config).ingest_text(&request, &source_name, &raw_text)?;
        Ok(summary.into())
    }

    /// A user's reports, newest first.
    pub fn user_reports(
        &self,
        user_id: String,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<FfiReportSummary>, LabCompanionError> {
        let db = self.db.lock()?;
        let reports = db.list_reports_for_user(&user_id, skip as usize, limit as usize)?;
        let mut summaries = Vec::with_capacity(reports.len());
        for report in reports {
            let count = db.count_results_for_report(&report.id)?;
            summaries.push(report.summary(count).into());
        }
        Ok(summaries)
    }

    // =========================================================================
    // Insight Operations
    // =========================================================================

    /// Chart data for one test.
    pub fn test_history(
        &self,
        user_id: String,
        test_key: String,
    ) -> Result<FfiTestHistory, LabCompanionError> {
        let db = self.db.lock()?;
        let history = InsightService::new(&db).test_history(&user_id, &test_key)?;
        Ok(history.into())
    }

    /// Latest result with trend and guidance.
    pub fn latest_insight(
        &self,
        user_id: String,
        test_key: String,
    ) -> Result<FfiLatestInsight, LabCompanionError> {
        let db = self.db.lock()?;
        let insight = InsightService::new(&db).latest_insight(&user_id, &test_key)?;
        Ok(insight.into())
    }

    /// Classify a value without storing it.
    pub fn classify(
        &self,
        test_key: String,
        value: f64,
        gender: Option<String>,
        age: Option<u32>,
    ) -> Result<FfiClassification, LabCompanionError> {
        let demographics = parse_demographics(gender, age)?;
        let db = self.db.lock()?;
        let classification = InsightService::new(&db).classify(&test_key, value, demographics)?;
        Ok(classification.into())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe panel.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPanel {
    pub key: String,
    pub display_name: String,
    pub position: u32,
}

impl From<Panel> for FfiPanel {
    fn from(panel: Panel) -> Self {
        Self {
            key: panel.key,
            display_name: panel.display_name,
            position: panel.position,
        }
    }
}

/// FFI-safe test type.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTestType {
    pub key: String,
    pub panel_key: String,
    pub display_name: String,
    pub unit: String,
    pub ref_low: Option<f64>,
    pub ref_high: Option<f64>,
    pub position: u32,
}

impl From<TestType> for FfiTestType {
    fn from(test: TestType) -> Self {
        Self {
            key: test.key,
            panel_key: test.panel_key,
            display_name: test.display_name,
            unit: test.unit,
            ref_low: test.ref_low,
            ref_high: test.ref_high,
            position: test.position,
        }
    }
}

/// FFI-safe user.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiUser {
    pub id: String,
    pub email: String,
    pub created_at: String,
}

impl From<User> for FfiUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// FFI-safe report summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReportSummary {
    pub id: String,
    pub original_filename: String,
    pub uploaded_at: String,
    pub parsed_success: bool,
    pub test_count: u64,
    pub notes: Option<String>,
}

impl From<ReportSummary> for FfiReportSummary {
    fn from(summary: ReportSummary) -> Self {
        Self {
            id: summary.id,
            original_filename: summary.original_filename,
            uploaded_at: summary.uploaded_at,
            parsed_success: summary.parsed_success,
            test_count: summary.test_count as u64,
            notes: summary.notes,
        }
    }
}

/// FFI-safe chart point. Status uses the stored labels (e.g. "CRITICAL_HIGH").
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiHistoryPoint {
    pub timestamp: String,
    pub value: f64,
    pub unit: String,
    pub status: String,
}

impl From<models::HistoryPoint> for FfiHistoryPoint {
    fn from(point: models::HistoryPoint) -> Self {
        Self {
            timestamp: point.timestamp,
            value: point.value,
            unit: point.unit,
            status: point.status.as_str().to_string(),
        }
    }
}

/// FFI-safe test history.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTestHistory {
    pub panel_key: String,
    pub test_key: String,
    pub display_name: String,
    pub unit: String,
    pub ref_low: Option<f64>,
    pub ref_high: Option<f64>,
    pub data: Vec<FfiHistoryPoint>,
}

impl From<TestHistory> for FfiTestHistory {
    fn from(history: TestHistory) -> Self {
        let meta = history.metadata;
        Self {
            panel_key: meta.panel_key,
            test_key: meta.test_key,
            display_name: meta.display_name,
            unit: meta.unit,
            ref_low: meta.ref_low,
            ref_high: meta.ref_high,
            data: history.data.into_iter().map(|p| p.into()).collect(),
        }
    }
}

/// FFI-safe guidance.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiGuidance {
    pub message: String,
    /// "improving", "worsening", "stable" or absent
    pub trend: Option<String>,
    pub suggestions: Vec<String>,
    pub disclaimer: String,
}

impl From<Guidance> for FfiGuidance {
    fn from(guidance: Guidance) -> Self {
        Self {
            message: guidance.message,
            trend: guidance.trend.map(|t| t.as_str().to_string()),
            suggestions: guidance.suggestions,
            disclaimer: guidance.disclaimer,
        }
    }
}

/// FFI-safe latest insight.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLatestInsight {
    pub latest: FfiHistoryPoint,
    pub previous: Option<FfiHistoryPoint>,
    pub guidance: FfiGuidance,
}

impl From<models::LatestInsight> for FfiLatestInsight {
    fn from(insight: models::LatestInsight) -> Self {
        Self {
            latest: insight.latest.into(),
            previous: insight.previous.map(|p| p.into()),
            guidance: insight.guidance.into(),
        }
    }
}

/// FFI-safe classification.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiClassification {
    pub test_key: String,
    pub display_name: String,
    pub value: f64,
    pub unit: String,
    pub status: String,
    pub age_category: String,
    pub ref_low: Option<f64>,
    pub ref_high: Option<f64>,
    pub guidance: FfiGuidance,
}

impl From<Classification> for FfiClassification {
    fn from(c: Classification) -> Self {
        Self {
            test_key: c.test_key,
            display_name: c.display_name,
            value: c.value,
            unit: c.unit,
            status: c.status.as_str().to_string(),
            age_category: c.age_category.as_str().to_string(),
            ref_low: c.ref_low,
            ref_high: c.ref_high,
            guidance: c.guidance.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facade_round_trip() {
        let core = open_database_in_memory().unwrap();
        assert_eq!(core.list_panels().unwrap().len(), 3);
        assert_eq!(core.panel_tests("lipid".into()).unwrap().len(), 4);

        let user = core.create_user("pat@example.com".into()).unwrap();
        let summary = core
            .ingest_text(
                user.id.clone(),
                "cbc.txt".into(),
                "Hemoglobin 11.0 g/dL\nWBC 7.5 K/uL".into(),
                Some("F".into()),
                Some(34),
            )
            .unwrap();
        assert!(summary.parsed_success);
        assert_eq!(summary.test_count, 2);

        let history = core.test_history(user.id.clone(), "HGB".into()).unwrap();
        assert_eq!(history.data.len(), 1);
        assert_eq!(history.data[0].status, "LOW");

        let insight = core.latest_insight(user.id.clone(), "WBC".into()).unwrap();
        assert!(insight.previous.is_none());
        assert!(insight.guidance.trend.is_none());

        let reports = core.user_reports(user.id, 0, 10).unwrap();
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn test_facade_errors() {
        let core = open_database_in_memory().unwrap();
        assert!(matches!(
            core.classify("HDL".into(), 50.0, Some("X".into()), None),
            Err(LabCompanionError::InvalidInput(_))
        ));
        assert!(matches!(
            core.panel_tests("THYROID".into()),
            Err(LabCompanionError::NotFound(_))
        ));
        assert!(matches!(
            core.latest_insight("nobody".into(), "LDL".into()),
            Err(LabCompanionError::NotFound(_))
        ));
        assert!(matches!(
            core.ingest_text("nobody".into(), "a.txt".into(), "LDL 90".into(), None, None),
            Err(LabCompanionError::NotFound(_))
        ));
    }

    #[test]
    fn test_facade_classify() {
        let core = open_database_in_memory().unwrap();
        let c = core.classify("hdl".into(), 72.0, Some("M".into()), Some(40)).unwrap();
        assert_eq!(c.status, "PROTECTIVE");
        assert_eq!(c.age_category, "MIDDLE_AGED");
        assert!(!c.guidance.disclaimer.is_empty());
    }
}
