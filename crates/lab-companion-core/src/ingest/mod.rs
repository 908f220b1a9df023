//! Report ingest pipeline.
//!
//! Pipeline: validate → store report → extract → parse → map names →
//! classify → store results

mod extractor;

pub use extractor::*;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::{Database, DbError};
use crate::models::{format_timestamp, Demographics, Report, ReportSummary, TestResult};
use crate::parsing::{parse_lab_report, ParsedTest};
use crate::rules::compute_status;

/// Note recorded when the extractor returns nothing.
pub const NO_TEXT_NOTE: &str = "OCR extraction failed: no text extracted";

/// Skipped names listed before the remainder is summarised.
const SKIPPED_PREVIEW: usize = 5;

/// Ingest errors.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Unsupported file type: {0}. Supported types: JPEG, PNG, PDF")]
    UnsupportedFileType(String),

    #[error("File too large: {size} bytes. Maximum size: {max} bytes")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl IngestError {
    pub fn status_code(&self) -> u16 {
        match self {
            IngestError::UnsupportedFileType(_) | IngestError::InvalidInput(_) => 400,
            IngestError::NotFound(_) | IngestError::Database(DbError::NotFound(_)) => 404,
            IngestError::FileTooLarge { .. } => 413,
            IngestError::Database(_) => 500,
        }
    }
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Who a report belongs to and when it was taken.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestRequest {
    pub user_id: String,
    pub demographics: Demographics,
    /// Report date; defaults to now
    pub reported_at: Option<DateTime<Utc>>,
}

impl IngestRequest {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn with_demographics(mut self, demographics: Demographics) -> Self {
        self.demographics = demographics;
        self
    }

    pub fn reported_at(mut self, at: DateTime<Utc>) -> Self {
        self.reported_at = Some(at);
        self
    }
}

/// Runs uploads through extraction, mapping and classification.
pub struct Ingestor<'a> {
    db: &'a Database,
    config: &'a Config,
}

impl<'a> Ingestor<'a> {
    pub fn new(db: &'a Database, config: &'a Config) -> Self {
        Self { db, config }
    }

    /// Validate an upload, store it, and extract its results.
    ///
    /// Extraction failures do not fail the call: the report is kept with
    /// `parsed_success = false` and an explanatory note.
    pub fn ingest_upload(
        &self,
        request: &IngestRequest,
        file: &UploadedFile,
        extractor: &dyn ReportExtractor,
    ) -> IngestResult<ReportSummary> {
        self.validate_file(file)?;
        self.require_user(&request.user_id)?;

        let report = self.create_report(request, &file.filename, &file.content_type, file.sha256())?;

        let output = match extractor.extract(file) {
            Ok(output) => output,
            Err(e) => {
                warn!(report_id = %report.id, extractor = extractor.name(), error = %e, "extraction failed");
                let note = format!("Processing error: {e}");
                return self.finish_without_results(report, None, note);
            }
        };

        if output.is_empty() {
            warn!(report_id = %report.id, "extractor returned no text");
            return self.finish_without_results(report, Some(String::new()), NO_TEXT_NOTE.to_string());
        }

        let parsed = match output.test_results {
            Some(results) => results,
            None => parse_lab_report(&output.raw_text),
        };
        self.store_results(report, &output.raw_text, parsed, output.confidence)
    }

    /// Ingest text that was already extracted elsewhere.
    pub fn ingest_text(
        &self,
        request: &IngestRequest,
        source_name: &str,
        raw_text: &str,
    ) -> IngestResult<ReportSummary> {
        self.require_user(&request.user_id)?;

        let sha = hex::encode(Sha256::digest(raw_text.as_bytes()));
        let report = self.create_report(request, source_name, "", sha)?;

        if raw_text.trim().is_empty() {
            return self.finish_without_results(report, Some(String::new()), NO_TEXT_NOTE.to_string());
        }
        let parsed = parse_lab_report(raw_text);
        self.store_results(report, raw_text, parsed, None)
    }

    fn validate_file(&self, file: &UploadedFile) -> IngestResult<()> {
        if !self.config.is_allowed_content_type(&file.content_type) {
            return Err(IngestError::UnsupportedFileType(file.content_type.clone()));
        }
        if file.is_empty() {
            return Err(IngestError::InvalidInput("uploaded file is empty".into()));
        }
        let size = file.len() as u64;
        if size > self.config.max_upload_bytes {
            return Err(IngestError::FileTooLarge {
                size,
                max: self.config.max_upload_bytes,
            });
        }
        Ok(())
    }

    fn require_user(&self, user_id: &str) -> IngestResult<()> {
        match self.db.get_user(user_id)? {
            Some(_) => Ok(()),
            None => Err(IngestError::NotFound(format!("user '{user_id}'"))),
        }
    }

    fn create_report(
        &self,
        request: &IngestRequest,
        filename: &str,
        content_type: &str,
        sha256: String,
    ) -> IngestResult<Report> {
        let filename = match filename.trim() {
            "" => "unknown",
            name => name,
        };
        let mut report = Report::new(
            request.user_id.clone(),
            filename.to_string(),
            content_type.trim().to_lowercase(),
        );
        if let Some(at) = request.reported_at {
            report.uploaded_at = format_timestamp(at);
        }
        report.set_demographics(request.demographics);
        report.file_sha256 = Some(sha256);
        self.db.insert_report(&report)?;

        if let Some(sha) = report.file_sha256.as_deref() {
            if let Some(previous) = self.db.find_duplicate_upload(&report.user_id, sha, &report.id)? {
                warn!(report_id = %report.id, %previous, "same file uploaded before");
            }
        }
        Ok(report)
    }

    fn finish_without_results(
        &self,
        mut report: Report,
        raw_text: Option<String>,
        note: String,
    ) -> IngestResult<ReportSummary> {
        self.db
            .update_report_outcome(&report.id, raw_text.as_deref(), false, Some(&note))?;
        report.raw_text = raw_text;
        report.parsed_success = false;
        report.notes = Some(note);
        Ok(report.summary(0))
    }

    fn store_results(
        &self,
        mut report: Report,
        raw_text: &str,
        parsed: Vec<ParsedTest>,
        confidence: Option<f64>,
    ) -> IngestResult<ReportSummary> {
        let (saved, notes) = match self.save_results(&report, raw_text, parsed, confidence) {
            Ok(outcome) => outcome,
            Err(e) => {
                // Results were rolled back; the report row stays with the reason
                warn!(report_id = %report.id, error = %e, "storing results failed");
                let note = format!("Processing error: {e}");
                self.db
                    .update_report_outcome(&report.id, Some(raw_text), false, Some(&note))?;
                return Err(e);
            }
        };

        info!(report_id = %report.id, saved, "report ingested");

        report.raw_text = Some(raw_text.to_string());
        report.parsed_success = saved > 0;
        report.notes = notes;
        Ok(report.summary(saved))
    }

    /// Map, classify and insert results in one transaction.
    ///
    /// Returns the number saved and the skipped-names note.
    fn save_results(
        &self,
        report: &Report,
        raw_text: &str,
        parsed: Vec<ParsedTest>,
        confidence: Option<f64>,
    ) -> IngestResult<(usize, Option<String>)> {
        let demographics = report.demographics();
        let mut skipped: Vec<String> = Vec::new();
        let mut saved = 0usize;

        let tx = self.db.begin()?;
        for test in parsed {
            if !test.value.is_finite() {
                skipped.push(test.test_name_raw);
                continue;
            }
            let fuzzy = self.config.fuzzy_threshold;
            let Some(matched) = self.db.map_test_name(&test.test_name_raw, fuzzy)? else {
                debug!(name = %test.test_name_raw, "unknown test name");
                skipped.push(test.test_name_raw);
                continue;
            };
            let test_type = matched.into_test_type();
            let status = compute_status(&test_type, test.value, demographics);

            let mut result = TestResult::new(
                report.id.clone(),
                test_type.key.clone(),
                test.value,
                test.unit,
                status,
            );
            result.confidence = confidence;
            result.created_at = report.uploaded_at.clone();
            self.db.insert_test_result(&result)?;
            saved += 1;
        }

        let notes = skipped_note(&skipped);
        if let Some(note) = &notes {
            warn!(report_id = %report.id, skipped = skipped.len(), "{note}");
        }
        self.db
            .update_report_outcome(&report.id, Some(raw_text), saved > 0, notes.as_deref())?;
        tx.commit().map_err(DbError::from)?;
        Ok((saved, notes))
    }
}

/// Summary of unknown names, or `None` when nothing was skipped.
pub fn skipped_note(skipped: &[String]) -> Option<String> {
    if skipped.is_empty() {
        return None;
    }
    let preview = skipped
        .iter()
        .take(SKIPPED_PREVIEW)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let mut note = format!("Skipped {} unknown tests: {}", skipped.len(), preview);
    if skipped.len() > SKIPPED_PREVIEW {
        note.push_str(&format!(" and {} more", skipped.len() - SKIPPED_PREVIEW));
    }
    Some(note)
}
