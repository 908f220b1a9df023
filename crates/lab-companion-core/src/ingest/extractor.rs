//! Extraction seam between the ingest pipeline and OCR/AI services.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::parsing::ParsedTest;

/// Extraction errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("Extractor not configured: {0}")]
    NotConfigured(String),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Extraction request failed: {0}")]
    Request(String),

    #[error("Invalid extraction response: {0}")]
    InvalidResponse(String),
}

impl ExtractionError {
    pub fn status_code(&self) -> u16 {
        match self {
            ExtractionError::UnsupportedInput(_) => 400,
            _ => 500,
        }
    }
}

/// An uploaded report file.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type.eq_ignore_ascii_case("application/pdf")
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hex SHA-256 of the file contents.
    pub fn sha256(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }
}

/// What an extractor recovered from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractionOutput {
    /// Recognised text (or the model's raw response)
    pub raw_text: String,
    /// Structured values, when the extractor produces them directly
    pub test_results: Option<Vec<ParsedTest>>,
    /// Overall confidence (0.0 - 1.0)
    pub confidence: Option<f64>,
}

impl ExtractionOutput {
    /// Plain OCR text, to be parsed by the lab-text parser.
    pub fn text(raw_text: impl Into<String>, confidence: Option<f64>) -> Self {
        Self {
            raw_text: raw_text.into(),
            test_results: None,
            confidence,
        }
    }

    /// Nothing usable came back.
    pub fn is_empty(&self) -> bool {
        self.raw_text.trim().is_empty()
            && self.test_results.as_ref().map_or(true, |r| r.is_empty())
    }
}

/// Turns an uploaded file into text and/or structured test values.
pub trait ReportExtractor {
    fn extract(&self, file: &UploadedFile) -> Result<ExtractionOutput, ExtractionError>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "extractor"
    }
}
