//! Uploaded report models.

use serde::{Deserialize, Serialize};

use super::patient::{Demographics, Gender};

/// A lab report uploaded by a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    /// Unique report ID
    pub id: String,
    /// Owning user ID
    pub user_id: String,
    /// File name as uploaded
    pub original_filename: String,
    /// MIME type of the upload (empty for pre-extracted text)
    pub content_type: String,
    /// SHA-256 of the uploaded bytes, hex-encoded
    pub file_sha256: Option<String>,
    /// Upload timestamp
    pub uploaded_at: String,
    /// Text recovered by the extractor
    pub raw_text: Option<String>,
    /// Whether at least one result was stored
    pub parsed_success: bool,
    /// Processing notes (skipped tests, failures)
    pub notes: Option<String>,
    /// Patient gender at time of report
    pub patient_gender: Option<Gender>,
    /// Patient age at time of report
    pub patient_age: Option<u32>,
}

impl Report {
    /// Create a new, not yet processed report.
    pub fn new(user_id: String, original_filename: String, content_type: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            original_filename,
            content_type,
            file_sha256: None,
            uploaded_at: super::timestamp_now(),
            raw_text: None,
            parsed_success: false,
            notes: None,
            patient_gender: None,
            patient_age: None,
        }
    }

    /// Demographics recorded with this report.
    pub fn demographics(&self) -> Demographics {
        Demographics::new(self.patient_gender, self.patient_age)
    }

    pub fn set_demographics(&mut self, demographics: Demographics) {
        self.patient_gender = demographics.gender;
        self.patient_age = demographics.age;
    }

    pub fn summary(&self, test_count: usize) -> ReportSummary {
        ReportSummary {
            id: self.id.clone(),
            original_filename: self.original_filename.clone(),
            uploaded_at: self.uploaded_at.clone(),
            parsed_success: self.parsed_success,
            test_count,
            notes: self.notes.clone(),
        }
    }
}

/// Outcome of processing an upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportSummary {
    pub id: String,
    pub original_filename: String,
    pub uploaded_at: String,
    pub parsed_success: bool,
    /// Number of stored test results
    pub test_count: usize,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_report_is_unparsed() {
        let report = Report::new("user-1".into(), "cbc.png".into(), "image/png".into());
        assert!(!report.parsed_success);
        assert!(report.raw_text.is_none());
        assert!(report.demographics().is_empty());
        assert_eq!(report.id.len(), 36);
    }

    #[test]
    fn test_demographics_round_trip_through_report() {
        let mut report = Report::new("user-1".into(), "lipid.pdf".into(), "application/pdf".into());
        report.set_demographics(Demographics::new(Some(Gender::Female), Some(64)));

        assert_eq!(report.patient_gender, Some(Gender::Female));
        assert_eq!(report.demographics().age, Some(64));

        let summary = report.summary(3);
        assert_eq!(summary.test_count, 3);
        assert_eq!(summary.original_filename, "lipid.pdf");
    }
}
