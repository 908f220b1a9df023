//! Test result, status and insight models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Classification of a value relative to its reference range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    Low,
    Normal,
    High,
    /// Below half of the lower bound
    CriticalLow,
    /// Above one and a half times the upper bound
    CriticalHigh,
    /// HDL at or above 60 mg/dL
    Protective,
    /// No reference range to compare against
    Unknown,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Low => "LOW",
            TestStatus::Normal => "NORMAL",
            TestStatus::High => "HIGH",
            TestStatus::CriticalLow => "CRITICAL_LOW",
            TestStatus::CriticalHigh => "CRITICAL_HIGH",
            TestStatus::Protective => "PROTECTIVE",
            TestStatus::Unknown => "UNKNOWN",
        }
    }

    /// Outside the normal band in either direction.
    pub fn is_abnormal(&self) -> bool {
        matches!(
            self,
            TestStatus::Low | TestStatus::High | TestStatus::CriticalLow | TestStatus::CriticalHigh
        )
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, TestStatus::CriticalLow | TestStatus::CriticalHigh)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unrecognised status label.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Unrecognised test status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for TestStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(TestStatus::Low),
            "NORMAL" => Ok(TestStatus::Normal),
            "HIGH" => Ok(TestStatus::High),
            "CRITICAL_LOW" => Ok(TestStatus::CriticalLow),
            "CRITICAL_HIGH" => Ok(TestStatus::CriticalHigh),
            "PROTECTIVE" => Ok(TestStatus::Protective),
            "UNKNOWN" => Ok(TestStatus::Unknown),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// A stored test value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestResult {
    pub id: String,
    pub report_id: String,
    pub test_key: String,
    pub value: f64,
    pub unit: String,
    pub status: TestStatus,
    /// Extractor confidence (0.0 - 1.0)
    pub confidence: Option<f64>,
    pub created_at: String,
}

impl TestResult {
    pub fn new(
        report_id: String,
        test_key: String,
        value: f64,
        unit: String,
        status: TestStatus,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            report_id,
            test_key,
            value,
            unit,
            status,
            confidence: None,
            created_at: super::timestamp_now(),
        }
    }
}

/// Direction of change between the two most recent values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Worsening,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Worsening => "worsening",
            Trend::Stable => "stable",
        }
    }
}

/// Educational guidance for a result. Never a diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Guidance {
    pub message: String,
    pub trend: Option<Trend>,
    pub suggestions: Vec<String>,
    pub disclaimer: String,
}

/// One point on a history chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryPoint {
    pub timestamp: String,
    pub value: f64,
    pub unit: String,
    pub status: TestStatus,
}

impl From<&TestResult> for HistoryPoint {
    fn from(result: &TestResult) -> Self {
        Self {
            timestamp: result.created_at.clone(),
            value: result.value,
            unit: result.unit.clone(),
            status: result.status,
        }
    }
}

/// Metadata describing the charted test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryMetadata {
    pub panel_key: String,
    pub test_key: String,
    pub display_name: String,
    pub unit: String,
    pub ref_low: Option<f64>,
    pub ref_high: Option<f64>,
}

/// All results of one test for one user, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestHistory {
    pub metadata: HistoryMetadata,
    pub data: Vec<HistoryPoint>,
}

/// Latest result with comparison and guidance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LatestInsight {
    pub latest: HistoryPoint,
    pub previous: Option<HistoryPoint>,
    pub guidance: Guidance,
}
