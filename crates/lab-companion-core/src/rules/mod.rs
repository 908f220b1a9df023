//! Classification rules: reference ranges, status and guidance.

mod guidance;
mod personalized;
mod reference;

pub use guidance::*;
pub use personalized::*;
pub use reference::*;

use crate::models::{Demographics, ReferenceRange, TestStatus, TestType};

/// Values below `low * CRITICAL_LOW_FACTOR` are critically low.
pub const CRITICAL_LOW_FACTOR: f64 = 0.5;
/// Values above `high * CRITICAL_HIGH_FACTOR` are critically high.
pub const CRITICAL_HIGH_FACTOR: f64 = 1.5;

/// Classify a value against an already-resolved range.
pub fn classify(test_key: &str, value: f64, range: Option<ReferenceRange>) -> TestStatus {
    let Some(range) = range else {
        return TestStatus::Unknown;
    };

    if is_hdl_protective(test_key, value) {
        return TestStatus::Protective;
    }

    if value < range.low * CRITICAL_LOW_FACTOR {
        TestStatus::CriticalLow
    } else if value < range.low {
        TestStatus::Low
    } else if value <= range.high {
        TestStatus::Normal
    } else if value <= range.high * CRITICAL_HIGH_FACTOR {
        TestStatus::High
    } else {
        TestStatus::CriticalHigh
    }
}

/// Range a test is judged against for the given demographics.
pub fn effective_range(test: &TestType, demographics: Demographics) -> Option<ReferenceRange> {
    resolve_range(&test.key, demographics, test.ref_low, test.ref_high)
}

/// Compute the status of a value for a test and patient.
pub fn compute_status(test: &TestType, value: f64, demographics: Demographics) -> TestStatus {
    classify(&test.key, value, effective_range(test, demographics))
}
