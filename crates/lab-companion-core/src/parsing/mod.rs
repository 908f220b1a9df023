//! Lab report text parsing.
//!
//! Pipeline: OCR text → clean-up → line patterns → supported-panel filter

mod aliases;
mod lab_parser;
mod text;

pub use aliases::*;
pub use lab_parser::*;
pub use text::{clean_ocr_text, extract_numeric_value, is_likely_test_result_line, normalize_test_name};

use serde::{Deserialize, Serialize};

/// A test value as read from a report, before mapping to a test type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedTest {
    /// Test name as printed on the report
    pub test_name_raw: String,
    pub value: f64,
    /// Unit as printed (may be empty)
    pub unit: String,
}

impl ParsedTest {
    pub fn new(test_name_raw: &str, value: f64, unit: &str) -> Self {
        Self {
            test_name_raw: test_name_raw.to_string(),
            value,
            unit: unit.to_string(),
        }
    }
}
