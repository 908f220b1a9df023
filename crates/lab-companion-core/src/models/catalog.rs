//! Panel and test catalog models.

use serde::{Deserialize, Serialize};

/// A named group of related lab tests (e.g. CBC).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Panel {
    /// Unique upper-case key (e.g., "CBC", "METABOLIC", "LIPID")
    pub key: String,
    /// Human-readable name
    pub display_name: String,
    /// Stable listing order
    pub position: u32,
}

/// A single lab test with its default reference range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestType {
    /// Unique test key (e.g., "WBC", "GLUCOSE", "HDL")
    pub key: String,
    /// Key of the owning panel
    pub panel_key: String,
    /// Human-readable name
    pub display_name: String,
    /// Canonical unit of measurement
    pub unit: String,
    /// Default lower bound of the normal range
    pub ref_low: Option<f64>,
    /// Default upper bound of the normal range
    pub ref_high: Option<f64>,
    /// Listing order within the panel
    pub position: u32,
}

/// Low/high bounds considered normal for a test.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ReferenceRange {
    pub low: f64,
    pub high: f64,
}

impl ReferenceRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Build a range only when both bounds are known.
    pub fn from_bounds(low: Option<f64>, high: Option<f64>) -> Option<Self> {
        Some(Self::new(low?, high?))
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }

    /// Inclusive containment check.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }
}

impl TestType {
    /// Create a test type without reference bounds.
    pub fn new(key: String, panel_key: String, display_name: String, unit: String) -> Self {
        Self {
            key,
            panel_key,
            display_name,
            unit,
            ref_low: None,
            ref_high: None,
            position: 0,
        }
    }

    /// Attach default reference bounds.
    pub fn with_range(mut self, low: f64, high: f64) -> Self {
        self.ref_low = Some(low);
        self.ref_high = Some(high);
        self
    }

    /// Default reference range, if both bounds are defined.
    pub fn default_range(&self) -> Option<ReferenceRange> {
        ReferenceRange::from_bounds(self.ref_low, self.ref_high)
    }
}
