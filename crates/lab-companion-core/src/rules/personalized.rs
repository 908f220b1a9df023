//! Gender- and age-adjusted reference ranges.
//!
//! Only a handful of tests have sex-specific adult ranges. Everything else
//! falls through to the table defaults.

use crate::models::{Demographics, Gender, ReferenceRange};

/// Age above which the red-cell ranges are lowered.
pub const SENIOR_AGE: u32 = 60;

/// HDL at or above this value is protective.
pub const HDL_PROTECTIVE_THRESHOLD: f64 = 60.0;

/// Sex-specific bounds plus the senior adjustment for one test.
struct SexSpecificRange {
    male: (f64, f64),
    female: (f64, f64),
    /// (shift, floor) applied to both bounds past `SENIOR_AGE`
    senior: Option<(f64, f64)>,
}

fn sex_specific(test_key: &str) -> Option<SexSpecificRange> {
    let range = match test_key {
        "RBC" => SexSpecificRange {
            male: (4.5, 5.9),
            female: (4.0, 5.2),
            senior: Some((0.2, 3.5)),
        },
        "HGB" => SexSpecificRange {
            male: (13.5, 17.5),
            female: (12.0, 15.5),
            senior: Some((0.5, 11.0)),
        },
        "HCT" => SexSpecificRange {
            male: (40.0, 54.0),
            female: (36.0, 46.0),
            senior: Some((2.0, 33.0)),
        },
        "HDL" => SexSpecificRange {
            male: (40.0, 999.0),
            female: (50.0, 999.0),
            senior: None,
        },
        _ => return None,
    };
    Some(range)
}

/// Resolve the bounds to use for a test given patient demographics.
///
/// Returns the defaults untouched when no demographics are known, when the
/// test has no sex-specific range, or when gender is unknown.
pub fn resolve_bounds(
    test_key: &str,
    demographics: Demographics,
    default_low: Option<f64>,
    default_high: Option<f64>,
) -> (Option<f64>, Option<f64>) {
    if demographics.is_empty() {
        return (default_low, default_high);
    }
    let Some(table) = sex_specific(test_key) else {
        return (default_low, default_high);
    };
    let (mut low, mut high) = match demographics.gender {
        Some(Gender::Male) => table.male,
        Some(Gender::Female) => table.female,
        None => return (default_low, default_high),
    };

    if let (Some(age), Some((shift, floor))) = (demographics.age, table.senior) {
        if age > SENIOR_AGE {
            low = (low - shift).max(floor);
            high -= shift;
        }
    }

    (Some(low), Some(high))
}

/// Resolve a complete range, or `None` if either bound is missing.
pub fn resolve_range(
    test_key: &str,
    demographics: Demographics,
    default_low: Option<f64>,
    default_high: Option<f64>,
) -> Option<ReferenceRange> {
    let (low, high) = resolve_bounds(test_key, demographics, default_low, default_high);
    ReferenceRange::from_bounds(low, high)
}

pub fn is_hdl_protective(test_key: &str, value: f64) -> bool {
    test_key == "HDL" && value >= HDL_PROTECTIVE_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo(gender: Option<Gender>, age: Option<u32>) -> Demographics {
        Demographics::new(gender, age)
    }

    #[test]
    fn test_no_demographics_returns_defaults() {
        let (low, high) = resolve_bounds("HGB", Demographics::default(), Some(13.5), Some(17.5));
        assert_eq!((low, high), (Some(13.5), Some(17.5)));
    }

    #[test]
    fn test_female_hemoglobin() {
        let range = resolve_range("HGB", demo(Some(Gender::Female), Some(30)), Some(13.5), Some(17.5));
        assert_eq!(range, Some(ReferenceRange::new(12.0, 15.5)));
    }

    #[test]
    fn test_senior_shift_applies_past_sixty() {
        let at_sixty = resolve_range("RBC", demo(Some(Gender::Male), Some(60)), None, None).unwrap();
        assert_eq!(at_sixty, ReferenceRange::new(4.5, 5.9));

        let senior = resolve_range("RBC", demo(Some(Gender::Male), Some(61)), None, None).unwrap();
        assert!((senior.low - 4.3).abs() < 1e-9);
        assert!((senior.high - 5.7).abs() < 1e-9);
    }

    #[test]
    fn test_senior_hematocrit_female() {
        let range = resolve_range("HCT", demo(Some(Gender::Female), Some(75)), None, None).unwrap();
        assert_eq!(range, ReferenceRange::new(34.0, 44.0));
    }

    #[test]
    fn test_hdl_by_gender_ignores_age() {
        let male = resolve_range("HDL", demo(Some(Gender::Male), Some(80)), None, None).unwrap();
        assert_eq!(male, ReferenceRange::new(40.0, 999.0));
        let female = resolve_range("HDL", demo(Some(Gender::Female), None), None, None).unwrap();
        assert_eq!(female, ReferenceRange::new(50.0, 999.0));
    }

    #[test]
    fn test_age_without_gender_keeps_defaults() {
        let (low, high) = resolve_bounds("HGB", demo(None, Some(70)), Some(13.5), Some(17.5));
        assert_eq!((low, high), (Some(13.5), Some(17.5)));
    }

    #[test]
    fn test_other_tests_keep_defaults() {
        let range = resolve_range("GLUCOSE", demo(Some(Gender::Female), Some(70)), Some(70.0), Some(100.0));
        assert_eq!(range, Some(ReferenceRange::new(70.0, 100.0)));
        assert!(resolve_range("GLUCOSE", demo(Some(Gender::Female), None), Some(70.0), None).is_none());
    }

    #[test]
    fn test_hdl_protective_threshold() {
        assert!(is_hdl_protective("HDL", 60.0));
        assert!(!is_hdl_protective("HDL", 59.9));
        assert!(!is_hdl_protective("LDL", 80.0));
    }
}
