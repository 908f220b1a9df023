//! Educational guidance and two-point trend.
//!
//! All text is general information keyed by test and status. Nothing here
//! is a diagnosis, and every guidance carries [`DISCLAIMER`].

use crate::models::{Guidance, ReferenceRange, TestStatus, TestType, Trend};

pub const DISCLAIMER: &str = "This is general educational information and NOT a medical diagnosis. \
Please consult a qualified doctor for medical advice and clinical decisions.";

/// Fraction of the range width (or of the value) under which a change is stable.
pub const STABLE_FRACTION: f64 = 0.05;

const CONSULT_DOCTOR: &str = "Consult your doctor for interpretation of this result.";

/// Build guidance for a result.
///
/// `range` is the range the result was judged against; the trend direction
/// is measured relative to its midpoint.
pub fn generate_guidance(
    test: &TestType,
    value: f64,
    status: TestStatus,
    previous_value: Option<f64>,
    range: Option<ReferenceRange>,
) -> Guidance {
    let trend = compute_trend(value, previous_value, range);
    let (message, suggestions) = match test.panel_key.as_str() {
        "CBC" | "METABOLIC" | "LIPID" => (panel_message(test, status), suggestions(test, status)),
        _ => (
            format!("This test measures {}.", test.display_name),
            vec![CONSULT_DOCTOR.to_string()],
        ),
    };

    Guidance {
        message,
        trend,
        suggestions,
        disclaimer: DISCLAIMER.to_string(),
    }
}

/// Two-point trend between the previous and current value.
pub fn compute_trend(
    current: f64,
    previous: Option<f64>,
    range: Option<ReferenceRange>,
) -> Option<Trend> {
    let previous = previous?;
    let change = (current - previous).abs();

    let Some(range) = range else {
        // Without a range there is no direction, only "about the same".
        return (change < (current * STABLE_FRACTION).abs()).then_some(Trend::Stable);
    };

    if change < range.width() * STABLE_FRACTION {
        return Some(Trend::Stable);
    }

    let mid = range.midpoint();
    if (current - mid).abs() < (previous - mid).abs() {
        Some(Trend::Improving)
    } else {
        Some(Trend::Worsening)
    }
}

fn panel_message(test: &TestType, status: TestStatus) -> String {
    match (lead_sentence(&test.key), status_sentence(&test.key, status)) {
        (Some(lead), Some(detail)) => format!("{lead} {detail}"),
        _ => {
            let topic = match test.panel_key.as_str() {
                "CBC" => "blood cell levels",
                "METABOLIC" => "organ function",
                _ => "heart health risk factors",
            };
            format!(
                "{} is a measure of {}. Your result is {}.",
                test.display_name, topic, status
            )
        }
    }
}

fn lead_sentence(test_key: &str) -> Option<&'static str> {
    let lead = match test_key {
        "WBC" => "White blood cells (WBC) help fight infections.",
        "RBC" => "Red blood cells (RBC) carry oxygen throughout your body.",
        "HGB" => "Hemoglobin carries oxygen in your blood.",
        "HCT" => "Hematocrit measures the proportion of blood made up of red blood cells.",
        "PLT" => "Platelets help your blood clot.",
        "MCV" => "Mean Corpuscular Volume (MCV) measures the average size of your red blood cells.",
        "GLUCOSE" => "Glucose is your blood sugar level.",
        "BUN" => "Blood Urea Nitrogen (BUN) reflects kidney function.",
        "CREATININE" => "Creatinine is a waste product filtered by your kidneys.",
        "SODIUM" => "Sodium is an electrolyte that helps regulate fluid balance.",
        "POTASSIUM" => "Potassium is essential for heart and muscle function.",
        "CHLORIDE" => "Chloride is an electrolyte that helps maintain fluid balance.",
        "CO2" => "CO2 (bicarbonate) helps maintain your body's pH balance.",
        "CALCIUM" => "Calcium is important for bone health and muscle function.",
        "TC" => "Total Cholesterol measures all cholesterol in your blood.",
        "LDL" => "LDL (\"bad\" cholesterol) can build up in arteries.",
        "HDL" => "HDL (\"good\" cholesterol) helps remove cholesterol from arteries.",
        "TRIG" => "Triglycerides are a type of fat in your blood.",
        _ => return None,
    };
    Some(lead)
}

fn status_sentence(test_key: &str, status: TestStatus) -> Option<&'static str> {
    use TestStatus::*;

    const IN_RANGE: &str = "Your level is within the normal range.";

    let sentence = match (test_key, status) {
        ("WBC", Normal) => IN_RANGE,
        ("WBC", Low) => "A low count may affect your immune system's ability to fight infections.",
        ("WBC", High) => "An elevated count may indicate your body is responding to an infection or inflammation.",
        ("WBC", CriticalLow) => "A very low count significantly affects immune function.",
        ("WBC", CriticalHigh) => "A very high count requires medical attention.",

        ("RBC", Normal) => IN_RANGE,
        ("RBC", Low) => "A low count may lead to fatigue and weakness.",
        ("RBC", High) => "An elevated count may affect blood flow.",
        ("RBC", CriticalLow) => "A very low count can cause severe symptoms.",
        ("RBC", CriticalHigh) => "A very high count requires medical attention.",

        ("HGB", Normal) => IN_RANGE,
        ("HGB", Low) => "Low levels may indicate anemia and can cause fatigue.",
        ("HGB", High) => "Elevated levels may affect blood thickness.",
        ("HGB", CriticalLow) => "Very low levels require immediate attention.",
        ("HGB", CriticalHigh) => "Very high levels require medical attention.",

        ("HCT", Normal) => IN_RANGE,
        ("HCT", Low) => "Low levels may indicate anemia.",
        ("HCT", High) => "High levels may affect blood flow.",
        ("HCT", CriticalLow) => "Very low levels require attention.",
        ("HCT", CriticalHigh) => "Very high levels require medical attention.",

        ("PLT", Normal) => IN_RANGE,
        ("PLT", Low) => "Low counts may increase bleeding risk.",
        ("PLT", High) => "High counts may affect blood clotting.",
        ("PLT", CriticalLow) => "Very low counts significantly increase bleeding risk.",
        ("PLT", CriticalHigh) => "Very high counts require medical attention.",

        ("MCV", Normal) => IN_RANGE,
        ("MCV", Low) => "Small cells may indicate certain types of anemia.",
        ("MCV", High) => "Large cells may indicate vitamin deficiencies.",
        ("MCV", CriticalLow) => "Very small cells require evaluation.",
        ("MCV", CriticalHigh) => "Very large cells require evaluation.",

        ("GLUCOSE", Normal) => IN_RANGE,
        ("GLUCOSE", Low) => "Low levels can cause symptoms like shakiness and confusion.",
        ("GLUCOSE", High) => "Elevated levels may indicate prediabetes or diabetes.",
        ("GLUCOSE", CriticalLow) => "Very low levels require immediate attention.",
        ("GLUCOSE", CriticalHigh) => "Very high levels require medical attention.",

        ("BUN", Normal) => IN_RANGE,
        ("BUN", Low) => "Low levels are usually not concerning.",
        ("BUN", High) => "Elevated levels may indicate kidney stress or dehydration.",
        ("BUN", CriticalLow) => "Very low levels may need evaluation.",
        ("BUN", CriticalHigh) => "Very high levels require medical attention.",

        ("CREATININE", Normal) => IN_RANGE,
        ("CREATININE", Low) => "Low levels are usually not concerning.",
        ("CREATININE", High) => "Elevated levels may indicate reduced kidney function.",
        ("CREATININE", CriticalLow) => "Very low levels may need evaluation.",
        ("CREATININE", CriticalHigh) => "Very high levels require medical attention.",

        ("SODIUM", Normal) => IN_RANGE,
        ("SODIUM", Low) => "Low levels can cause confusion and weakness.",
        ("SODIUM", High) => "High levels may indicate dehydration.",
        ("SODIUM", CriticalLow) => "Very low levels require immediate attention.",
        ("SODIUM", CriticalHigh) => "Very high levels require medical attention.",

        ("POTASSIUM", Normal) => IN_RANGE,
        ("POTASSIUM", Low) => "Low levels can affect heart rhythm and muscle strength.",
        ("POTASSIUM", High) => "High levels can affect heart rhythm.",
        ("POTASSIUM", CriticalLow) => "Very low levels require immediate attention.",
        ("POTASSIUM", CriticalHigh) => "Very high levels require immediate attention.",

        ("CHLORIDE", Normal) => IN_RANGE,
        ("CHLORIDE", Low) => "Low levels may indicate fluid imbalances.",
        ("CHLORIDE", High) => "High levels may indicate dehydration.",
        ("CHLORIDE", CriticalLow) => "Very low levels require evaluation.",
        ("CHLORIDE", CriticalHigh) => "Very high levels require evaluation.",

        ("CO2", Normal) => IN_RANGE,
        ("CO2", Low) => "Low levels may indicate metabolic acidosis.",
        ("CO2", High) => "High levels may indicate metabolic alkalosis.",
        ("CO2", CriticalLow) => "Very low levels require medical attention.",
        ("CO2", CriticalHigh) => "Very high levels require medical attention.",

        ("CALCIUM", Normal) => IN_RANGE,
        ("CALCIUM", Low) => "Low levels can affect bones and muscles.",
        ("CALCIUM", High) => "High levels may indicate various conditions.",
        ("CALCIUM", CriticalLow) => "Very low levels require medical attention.",
        ("CALCIUM", CriticalHigh) => "Very high levels require medical attention.",

        ("TC", Normal) => "Your level is within the desirable range.",
        ("TC", Low) => "Low levels are generally favorable for heart health.",
        ("TC", High) => "Elevated levels may increase cardiovascular risk.",
        ("TC", CriticalLow) => "Very low levels may need evaluation.",
        ("TC", CriticalHigh) => "Very high levels significantly increase cardiovascular risk.",

        ("LDL", Normal) => "Your level is within the optimal range.",
        ("LDL", Low) => "Low levels are favorable for heart health.",
        ("LDL", High) => "Elevated levels increase risk of heart disease.",
        ("LDL", CriticalLow) => "Very low levels are generally not concerning.",
        ("LDL", CriticalHigh) => "Very high levels significantly increase heart disease risk.",

        ("HDL", Normal) => "Your level is within the protective range.",
        ("HDL", Low) => "Low levels may increase cardiovascular risk.",
        ("HDL", High) => "High levels are generally protective for heart health.",
        ("HDL", CriticalLow) => "Very low levels increase heart disease risk.",
        ("HDL", CriticalHigh) => "Very high levels are generally favorable.",

        ("TRIG", Normal) => IN_RANGE,
        ("TRIG", Low) => "Low levels are generally not concerning.",
        ("TRIG", High) => "Elevated levels may increase cardiovascular risk.",
        ("TRIG", CriticalLow) => "Very low levels are generally not concerning.",
        ("TRIG", CriticalHigh) => "Very high levels significantly increase cardiovascular risk.",

        _ => return None,
    };
    Some(sentence)
}

fn suggestions(test: &TestType, status: TestStatus) -> Vec<String> {
    use TestStatus::*;

    let lines: &[&str] = match (test.panel_key.as_str(), status) {
        ("CBC", Normal) => &[
            "Continue maintaining a healthy lifestyle.",
            "Regular check-ups help monitor your health over time.",
        ],
        ("CBC", Low | CriticalLow) => &[
            "Discuss this result with your doctor.",
            "Your doctor may recommend additional tests or evaluation.",
            "Follow your doctor's guidance for any necessary treatment.",
        ],
        ("CBC", High | CriticalHigh) => &[
            "Discuss this result with your doctor.",
            "Your doctor may recommend additional tests to determine the cause.",
            "Follow your doctor's guidance for any necessary treatment.",
        ],

        ("METABOLIC", Normal) => &[
            "Continue maintaining a healthy lifestyle.",
            "Stay hydrated and maintain a balanced diet.",
            "Regular monitoring helps track your health over time.",
        ],
        ("METABOLIC", Low | CriticalLow) => &[
            "Discuss this result with your doctor.",
            "Your doctor may recommend dietary changes or further evaluation.",
            "Follow your doctor's guidance for any necessary treatment.",
        ],
        ("METABOLIC", High | CriticalHigh) => &[
            "Discuss this result with your doctor.",
            "Your doctor may recommend lifestyle modifications or further testing.",
            "Follow your doctor's guidance for any necessary treatment.",
        ],

        ("LIPID", Normal) => &[
            "Continue maintaining heart-healthy habits.",
            "Regular exercise and a balanced diet support cardiovascular health.",
            "Regular monitoring helps track your heart health over time.",
        ],
        // Low is favorable for every lipid except HDL.
        ("LIPID", Low | CriticalLow) if test.key == "HDL" => &[
            "Discuss this result with your doctor.",
            "Your doctor may recommend lifestyle changes to raise HDL levels.",
            "Regular exercise can help improve HDL cholesterol.",
        ],
        ("LIPID", Low | CriticalLow) => &[
            "Low levels are generally favorable for heart health.",
            "Continue maintaining healthy habits.",
        ],
        ("LIPID", High | CriticalHigh) => &[
            "Discuss this result with your doctor.",
            "Your doctor may recommend dietary changes, exercise, or medication.",
            "Heart-healthy lifestyle changes can help improve lipid levels.",
            "Follow your doctor's guidance for managing cardiovascular risk.",
        ],

        _ => &[CONSULT_DOCTOR],
    };
    lines.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::reference_test;

    fn range(low: f64, high: f64) -> Option<ReferenceRange> {
        Some(ReferenceRange::new(low, high))
    }

    #[test]
    fn test_no_previous_no_trend() {
        assert_eq!(compute_trend(90.0, None, range(70.0, 100.0)), None);
    }

    #[test]
    fn test_stable_within_five_percent_of_width() {
        // width 30 -> threshold 1.5
        assert_eq!(compute_trend(91.0, Some(90.0), range(70.0, 100.0)), Some(Trend::Stable));
        assert_eq!(compute_trend(93.0, Some(90.0), range(70.0, 100.0)), Some(Trend::Worsening));
    }

    #[test]
    fn test_improving_moves_toward_midpoint() {
        assert_eq!(compute_trend(105.0, Some(130.0), range(70.0, 100.0)), Some(Trend::Improving));
        assert_eq!(compute_trend(130.0, Some(105.0), range(70.0, 100.0)), Some(Trend::Worsening));
        assert_eq!(compute_trend(60.0, Some(50.0), range(70.0, 100.0)), Some(Trend::Improving));
    }

    #[test]
    fn test_rangeless_trend_is_stable_or_none() {
        assert_eq!(compute_trend(100.0, Some(97.0), None), Some(Trend::Stable));
        assert_eq!(compute_trend(100.0, Some(90.0), None), None);
    }

    #[test]
    fn test_message_combines_lead_and_status() {
        let glucose = reference_test("GLUCOSE").unwrap();
        let guidance = generate_guidance(&glucose, 130.0, TestStatus::High, None, glucose.default_range());
        assert_eq!(
            guidance.message,
            "Glucose is your blood sugar level. Elevated levels may indicate prediabetes or diabetes."
        );
        assert_eq!(guidance.suggestions.len(), 3);
        assert_eq!(guidance.disclaimer, DISCLAIMER);
        assert!(guidance.trend.is_none());
    }

    #[test]
    fn test_unknown_status_falls_back_to_panel_topic() {
        let bun = reference_test("BUN").unwrap();
        let guidance = generate_guidance(&bun, 12.0, TestStatus::Unknown, None, None);
        assert_eq!(
            guidance.message,
            "Blood Urea Nitrogen is a measure of organ function. Your result is UNKNOWN."
        );
        assert_eq!(guidance.suggestions, vec![CONSULT_DOCTOR.to_string()]);
    }

    #[test]
    fn test_unknown_panel_message() {
        let tsh = TestType::new("TSH".into(), "THYROID".into(), "Thyroid Stimulating Hormone".into(), "mIU/L".into());
        let guidance = generate_guidance(&tsh, 2.0, TestStatus::Unknown, None, None);
        assert_eq!(guidance.message, "This test measures Thyroid Stimulating Hormone.");
        assert_eq!(guidance.suggestions, vec![CONSULT_DOCTOR.to_string()]);
        assert_eq!(guidance.disclaimer, DISCLAIMER);
    }

    #[test]
    fn test_lipid_low_split_between_hdl_and_others() {
        let hdl = reference_test("HDL").unwrap();
        let ldl = reference_test("LDL").unwrap();

        let low_hdl = generate_guidance(&hdl, 30.0, TestStatus::Low, None, hdl.default_range());
        assert!(low_hdl.suggestions.iter().any(|s| s.contains("raise HDL")));

        let low_ldl = generate_guidance(&ldl, 10.0, TestStatus::Low, None, ldl.default_range());
        assert_eq!(low_ldl.suggestions[0], "Low levels are generally favorable for heart health.");
    }

    #[test]
    fn test_protective_hdl_guidance() {
        let hdl = reference_test("HDL").unwrap();
        let guidance = generate_guidance(&hdl, 72.0, TestStatus::Protective, None, hdl.default_range());
        assert_eq!(
            guidance.message,
            "HDL Cholesterol is a measure of heart health risk factors. Your result is PROTECTIVE."
        );
        assert_eq!(
            guidance.suggestions,
            vec!["Consult your doctor for interpretation of this result.".to_string()]
        );
    }

    #[test]
    fn test_every_seeded_test_has_messages_for_core_statuses() {
        let statuses = [
            TestStatus::Normal,
            TestStatus::Low,
            TestStatus::High,
            TestStatus::CriticalLow,
            TestStatus::CriticalHigh,
        ];
        for test in crate::rules::reference_tests() {
            assert!(lead_sentence(&test.key).is_some(), "{} missing lead", test.key);
            for status in statuses {
                assert!(
                    status_sentence(&test.key, status).is_some(),
                    "{} missing {} text",
                    test.key,
                    status
                );
            }
        }
    }
}
