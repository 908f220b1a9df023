//! Extraction prompts for lab report images and PDFs.
//!
//! The model is asked for a bare JSON object so the response can go straight
//! to [`crate::parse_extraction_response`].

/// Instructions sent with every report.
pub const EXTRACTION_PROMPT: &str = r#"You are a medical report analyzer. Extract ALL test results from this medical lab report.

**Instructions:**
1. Identify all test names, their numeric values, and units
2. Focus on these test panels: CBC (Complete Blood Count), Metabolic Panel, and Lipid Panel
3. Return results in valid JSON format only
4. If a test doesn't have a unit, use an empty string
5. Be precise with numeric values (include decimals)
6. Normalize test names to common medical abbreviations when possible

**Supported Tests:**
- CBC: WBC, RBC, Hemoglobin, Hematocrit, Platelets, MCV
- Metabolic: Glucose, BUN, Creatinine, Sodium, Potassium, Chloride, CO2, Calcium
- Lipid: Total Cholesterol, LDL, HDL, Triglycerides

**Output Format (JSON only, no markdown):**
{
  "test_results": [
    {"test_name": "WBC", "value": 7.2, "unit": "10^3/µL"},
    {"test_name": "Glucose", "value": 95.0, "unit": "mg/dL"}
  ]
}

**Important:**
- Return ONLY valid JSON, no additional text or markdown formatting
- If no tests are found, return: {"test_results": []}
- Ensure all numeric values are numbers, not strings"#;

/// Prompt for a report whose text was already extracted.
pub fn make_text_prompt(report_text: &str) -> String {
    format!("{EXTRACTION_PROMPT}\n\n**Medical Report Text:**\n{report_text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_panels_and_format() {
        assert!(EXTRACTION_PROMPT.contains("Lipid Panel"));
        assert!(EXTRACTION_PROMPT.contains("\"test_results\""));
        assert!(EXTRACTION_PROMPT.contains("Triglycerides"));
    }

    #[test]
    fn test_text_prompt() {
        let prompt = make_text_prompt("Glucose 95 mg/dL");
        assert!(prompt.starts_with(EXTRACTION_PROMPT));
        assert!(prompt.ends_with("Glucose 95 mg/dL"));
    }
}
