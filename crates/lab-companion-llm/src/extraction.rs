//! Lab value extraction from model output.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use lab_companion_core::ingest::{
    ExtractionError, ExtractionOutput, ReportExtractor, UploadedFile,
};
use lab_companion_core::parsing::ParsedTest;

/// Response parsing errors.
#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
}

impl From<ResponseError> for ExtractionError {
    fn from(e: ResponseError) -> Self {
        ExtractionError::InvalidResponse(e.to_string())
    }
}

pub type ResponseResult<T> = Result<T, ResponseError>;

/// Validated model output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResponse {
    pub test_results: Vec<ParsedTest>,
    /// Model text exactly as received
    pub raw_response: String,
    pub success: bool,
}

impl ExtractionResponse {
    pub fn into_output(self) -> ExtractionOutput {
        ExtractionOutput {
            raw_text: self.raw_response,
            test_results: Some(self.test_results),
            confidence: None,
        }
    }
}

/// Remove a surrounding Markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

fn numeric_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn parse_entry(entry: &Value) -> Option<ParsedTest> {
    let obj = entry.as_object()?;
    let name = obj.get("test_name")?.as_str()?.trim();
    let value = numeric_value(obj.get("value")?)?;
    let unit = match obj.get("unit")? {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        _ => return None,
    };
    if name.is_empty() {
        return None;
    }
    Some(ParsedTest {
        test_name_raw: name.to_string(),
        value,
        unit,
    })
}

/// Parse a model response into test values.
///
/// Entries missing `test_name`, `value` or `unit`, or whose value is not a
/// number (or numeric string), are dropped.
pub fn parse_extraction_response(text: &str) -> ResponseResult<ExtractionResponse> {
    let cleaned = strip_code_fence(text);

    // Models sometimes wrap the object in prose
    let start = cleaned.find('{').ok_or_else(|| {
        ResponseError::InvalidFormat("No JSON object found in response".into())
    })?;
    let end = cleaned.rfind('}').ok_or_else(|| {
        ResponseError::InvalidFormat("No closing brace found in response".into())
    })?;
    if end < start {
        return Err(ResponseError::InvalidFormat("Malformed JSON object".into()));
    }

    let data: Value = serde_json::from_str(&cleaned[start..=end])?;
    let entries = match data.get("test_results") {
        None | Some(Value::Null) => &[][..],
        Some(Value::Array(items)) => items.as_slice(),
        Some(_) => {
            return Err(ResponseError::InvalidFormat(
                "test_results must be an array".into(),
            ))
        }
    };

    let test_results: Vec<ParsedTest> = entries.iter().filter_map(parse_entry).collect();
    debug!(
        received = entries.len(),
        kept = test_results.len(),
        "parsed extraction response"
    );

    Ok(ExtractionResponse {
        success: !test_results.is_empty(),
        test_results,
        raw_response: text.to_string(),
    })
}

#[derive(Debug, Clone)]
enum MockBehavior {
    Text(String),
    Response(String),
    Fail(ExtractionError),
}

/// Extractor with canned output, for tests and offline use.
#[derive(Debug, Clone)]
pub struct MockExtractor {
    behavior: MockBehavior,
}

impl MockExtractor {
    /// Return `text` as recognised text, to be run through the lab parser.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Text(text.into()),
        }
    }

    /// Return `response` as if a model had produced it.
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Response(response.into()),
        }
    }

    /// Fail every extraction with `error`.
    pub fn failing(error: ExtractionError) -> Self {
        Self {
            behavior: MockBehavior::Fail(error),
        }
    }
}

impl ReportExtractor for MockExtractor {
    fn extract(&self, _file: &UploadedFile) -> Result<ExtractionOutput, ExtractionError> {
        match &self.behavior {
            MockBehavior::Text(text) => Ok(ExtractionOutput::text(text.clone(), Some(1.0))),
            MockBehavior::Response(response) => {
                Ok(parse_extraction_response(response)?.into_output())
            }
            MockBehavior::Fail(error) => Err(error.clone()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let json = r#"{"test_results":[{"test_name":"WBC","value":7.2,"unit":"10^3/µL"},{"test_name":"Glucose","value":95,"unit":"mg/dL"}]}"#;
        let response = parse_extraction_response(json).unwrap();
        assert!(response.success);
        assert_eq!(
            response.test_results,
            vec![
                ParsedTest::new("WBC", 7.2, "10^3/µL"),
                ParsedTest::new("Glucose", 95.0, "mg/dL"),
            ]
        );
        assert_eq!(response.raw_response, json);
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = "```json\n{\"test_results\":[{\"test_name\":\"HDL\",\"value\":\"55.5\",\"unit\":\"mg/dL\"}]}\n```";
        let response = parse_extraction_response(text).unwrap();
        assert_eq!(response.test_results, vec![ParsedTest::new("HDL", 55.5, "mg/dL")]);
    }

    #[test]
    fn test_parse_with_prose_prefix() {
        let text = "Here are the results:\n{\"test_results\":[]}";
        let response = parse_extraction_response(text).unwrap();
        assert!(!response.success);
        assert!(response.test_results.is_empty());
    }

    #[test]
    fn test_incomplete_entries_dropped() {
        let text = r#"{"test_results":[
            {"test_name":"LDL","value":"high","unit":"mg/dL"},
            {"test_name":"HDL","value":50},
            {"value":5,"unit":"x"},
            {"test_name":"BUN","value":14,"unit":null},
            {"test_name":"Sodium","value":140,"unit":"mmol/L"}
        ]}"#;
        let response = parse_extraction_response(text).unwrap();
        let names: Vec<_> = response.test_results.iter().map(|t| t.test_name_raw.as_str()).collect();
        assert_eq!(names, vec!["BUN", "Sodium"]);
        assert_eq!(response.test_results[0].unit, "");
    }

    #[test]
    fn test_invalid_responses() {
        assert!(matches!(
            parse_extraction_response("no json here"),
            Err(ResponseError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_extraction_response("{not json}"),
            Err(ResponseError::JsonParse(_))
        ));
        assert!(parse_extraction_response(r#"{"test_results": 3}"#).is_err());
    }

    #[test]
    fn test_missing_results_key_is_empty() {
        let response = parse_extraction_response(r#"{"other": 1}"#).unwrap();
        assert!(!response.success);
    }

    #[test]
    fn test_mock_extractor_modes() {
        let file = UploadedFile::new("r.png", "image/png", vec![1, 2, 3]);

        let text = MockExtractor::with_text("WBC 7.0").extract(&file).unwrap();
        assert_eq!(text.raw_text, "WBC 7.0");
        assert!(text.test_results.is_none());

        let structured = MockExtractor::with_response(r#"{"test_results":[{"test_name":"RBC","value":4.8,"unit":""}]}"#)
            .extract(&file)
            .unwrap();
        assert_eq!(structured.test_results.unwrap().len(), 1);

        let bad = MockExtractor::with_response("garbage").extract(&file).unwrap_err();
        assert!(matches!(bad, ExtractionError::InvalidResponse(_)));

        let err = MockExtractor::failing(ExtractionError::Request("offline".into()))
            .extract(&file)
            .unwrap_err();
        assert_eq!(err, ExtractionError::Request("offline".into()));
    }
}
