//! Gemini `generateContent` client.
//!
//! Images and PDFs are sent inline (base64) together with
//! [`EXTRACTION_PROMPT`]; the model answers with the JSON result object.

use std::time::{Duration, Instant};

use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use lab_companion_core::config::GeminiSettings;
use lab_companion_core::ingest::{
    ExtractionError, ExtractionOutput, ReportExtractor, UploadedFile,
};

use crate::extraction::parse_extraction_response;
use crate::prompts::EXTRACTION_PROMPT;

/// Blocking Gemini client implementing [`ReportExtractor`].
pub struct GeminiExtractor {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout_secs: u64,
}

impl GeminiExtractor {
    /// Build from configuration. Fails when no API key is set.
    pub fn from_settings(settings: &GeminiSettings) -> Result<Self, ExtractionError> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ExtractionError::NotConfigured("GEMINI_API_KEY is not set".into())
            })?
            .to_string();

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ExtractionError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model: settings.model.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            timeout_secs: settings.timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

/// Request body for `models/{model}:generateContent`
#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

/// Response body from `generateContent`
#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

fn is_supported(file: &UploadedFile) -> bool {
    file.is_pdf() || file.content_type.to_ascii_lowercase().starts_with("image/")
}

impl ReportExtractor for GeminiExtractor {
    fn extract(&self, file: &UploadedFile) -> Result<ExtractionOutput, ExtractionError> {
        if !is_supported(file) {
            return Err(ExtractionError::UnsupportedInput(file.content_type.clone()));
        }
        let _span = info_span!(
            "gemini_extract",
            model = %self.model,
            size = file.len(),
        )
        .entered();
        let start = Instant::now();

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: EXTRACTION_PROMPT,
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: &file.content_type,
                            data: base64::engine::general_purpose::STANDARD.encode(&file.bytes),
                        },
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractionError::Request(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    ExtractionError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::Request(format!(
                "Gemini returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| ExtractionError::InvalidResponse(e.to_string()))?;
        let text = parsed
            .text()
            .ok_or_else(|| ExtractionError::InvalidResponse("empty response".into()))?;

        let extraction = parse_extraction_response(&text)?;
        info!(
            elapsed_ms = %start.elapsed().as_millis(),
            results = extraction.test_results.len(),
            "Gemini extraction complete"
        );
        Ok(extraction.into_output())
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let settings = GeminiSettings::default();
        assert!(matches!(
            GeminiExtractor::from_settings(&settings),
            Err(ExtractionError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_endpoint() {
        let settings = GeminiSettings {
            api_key: Some("key".into()),
            base_url: "https://example.test/v1beta/".into(),
            ..GeminiSettings::default()
        };
        let extractor = GeminiExtractor::from_settings(&settings).unwrap();
        assert_eq!(
            extractor.endpoint(),
            "https://example.test/v1beta/models/gemini-2.0-flash-exp:generateContent"
        );
    }

    #[test]
    fn test_rejects_non_report_files() {
        let settings = GeminiSettings {
            api_key: Some("key".into()),
            ..GeminiSettings::default()
        };
        let extractor = GeminiExtractor::from_settings(&settings).unwrap();
        let file = UploadedFile::new("a.txt", "text/plain", b"hello".to_vec());
        assert!(matches!(
            extractor.extract(&file),
            Err(ExtractionError::UnsupportedInput(_))
        ));
    }

    #[test]
    fn test_request_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: "prompt" },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/png",
                            data: "AAEC".into(),
                        },
                    },
                ],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "prompt");
        assert_eq!(json["contents"][0]["parts"][1]["inline_data"]["mime_type"], "image/png");
    }

    #[test]
    fn test_response_text() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"{\"test_results\":"},{"text":"[]}"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("{\"test_results\":[]}"));

        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.text().is_none());
    }
}
