//! Gemini `generateContent` transport.
//!
//! Uses `ureq` (sync) wrapped in `tokio::task::spawn_blocking` so the async
//! runtime never blocks on the HTTP round-trip.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::inference::{InferenceClient, InferenceError, InferenceRequest, Part};

/// Default API base, without the model segment.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Default model path segment.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key, sent as the `key` query parameter.
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    /// Create a config with the given API key and default endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full endpoint URL, without the key.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// [`InferenceClient`] backed by the Gemini REST API.
pub struct GeminiClient {
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<WirePart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WirePart {
    Text { text: String },
    Inline { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

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
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn to_wire(request: InferenceRequest) -> GenerateRequest {
    let parts = request
        .parts
        .into_iter()
        .map(|p| match p {
            Part::Text(text) => WirePart::Text { text },
            Part::InlineData { mime_type, data } => WirePart::Inline {
                inline_data: InlineData { mime_type, data },
            },
        })
        .collect();
    GenerateRequest {
        contents: vec![Content { parts }],
    }
}

/// Text of the first part of the first candidate.
fn first_candidate_text(resp: GenerateResponse) -> Result<String, InferenceError> {
    resp.candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or(InferenceError::MissingCandidate)
}

/// Make a synchronous call to the generateContent endpoint.
fn call_generate(config: &GeminiConfig, body: &GenerateRequest) -> Result<String, InferenceError> {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(config.timeout))
        .build()
        .into();

    let response = agent
        .post(&config.endpoint())
        .query("key", &config.api_key)
        .header("content-type", "application/json")
        .send_json(body)
        .map_err(|e| match e {
            ureq::Error::StatusCode(status) => InferenceError::Api { status },
            other => InferenceError::Network(other.to_string()),
        })?;

    let resp: GenerateResponse = response
        .into_body()
        .read_json()
        .map_err(|e| InferenceError::Parse(format!("failed to parse response: {}", e)))?;

    first_candidate_text(resp)
}

#[async_trait]
impl InferenceClient for GeminiClient {
    async fn generate(&self, request: InferenceRequest) -> Result<String, InferenceError> {
        let config = self.config.clone();
        let body = to_wire(request);

        tokio::task::spawn_blocking(move || call_generate(&config, &body))
            .await
            .map_err(|e| InferenceError::Network(format!("task join error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_and_model() {
        let cfg = GeminiConfig::new("k").with_base_url("http://localhost:9/v1beta/models/");
        assert_eq!(
            cfg.endpoint(),
            "http://localhost:9/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn wire_format_matches_generate_content() {
        let req = InferenceRequest::text("describe").with_inline_data("image/jpeg", "AAAA");
        let json = serde_json::to_value(to_wire(req)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{
                    "parts": [
                        {"text": "describe"},
                        {"inline_data": {"mime_type": "image/jpeg", "data": "AAAA"}}
                    ]
                }]
            })
        );
    }

    #[test]
    fn first_candidate_text_extracted() {
        let resp: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                {"content": {"parts": [{"text": "first"}, {"text": "second"}]}},
                {"content": {"parts": [{"text": "other"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(first_candidate_text(resp).unwrap(), "first");
    }

    #[test]
    fn missing_candidates_is_an_error() {
        let resp: GenerateResponse =
            serde_json::from_value(serde_json::json!({"error": {"code": 400}})).unwrap();
        assert_eq!(
            first_candidate_text(resp).unwrap_err(),
            InferenceError::MissingCandidate
        );

        let resp: GenerateResponse =
            serde_json::from_value(serde_json::json!({"candidates": [{"content": {"parts": []}}]}))
                .unwrap();
        assert!(first_candidate_text(resp).is_err());
    }
}
