//! The seam between prompt handling and the HTTP transport.

use async_trait::async_trait;
use smartbin_core::FallbackReason;

/// Error type for inference endpoint calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InferenceError {
    /// Connection, DNS, TLS or timeout failure.
    #[error("inference network error: {0}")]
    Network(String),
    /// The endpoint answered with a non-success status.
    #[error("inference API error ({status})")]
    Api { status: u16 },
    /// The response body was not the expected envelope.
    #[error("inference parse error: {0}")]
    Parse(String),
    /// The envelope had no candidate text.
    #[error("inference response contained no candidates")]
    MissingCandidate,
}

impl From<InferenceError> for FallbackReason {
    fn from(e: InferenceError) -> Self {
        match e {
            InferenceError::Network(msg) => FallbackReason::Transport(msg),
            InferenceError::Api { status } => FallbackReason::Status(status),
            InferenceError::Parse(msg) => FallbackReason::MalformedResponse(msg),
            InferenceError::MissingCandidate => FallbackReason::EmptyResponse,
        }
    }
}

/// One element of a multimodal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    /// Base64 payload with its MIME type.
    InlineData { mime_type: String, data: String },
}

/// A single-turn request: an ordered list of parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceRequest {
    pub parts: Vec<Part>,
}

impl InferenceRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Text(prompt.into())],
        }
    }

    pub fn with_inline_data(mut self, mime_type: &str, data: impl Into<String>) -> Self {
        self.parts.push(Part::InlineData {
            mime_type: mime_type.to_string(),
            data: data.into(),
        });
        self
    }
}

/// Trait for sending one request to a generative model and getting text back.
///
/// Implementations own the wire format; the classification client owns
/// prompts, parsing and fallbacks.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn generate(&self, request: InferenceRequest) -> Result<String, InferenceError>;
}
