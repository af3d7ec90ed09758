//! Classification and chat on top of an [`InferenceClient`].
//!
//! Neither entry point ever returns an error. Transport and envelope
//! failures become [`Outcome::Fallback`] carrying the canned value, so a
//! caller always has something to show; the `_tagged` variants keep the
//! tag for logging and tests.

use smartbin_core::parse::truncate;
use smartbin_core::{
    fallback_chat_response, fallback_classification, parse_classification, ClassificationResult,
    EncodedImage, Outcome, ParseTier,
};

use crate::inference::{InferenceClient, InferenceRequest};
use crate::prompt::{chat_prompt, classification_prompt};

/// MIME type assumed for a bare base64 payload.
const DEFAULT_IMAGE_MIME_TYPE: &str = "image/jpeg";

/// A classification together with the parse tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub result: ClassificationResult,
    /// `None` when the value is the static fallback.
    pub tier: Option<ParseTier>,
}

/// Client for waste classification and the EcoBot chat.
pub struct ClassificationClient {
    inference: Box<dyn InferenceClient>,
}

impl ClassificationClient {
    pub fn new(inference: Box<dyn InferenceClient>) -> Self {
        Self { inference }
    }

    /// Classify a base64 JPEG payload, keeping the origin tag.
    pub async fn classify_tagged(&self, image_base64: &str) -> Outcome<Classified> {
        self.classify_inline(DEFAULT_IMAGE_MIME_TYPE, image_base64).await
    }

    /// Classify an image, declaring its own MIME type to the model.
    pub async fn classify_image_tagged(&self, image: &EncodedImage) -> Outcome<Classified> {
        self.classify_inline(image.mime_type(), &image.to_base64()).await
    }

    async fn classify_inline(&self, mime_type: &str, image_base64: &str) -> Outcome<Classified> {
        let request = InferenceRequest::text(classification_prompt())
            .with_inline_data(mime_type, image_base64);

        match self.inference.generate(request).await {
            Ok(text) => {
                let (result, tier) = parse_classification(&text);
                if tier == ParseTier::LabeledLines {
                    tracing::debug!(
                        response = %truncate(&text, 200),
                        "no embedded JSON in model output, used labeled-line extraction"
                    );
                }
                tracing::info!(
                    waste_type = %result.waste_type,
                    classification = %result.classification,
                    ?tier,
                    "waste image classified"
                );
                Outcome::Ok(Classified {
                    result,
                    tier: Some(tier),
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "classification failed, using fallback result");
                Outcome::Fallback {
                    value: Classified {
                        result: fallback_classification(),
                        tier: None,
                    },
                    reason: e.into(),
                }
            }
        }
    }

    /// Classify a base64 JPEG payload. Always returns a populated result.
    pub async fn classify(&self, image_base64: &str) -> ClassificationResult {
        self.classify_tagged(image_base64)
            .await
            .map(|c| c.result)
            .into_value_or(fallback_classification())
    }

    /// Ask the assistant, keeping the origin tag.
    pub async fn chat_tagged(&self, message: &str, context: Option<&str>) -> Outcome<String> {
        let request = InferenceRequest::text(chat_prompt(message, context));
        match self.inference.generate(request).await {
            Ok(text) => Outcome::Ok(text),
            Err(e) => {
                tracing::warn!(error = %e, "chat request failed, using keyword fallback");
                Outcome::Fallback {
                    value: fallback_chat_response(message).to_string(),
                    reason: e.into(),
                }
            }
        }
    }

    /// Ask the assistant. Always returns text.
    pub async fn chat(&self, message: &str, context: Option<&str>) -> String {
        self.chat_tagged(message, context)
            .await
            .into_value_or(fallback_chat_response(message).to_string())
    }
}
