//! Behavior of `ClassificationClient` against scripted inference doubles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use smartbin_classify::{
    ClassificationClient, InferenceClient, InferenceError, InferenceRequest, Part,
};
use smartbin_core::{EncodedImage, FallbackReason, Outcome, ParseTier};

/// Returns the same scripted reply every time and records requests.
struct ScriptedInference {
    reply: Result<String, InferenceError>,
    calls: Arc<AtomicUsize>,
    last_request: Arc<Mutex<Option<InferenceRequest>>>,
}

impl ScriptedInference {
    fn new(reply: Result<String, InferenceError>) -> Self {
        Self {
            reply,
            calls: Arc::new(AtomicUsize::new(0)),
            last_request: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl InferenceClient for ScriptedInference {
    async fn generate(&self, request: InferenceRequest) -> Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);
        self.reply.clone()
    }
}

fn client_with(reply: Result<String, InferenceError>) -> ClassificationClient {
    ClassificationClient::new(Box::new(ScriptedInference::new(reply)))
}

const PET_JSON: &str = r#"{"wasteType":"PET","classification":"bottle","recommendations":"rinse","recyclingTips":"crush before disposal"}"#;

#[tokio::test]
async fn embedded_json_fields_returned_unmodified() {
    let client = client_with(Ok(format!("Sure! Here you go:\n{}\nThanks", PET_JSON)));
    let result = client.classify("AAAA").await;
    assert_eq!(result.waste_type, "PET");
    assert_eq!(result.classification, "bottle");
    assert_eq!(result.recommendations, "rinse");
    assert_eq!(result.recycling_tips, "crush before disposal");
}

#[tokio::test]
async fn labeled_lines_used_without_json() {
    let client = client_with(Ok(
        "Waste type: plastic\nClassification: PET bottle\nRecommendation: rinse it".to_string(),
    ));
    match client.classify_tagged("AAAA").await {
        Outcome::Ok(classified) => {
            assert_eq!(classified.tier, Some(ParseTier::LabeledLines));
            assert_eq!(classified.result.classification, "PET bottle");
            assert_eq!(classified.result.recycling_tips, "Check local recycling guidelines");
        }
        other => panic!("expected Ok, got {:?}", other),
    }
}

#[tokio::test]
async fn network_failure_returns_static_fallback_every_time() {
    let client = client_with(Err(InferenceError::Network("connection refused".into())));
    for _ in 0..3 {
        let result = client.classify("AAAA").await;
        assert_eq!(result.waste_type, "plastic");
        assert_eq!(result.classification, "recyclable material");
        assert_eq!(
            result.recommendations,
            "Clean the item and check local recycling guidelines"
        );
        assert_eq!(
            result.recycling_tips,
            "Proper sorting helps create a circular economy"
        );
    }
}

#[tokio::test]
async fn failure_is_tagged_with_reason() {
    let client = client_with(Err(InferenceError::Api { status: 503 }));
    let outcome = client.classify_tagged("AAAA").await;
    assert!(outcome.is_fallback());
    assert_eq!(outcome.reason(), Some(&FallbackReason::Status(503)));
    assert_eq!(outcome.value().unwrap().tier, None);
}

#[tokio::test]
async fn identical_input_gives_identical_results() {
    let client = client_with(Ok(PET_JSON.to_string()));
    let a = client.classify("SAME").await;
    let b = client.classify("SAME").await;
    assert_eq!(a, b);
}

#[tokio::test]
async fn request_carries_prompt_then_inline_jpeg() {
    let inference = ScriptedInference::new(Ok(PET_JSON.to_string()));
    let last = inference.last_request.clone();
    let calls = inference.calls.clone();
    let client = ClassificationClient::new(Box::new(inference));

    client.classify("QUJD").await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let request = last.lock().unwrap().clone().unwrap();
    assert_eq!(request.parts.len(), 2);
    assert!(matches!(&request.parts[0], Part::Text(t) if t.contains("wasteType")));
    assert_eq!(
        request.parts[1],
        Part::InlineData {
            mime_type: "image/jpeg".to_string(),
            data: "QUJD".to_string(),
        }
    );
}

#[tokio::test]
async fn chat_returns_model_text() {
    let client = client_with(Ok("Rinse it and drop it in the yellow bin.".to_string()));
    let reply = client.chat("where does this go?", Some("user has 3 pending orders")).await;
    assert_eq!(reply, "Rinse it and drop it in the yellow bin.");
}

#[tokio::test]
async fn chat_sends_context_and_user_turn() {
    let inference = ScriptedInference::new(Ok("ok".to_string()));
    let last = inference.last_request.clone();
    let client = ClassificationClient::new(Box::new(inference));

    client.chat("hello", Some("pickup scheduled")).await;

    let request = last.lock().unwrap().clone().unwrap();
    match &request.parts[..] {
        [Part::Text(text)] => {
            assert!(text.contains("EcoBot"));
            assert!(text.contains("Context: pickup scheduled"));
            assert!(text.ends_with("User: hello"));
        }
        other => panic!("unexpected parts {:?}", other),
    }
}

#[tokio::test]
async fn chat_falls_back_by_keyword() {
    let client = client_with(Err(InferenceError::MissingCandidate));
    let reply = client.chat("Where is my pickup?", None).await;
    assert!(reply.starts_with("For waste pickup orders"));

    let outcome = client.chat_tagged("tell me about plastic", None).await;
    assert!(outcome.is_fallback());
    assert!(outcome.value().unwrap().contains("recycling codes"));
}

#[tokio::test]
async fn png_image_is_declared_as_png() {
    let inference = ScriptedInference::new(Ok(PET_JSON.to_string()));
    let last = inference.last_request.clone();
    let client = ClassificationClient::new(Box::new(inference));
    let image = EncodedImage::new(vec![0x89, b'P', b'N', b'G'], "image/png");

    let outcome = client.classify_image_tagged(&image).await;

    assert_eq!(outcome.origin(), "model");
    let request = last.lock().unwrap().clone().unwrap();
    assert_eq!(
        request.parts[1],
        Part::InlineData {
            mime_type: "image/png".to_string(),
            data: image.to_base64(),
        }
    );
}
