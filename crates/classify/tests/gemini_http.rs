//! `GeminiClient` against a local HTTP endpoint that mimics generateContent.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use smartbin_classify::{
    ClassificationClient, GeminiClient, GeminiConfig, InferenceClient, InferenceError,
    InferenceRequest,
};
use smartbin_core::{FallbackReason, Outcome};

#[derive(Default)]
struct Captured {
    uri: Option<String>,
    body: Option<serde_json::Value>,
}

struct MockEndpoint {
    status: StatusCode,
    body: String,
    captured: Mutex<Captured>,
}

async fn handle(State(mock): State<Arc<MockEndpoint>>, uri: Uri, body: String) -> impl IntoResponse {
    {
        let mut captured = mock.captured.lock().unwrap();
        captured.uri = Some(uri.to_string());
        captured.body = serde_json::from_str(&body).ok();
    }
    (mock.status, mock.body.clone())
}

/// Start a mock endpoint and return its base URL plus the shared state.
async fn start_mock(status: StatusCode, body: &str) -> (String, Arc<MockEndpoint>) {
    let mock = Arc::new(MockEndpoint {
        status,
        body: body.to_string(),
        captured: Mutex::new(Captured::default()),
    });
    let app = Router::new().fallback(handle).with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/v1beta/models", addr), mock)
}

fn client_for(base_url: &str) -> GeminiClient {
    GeminiClient::new(
        GeminiConfig::new("test-key")
            .with_base_url(base_url)
            .with_timeout(Duration::from_secs(5)),
    )
}

fn envelope(text: &str) -> String {
    serde_json::json!({
        "candidates": [{"content": {"parts": [{"text": text}]}}]
    })
    .to_string()
}

#[tokio::test(flavor = "multi_thread")]
async fn posts_generate_content_with_key_and_inline_image() {
    let inner = r#"{"wasteType":"PET","classification":"bottle","recommendations":"rinse","recyclingTips":"crush before disposal"}"#;
    let (base, mock) = start_mock(StatusCode::OK, &envelope(inner)).await;

    let client = ClassificationClient::new(Box::new(client_for(&base)));
    let result = client.classify("SU1BR0U=").await;
    assert_eq!(result.classification, "bottle");

    let captured = mock.captured.lock().unwrap();
    let uri = captured.uri.clone().unwrap();
    assert!(uri.starts_with("/v1beta/models/gemini-1.5-flash:generateContent"));
    assert!(uri.contains("key=test-key"));

    let body = captured.body.clone().unwrap();
    let parts = &body["contents"][0]["parts"];
    assert!(parts[0]["text"].as_str().unwrap().contains("recyclingTips"));
    assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
    assert_eq!(parts[1]["inline_data"]["data"], "SU1BR0U=");
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_status_becomes_api_error() {
    let (base, _mock) = start_mock(StatusCode::INTERNAL_SERVER_ERROR, "{}").await;
    let err = client_for(&base)
        .generate(InferenceRequest::text("hi"))
        .await
        .unwrap_err();
    assert_eq!(err, InferenceError::Api { status: 500 });
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_status_yields_tagged_fallback() {
    let (base, _mock) = start_mock(StatusCode::SERVICE_UNAVAILABLE, "{}").await;
    let client = ClassificationClient::new(Box::new(client_for(&base)));
    let outcome = client.classify_tagged("AAAA").await;
    match outcome {
        Outcome::Fallback { value, reason } => {
            assert_eq!(value.result.classification, "recyclable material");
            assert_eq!(reason, FallbackReason::Status(503));
        }
        other => panic!("expected fallback, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn non_json_body_is_parse_error() {
    let (base, _mock) = start_mock(StatusCode::OK, "<html>oops</html>").await;
    let err = client_for(&base)
        .generate(InferenceRequest::text("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, InferenceError::Parse(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn envelope_without_candidates_is_missing_candidate() {
    let (base, _mock) = start_mock(StatusCode::OK, r#"{"promptFeedback":{}}"#).await;
    let err = client_for(&base)
        .generate(InferenceRequest::text("hi"))
        .await
        .unwrap_err();
    assert_eq!(err, InferenceError::MissingCandidate);
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_endpoint_is_network_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client_for(&format!("http://{}/v1beta/models", addr))
        .generate(InferenceRequest::text("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, InferenceError::Network(_)));
}
