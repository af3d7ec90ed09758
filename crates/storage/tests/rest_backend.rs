//! `RestBackend` against a local server that speaks the storage and
//! PostgREST wire shapes, backed by `MemoryBackend`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use smartbin_storage::conformance::run_conformance_suite;
use smartbin_storage::{
    BlobStore, MemoryBackend, NewChatConversation, NewPickupOrder, NewWasteUpload, OrderStatus,
    RecordStore, RestBackend, RestConfig, StorageError, UploadOptions,
};

const KEY: &str = "anon-test-key";

type Shared = Arc<MemoryBackend>;

fn authorized(headers: &HeaderMap) -> bool {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    let bearer = headers.get("authorization").and_then(|v| v.to_str().ok());
    apikey == Some(KEY) && bearer == Some(&format!("Bearer {}", KEY))
}

fn storage_error(e: StorageError) -> Response {
    match e {
        StorageError::AlreadyExists { .. } => (
            StatusCode::BAD_REQUEST,
            Json(json!({"statusCode": "409", "error": "Duplicate", "message": "The resource already exists"})),
        )
            .into_response(),
        StorageError::ObjectNotFound { .. } => (
            StatusCode::BAD_REQUEST,
            Json(json!({"statusCode": "404", "error": "not_found", "message": "Object not found"})),
        )
            .into_response(),
        StorageError::RecordNotFound { .. } => (
            StatusCode::CONFLICT,
            Json(json!({"code": "23503", "message": "violates foreign key constraint"})),
        )
            .into_response(),
        StorageError::InvalidRecord { message, .. } => (
            StatusCode::BAD_REQUEST,
            Json(json!({"code": "23514", "message": message})),
        )
            .into_response(),
        StorageError::Backend(message) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"message": message}))).into_response()
        }
    }
}

async fn upload_object(
    State(backend): State<Shared>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");
    let upsert = headers.get("x-upsert").and_then(|v| v.to_str().ok()) == Some("true");
    let options = UploadOptions {
        upsert,
        ..UploadOptions::new(content_type)
    };
    match backend.upload(&bucket, &key, body.to_vec(), options).await {
        Ok(()) => Json(json!({"Key": format!("{}/{}", bucket, key)})).into_response(),
        Err(e) => storage_error(e),
    }
}

async fn download_object(
    State(backend): State<Shared>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match backend.download(&bucket, &key).await {
        Ok(bytes) => bytes.into_response(),
        Err(e) => storage_error(e),
    }
}

async fn insert_row(
    State(backend): State<Shared>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(row): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    // PostgREST only echoes the row when asked to.
    if headers.get("prefer").and_then(|v| v.to_str().ok()) != Some("return=representation") {
        return StatusCode::CREATED.into_response();
    }
    let stored = match table.as_str() {
        "waste_uploads" => {
            let row: NewWasteUpload = serde_json::from_value(row).unwrap();
            backend.insert_waste_upload(row).await.map(|r| json!(r))
        }
        "chatbot_conversations" => {
            let row: NewChatConversation = serde_json::from_value(row).unwrap();
            backend.insert_chat_conversation(row).await.map(|r| json!(r))
        }
        "orders" => {
            let row: NewPickupOrder = serde_json::from_value(row).unwrap();
            backend.insert_pickup_order(row).await.map(|r| json!(r))
        }
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    match stored {
        Ok(rec) => (StatusCode::CREATED, Json(json!([rec]))).into_response(),
        Err(e) => storage_error(e),
    }
}

async fn select_rows(
    State(backend): State<Shared>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let rows = match table.as_str() {
        "waste_uploads" => {
            let limit = params
                .get("limit")
                .and_then(|l| l.parse().ok())
                .unwrap_or(0);
            backend.list_waste_uploads(limit).await.map(|r| json!(r))
        }
        "orders" => {
            let status = params
                .get("status")
                .and_then(|s| s.strip_prefix("eq."))
                .map(|s| s.parse::<OrderStatus>().unwrap());
            backend.list_pickup_orders(status).await.map(|r| json!(r))
        }
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    match rows {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => storage_error(e),
    }
}

/// Start a fresh mock project and return its URL.
async fn start_mock() -> String {
    let backend: Shared = Arc::new(MemoryBackend::new());
    let app = Router::new()
        .route(
            "/storage/v1/object/{bucket}/{key}",
            post(upload_object).get(download_object),
        )
        .route("/rest/v1/{table}", post(insert_row).get(select_rows))
        .with_state(backend);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn backend_for(url: &str, key: &str) -> RestBackend {
    RestBackend::new(RestConfig::new(url, key).with_timeout(Duration::from_secs(5)))
}

#[tokio::test(flavor = "multi_thread")]
async fn rest_backend_passes_conformance_suite() {
    let report = run_conformance_suite(|| async {
        let url = start_mock().await;
        backend_for(&url, KEY)
    })
    .await;
    assert!(report.failed == 0, "{report}");
}

#[tokio::test(flavor = "multi_thread")]
async fn public_url_points_at_public_object_path() {
    let url = start_mock().await;
    let backend = backend_for(&url, KEY);
    assert_eq!(
        backend.public_url("waste-images", "waste-1.jpg"),
        format!("{}/storage/v1/object/public/waste-images/waste-1.jpg", url)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn wrong_key_surfaces_as_backend_error() {
    let url = start_mock().await;
    let backend = backend_for(&url, "wrong-key");
    let err = backend
        .upload("waste-images", "a.jpg", vec![1], UploadOptions::new("image/jpeg"))
        .await
        .unwrap_err();
    match err {
        StorageError::Backend(msg) => assert!(msg.contains("401"), "{msg}"),
        other => panic!("expected Backend, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_project_is_backend_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = backend_for(&format!("http://{}", addr), KEY);
    let err = backend.list_waste_uploads(10).await.unwrap_err();
    assert!(matches!(err, StorageError::Backend(_)));
}
