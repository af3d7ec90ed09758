//! Route handlers: health, classification, deposits, chat, session, uploads, orders.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use smartbin_core::{
    EncodedImage, Outcome, RandomizedMeasurer, SampleMeasurer, UserSuppliedMeasurer, WasteSample,
    WeightUnit,
};
use smartbin_pipeline::{CollectingSink, PipelineError, SessionError};
use smartbin_storage::{NewPickupOrder, OrderStatus, StorageError};

use super::json_error;
use super::state::AppState;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "busy": state.pipeline.is_busy(),
    });
    (StatusCode::OK, Json(response))
}

/// An image sent as a `data:` URL or as bare base64.
#[derive(Debug, Deserialize)]
pub(crate) struct ImagePayload {
    image: String,
    /// MIME type for bare base64; defaults to JPEG.
    #[serde(default)]
    mime_type: Option<String>,
}

impl ImagePayload {
    fn decode(&self) -> Result<EncodedImage, Response> {
        let image = if self.image.starts_with("data:") {
            EncodedImage::from_data_url(&self.image)
        } else {
            EncodedImage::from_base64(
                &self.image,
                self.mime_type.as_deref().unwrap_or("image/jpeg"),
            )
        };
        match image {
            Some(img) if !img.is_empty() => Ok(img),
            _ => Err(json_error(StatusCode::BAD_REQUEST, "image must be non-empty base64 or a data URL")
                .into_response()),
        }
    }
}

/// POST /classify
pub(crate) async fn handle_classify(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ImagePayload>,
) -> Response {
    let image = match payload.decode() {
        Ok(img) => img,
        Err(resp) => return resp,
    };

    let outcome = state.classifier.classify_image_tagged(&image).await;
    let origin = outcome.origin();
    let reason = outcome.reason().cloned();
    let result = match outcome {
        Outcome::Ok(c) | Outcome::Fallback { value: c, .. } => c.result,
        Outcome::Failed(_) => smartbin_core::fallback_classification(),
    };

    let response = serde_json::json!({
        "classification": result,
        "origin": origin,
        "fallback_reason": reason,
    });
    (StatusCode::OK, Json(response)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct DepositRequest {
    #[serde(flatten)]
    image: ImagePayload,
    /// Weight as a number in `unit`; omitted means a placeholder reading.
    #[serde(default)]
    weight: Option<f64>,
    #[serde(default)]
    unit: WeightUnit,
    #[serde(default)]
    quality: Option<u8>,
}

/// POST /deposits
pub(crate) async fn handle_deposit(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DepositRequest>,
) -> Response {
    let image = match request.image.decode() {
        Ok(img) => img,
        Err(resp) => return resp,
    };
    let quality = request.quality.unwrap_or(state.default_quality);
    if quality > 100 {
        return json_error(StatusCode::BAD_REQUEST, "quality must be 0..=100").into_response();
    }

    let measurer: Box<dyn SampleMeasurer> = match request.weight {
        Some(w) => Box::new(UserSuppliedMeasurer {
            weight_grams: request.unit.to_grams(w),
            quality_percent: quality,
        }),
        None => Box::new(RandomizedMeasurer::new()),
    };

    let sink = CollectingSink::new();
    let report = match state
        .pipeline
        .deposit_sample(WasteSample::new(image), measurer.as_ref(), &sink)
        .await
    {
        Ok(r) => r,
        Err(PipelineError::Busy) => {
            return json_error(StatusCode::CONFLICT, "a deposit is already in progress")
                .into_response()
        }
        Err(e) => {
            return json_error(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string()).into_response()
        }
    };

    // Crediting writes the session file, so it runs on the blocking pool.
    let credit_state = Arc::clone(&state);
    let reward = report.reward.clone();
    let credited = tokio::task::spawn_blocking(move || {
        let mut store = credit_state.session.blocking_lock();
        store.credit_deposit(&reward).map(|s| s.clone())
    })
    .await;
    let session = match credited {
        Ok(Ok(s)) => Some(s),
        Ok(Err(SessionError::NotLoggedIn)) => None,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "failed to credit session");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "session credit task failed");
            None
        }
    };

    let mut body = match serde_json::to_value(&report) {
        Ok(v) => v,
        Err(e) => {
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()).into_response()
        }
    };
    if let Some(obj) = body.as_object_mut() {
        obj.insert(
            "notifications".to_string(),
            serde_json::to_value(sink.notifications()).unwrap_or_default(),
        );
        if let Some(s) = session {
            obj.insert(
                "session".to_string(),
                serde_json::to_value(s).unwrap_or_default(),
            );
        }
    }
    (StatusCode::OK, Json(body)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatRequest {
    message: String,
    #[serde(default)]
    context: Option<String>,
}

/// POST /chat
pub(crate) async fn handle_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    if request.message.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "message must not be empty").into_response();
    }
    let reply = state
        .assistant
        .ask(&request.message, request.context.as_deref())
        .await;
    (StatusCode::OK, Json(reply)).into_response()
}

/// GET /session
pub(crate) async fn handle_session(State(state): State<Arc<AppState>>) -> Response {
    let store = state.session.lock().await;
    match store.current() {
        Some(s) => (StatusCode::OK, Json(s.clone())).into_response(),
        None => json_error(StatusCode::NOT_FOUND, "not logged in").into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadsQuery {
    #[serde(default = "default_upload_limit")]
    limit: usize,
}

fn default_upload_limit() -> usize {
    20
}

/// GET /uploads
pub(crate) async fn handle_list_uploads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UploadsQuery>,
) -> Response {
    match state.records.list_waste_uploads(query.limit).await {
        Ok(uploads) => (StatusCode::OK, Json(serde_json::json!({ "uploads": uploads }))).into_response(),
        Err(e) => storage_error(e),
    }
}

/// POST /orders
pub(crate) async fn handle_create_order(
    State(state): State<Arc<AppState>>,
    Json(order): Json<NewPickupOrder>,
) -> Response {
    match state.records.insert_pickup_order(order).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => storage_error(e),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OrdersQuery {
    #[serde(default)]
    status: Option<String>,
}

/// GET /orders
pub(crate) async fn handle_list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OrdersQuery>,
) -> Response {
    let status = match query.status.as_deref().map(str::parse::<OrderStatus>) {
        None => None,
        Some(Ok(s)) => Some(s),
        Some(Err(e)) => return json_error(StatusCode::BAD_REQUEST, &e).into_response(),
    };
    match state.records.list_pickup_orders(status).await {
        Ok(orders) => (StatusCode::OK, Json(serde_json::json!({ "orders": orders }))).into_response(),
        Err(e) => storage_error(e),
    }
}

fn storage_error(e: StorageError) -> Response {
    let status = match &e {
        StorageError::RecordNotFound { .. } | StorageError::ObjectNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        StorageError::InvalidRecord { .. } => StatusCode::BAD_REQUEST,
        StorageError::AlreadyExists { .. } => StatusCode::CONFLICT,
        StorageError::Backend(_) => StatusCode::BAD_GATEWAY,
    };
    if status == StatusCode::BAD_GATEWAY {
        tracing::error!(error = %e, "storage backend failed");
    }
    json_error(status, &e.to_string()).into_response()
}
