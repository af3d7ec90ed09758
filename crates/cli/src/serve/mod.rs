//! `smartbin serve` -- HTTP JSON API for deposits, chat and pickup orders.
//!
//! Security features:
//! - CORS headers on all responses (permissive for kiosk frontends)
//! - Per-IP rate limiting (default: 60 req/min, `server.rate_limit`)
//! - Optional API key via `server.api_key` or `SMARTBIN_SERVICE_KEY`
//!
//! Endpoints:
//! - GET  /health     - Server status (exempt from auth)
//! - POST /classify   - Classify an image, store nothing
//! - POST /deposits   - Classify, store and reward one deposit
//! - POST /chat       - Ask the EcoBot assistant
//! - GET  /session    - Current session balance
//! - GET  /uploads    - Stored uploads, newest first
//! - POST /orders     - Create a pickup order
//! - GET  /orders     - List pickup orders, optionally by `status`
//!
//! All responses use Content-Type: application/json.

mod handlers;
mod middleware;
mod state;

use std::path::Path;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};

use self::handlers::{
    handle_chat, handle_classify, handle_create_order, handle_deposit, handle_health,
    handle_list_orders, handle_list_uploads, handle_not_found, handle_session,
};
use self::middleware::{auth_middleware, rate_limit_middleware};
pub(crate) use self::state::AppState;
use self::state::RateLimiter;
use crate::app::{CliError, Services};
use crate::config::SmartbinConfig;

/// Maximum request body size: 10 MB, enough for a base64 photo.
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Rate limit window duration in seconds (1 minute).
const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Load config, build services and serve until Ctrl+C.
pub(crate) async fn run(config_path: Option<&Path>, port: Option<u16>) -> Result<(), CliError> {
    let config = SmartbinConfig::load(config_path)?;
    let port = port.unwrap_or(config.server.port);
    let services = Services::from_config(config)?;
    let state = Arc::new(AppState::new(services)?);
    start_server(state, port).await
}

/// Build the router over `state`.
pub(crate) fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/classify", post(handle_classify))
        .route("/deposits", post(handle_deposit))
        .route("/chat", post(handle_chat))
        .route("/session", get(handle_session))
        .route("/uploads", get(handle_list_uploads))
        .route("/orders", get(handle_list_orders).post(handle_create_order))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Listen on `port` until a shutdown signal arrives.
pub(crate) async fn start_server(state: Arc<AppState>, port: u16) -> Result<(), CliError> {
    if state.api_key.is_some() {
        tracing::info!("API key authentication enabled");
    }
    tracing::info!(
        rate_limit = state.rate_limiter.max_requests,
        "rate limit per IP per minute"
    );

    let app = router(state);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("SmartBin API listening on http://{}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server shut down");
    Ok(())
}

/// Wait for Ctrl+C. If the handler cannot be installed, run until killed.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received shutdown signal"),
        Err(e) => {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
