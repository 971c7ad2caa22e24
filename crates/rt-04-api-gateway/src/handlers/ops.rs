//! Operational endpoints.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use crate::domain::ApiError;
use crate::router::AppState;

/// Prometheus text exposition content type.
pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// `GET /health`: `{"status": "ok"}` when storage answers, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    if let Err(e) = state.store.ping().await {
        warn!(error = %e, "Health check failed");
        return Err(ApiError::Unavailable(e.to_string()));
    }
    Ok(Json(json!({ "status": "ok" })))
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state
        .metrics
        .set_live_subscribers(state.fanout.subscriber_count());
    let body = state
        .metrics
        .encode()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body))
}
