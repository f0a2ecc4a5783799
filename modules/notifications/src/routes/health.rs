use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use super::AppState;

/// Liveness: the process is up and serving.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "notifications-rs",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness: the datastore answers.
pub async fn ready(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    match state.dispatch.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "not_ready", "error": e.to_string() })),
            )
        }
    }
}
