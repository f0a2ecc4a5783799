//! Notification CRUD routes
//!
//! Bodies are taken as raw JSON and run through [`crate::validation`] so that
//! malformed input always yields a `validation_error` body. The origin marker
//! is read here and nowhere else: past this point a request only carries
//! `skip_recipient_validation`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use platform_http_contracts::CorrelationId;
use serde_json::Value;
use std::sync::Arc;

use super::AppState;
use crate::error::ApiError;
use crate::models::Notification;
use crate::services::CreateNotification;
use crate::validation::{self, ValidationErrors};

fn json_body(
    body: Result<Json<Value>, JsonRejection>,
    cid: &CorrelationId,
) -> Result<Value, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::new(ValidationErrors::malformed(rejection.body_text()), cid))
}

fn path_id(raw: &str, cid: &CorrelationId) -> Result<i64, ApiError> {
    validation::parse_id(raw).map_err(|e| ApiError::new(e, cid))
}

/// POST /notifications
pub async fn create_notification(
    State(state): State<Arc<AppState>>,
    cid: CorrelationId,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Notification>), ApiError> {
    let body = json_body(body, &cid)?;
    let notification = validation::parse_create(&body).map_err(|e| ApiError::new(e, &cid))?;

    let request = CreateNotification {
        notification,
        skip_recipient_validation: state.origins.is_trusted_request(&headers),
        correlation_id: cid.clone(),
    };

    let created = state
        .dispatch
        .create(request)
        .await
        .map_err(|e| ApiError::new(e, &cid))?;

    Ok((StatusCode::CREATED, Json(created.notification)))
}

/// GET /notifications
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    cid: CorrelationId,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let rows = state
        .dispatch
        .list()
        .await
        .map_err(|e| ApiError::new(e, &cid))?;
    Ok(Json(rows))
}

/// GET /notifications/{id}
pub async fn get_notification(
    State(state): State<Arc<AppState>>,
    cid: CorrelationId,
    Path(raw_id): Path<String>,
) -> Result<Json<Notification>, ApiError> {
    let id = path_id(&raw_id, &cid)?;
    let row = state
        .dispatch
        .get(id)
        .await
        .map_err(|e| ApiError::new(e, &cid))?;
    Ok(Json(row))
}

/// PUT /notifications/{id}
pub async fn update_notification(
    State(state): State<Arc<AppState>>,
    cid: CorrelationId,
    Path(raw_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Notification>, ApiError> {
    let id = path_id(&raw_id, &cid)?;
    let body = json_body(body, &cid)?;
    let patch = validation::parse_update(&body).map_err(|e| ApiError::new(e, &cid))?;

    let row = state
        .dispatch
        .update(id, patch)
        .await
        .map_err(|e| ApiError::new(e, &cid))?;
    Ok(Json(row))
}

/// DELETE /notifications/{id}
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    cid: CorrelationId,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = path_id(&raw_id, &cid)?;
    state
        .dispatch
        .delete(id)
        .await
        .map_err(|e| ApiError::new(e, &cid))?;
    Ok(StatusCode::NO_CONTENT)
}
