use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use platform_http_contracts::CorrelationId;
use serde_json::Value;
use std::sync::Arc;

use super::AppState;
use crate::error::{ApiError, UsersError};
use crate::models::User;
use crate::validation::{self, ValidationErrors};

fn json_body(
    body: Result<Json<Value>, JsonRejection>,
    cid: &CorrelationId,
) -> Result<Value, ApiError> {
    body.map(|Json(v)| v)
        .map_err(|r| ApiError::new(ValidationErrors::malformed(r.body_text()), cid))
}

fn path_id(raw: &str, cid: &CorrelationId) -> Result<i64, ApiError> {
    validation::parse_id(raw).map_err(|e| ApiError::new(e, cid))
}

/// GET /users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    cid: CorrelationId,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.store.list().await.map_err(|e| ApiError::new(e, &cid))?;
    Ok(Json(users))
}

/// GET /users/{id}
///
/// This is the lookup the notification service uses to check recipients.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    cid: CorrelationId,
    Path(raw_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = path_id(&raw_id, &cid)?;
    state
        .store
        .find(id)
        .await
        .map_err(|e| ApiError::new(e, &cid))?
        .map(Json)
        .ok_or_else(|| ApiError::new(UsersError::NotFound, &cid))
}

/// POST /users
///
/// Responds once the user is stored; the welcome notification goes out in
/// the background and never affects this response.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    cid: CorrelationId,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let body = json_body(body, &cid)?;
    let new_user = validation::parse_new_user(&body).map_err(|e| ApiError::new(e, &cid))?;

    if state
        .store
        .email_taken(&new_user.email, None)
        .await
        .map_err(|e| ApiError::new(e, &cid))?
    {
        return Err(ApiError::new(UsersError::DuplicateEmail, &cid));
    }

    let user = state
        .store
        .insert(&new_user)
        .await
        .map_err(|e| ApiError::new(e, &cid))?;
    tracing::info!(correlation_id = %cid, user_id = user.id, "User created");

    drop(state.notifier.send_welcome(&user, &cid));

    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    cid: CorrelationId,
    Path(raw_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let id = path_id(&raw_id, &cid)?;
    let body = json_body(body, &cid)?;
    let patch = validation::parse_user_patch(&body).map_err(|e| ApiError::new(e, &cid))?;

    if let Some(email) = &patch.email {
        if state
            .store
            .email_taken(email, Some(id))
            .await
            .map_err(|e| ApiError::new(e, &cid))?
        {
            return Err(ApiError::new(UsersError::DuplicateEmail, &cid));
        }
    }

    state
        .store
        .update(id, &patch)
        .await
        .map_err(|e| ApiError::new(e, &cid))?
        .map(Json)
        .ok_or_else(|| ApiError::new(UsersError::NotFound, &cid))
}

/// DELETE /users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    cid: CorrelationId,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = path_id(&raw_id, &cid)?;
    if state
        .store
        .delete(id)
        .await
        .map_err(|e| ApiError::new(e, &cid))?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::new(UsersError::NotFound, &cid))
    }
}

/// POST /users/{id}/notify
///
/// Synchronous proxy to the notification service. Its status and body are
/// returned unchanged; a transport failure becomes 503.
pub async fn notify_user(
    State(state): State<Arc<AppState>>,
    cid: CorrelationId,
    Path(raw_id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = path_id(&raw_id, &cid)?;

    let user = state
        .store
        .find(id)
        .await
        .map_err(|e| ApiError::new(e, &cid))?
        .ok_or_else(|| ApiError::new(UsersError::NotFound, &cid))?;

    let body = json_body(body, &cid)?;
    let request = validation::parse_notify(&body).map_err(|e| ApiError::new(e, &cid))?;

    match state.notifier.notify(user.id, &request, &cid).await {
        Ok(forwarded) => {
            tracing::info!(
                correlation_id = %cid,
                recipient_id = user.id,
                status = forwarded.status,
                "Notify forwarded"
            );
            let status =
                StatusCode::from_u16(forwarded.status).unwrap_or(StatusCode::BAD_GATEWAY);
            Ok((status, Json(forwarded.body)).into_response())
        }
        Err(e) => {
            tracing::warn!(
                correlation_id = %cid,
                recipient_id = user.id,
                error = %e,
                "Notification service unreachable"
            );
            Err(ApiError::new(UsersError::NotificationServiceUnavailable, &cid))
        }
    }
}
