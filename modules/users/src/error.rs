use axum::response::{IntoResponse, Response};
use platform_http_contracts::{CorrelationId, ErrorBody, ErrorCode};

use crate::repos::StoreError;
use crate::validation::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum UsersError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("Not found")]
    NotFound,

    #[error("email already exists")]
    DuplicateEmail,

    #[error("notification-service unavailable")]
    NotificationServiceUnavailable,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for UsersError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => UsersError::DuplicateEmail,
            other => UsersError::Store(other),
        }
    }
}

impl UsersError {
    pub fn to_body(&self, correlation_id: &CorrelationId) -> ErrorBody {
        let body = match self {
            UsersError::Validation(e) => ErrorBody::new(ErrorCode::ValidationError, e.message.clone())
                .with_details(e.details.clone()),
            UsersError::NotFound => ErrorBody::new(ErrorCode::NotFound, "Not found"),
            UsersError::DuplicateEmail => ErrorBody::new(ErrorCode::Conflict, "email already exists"),
            UsersError::NotificationServiceUnavailable => ErrorBody::new(
                ErrorCode::UpstreamUnavailable,
                "notification-service unavailable",
            ),
            UsersError::Store(_) => ErrorBody::new(ErrorCode::InternalError, "Internal Server Error"),
        };
        body.with_correlation_id(correlation_id.as_str())
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub error: UsersError,
    pub correlation_id: CorrelationId,
}

impl ApiError {
    pub fn new(error: impl Into<UsersError>, correlation_id: &CorrelationId) -> Self {
        Self {
            error: error.into(),
            correlation_id: correlation_id.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let UsersError::Store(e) = &self.error {
            tracing::error!(correlation_id = %self.correlation_id, error = %e, "Datastore failure");
        }
        self.error.to_body(&self.correlation_id).into_response()
    }
}
