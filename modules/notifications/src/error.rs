use axum::response::{IntoResponse, Response};
use platform_http_contracts::{CorrelationId, ErrorBody, ErrorCode};

use crate::repos::StoreError;
use crate::validation::ValidationErrors;

/// Failure of a notification operation, mapped one-to-one onto an error kind.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("recipient {recipient_id} not found")]
    RecipientNotFound { recipient_id: i64 },

    #[error("recipient registry unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DispatchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DispatchError::Validation(_) => ErrorCode::ValidationError,
            DispatchError::RecipientNotFound { .. } => ErrorCode::RecipientNotFound,
            DispatchError::UpstreamUnavailable(_) => ErrorCode::UpstreamUnavailable,
            DispatchError::NotFound => ErrorCode::NotFound,
            DispatchError::Store(_) => ErrorCode::InternalError,
        }
    }

    /// Client-facing body. Datastore details stay in the logs.
    pub fn to_body(&self, correlation_id: &CorrelationId) -> ErrorBody {
        let body = match self {
            DispatchError::Validation(e) => {
                ErrorBody::new(self.code(), e.message.clone()).with_details(e.details.clone())
            }
            DispatchError::RecipientNotFound { recipient_id } => {
                ErrorBody::new(self.code(), "recipient not found").with_recipient_id(*recipient_id)
            }
            DispatchError::UpstreamUnavailable(_) => {
                ErrorBody::new(self.code(), "user-service unavailable")
            }
            DispatchError::NotFound => ErrorBody::new(self.code(), "Not found"),
            DispatchError::Store(_) => ErrorBody::new(self.code(), "Internal Server Error"),
        };
        body.with_correlation_id(correlation_id.as_str())
    }
}

/// Route-level error: the failure plus the request's correlation id.
#[derive(Debug)]
pub struct ApiError {
    pub error: DispatchError,
    pub correlation_id: CorrelationId,
}

impl ApiError {
    pub fn new(error: impl Into<DispatchError>, correlation_id: &CorrelationId) -> Self {
        Self {
            error: error.into(),
            correlation_id: correlation_id.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self.error {
            DispatchError::Store(e) => tracing::error!(
                correlation_id = %self.correlation_id,
                error = %e,
                "Datastore failure"
            ),
            DispatchError::UpstreamUnavailable(reason) => tracing::warn!(
                correlation_id = %self.correlation_id,
                reason = %reason,
                "Recipient check unavailable"
            ),
            _ => {}
        }
        self.error.to_body(&self.correlation_id).into_response()
    }
}
