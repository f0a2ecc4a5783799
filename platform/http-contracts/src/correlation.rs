//! Correlation id propagation
//!
//! Every request, response and event in a call chain carries the same opaque
//! correlation id. The first service to see a request without one generates it;
//! everyone downstream forwards it unchanged. It is only used for tracing.

use std::fmt;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Fresh UUID v4 correlation id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Read the id from request headers; blank or non-ASCII values count as absent.
    #[cfg(feature = "axum")]
    pub fn from_headers(headers: &http::HeaderMap) -> Option<Self> {
        headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::new)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(feature = "axum")]
mod axum_support {
    use super::{CorrelationId, CORRELATION_ID_HEADER};
    use axum::{
        body::Body,
        extract::FromRequestParts,
        http::{request::Parts, HeaderValue, Request},
        middleware::Next,
        response::Response,
    };
    use std::convert::Infallible;

    /// Resolve the request's correlation id (inbound header or a new one), store
    /// it in the request extensions and echo it on the response.
    pub async fn correlation_id_middleware(mut req: Request<Body>, next: Next) -> Response {
        let correlation_id =
            CorrelationId::from_headers(req.headers()).unwrap_or_else(CorrelationId::generate);

        req.extensions_mut().insert(correlation_id.clone());

        let mut res = next.run(req).await;
        if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
            res.headers_mut().insert(CORRELATION_ID_HEADER, value);
        }
        res
    }

    impl<S> FromRequestParts<S> for CorrelationId
    where
        S: Send + Sync,
    {
        type Rejection = Infallible;

        async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
            Ok(parts
                .extensions
                .get::<CorrelationId>()
                .cloned()
                .or_else(|| CorrelationId::from_headers(&parts.headers))
                .unwrap_or_else(CorrelationId::generate))
        }
    }
}

#[cfg(feature = "axum")]
pub use axum_support::correlation_id_middleware;
