//! Recipient existence checks against the user registry

use async_trait::async_trait;
use platform_http_contracts::{CorrelationId, CORRELATION_ID_HEADER};
use reqwest::StatusCode;
use std::time::Duration;

/// Outcome of asking the registry whether a recipient exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientCheck {
    Exists,
    NotFound,
    /// Registry timed out, was unreachable or answered with an unexpected status.
    Unavailable(String),
}

#[async_trait]
pub trait RecipientValidator: Send + Sync {
    async fn check(&self, recipient_id: i64, correlation_id: &CorrelationId) -> RecipientCheck;
}

/// Calls `GET {base_url}/users/{id}` with a per-request timeout.
///
/// - 2xx → exists
/// - 404 → not found
/// - anything else, timeouts and transport errors → unavailable
#[derive(Debug, Clone)]
pub struct HttpRecipientValidator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRecipientValidator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RecipientValidator for HttpRecipientValidator {
    async fn check(&self, recipient_id: i64, correlation_id: &CorrelationId) -> RecipientCheck {
        let url = format!("{}/users/{}", self.base_url, recipient_id);

        let response = self
            .client
            .get(&url)
            .header(CORRELATION_ID_HEADER, correlation_id.as_str())
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => RecipientCheck::Exists,
            Ok(resp) if resp.status() == StatusCode::NOT_FOUND => RecipientCheck::NotFound,
            Ok(resp) => RecipientCheck::Unavailable(format!(
                "user registry answered {}",
                resp.status()
            )),
            Err(e) if e.is_timeout() => {
                RecipientCheck::Unavailable("user registry timed out".to_string())
            }
            Err(e) => RecipientCheck::Unavailable(format!("user registry unreachable: {e}")),
        }
    }
}
