//! Client side of the notification service's create endpoint
//!
//! Two call styles:
//! - welcome notifications are fire-and-forget: a background task whose
//!   failure is logged and otherwise ignored
//! - explicit notify calls are synchronous and tagged with this service's
//!   origin name so the notification service does not call back here to
//!   check a recipient we just looked up

use platform_http_contracts::{BestEffort, CorrelationId, CORRELATION_ID_HEADER, ORIGIN_HEADER};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::models::{NotifyRequest, User};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification-service unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("notification-service answered {0}")]
    Rejected(u16),
}

/// The notification service's answer, passed back to our caller as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct Forwarded {
    pub status: u16,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct NotificationClient {
    client: reqwest::Client,
    endpoint: String,
    welcome_timeout: Duration,
    notify_timeout: Duration,
    origin_name: String,
}

impl NotificationClient {
    pub fn new(
        base_url: &str,
        welcome_timeout: Duration,
        notify_timeout: Duration,
        origin_name: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/notifications", base_url.trim_end_matches('/')),
            welcome_timeout,
            notify_timeout,
            origin_name: origin_name.into(),
        }
    }

    /// Send the welcome notification for a freshly created user in the background.
    ///
    /// The returned handle may be dropped; the task runs to completion either way.
    pub fn send_welcome(
        &self,
        user: &User,
        correlation_id: &CorrelationId,
    ) -> JoinHandle<BestEffort<NotifyError>> {
        let request = self
            .client
            .post(&self.endpoint)
            .timeout(self.welcome_timeout)
            .header(CORRELATION_ID_HEADER, correlation_id.as_str())
            .json(&json!({
                "subject": format!("Welcome, {}!", user.name),
                "message": "Thanks for joining.",
                "recipientId": user.id,
            }));
        let user_id = user.id;
        let correlation_id = correlation_id.clone();

        tokio::spawn(async move {
            let result = match request.send().await {
                Ok(resp) if resp.status().is_success() => Ok(()),
                Ok(resp) => Err(NotifyError::Rejected(resp.status().as_u16())),
                Err(e) => Err(NotifyError::Transport(e)),
            };

            let outcome = BestEffort::from_result(result);
            match outcome.dropped() {
                None => tracing::info!(
                    correlation_id = %correlation_id,
                    recipient_id = user_id,
                    "Welcome notification sent"
                ),
                Some(e) => tracing::warn!(
                    correlation_id = %correlation_id,
                    recipient_id = user_id,
                    error = %e,
                    "Welcome notification dropped"
                ),
            }
            outcome
        })
    }

    /// Create a notification for `user_id` and wait for the answer.
    ///
    /// Any HTTP response, error statuses included, comes back as [`Forwarded`],
    /// with a `null` body when the reply is not JSON. Only transport failures
    /// (timeout, refused, truncated body) are errors.
    pub async fn notify(
        &self,
        user_id: i64,
        request: &NotifyRequest,
        correlation_id: &CorrelationId,
    ) -> Result<Forwarded, NotifyError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .timeout(self.notify_timeout)
            .header(CORRELATION_ID_HEADER, correlation_id.as_str())
            .header(ORIGIN_HEADER, &self.origin_name)
            .json(&json!({
                "subject": request.subject,
                "message": request.message,
                "recipientId": user_id,
            }))
            .send()
            .await?;

        let status = resp.status().as_u16();
        let bytes = resp.bytes().await?;
        // a reply without a JSON body still has its status forwarded
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Ok(Forwarded { status, body })
    }
}
