//! notifications.created consumer
//!
//! Decodes each event and hands it to a [`NotificationSink`]. Deliveries that
//! cannot be decoded or delivered are rejected without requeue; everything
//! else is acknowledged once the sink returns.

use async_trait::async_trait;
use event_bus::{consume, BusMessage, BusResult, EventBus};
use tracing::Instrument;

use crate::event_bus::NOTIFICATION_CREATED_SUBJECT;
use crate::models::NotificationCreatedEvent;

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Where consumed notifications end up.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, event: &NotificationCreatedEvent) -> Result<(), SinkError>;
}

/// Default sink: records the delivery in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

#[async_trait]
impl NotificationSink for LoggingSink {
    async fn deliver(&self, event: &NotificationCreatedEvent) -> Result<(), SinkError> {
        let n = &event.notification;
        tracing::info!(
            notification_id = n.id,
            recipient_id = ?n.recipient_id,
            subject = %n.subject,
            message = %n.message,
            created_at = %n.created_at,
            "Notification delivered"
        );
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConsumeError {
    #[error("malformed notifications.created payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("sink failed: {0}")]
    Sink(SinkError),
}

/// Decode one message and deliver it.
pub async fn handle_notification_created(
    sink: &dyn NotificationSink,
    msg: &BusMessage,
) -> Result<(), ConsumeError> {
    let event: NotificationCreatedEvent = serde_json::from_slice(&msg.payload)?;

    let span = tracing::info_span!(
        "notification_created",
        correlation_id = %event.correlation_id,
        notification_id = event.notification.id,
    );

    sink.deliver(&event)
        .instrument(span)
        .await
        .map_err(ConsumeError::Sink)
}

/// Subscribe to notifications.created and process deliveries until the
/// subscription ends. Subscription failures are returned immediately.
pub async fn run_notification_created_consumer(
    bus: &dyn EventBus,
    sink: &dyn NotificationSink,
) -> BusResult<()> {
    tracing::info!(subject = NOTIFICATION_CREATED_SUBJECT, "Starting notification consumer");

    consume(bus, NOTIFICATION_CREATED_SUBJECT, move |msg| async move {
        handle_notification_created(sink, &msg).await
    })
    .await
}
