//! Publishing of notification lifecycle events

use event_bus::{BusError, EventBus, InMemoryBus, NatsBus, NatsBusConfig};
use platform_http_contracts::BestEffort;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{BusConfig, BusType};
use crate::models::NotificationCreatedEvent;

/// Routing key for newly created notifications
pub const NOTIFICATION_CREATED_SUBJECT: &str = "notifications.created";

/// Subjects captured by the notifications stream
pub const NOTIFICATION_SUBJECTS: &str = "notifications.>";

/// Upper bound on a single publish, broker ack included.
pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the configured bus. NATS connects lazily on first use.
pub fn build_bus(config: &BusConfig) -> Arc<dyn EventBus> {
    match config.bus_type {
        BusType::Nats => {
            tracing::info!(url = %config.nats_url, stream = %config.stream_name, "Using NATS event bus");
            Arc::new(NatsBus::new(NatsBusConfig::new(
                config.nats_url.clone(),
                config.stream_name.clone(),
                vec![NOTIFICATION_SUBJECTS.to_string()],
            )))
        }
        BusType::InMemory => {
            tracing::info!("Using in-memory event bus");
            Arc::new(InMemoryBus::new())
        }
    }
}

/// Publish a notifications.created event.
///
/// Never fails the caller: broker problems come back as `Dropped` for the
/// caller to log.
pub async fn publish_notification_created(
    bus: &dyn EventBus,
    event: &NotificationCreatedEvent,
) -> BestEffort<BusError> {
    let payload = match serde_json::to_vec(event) {
        Ok(payload) => payload,
        Err(e) => return BestEffort::Dropped(BusError::PublishError(e.to_string())),
    };

    let result = match tokio::time::timeout(
        PUBLISH_TIMEOUT,
        bus.publish(NOTIFICATION_CREATED_SUBJECT, payload),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(BusError::PublishError(format!(
            "no broker ack within {}s",
            PUBLISH_TIMEOUT.as_secs()
        ))),
    };

    BestEffort::from_result(result)
}
