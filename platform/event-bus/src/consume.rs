//! Subscription loop with the ack/reject policy applied

use crate::{BusMessage, BusResult, EventBus};
use futures::StreamExt;
use std::fmt::Display;
use std::future::Future;

/// Subscribe to `subject` and run `handler` for every delivery.
///
/// - handler `Ok` → the delivery is acknowledged
/// - handler `Err` → the delivery is rejected without requeue and the error is logged
///
/// Returns when the subscription stream ends (connection closed). Subscription
/// failures are returned to the caller.
pub async fn consume<B, H, Fut, E>(bus: &B, subject: &str, handler: H) -> BusResult<()>
where
    B: EventBus + ?Sized,
    H: Fn(BusMessage) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut stream = bus.subscribe(subject).await?;
    tracing::info!(subject = %subject, "Subscribed");

    while let Some(delivery) = stream.next().await {
        let msg = delivery.message.clone();

        match handler(msg).await {
            Ok(()) => {
                if let Err(e) = delivery.ack().await {
                    tracing::error!(subject = %subject, error = %e, "Failed to ack delivery");
                }
            }
            Err(e) => {
                tracing::error!(
                    subject = %subject,
                    error = %e,
                    "Handler failed, rejecting delivery without requeue"
                );
                if let Err(e) = delivery.reject().await {
                    tracing::error!(subject = %subject, error = %e, "Failed to reject delivery");
                }
            }
        }
    }

    tracing::warn!(subject = %subject, "Subscription stream ended");
    Ok(())
}
