//! # EventBus Abstraction
//!
//! Topic-routed publish/subscribe used by the notification services.
//!
//! ## Implementations
//!
//! - **NatsBus**: Production implementation using NATS JetStream. The connection
//!   is established lazily on first use and reused for every publish/subscribe.
//! - **InMemoryBus**: Test/dev implementation using in-memory channels
//!
//! ## Delivery Semantics
//!
//! Subscriptions yield [`Delivery`] values. Each delivery must be settled exactly
//! once: [`Delivery::ack`] removes it from the queue, [`Delivery::reject`] drops it
//! without requeue. A delivery that is never settled is redelivered once the
//! subscriber goes away (at-least-once).
//!
//! [`consume`] wraps that policy around a handler: success acks, failure rejects.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use event_bus::{consume, EventBus, InMemoryBus};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = InMemoryBus::new();
//!
//! bus.publish("notifications.created", b"{}".to_vec()).await?;
//!
//! consume(&bus, "notifications.created", |msg| async move {
//!     println!("Received: {} bytes on {}", msg.payload.len(), msg.subject);
//!     Ok::<(), std::io::Error>(())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

mod consume;
mod inmemory_bus;
mod nats_bus;

pub use consume::consume;
pub use inmemory_bus::{InMemoryBus, Settlement};
pub use nats_bus::{NatsBus, NatsBusConfig};

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::HashMap;
use std::fmt;

/// A message received from the event bus
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// The subject (routing key) this message was published to
    pub subject: String,
    /// The message payload (raw bytes)
    pub payload: Vec<u8>,
    /// Optional headers
    pub headers: Option<HashMap<String, String>>,
}

impl BusMessage {
    pub fn new(subject: String, payload: Vec<u8>) -> Self {
        Self {
            subject,
            payload,
            headers: None,
        }
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }
}

/// Broker-side settlement of a single delivery.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    /// Remove the message from the queue.
    async fn ack(self: Box<Self>) -> BusResult<()>;

    /// Drop the message without requeue.
    async fn reject(self: Box<Self>) -> BusResult<()>;
}

/// A message together with the handle that settles it.
pub struct Delivery {
    pub message: BusMessage,
    acker: Box<dyn Acknowledger>,
}

impl Delivery {
    pub fn new(message: BusMessage, acker: Box<dyn Acknowledger>) -> Self {
        Self { message, acker }
    }

    pub async fn ack(self) -> BusResult<()> {
        self.acker.ack().await
    }

    pub async fn reject(self) -> BusResult<()> {
        self.acker.reject().await
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Errors that can occur when using the event bus
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("failed to publish message: {0}")]
    PublishError(String),

    #[error("failed to subscribe to subject: {0}")]
    SubscribeError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("failed to settle delivery: {0}")]
    AckError(String),
}

impl BusError {
    /// True when the broker itself could not be reached.
    pub fn is_connection(&self) -> bool {
        matches!(self, BusError::ConnectionError(_))
    }
}

/// Result type for event bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Core event bus abstraction for topic-routed messaging
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish a message durably under a routing key
    ///
    /// Returns once the broker has accepted (and persisted) the message.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()>;

    /// Open an exclusive subscription bound to a routing key
    ///
    /// Only messages published after the subscription is opened are delivered.
    async fn subscribe(&self, subject: &str) -> BusResult<BoxStream<'static, Delivery>>;

    /// Flush and release the underlying connection, if any.
    async fn close(&self) -> BusResult<()> {
        Ok(())
    }
}

impl fmt::Debug for dyn EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventBus")
    }
}
