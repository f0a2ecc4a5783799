//! NATS JetStream implementation of the EventBus trait

use crate::{Acknowledger, BusError, BusMessage, BusResult, Delivery, EventBus};
use async_nats::jetstream::{self, consumer, stream, AckKind};
use async_nats::Client;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::collections::HashMap;
use tokio::sync::OnceCell;

/// Connection settings for [`NatsBus`]
#[derive(Debug, Clone)]
pub struct NatsBusConfig {
    /// Server URL, e.g. `nats://localhost:4222`
    pub url: String,
    /// Name of the JetStream stream that captures the domain's subjects
    pub stream_name: String,
    /// Subjects captured by the stream, e.g. `notifications.>`
    pub subjects: Vec<String>,
}

impl NatsBusConfig {
    pub fn new(url: impl Into<String>, stream_name: impl Into<String>, subjects: Vec<String>) -> Self {
        Self {
            url: url.into(),
            stream_name: stream_name.into(),
            subjects,
        }
    }
}

struct Connection {
    client: Client,
    jetstream: jetstream::Context,
    stream: stream::Stream,
}

/// EventBus implementation using NATS JetStream
///
/// One connection and one JetStream context per `NatsBus`, established on
/// first use and shared by every publish and subscribe afterwards. The
/// underlying client multiplexes concurrent publishes over a single writer,
/// so frames from concurrent callers never interleave.
///
/// - The stream uses file storage: published messages survive a broker restart.
/// - `publish` waits for the server's publish ack.
/// - `subscribe` creates an ephemeral pull consumer (exclusive, anonymous) with
///   explicit acks; `reject` terminates the message so it is never redelivered.
///
/// # Example
/// ```rust,no_run
/// use event_bus::{EventBus, NatsBus, NatsBusConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = NatsBus::new(NatsBusConfig::new(
///     "nats://localhost:4222",
///     "NOTIFICATIONS",
///     vec!["notifications.>".to_string()],
/// ));
///
/// bus.publish("notifications.created", b"hello".to_vec()).await?;
/// # Ok(())
/// # }
/// ```
pub struct NatsBus {
    config: NatsBusConfig,
    connection: OnceCell<Connection>,
}

impl NatsBus {
    pub fn new(config: NatsBusConfig) -> Self {
        Self {
            config,
            connection: OnceCell::new(),
        }
    }

    /// Connect (once) and make sure the stream exists.
    async fn connection(&self) -> BusResult<&Connection> {
        self.connection
            .get_or_try_init(|| async {
                tracing::info!(url = %self.config.url, "Connecting to NATS");
                let client = async_nats::connect(&self.config.url)
                    .await
                    .map_err(|e| BusError::ConnectionError(e.to_string()))?;
                let jetstream = jetstream::new(client.clone());

                let stream = jetstream
                    .get_or_create_stream(stream::Config {
                        name: self.config.stream_name.clone(),
                        subjects: self.config.subjects.clone(),
                        storage: stream::StorageType::File,
                        ..Default::default()
                    })
                    .await
                    .map_err(|e| BusError::ConnectionError(e.to_string()))?;

                tracing::info!(stream = %self.config.stream_name, "JetStream stream ready");

                Ok(Connection {
                    client,
                    jetstream,
                    stream,
                })
            })
            .await
    }
}

struct JetStreamAcker {
    message: jetstream::Message,
}

#[async_trait]
impl Acknowledger for JetStreamAcker {
    async fn ack(self: Box<Self>) -> BusResult<()> {
        self.message
            .ack()
            .await
            .map_err(|e| BusError::AckError(e.to_string()))
    }

    async fn reject(self: Box<Self>) -> BusResult<()> {
        self.message
            .ack_with(AckKind::Term)
            .await
            .map_err(|e| BusError::AckError(e.to_string()))
    }
}

fn to_bus_message(message: &jetstream::Message) -> BusMessage {
    let mut msg = BusMessage::new(message.subject.to_string(), message.payload.to_vec());

    if let Some(nats_headers) = &message.headers {
        let mut headers = HashMap::new();
        for (key, values) in nats_headers.iter() {
            if let Some(value) = values.first() {
                headers.insert(key.to_string(), value.to_string());
            }
        }
        if !headers.is_empty() {
            msg = msg.with_headers(headers);
        }
    }

    msg
}

#[async_trait]
impl EventBus for NatsBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()> {
        let conn = self.connection().await?;

        let ack = conn
            .jetstream
            .publish(subject.to_string(), payload.into())
            .await
            .map_err(|e| BusError::PublishError(e.to_string()))?;
        ack.await
            .map_err(|e| BusError::PublishError(e.to_string()))?;

        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> BusResult<BoxStream<'static, Delivery>> {
        let conn = self.connection().await?;

        let consumer = conn
            .stream
            .create_consumer(consumer::pull::Config {
                filter_subject: subject.to_string(),
                ack_policy: consumer::AckPolicy::Explicit,
                deliver_policy: consumer::DeliverPolicy::New,
                ..Default::default()
            })
            .await
            .map_err(|e| BusError::SubscribeError(e.to_string()))?;

        let messages = consumer
            .messages()
            .await
            .map_err(|e| BusError::SubscribeError(e.to_string()))?;

        let stream = messages.filter_map(|result| async move {
            match result {
                Ok(message) => {
                    let msg = to_bus_message(&message);
                    Some(Delivery::new(msg, Box::new(JetStreamAcker { message })))
                }
                Err(e) => {
                    tracing::error!(error = %e, "JetStream delivery error");
                    None
                }
            }
        });

        Ok(stream.boxed())
    }

    async fn close(&self) -> BusResult<()> {
        if let Some(conn) = self.connection.get() {
            conn.client
                .flush()
                .await
                .map_err(|e| BusError::ConnectionError(e.to_string()))?;
            tracing::info!("NATS connection flushed");
        }
        Ok(())
    }
}
