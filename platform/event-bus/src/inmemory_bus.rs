//! In-memory implementation of the EventBus trait for testing and development

use crate::{Acknowledger, BusError, BusMessage, BusResult, Delivery, EventBus};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// How a delivery was settled by its consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Acked,
    Rejected,
}

/// EventBus implementation using in-memory channels
///
/// This implementation is suitable for:
/// - Unit tests (no external dependencies)
/// - Local development without a broker
///
/// Messages are broadcast to all subscribers via a Tokio broadcast channel and
/// filtered per subscription pattern. Every settlement (ack/reject) is recorded
/// so tests can assert on consumer behaviour, and the bus can be flipped to
/// unavailable to simulate a broker outage.
#[derive(Clone)]
pub struct InMemoryBus {
    inner: Arc<Inner>,
}

struct Inner {
    sender: Mutex<Option<broadcast::Sender<BusMessage>>>,
    available: AtomicBool,
    published: Mutex<Vec<BusMessage>>,
    settlements: Mutex<Vec<(String, Settlement)>>,
}

impl InMemoryBus {
    /// Create a new in-memory event bus with a buffer of 1000 messages.
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    /// Create a new in-memory event bus with a custom buffer size
    pub fn with_capacity(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self {
            inner: Arc::new(Inner {
                sender: Mutex::new(Some(sender)),
                available: AtomicBool::new(true),
                published: Mutex::new(Vec::new()),
                settlements: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Simulate the broker going away (`false`) or coming back (`true`).
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Close the bus: open subscription streams end after draining.
    pub fn shutdown(&self) {
        self.inner.sender.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    /// Every message accepted by `publish`, in order.
    pub fn published(&self) -> Vec<BusMessage> {
        self.inner
            .published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Every settlement recorded so far as `(subject, settlement)`.
    pub fn settlements(&self) -> Vec<(String, Settlement)> {
        self.inner
            .settlements
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Wait until at least `count` subscriptions are open (bounded to ~2s).
    pub async fn wait_for_subscribers(&self, count: usize) {
        for _ in 0..400 {
            if self.subscriber_count() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Wait until at least `count` settlements are recorded or `timeout` elapses.
    pub async fn wait_for_settlements(
        &self,
        count: usize,
        timeout: Duration,
    ) -> Vec<(String, Settlement)> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let settled = self.settlements();
            if settled.len() >= count || tokio::time::Instant::now() >= deadline {
                return settled;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn subscriber_count(&self) -> usize {
        self.inner
            .sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    fn ensure_available(&self) -> BusResult<()> {
        if self.inner.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BusError::ConnectionError(
                "in-memory bus marked unavailable".to_string(),
            ))
        }
    }

    /// Check if a subject matches a subscription pattern
    ///
    /// Supports NATS-style wildcards:
    /// - `*` matches exactly one token
    /// - `>` matches one or more tokens
    fn matches_pattern(subject: &str, pattern: &str) -> bool {
        let subject_tokens: Vec<&str> = subject.split('.').collect();
        let pattern_tokens: Vec<&str> = pattern.split('.').collect();

        let mut s_idx = 0;
        let mut p_idx = 0;

        while s_idx < subject_tokens.len() && p_idx < pattern_tokens.len() {
            let pattern_token = pattern_tokens[p_idx];

            if pattern_token == ">" {
                return true;
            } else if pattern_token == "*" || subject_tokens[s_idx] == pattern_token {
                s_idx += 1;
                p_idx += 1;
            } else {
                return false;
            }
        }

        s_idx == subject_tokens.len() && p_idx == pattern_tokens.len()
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

struct InMemoryAcker {
    subject: String,
    inner: Arc<Inner>,
}

impl InMemoryAcker {
    fn record(&self, settlement: Settlement) {
        self.inner
            .settlements
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((self.subject.clone(), settlement));
    }
}

#[async_trait]
impl Acknowledger for InMemoryAcker {
    async fn ack(self: Box<Self>) -> BusResult<()> {
        self.record(Settlement::Acked);
        Ok(())
    }

    async fn reject(self: Box<Self>) -> BusResult<()> {
        self.record(Settlement::Rejected);
        Ok(())
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()> {
        self.ensure_available()?;

        let msg = BusMessage::new(subject.to_string(), payload);
        let guard = self.inner.sender.lock().unwrap_or_else(|e| e.into_inner());
        let sender = guard
            .as_ref()
            .ok_or_else(|| BusError::ConnectionError("in-memory bus is shut down".to_string()))?;

        self.inner
            .published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(msg.clone());

        // No receivers is fine: the message is simply not observed.
        let _ = sender.send(msg);
        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> BusResult<BoxStream<'static, Delivery>> {
        self.ensure_available()?;

        let mut receiver = self
            .inner
            .sender
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|s| s.subscribe())
            .ok_or_else(|| BusError::SubscribeError("in-memory bus is shut down".to_string()))?;
        let pattern = pattern.to_string();
        let inner = self.inner.clone();

        let stream = async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(msg) => {
                        if Self::matches_pattern(&msg.subject, &pattern) {
                            let acker = InMemoryAcker {
                                subject: msg.subject.clone(),
                                inner: inner.clone(),
                            };
                            yield Delivery::new(msg, Box::new(acker));
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "InMemoryBus: subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };

        Ok(stream.boxed())
    }
}
