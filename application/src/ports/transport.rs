//! Transport fabric port
//!
//! Two primitives decouple every component of the pipeline:
//!
//! - **Work queues** per topic: at-least-once, competing consumers. A message
//!   is handed to exactly one consumer per delivery, but may be delivered
//!   again.
//! - **Pub/sub channels** keyed by name: broadcast to the live subscribers at
//!   publish time, not durable. Delivery order to a single subscriber follows
//!   publish order.

use async_trait::async_trait;
use magi_domain::{QueueMessage, SessionEvent, SessionId};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    #[error("Transport closed")]
    Closed,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A message taken from a work queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub payload: String,
}

/// Live subscription to a pub/sub channel.
///
/// Dropping the subscription unsubscribes; messages published afterwards are
/// not buffered for it. A fabric that keeps per-channel bookkeeping registers
/// an unsubscribe hook with [`ChannelSubscription::on_drop`] to release it.
pub struct ChannelSubscription {
    channel: String,
    receiver: mpsc::UnboundedReceiver<String>,
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl ChannelSubscription {
    pub fn new(channel: impl Into<String>, receiver: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            channel: channel.into(),
            receiver,
            unsubscribe: None,
        }
    }

    /// Run `hook` when the subscription is dropped, after the receiver closes.
    pub fn on_drop(mut self, hook: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.unsubscribe = Some(Box::new(hook));
        self
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Wait for the next message. `None` once the transport has shut down.
    pub async fn recv(&mut self) -> Option<String> {
        self.receiver.recv().await
    }
}

impl Drop for ChannelSubscription {
    fn drop(&mut self) {
        self.receiver.close();
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

/// Queue + pub/sub substrate
#[async_trait]
pub trait TransportFabric: Send + Sync {
    /// Append a message to a topic's work queue.
    async fn publish_to_queue(&self, topic: &str, message: String) -> Result<(), TransportError>;

    /// Block until a message is available on any of `topics`.
    ///
    /// When several topics have messages waiting, consumption rotates between
    /// them so no topic starves another.
    async fn consume_from_queue(&self, topics: &[&str]) -> Result<Delivery, TransportError>;

    /// Broadcast to the channel's live subscribers; returns how many received it.
    async fn publish_to_channel(&self, channel: &str, message: String)
    -> Result<usize, TransportError>;

    /// Subscribe to a channel. Only messages published after this returns are seen.
    async fn subscribe_to_channel(&self, channel: &str)
    -> Result<ChannelSubscription, TransportError>;
}

/// Typed helpers over [`TransportFabric`].
#[async_trait]
pub trait TransportFabricExt: TransportFabric {
    /// Encode a [`QueueMessage`] and publish it on the topic its kind maps to.
    async fn enqueue(&self, message: &QueueMessage) -> Result<(), TransportError> {
        let raw = message
            .encode()
            .map_err(|e| TransportError::Serialization(e.to_string()))?;
        self.publish_to_queue(message.topic(), raw).await
    }

    /// Encode a [`SessionEvent`] and publish it on the session's result channel.
    async fn publish_event(
        &self,
        session_id: &SessionId,
        event: &SessionEvent,
    ) -> Result<usize, TransportError> {
        let raw = event
            .encode()
            .map_err(|e| TransportError::Serialization(e.to_string()))?;
        self.publish_to_channel(&session_id.result_channel(), raw)
            .await
    }
}

impl<T: TransportFabric + ?Sized> TransportFabricExt for T {}
