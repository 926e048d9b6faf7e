//! In-process transport fabric.
//!
//! Work queues and pub/sub channels for running every pipeline component in
//! one process:
//!
//! | Primitive | Storage | Delivery |
//! |-----------|---------|----------|
//! | Work queue | `VecDeque` per topic | one consumer per message, FIFO per topic |
//! | Channel | `mpsc` sender per subscriber | every live subscriber, publish order |
//!
//! Consumers block on a shared [`Notify`]. Every publish wakes all waiting
//! consumers; each re-checks its own topics, so a consumer never misses a
//! message published to a topic it is waiting on.

use async_trait::async_trait;
use magi_application::ports::transport::{
    ChannelSubscription, Delivery, TransportError, TransportFabric,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{Notify, mpsc};
use tracing::{debug, trace};

#[derive(Default)]
struct QueueState {
    queues: HashMap<String, VecDeque<String>>,
    /// Rotates the starting topic of multi-topic consumers
    cursor: usize,
}

impl QueueState {
    fn take(&mut self, topics: &[&str]) -> Option<Delivery> {
        if topics.is_empty() {
            return None;
        }
        let start = self.cursor % topics.len();
        for offset in 0..topics.len() {
            let topic = topics[(start + offset) % topics.len()];
            if let Some(payload) = self.queues.get_mut(topic).and_then(|q| q.pop_front()) {
                self.cursor = start + offset + 1;
                return Some(Delivery {
                    topic: topic.to_string(),
                    payload,
                });
            }
        }
        None
    }
}

type ChannelMap = HashMap<String, Vec<mpsc::UnboundedSender<String>>>;

/// Drop closed senders on `channel`; the entry goes once none are left.
fn prune_channel(channels: &RwLock<ChannelMap>, channel: &str) {
    let mut channels = channels.write().unwrap_or_else(|e| e.into_inner());
    if let Some(senders) = channels.get_mut(channel) {
        senders.retain(|tx| !tx.is_closed());
        if senders.is_empty() {
            channels.remove(channel);
            trace!("Channel {} has no subscribers left", channel);
        }
    }
}

/// Transport fabric backed by process memory.
#[derive(Default)]
pub struct InMemoryTransport {
    state: Mutex<QueueState>,
    available: Notify,
    channels: Arc<RwLock<ChannelMap>>,
    closed: AtomicBool,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages waiting on `topic`.
    pub fn queue_depth(&self, topic: &str) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .queues
            .get(topic)
            .map_or(0, VecDeque::len)
    }

    /// Live subscribers on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(channel)
            .map_or(0, |senders| senders.iter().filter(|tx| !tx.is_closed()).count())
    }

    /// Channels with at least one registered subscriber.
    pub fn channel_count(&self) -> usize {
        self.channels.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Shut the fabric down.
    ///
    /// Blocked consumers return [`TransportError::Closed`] and every channel
    /// subscription ends.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.available.notify_waiters();
        self.channels
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        debug!("In-memory transport closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.is_closed() {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TransportFabric for InMemoryTransport {
    async fn publish_to_queue(&self, topic: &str, message: String) -> Result<(), TransportError> {
        self.ensure_open()?;
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state
                .queues
                .entry(topic.to_string())
                .or_default()
                .push_back(message);
        }
        trace!("Queued message on {}", topic);
        self.available.notify_waiters();
        Ok(())
    }

    async fn consume_from_queue(&self, topics: &[&str]) -> Result<Delivery, TransportError> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            // Register interest before checking so a concurrent publish is not missed.
            notified.as_mut().enable();

            self.ensure_open()?;
            let taken = self
                .state
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take(topics);
            if let Some(delivery) = taken {
                return Ok(delivery);
            }

            notified.await;
        }
    }

    async fn publish_to_channel(
        &self,
        channel: &str,
        message: String,
    ) -> Result<usize, TransportError> {
        self.ensure_open()?;
        let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());
        let Some(senders) = channels.get_mut(channel) else {
            return Ok(0);
        };
        senders.retain(|tx| tx.send(message.clone()).is_ok());
        let delivered = senders.len();
        if senders.is_empty() {
            channels.remove(channel);
        }
        Ok(delivered)
    }

    async fn subscribe_to_channel(
        &self,
        channel: &str,
    ) -> Result<ChannelSubscription, TransportError> {
        self.ensure_open()?;
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(channel.to_string())
            .or_default()
            .push(tx);
        debug!("Subscribed to {}", channel);

        let channels = Arc::downgrade(&self.channels);
        let name = channel.to_string();
        Ok(ChannelSubscription::new(channel, rx).on_drop(move || {
            if let Some(channels) = channels.upgrade() {
                prune_channel(&channels, &name);
            }
        }))
    }
}
