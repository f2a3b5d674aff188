//! Publish/subscribe boundary between processes.
//!
//! Machines in different processes never call each other. They publish
//! [`Message`]s onto topics, and each process runs a [`BusAdapter`] that
//! decodes what arrives on its inbound topics and hands it to its driver.
//!
//! The broker itself is behind the [`Bus`] trait; [`InMemoryBus`] implements
//! it for a single-process deployment and for tests.

mod adapter;
mod codec;
mod memory;

pub use adapter::{AdapterStats, BusAdapter};
pub use codec::{decode, ArgError, Message, ProtocolError};
pub use memory::{topic_matches, InMemoryBus};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BusError {
    #[error("invalid topic '{0}'")]
    InvalidTopic(String),

    #[error("invalid topic filter '{0}'")]
    InvalidFilter(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("no tokio runtime available to listen on '{0}'")]
    NoRuntime(String),

    #[error("bus is closed")]
    Closed,
}

/// A payload received on a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Stream of messages matching one topic filter.
#[derive(Debug)]
pub struct Subscription {
    filter: String,
    receiver: mpsc::UnboundedReceiver<BusMessage>,
}

impl Subscription {
    pub fn new(filter: impl Into<String>, receiver: mpsc::UnboundedReceiver<BusMessage>) -> Self {
        Self {
            filter: filter.into(),
            receiver,
        }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Next message, or `None` once the bus has dropped this subscription.
    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<BusMessage> {
        self.receiver.try_recv().ok()
    }
}

/// A topic-based message broker.
///
/// `publish` must not block: it is called from inside machine actions.
pub trait Bus: Send + Sync {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), BusError>;

    /// Subscribe to every topic matching `filter` (`+` and `#` wildcards).
    fn subscribe(&self, filter: &str) -> Result<Subscription, BusError>;

    /// Encode and publish a message.
    fn publish_message(&self, topic: &str, message: &Message) -> Result<(), BusError> {
        let payload = message.encode()?;
        debug!(topic, payload = %message, "Publishing");
        self.publish(topic, &payload)
    }
}
