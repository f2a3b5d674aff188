//! In-process broker with MQTT-style topic filters.

use super::{Bus, BusError, BusMessage, Subscription};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::trace;

struct Subscriber {
    filter: String,
    sender: mpsc::UnboundedSender<BusMessage>,
}

/// Broker delivering every published payload to all matching subscriptions.
///
/// Delivery is immediate and never blocks the publisher. Subscriptions whose
/// receiver has been dropped are pruned on the next publish.
#[derive(Default)]
pub struct InMemoryBus {
    subscribers: Mutex<Vec<Subscriber>>,
    published: AtomicU64,
    closed: AtomicBool,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of payloads accepted so far.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Drop every subscription; listeners see their stream end.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.subscribers.lock().clear();
    }
}

impl Bus for InMemoryBus {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), BusError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BusError::Closed);
        }
        if topic.is_empty() || topic.contains(['+', '#']) {
            return Err(BusError::InvalidTopic(topic.to_string()));
        }
        self.published.fetch_add(1, Ordering::Relaxed);

        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|subscriber| {
            if !topic_matches(&subscriber.filter, topic) {
                return !subscriber.sender.is_closed();
            }
            let message = BusMessage {
                topic: topic.to_string(),
                payload: payload.to_vec(),
            };
            subscriber.sender.send(message).is_ok()
        });
        trace!(topic, bytes = payload.len(), "Delivered");
        Ok(())
    }

    fn subscribe(&self, filter: &str) -> Result<Subscription, BusError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BusError::Closed);
        }
        if !valid_filter(filter) {
            return Err(BusError::InvalidFilter(filter.to_string()));
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.lock().push(Subscriber {
            filter: filter.to_string(),
            sender,
        });
        Ok(Subscription::new(filter, receiver))
    }
}

fn valid_filter(filter: &str) -> bool {
    if filter.is_empty() {
        return false;
    }
    let levels: Vec<&str> = filter.split('/').collect();
    let last = levels.len() - 1;
    levels.iter().enumerate().all(|(index, level)| match *level {
        "#" => index == last,
        "+" => true,
        level => !level.contains(['+', '#']),
    })
}

/// Whether `topic` matches `filter`. `+` matches exactly one level, a
/// trailing `#` matches the parent level and everything below it.
///
/// ```
/// use chargepark::bus::topic_matches;
///
/// assert!(topic_matches("ttm4115/+/charger", "ttm4115/team_04/charger"));
/// assert!(topic_matches("ttm4115/#", "ttm4115/team_04/car"));
/// assert!(!topic_matches("ttm4115/+", "ttm4115/team_04/car"));
/// ```
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(expected), Some(actual)) if expected == actual => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
