// In-process Broker
// A pub/sub broker living in one process, used to run several nodes side by side

use crate::transport::traits::{
    pattern_matches, InboundMessage, Publisher, Subscriber, Subscription, TransportError,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::trace;

struct PatternSubscriber {
    pattern: String,
    sender: mpsc::UnboundedSender<InboundMessage>,
}

#[derive(Default)]
struct BrokerInner {
    subscribers: Mutex<Vec<PatternSubscriber>>,
    published: AtomicU64,
    fail_publish: AtomicBool,
    fail_subscribe: AtomicBool,
}

/// In-memory broker implementing both transport halves
///
/// Clones share the same broker, so every node handed a clone sees every
/// other node's traffic exactly as it would on a shared Redis instance.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total messages accepted for publishing
    pub fn published_count(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }

    /// Number of live pattern subscriptions
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers();
        subscribers.retain(|s| !s.sender.is_closed());
        subscribers.len()
    }

    /// Make every following publish fail
    pub fn set_fail_publish(&self, fail: bool) {
        self.inner.fail_publish.store(fail, Ordering::Relaxed);
    }

    /// Make every following subscribe fail
    pub fn set_fail_subscribe(&self, fail: bool) {
        self.inner.fail_subscribe.store(fail, Ordering::Relaxed);
    }

    /// Drop every subscription, ending each subscriber's stream once its
    /// queued messages are read
    pub fn close(&self) {
        self.subscribers().clear();
    }

    fn subscribers(&self) -> std::sync::MutexGuard<'_, Vec<PatternSubscriber>> {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Publisher for MemoryBroker {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if self.inner.fail_publish.load(Ordering::Relaxed) {
            return Err(TransportError::PublishFailed(format!(
                "broker rejected publish on {topic}"
            )));
        }

        let mut subscribers = self.subscribers();
        subscribers.retain(|s| !s.sender.is_closed());

        for subscriber in subscribers.iter() {
            if pattern_matches(&subscriber.pattern, topic) {
                let message = InboundMessage::new(&subscriber.pattern, topic, payload.clone());
                // A receiver dropped between retain and send is harmless
                let _ = subscriber.sender.send(message);
            }
        }

        self.inner.published.fetch_add(1, Ordering::Relaxed);
        trace!(topic, bytes = payload.len(), "published");
        Ok(())
    }
}

impl Subscriber for MemoryBroker {
    async fn psubscribe(&self, pattern: &str) -> Result<Subscription, TransportError> {
        if self.inner.fail_subscribe.load(Ordering::Relaxed) {
            return Err(TransportError::SubscribeFailed(format!(
                "broker rejected psubscribe to {pattern}"
            )));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers().push(PatternSubscriber {
            pattern: pattern.to_string(),
            sender,
        });
        Ok(receiver)
    }
}
