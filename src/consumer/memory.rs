//! In-memory broker.
//!
//! Holds one queue in process and records every operation the consumer
//! performs on it. Like RabbitMQ it refuses to ack a delivery tag that is not
//! outstanding. Unlike RabbitMQ it does not block when the in-flight limit is
//! reached: asking for another delivery at the limit is an error, so a
//! consumer that reads ahead of its acks fails loudly.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{watch, Notify};

use super::{Broker, Delivery};
use crate::error::BrokerError;

/// An operation observed by the in-memory broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    QueueDeleted { queue: String, discarded: usize },
    QueueDeclared { queue: String, durable: bool },
    PrefetchSet(u16),
    ConsumeStarted(String),
    Delivered(u64),
    Acked(u64),
    Closed,
}

#[derive(Debug, Default)]
struct Shared {
    messages: VecDeque<Vec<u8>>,
    events: Vec<BrokerEvent>,
    publisher_closed: bool,
}

#[derive(Debug)]
struct Inner {
    shared: Mutex<Shared>,
    queued: Notify,
    changed: watch::Sender<u64>,
}

impl Inner {
    fn record(&self, event: BrokerEvent) {
        self.shared.lock().events.push(event);
        self.changed.send_modify(|version| *version += 1);
    }
}

/// Broker side of an in-memory queue.
///
/// # Example
///
/// ```
/// use smokewatch::MemoryBroker;
///
/// let (publisher, broker) = MemoryBroker::create("memory://pit");
/// publisher.publish("05/29/24 14:00:00, 150.2");
/// ```
#[derive(Debug)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
    description: String,
    prefetch: Option<u16>,
    consuming: Option<String>,
    unacked: BTreeSet<u64>,
    next_tag: u64,
    closed: bool,
}

/// Producer side of an in-memory queue, also used to inspect what the
/// consumer did.
#[derive(Debug, Clone)]
pub struct MemoryPublisher {
    inner: Arc<Inner>,
    changes: watch::Receiver<u64>,
}

impl MemoryBroker {
    /// Create a connected broker and its publisher.
    pub fn create(description: &str) -> (MemoryPublisher, Self) {
        let (changed, changes) = watch::channel(0);
        let inner = Arc::new(Inner {
            shared: Mutex::new(Shared::default()),
            queued: Notify::new(),
            changed,
        });

        let publisher = MemoryPublisher {
            inner: inner.clone(),
            changes,
        };
        let broker = Self {
            inner,
            description: format!("memory: {}", description),
            prefetch: None,
            consuming: None,
            unacked: BTreeSet::new(),
            next_tag: 1,
            closed: false,
        };
        (publisher, broker)
    }

    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.closed {
            Err(BrokerError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn delete_queue(&mut self, queue: &str) -> Result<(), BrokerError> {
        self.ensure_open()?;
        let discarded = {
            let mut shared = self.inner.shared.lock();
            let discarded = shared.messages.len();
            shared.messages.clear();
            discarded
        };
        self.inner.record(BrokerEvent::QueueDeleted {
            queue: queue.to_string(),
            discarded,
        });
        Ok(())
    }

    async fn declare_durable_queue(&mut self, queue: &str) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.inner.record(BrokerEvent::QueueDeclared {
            queue: queue.to_string(),
            durable: true,
        });
        Ok(())
    }

    async fn set_prefetch(&mut self, count: u16) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.prefetch = Some(count);
        self.inner.record(BrokerEvent::PrefetchSet(count));
        Ok(())
    }

    async fn start_consuming(&mut self, queue: &str) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.consuming = Some(queue.to_string());
        self.inner
            .record(BrokerEvent::ConsumeStarted(queue.to_string()));
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<Delivery, BrokerError>> {
        if let Err(e) = self.ensure_open() {
            return Some(Err(e));
        }
        if self.consuming.is_none() {
            return Some(Err(BrokerError::Channel(
                "recv before start_consuming".to_string(),
            )));
        }

        loop {
            if let Some(limit) = self.prefetch {
                if self.unacked.len() >= usize::from(limit) {
                    return Some(Err(BrokerError::PrefetchExceeded(limit)));
                }
            }

            let next = {
                let mut shared = self.inner.shared.lock();
                match shared.messages.pop_front() {
                    Some(body) => Some(body),
                    None if shared.publisher_closed => return None,
                    None => None,
                }
            };

            if let Some(body) = next {
                let delivery_tag = self.next_tag;
                self.next_tag += 1;
                self.unacked.insert(delivery_tag);
                self.inner.record(BrokerEvent::Delivered(delivery_tag));
                return Some(Ok(Delivery { delivery_tag, body }));
            }

            self.inner.queued.notified().await;
        }
    }

    async fn ack(&mut self, delivery_tag: u64) -> Result<(), BrokerError> {
        self.ensure_open()?;
        if !self.unacked.remove(&delivery_tag) {
            return Err(BrokerError::UnknownDeliveryTag(delivery_tag));
        }
        self.inner.record(BrokerEvent::Acked(delivery_tag));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.closed = true;
        self.inner.record(BrokerEvent::Closed);
        Ok(())
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl MemoryPublisher {
    /// Append a message to the queue.
    pub fn publish(&self, body: impl Into<Vec<u8>>) {
        self.inner.shared.lock().messages.push_back(body.into());
        self.inner.queued.notify_one();
    }

    /// End the subscription once the queue drains.
    pub fn close(&self) {
        self.inner.shared.lock().publisher_closed = true;
        self.inner.queued.notify_one();
    }

    /// Messages waiting in the queue.
    pub fn pending(&self) -> usize {
        self.inner.shared.lock().messages.len()
    }

    /// Every operation recorded so far.
    pub fn events(&self) -> Vec<BrokerEvent> {
        self.inner.shared.lock().events.clone()
    }

    /// Acknowledged delivery tags, in ack order.
    pub fn acked(&self) -> Vec<u64> {
        self.inner
            .shared
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                BrokerEvent::Acked(tag) => Some(*tag),
                _ => None,
            })
            .collect()
    }

    /// Wait until the recorded operations satisfy `predicate`.
    pub async fn wait_for<F>(&self, predicate: F)
    where
        F: Fn(&[BrokerEvent]) -> bool,
    {
        let mut changes = self.changes.clone();
        loop {
            let satisfied = predicate(&self.inner.shared.lock().events);
            if satisfied {
                return;
            }
            if changes.changed().await.is_err() {
                return;
            }
        }
    }

    /// Wait until the consumer has subscribed.
    pub async fn wait_for_consumer(&self) {
        self.wait_for(|events| {
            events
                .iter()
                .any(|e| matches!(e, BrokerEvent::ConsumeStarted(_)))
        })
        .await;
    }

    /// Wait until `count` deliveries have been acknowledged.
    pub async fn wait_for_acks(&self, count: usize) {
        self.wait_for(|events| {
            events
                .iter()
                .filter(|e| matches!(e, BrokerEvent::Acked(_)))
                .count()
                >= count
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn subscribed() -> (MemoryPublisher, MemoryBroker) {
        let (publisher, mut broker) = MemoryBroker::create("test");
        broker.set_prefetch(1).await.unwrap();
        broker.start_consuming("q").await.unwrap();
        (publisher, broker)
    }

    #[tokio::test]
    async fn test_delivers_in_order() {
        let (publisher, mut broker) = subscribed().await;
        publisher.publish("a");
        publisher.publish("b");

        let first = broker.recv().await.unwrap().unwrap();
        assert_eq!(first.delivery_tag, 1);
        assert_eq!(first.body, b"a");
        broker.ack(1).await.unwrap();

        let second = broker.recv().await.unwrap().unwrap();
        assert_eq!(second.delivery_tag, 2);
        assert_eq!(second.body, b"b");
    }

    #[tokio::test]
    async fn test_prefetch_limit_enforced() {
        let (publisher, mut broker) = subscribed().await;
        publisher.publish("a");
        publisher.publish("b");

        broker.recv().await.unwrap().unwrap();
        let err = broker.recv().await.unwrap().unwrap_err();
        assert!(matches!(err, BrokerError::PrefetchExceeded(1)));
    }

    #[tokio::test]
    async fn test_double_ack_rejected() {
        let (publisher, mut broker) = subscribed().await;
        publisher.publish("a");

        let delivery = broker.recv().await.unwrap().unwrap();
        broker.ack(delivery.delivery_tag).await.unwrap();
        let err = broker.ack(delivery.delivery_tag).await.unwrap_err();
        assert!(matches!(err, BrokerError::UnknownDeliveryTag(1)));
    }

    #[tokio::test]
    async fn test_delete_discards_backlog() {
        let (publisher, mut broker) = MemoryBroker::create("test");
        publisher.publish("old-1");
        publisher.publish("old-2");

        broker.delete_queue("q").await.unwrap();

        assert_eq!(publisher.pending(), 0);
        assert_eq!(
            publisher.events(),
            vec![BrokerEvent::QueueDeleted {
                queue: "q".to_string(),
                discarded: 2
            }]
        );
    }

    #[tokio::test]
    async fn test_recv_waits_for_publish() {
        let (publisher, mut broker) = subscribed().await;

        let handle = tokio::spawn(async move { broker.recv().await.map(|r| r.map(|d| d.body)) });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        publisher.publish("late");

        let body = handle.await.unwrap().unwrap().unwrap();
        assert_eq!(body, b"late");
    }

    #[tokio::test]
    async fn test_publisher_close_ends_stream() {
        let (publisher, mut broker) = subscribed().await;
        publisher.close();
        assert!(broker.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_closed_broker_rejects_operations() {
        let (_publisher, mut broker) = subscribed().await;
        broker.close().await.unwrap();

        assert!(matches!(broker.ack(1).await, Err(BrokerError::Closed)));
        assert!(matches!(broker.close().await, Err(BrokerError::Closed)));
        assert!(matches!(broker.recv().await, Some(Err(BrokerError::Closed))));
    }

    #[test]
    fn test_description() {
        let (_publisher, broker) = MemoryBroker::create("memory://pit");
        assert_eq!(broker.description(), "memory: memory://pit");
    }
}
