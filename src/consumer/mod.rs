//! Queue consumer with a strict one-message-in-flight discipline.
//!
//! The [`Broker`] trait abstracts the handful of queue operations the
//! consumer needs, with an AMQP implementation backed by lapin and an
//! in-memory implementation for tests and in-process producers.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected ──▶ Connected ──▶ Subscribed ──▶ Consuming ──┬──▶ Closing (interrupt)
//!                                                           └──▶ Failed  (error)
//! ```
//!
//! Both terminal states close the broker connection before [`Consumer::run`]
//! returns.
//!
//! # Startup
//!
//! Subscribing deletes the queue and declares it again (durable). Any backlog
//! left from before the restart is discarded so the window starts from fresh
//! readings.

mod amqp;
mod memory;

pub use amqp::{amqp_uri, AmqpBroker};
pub use memory::{BrokerEvent, MemoryBroker, MemoryPublisher};

use std::future::Future;

use async_trait::async_trait;
use smokewatch_notify::Notifier;
use tracing::{debug, error, info, warn};

use crate::error::{BrokerError, ConsumerError, ProcessingError};
use crate::monitor::{Outcome, StallMonitor};

/// Default queue carrying the monitored item's readings.
pub const DEFAULT_QUEUE: &str = "02-food-A";

/// Maximum number of unacknowledged deliveries.
pub const PREFETCH_COUNT: u16 = 1;

/// A message handed out by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Tag used to acknowledge this delivery.
    pub delivery_tag: u64,
    /// Raw message body.
    pub body: Vec<u8>,
}

/// Queue operations used by the consumer.
///
/// Implementations are driven from a single task; none of the methods are
/// called concurrently.
#[async_trait]
pub trait Broker: Send {
    /// Delete a queue and everything in it. Deleting a missing queue is not an error.
    async fn delete_queue(&mut self, queue: &str) -> Result<(), BrokerError>;

    /// Declare a durable queue.
    async fn declare_durable_queue(&mut self, queue: &str) -> Result<(), BrokerError>;

    /// Limit the number of unacknowledged deliveries.
    async fn set_prefetch(&mut self, count: u16) -> Result<(), BrokerError>;

    /// Start a manual-ack subscription on a queue.
    async fn start_consuming(&mut self, queue: &str) -> Result<(), BrokerError>;

    /// Wait for the next delivery.
    ///
    /// Returns `None` when the broker ends the subscription.
    async fn recv(&mut self) -> Option<Result<Delivery, BrokerError>>;

    /// Acknowledge a delivery.
    async fn ack(&mut self, delivery_tag: u64) -> Result<(), BrokerError>;

    /// Close the connection.
    async fn close(&mut self) -> Result<(), BrokerError>;

    /// Human-readable description of the broker endpoint.
    fn description(&self) -> &str;
}

/// Where the consumer is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Disconnected,
    Connected,
    Subscribed,
    Consuming,
    /// Shutting down after an interrupt.
    Closing,
    /// Shutting down after an error.
    Failed,
}

/// Consumes readings from one queue and feeds them to a [`StallMonitor`].
pub struct Consumer<B, N> {
    broker: B,
    queue: String,
    monitor: StallMonitor<N>,
    state: ConsumerState,
    acked: u64,
    stalls: u64,
}

impl<B: Broker, N: Notifier> Consumer<B, N> {
    /// Wrap an already connected broker.
    pub fn new(broker: B, queue: impl Into<String>, monitor: StallMonitor<N>) -> Self {
        let mut consumer = Self {
            broker,
            queue: queue.into(),
            monitor,
            state: ConsumerState::Disconnected,
            acked: 0,
            stalls: 0,
        };
        consumer.transition(ConsumerState::Connected);
        consumer
    }

    /// Subscribe and process messages until `shutdown` resolves or an error occurs.
    ///
    /// `shutdown` is only raced against waiting for the next delivery; a
    /// message that is already being processed is always finished and
    /// acknowledged first. The broker connection is closed on every path.
    pub async fn run<S>(&mut self, shutdown: S) -> Result<(), ConsumerError>
    where
        S: Future<Output = ()> + Send,
    {
        let result = match self.subscribe().await {
            Ok(()) => self.consume(shutdown).await.map_err(ConsumerError::from),
            Err(e) => Err(e),
        };

        match &result {
            Ok(()) => self.transition(ConsumerState::Closing),
            Err(e) => {
                error!("Consumer stopped: {}", e);
                self.transition(ConsumerState::Failed);
            }
        }

        info!("Closing connection to {}", self.broker.description());
        if let Err(e) = self.broker.close().await {
            warn!("Failed to close broker connection: {}", e);
        }

        result
    }

    /// Reset the queue, set the in-flight limit and start the subscription.
    async fn subscribe(&mut self) -> Result<(), ConsumerError> {
        let queue = self.queue.clone();
        let setup_error = |source| ConsumerError::Setup {
            queue: queue.clone(),
            source,
        };

        self.broker
            .delete_queue(&queue)
            .await
            .map_err(setup_error)?;
        self.broker
            .declare_durable_queue(&queue)
            .await
            .map_err(setup_error)?;
        self.broker
            .set_prefetch(PREFETCH_COUNT)
            .await
            .map_err(setup_error)?;
        self.transition(ConsumerState::Subscribed);

        self.broker
            .start_consuming(&queue)
            .await
            .map_err(setup_error)?;
        self.transition(ConsumerState::Consuming);

        info!(
            "Ready for work on queue '{}' at {}. To exit press CTRL+C",
            queue,
            self.broker.description()
        );
        Ok(())
    }

    async fn consume<S>(&mut self, shutdown: S) -> Result<(), ProcessingError>
    where
        S: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        loop {
            let delivery = tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("User interrupted continuous listening process");
                    return Ok(());
                }
                next = self.broker.recv() => match next {
                    Some(delivery) => delivery?,
                    None => return Err(ProcessingError::StreamClosed),
                },
            };

            self.handle(delivery).await?;
        }
    }

    /// Process one delivery, then acknowledge it.
    ///
    /// The ack does not depend on the alert outcome. A malformed body is
    /// returned as an error without acknowledging.
    async fn handle(&mut self, delivery: Delivery) -> Result<Outcome, ProcessingError> {
        let outcome = self
            .monitor
            .process(&delivery.body)
            .await
            .map_err(|source| ProcessingError::Decode {
                delivery_tag: delivery.delivery_tag,
                source,
            })?;

        if outcome.is_stall() {
            self.stalls += 1;
        }

        self.broker.ack(delivery.delivery_tag).await?;
        self.acked += 1;
        debug!(delivery_tag = delivery.delivery_tag, "Acknowledged");

        Ok(outcome)
    }

    fn transition(&mut self, next: ConsumerState) {
        debug!(from = ?self.state, to = ?next, "Consumer state change");
        self.state = next;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConsumerState {
        self.state
    }

    /// Queue being consumed.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Number of messages acknowledged so far.
    pub fn acked(&self) -> u64 {
        self.acked
    }

    /// Number of messages that found the temperature stalled.
    pub fn stalls(&self) -> u64 {
        self.stalls
    }

    /// The stall monitor fed by this consumer.
    pub fn monitor(&self) -> &StallMonitor<N> {
        &self.monitor
    }

    /// The underlying broker.
    pub fn broker(&self) -> &B {
        &self.broker
    }
}

impl<B: Broker, N> std::fmt::Debug for Consumer<B, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("broker", &self.broker.description())
            .field("queue", &self.queue)
            .field("state", &self.state)
            .field("acked", &self.acked)
            .finish()
    }
}
