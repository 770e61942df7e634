//! # smokewatch
//!
//! Watches a queue of temperature readings for one monitored item and emails
//! an alert when the temperature stalls.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐  delivery   ┌──────────┐  body   ┌──────────────┐  stall  ┌──────────┐
//! │  Broker  │────────────▶│ Consumer │────────▶│ StallMonitor │────────▶│ Notifier │
//! │ (AMQP /  │◀────────────│  (loop)  │◀────────│   (window)   │         │  (SMTP)  │
//! │  memory) │     ack     └──────────┘ outcome └──────────────┘         └──────────┘
//! └──────────┘
//! ```
//!
//! - **[`consumer`]**: the [`Broker`] seam, the AMQP and in-memory brokers, and
//!   the [`Consumer`] loop that processes one message at a time and acks it
//! - **[`monitor`]**: [`StallMonitor`], which decodes readings, keeps the
//!   sliding window and calls the notifier on a stall
//! - **[`error`]**: connection, processing and broker errors
//!
//! The window itself lives in [`smokewatch_types`]; alert delivery lives in
//! [`smokewatch_notify`].
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Consume the default queue on a local RabbitMQ
//! smokewatch
//!
//! # Another broker and queue
//! smokewatch --host rabbit.local --queue 03-food-B
//! ```
//!
//! ### As a library with an in-memory broker
//!
//! ```
//! use async_trait::async_trait;
//! use smokewatch::{Consumer, MemoryBroker, StallMonitor};
//! use smokewatch_notify::{AlertError, Notifier};
//!
//! struct PrintNotifier;
//!
//! #[async_trait]
//! impl Notifier for PrintNotifier {
//!     async fn send(&self, subject: &str, _body: &str) -> Result<(), AlertError> {
//!         println!("{subject}");
//!         Ok(())
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let (publisher, broker) = MemoryBroker::create("pit");
//! let monitor = StallMonitor::new("Food A", PrintNotifier);
//! let mut consumer = Consumer::new(broker, "02-food-A", monitor);
//!
//! // Ends with an error once the publisher closes and the queue drains.
//! publisher.close();
//! assert!(consumer.run(std::future::pending()).await.is_err());
//! # });
//! ```

pub mod consumer;
pub mod error;
pub mod monitor;

pub use consumer::{
    amqp_uri, AmqpBroker, Broker, BrokerEvent, Consumer, ConsumerState, Delivery, MemoryBroker,
    MemoryPublisher, DEFAULT_QUEUE, PREFETCH_COUNT,
};
pub use error::{BrokerError, ConsumerError, ProcessingError};
pub use monitor::{Outcome, StallMonitor};
