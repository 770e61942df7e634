//! Error types for the consumer.
//!
//! Connection and processing errors end the process. Alert delivery errors
//! ([`smokewatch_notify::AlertError`]) never reach this level: the stall
//! monitor reports them and moves on.

use smokewatch_types::DecodeError;
use thiserror::Error;

/// Errors raised by a [`Broker`](crate::consumer::Broker) implementation.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Could not reach or handshake with the broker.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A channel operation was rejected or failed.
    #[error("Channel error: {0}")]
    Channel(String),

    /// Ack for a delivery that is not outstanding.
    #[error("Unknown delivery tag: {0}")]
    UnknownDeliveryTag(u64),

    /// A delivery was requested while the in-flight limit was already reached.
    #[error("In-flight limit of {0} exceeded")]
    PrefetchExceeded(u16),

    /// Operation on a closed connection.
    #[error("Connection closed")]
    Closed,
}

impl From<lapin::Error> for BrokerError {
    fn from(err: lapin::Error) -> Self {
        match err {
            lapin::Error::IOError(_) => BrokerError::Connection(err.to_string()),
            lapin::Error::InvalidConnectionState(_) => BrokerError::Closed,
            _ => BrokerError::Channel(err.to_string()),
        }
    }
}

/// Errors that stop the consume loop.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Message body could not be decoded into a reading.
    #[error("Malformed payload in delivery {delivery_tag}: {source}")]
    Decode {
        delivery_tag: u64,
        #[source]
        source: DecodeError,
    },

    /// Receiving or acknowledging failed.
    #[error("Broker error while consuming: {0}")]
    Broker(#[from] BrokerError),

    /// The broker ended the consumer stream.
    #[error("Consumer stream closed by broker")]
    StreamClosed,
}

/// Errors returned by [`Consumer`](crate::consumer::Consumer).
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// Broker unreachable at startup.
    #[error("Connection to broker at {host} failed: {source}")]
    Connection {
        host: String,
        #[source]
        source: BrokerError,
    },

    /// Queue reset, prefetch or subscription failed.
    #[error("Failed to subscribe to queue '{queue}': {source}")]
    Setup {
        queue: String,
        #[source]
        source: BrokerError,
    },

    /// Failure while consuming.
    #[error(transparent)]
    Processing(#[from] ProcessingError),
}
