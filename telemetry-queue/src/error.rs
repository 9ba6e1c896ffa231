//! Error types for the queue client.

use thiserror::Error;

/// Errors raised while talking to the broker.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The broker could not be reached. Fatal at startup.
    #[error("Failed to connect to broker at {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: lapin::Error,
    },

    /// Opening or configuring a channel failed.
    #[error("Channel error: {0}")]
    Channel(#[source] lapin::Error),

    /// The queue could not be declared.
    #[error("Failed to declare queue '{queue}': {source}")]
    Declare {
        queue: String,
        #[source]
        source: lapin::Error,
    },

    /// The broker refused or dropped a publish.
    #[error("Failed to publish to queue '{queue}': {source}")]
    Publish {
        queue: String,
        #[source]
        source: lapin::Error,
    },

    /// Subscribing to the queue or receiving a delivery failed.
    #[error("Consumer error on queue '{queue}': {source}")]
    Consume {
        queue: String,
        #[source]
        source: lapin::Error,
    },

    /// Acknowledging or rejecting a delivery failed.
    #[error("Failed to settle delivery {delivery_tag}: {source}")]
    Ack {
        delivery_tag: u64,
        #[source]
        source: lapin::Error,
    },

    /// The reading could not be serialized.
    #[error("Failed to encode reading: {0}")]
    Encode(#[from] serde_json::Error),
}
