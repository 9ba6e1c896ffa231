//! Long-lived task draining the durable queue into the store.

use std::sync::Arc;

use telemetry_queue::QueueClient;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::ingest::Ingestor;

/// Handle to the background queue consumer.
///
/// When the consumer stops (broker closed the stream or the connection
/// broke) the reason is logged and the HTTP API keeps serving direct pushes.
#[derive(Debug)]
pub struct QueueDrain {
    handle: JoinHandle<()>,
}

impl QueueDrain {
    /// Start consuming on a background task.
    pub fn spawn(client: Arc<QueueClient>, ingestor: Ingestor) -> Self {
        let handle = tokio::spawn(async move {
            let queue = client.queue().to_string();
            match client
                .consume(|body: &[u8]| ingestor.ingest_delivery(body))
                .await
            {
                Ok(handled) => warn!(
                    queue = %queue,
                    handled,
                    "Queue consumer ended; only direct pushes will be accepted"
                ),
                Err(e) => error!(
                    queue = %queue,
                    error = %e,
                    "Queue consumer failed; only direct pushes will be accepted"
                ),
            }
        });

        Self { handle }
    }

    /// Whether the consumer task has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop consuming. Unacknowledged deliveries are returned to the queue
    /// by the broker when the channel closes.
    pub fn abort(&self) {
        self.handle.abort();
    }
}
