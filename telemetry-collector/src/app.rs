//! Collector startup and shutdown sequence.
//!
//! Startup binds the HTTP listener first and only then connects to the
//! broker and starts draining. Every fatal startup error therefore happens
//! before a single delivery has been acknowledged.

use std::future::Future;
use std::sync::Arc;

use telemetry_queue::{redact_url, QueueClient, QueueError};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::CollectorConfig;
use crate::consumer::QueueDrain;
use crate::ingest::{IngestCounts, Ingestor};
use crate::server::CollectorServer;
use crate::store::Store;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot start without the message broker at {url}: {source}")]
    Broker {
        url: String,
        #[source]
        source: QueueError,
    },
}

/// A started collector: listener bound and, when enabled, the queue drain
/// running.
#[derive(Debug)]
pub struct Collector {
    server: CollectorServer,
    listener: TcpListener,
    ingestor: Ingestor,
    queue: Option<(Arc<QueueClient>, QueueDrain)>,
}

impl Collector {
    pub async fn start(config: &CollectorConfig) -> Result<Self, StartupError> {
        let ingestor = Ingestor::new(Store::new());
        let server = CollectorServer::new(config.server.clone(), ingestor.clone());
        let listener = server.bind().await.map_err(|source| StartupError::Bind {
            addr: config.server.listen_addr.clone(),
            source,
        })?;

        let queue = if config.consumer.enabled {
            let client = QueueClient::connect(&config.queue)
                .await
                .map_err(|source| StartupError::Broker {
                    url: redact_url(&config.queue.url),
                    source,
                })?;
            let client = Arc::new(client);
            let drain = QueueDrain::spawn(client.clone(), ingestor.clone());
            Some((client, drain))
        } else {
            info!("Queue consumption disabled, accepting direct pushes only");
            None
        };

        Ok(Self {
            server,
            listener,
            ingestor,
            queue,
        })
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    /// Serve until `shutdown` resolves, then stop the drain and close the
    /// broker connection.
    pub async fn run<F>(self, shutdown: F) -> std::io::Result<IngestCounts>
    where
        F: Future<Output = ()>,
    {
        self.server.serve(self.listener, shutdown).await?;

        if let Some((client, drain)) = self.queue {
            if drain.is_finished() {
                warn!("Queue drain had already stopped before shutdown");
            }
            drain.abort();
            if let Err(e) = client.close().await {
                warn!(error = %e, "Failed to close queue connection");
            }
        }

        Ok(self.ingestor.stats())
    }
}
