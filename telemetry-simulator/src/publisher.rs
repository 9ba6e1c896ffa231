//! Delivery of readings to the collector.
//!
//! Two transports implement [`Publisher`]:
//!
//! - [`QueueClient`]: persistent message on the durable queue, survives a
//!   collector restart
//! - [`HttpPublisher`]: direct `POST` to the collector's `/telemetry` endpoint

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use telemetry_queue::{redact_url, QueueClient, QueueError};
use telemetry_types::{Reading, CONTENT_TYPE_JSON};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Collector rejected reading with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Transport used by the simulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PublisherMode {
    /// Durable queue (default)
    #[default]
    Queue,
    /// Direct HTTP push
    Http,
}

/// Sink for generated readings.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Deliver one reading. Errors are per reading; the caller decides
    /// whether to carry on.
    async fn publish(&self, reading: &Reading) -> Result<(), PublishError>;

    /// Human-readable destination, for logs.
    fn description(&self) -> String;

    /// Release the underlying connection.
    async fn close(&self) -> Result<(), PublishError> {
        Ok(())
    }
}

#[async_trait]
impl Publisher for QueueClient {
    async fn publish(&self, reading: &Reading) -> Result<(), PublishError> {
        QueueClient::publish(self, reading).await?;
        Ok(())
    }

    fn description(&self) -> String {
        format!(
            "queue '{}' at {}",
            self.queue(),
            redact_url(&self.config().url)
        )
    }

    async fn close(&self) -> Result<(), PublishError> {
        QueueClient::close(self).await?;
        Ok(())
    }
}

/// Posts readings straight to the collector.
#[derive(Debug, Clone)]
pub struct HttpPublisher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPublisher {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("device-simulator/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish(&self, reading: &Reading) -> Result<(), PublishError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE_JSON)
            .json(reading)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(PublishError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    fn description(&self) -> String {
        format!("collector at {}", self.endpoint)
    }
}
