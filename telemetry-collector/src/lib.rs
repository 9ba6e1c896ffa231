//! # telemetry-collector
//!
//! Collector service for the telemetry pipeline. Readings arrive either
//! pushed directly over HTTP or drained from the durable queue, and are
//! appended to one in-memory, insertion-ordered store that the HTTP API
//! serves back.
//!
//! ## Architecture
//!
//! ```text
//!  POST /telemetry ──▶ ┌──────────┐
//!                      │ Ingestor │──▶ Store ──▶ GET /telemetry
//!  QueueDrain ───────▶ └──────────┘              GET /telemetry/latest
//!  (AMQP consumer)
//! ```
//!
//! - **[`store`]**: append-only record sequence with snapshot reads
//! - **[`ingest`]**: validation and `received_at` stamping for both paths
//! - **[`server`]**: hyper-based HTTP API
//! - **[`consumer`]**: background task draining the queue
//! - **[`config`]**: layered file/environment configuration
//! - **[`app`]**: startup order and shutdown of the whole service
//!
//! The store lives only as long as the process.
//!
//! ## Example
//!
//! ```rust,no_run
//! use telemetry_collector::{CollectorServer, Ingestor, ServerConfig, Store};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let ingestor = Ingestor::new(Store::new());
//!     let server = CollectorServer::new(
//!         ServerConfig::builder().listen_addr("127.0.0.1:5001").build(),
//!         ingestor,
//!     );
//!
//!     let listener = server.bind().await?;
//!     server.serve(listener, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```

pub mod app;
pub mod config;
pub mod consumer;
pub mod ingest;
pub mod server;
pub mod store;

pub use app::{Collector, StartupError};
pub use config::{CollectorConfig, ConfigError, ConsumerConfig};
pub use consumer::QueueDrain;
pub use ingest::{IngestCounts, IngestError, Ingestor};
pub use server::{handle_request, CollectorServer, ServerConfig};
pub use store::{Appended, Store};

// Re-export types for convenience
pub use telemetry_types::{Origin, Reading, SourceId, TelemetryRecord};
