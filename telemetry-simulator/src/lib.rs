//! # telemetry-simulator
//!
//! Simulated sensor device for the telemetry pipeline. A [`Generator`]
//! produces one synthetic [`Reading`] per period and a [`Runner`] hands it
//! to a [`Publisher`]: the durable queue by default, or the collector's
//! HTTP endpoint directly.
//!
//! Publishing is fire-and-forget. A failed publish is logged and that
//! reading is lost; the next period produces a fresh one.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use telemetry_simulator::{Generator, GeneratorConfig, HttpPublisher, Runner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let publisher =
//!         HttpPublisher::new("http://127.0.0.1:5001/telemetry", Duration::from_secs(5))?;
//!     let generator = Generator::new(GeneratorConfig::default())?;
//!
//!     let summary = Runner::new(generator, Duration::from_secs(5))
//!         .limit(Some(10))
//!         .run(&publisher, std::future::pending())
//!         .await;
//!     println!("sent {} readings", summary.published);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod duration;
pub mod generator;
pub mod publisher;
pub mod runner;

pub use config::{ConfigError, PublisherConfig, SimulatorConfig};
pub use duration::parse_duration;
pub use generator::{Generator, GeneratorConfig, GeneratorError};
pub use publisher::{HttpPublisher, PublishError, Publisher, PublisherMode};
pub use runner::{RunSummary, Runner};
pub use telemetry_types::{Reading, SourceId};
