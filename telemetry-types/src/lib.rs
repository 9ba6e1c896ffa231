//! # telemetry-types
//!
//! Shared data model for the telemetry pipeline. Producers emit
//! [`Reading`]s; the collector stores them as [`TelemetryRecord`]s.
//!
//! ## Example
//!
//! ```rust
//! use telemetry_types::{Reading, SourceId};
//!
//! let reading = Reading::builder(1, 21.3)
//!     .attribute("unit", "°C")
//!     .attribute("location", "Kitchen")
//!     .build();
//!
//! assert_eq!(reading.source_id, SourceId::Number(1));
//! let json = serde_json::to_string(&reading).unwrap();
//! assert!(json.contains("\"source_id\":1"));
//! ```
//!
//! ## Wire format
//!
//! Readings travel as JSON objects:
//!
//! ```text
//! {"source_id":1,"value":21.3,"captured_at":"2024-01-01T12:00:00Z","attributes":{"unit":"°C"}}
//! ```
//!
//! The decoder also accepts the legacy `sensor_id` / `timestamp` field names.

mod reading;
mod record;
mod source;

pub use reading::*;
pub use record::*;
pub use source::*;

/// Free-form metadata attached to a reading.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// MIME type of every encoded reading.
pub const CONTENT_TYPE_JSON: &str = "application/json";
