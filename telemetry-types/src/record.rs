//! TelemetryRecord - a reading as accepted by the collector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Attributes, Reading, SourceId};

/// Ingestion path a record arrived through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Pushed directly with `POST /telemetry`.
    Http,
    /// Drained from the durable queue.
    Queue,
}

impl Origin {
    /// Lowercase name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Http => "http",
            Origin::Queue => "queue",
        }
    }
}

/// A stored reading.
///
/// Directly pushed bodies have arbitrary shape, so `source_id` and `value`
/// are only present when the producer supplied them. `captured_at` falls
/// back to `received_at` when no capture time was given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<SourceId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    pub captured_at: DateTime<Utc>,

    /// Server-observed acceptance time.
    pub received_at: DateTime<Utc>,

    #[serde(default)]
    pub attributes: Attributes,

    pub origin: Origin,
}

impl TelemetryRecord {
    /// Wrap a decoded reading.
    pub fn from_reading(reading: Reading, origin: Origin, received_at: DateTime<Utc>) -> Self {
        Self {
            source_id: Some(reading.source_id),
            value: Some(reading.value),
            captured_at: reading.captured_at,
            received_at,
            attributes: reading.attributes,
            origin,
        }
    }

    /// Interpret an arbitrary JSON object pushed over HTTP.
    ///
    /// The whole object becomes `attributes`; well-known fields are lifted
    /// out when they have the expected type.
    pub fn from_payload(payload: Attributes, received_at: DateTime<Utc>) -> Self {
        let source_id = field(&payload, "source_id", "sensor_id").and_then(SourceId::from_json);
        let value = payload.get("value").and_then(Value::as_f64);
        let captured_at = field(&payload, "captured_at", "timestamp")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|at| at.with_timezone(&Utc))
            .unwrap_or(received_at);

        Self {
            source_id,
            value,
            captured_at,
            received_at,
            attributes: payload,
            origin: Origin::Http,
        }
    }
}

fn field<'a>(payload: &'a Attributes, name: &str, legacy: &str) -> Option<&'a Value> {
    payload.get(name).or_else(|| payload.get(legacy))
}
