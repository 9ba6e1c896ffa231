//! Reading - one measurement emitted by one device.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Attributes, SourceId};

/// A single sensor measurement.
///
/// `captured_at` is producer-local time. Readings from independent producers
/// carry no ordering guarantee relative to each other, and a reading
/// published twice is two readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireReading")]
pub struct Reading {
    /// Device that produced the measurement.
    pub source_id: SourceId,

    /// The measured value.
    pub value: f64,

    /// When the value was sampled (UTC).
    pub captured_at: DateTime<Utc>,

    /// Producer-defined metadata such as unit, location or status.
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

/// Decoding form: accepts the legacy `sensor_id` / `timestamp` keys.
///
/// The canonical key wins when both are present; the legacy value is then
/// ignored, even if it would not decode.
#[derive(Deserialize)]
struct WireReading {
    source_id: Option<SourceId>,
    sensor_id: Option<Value>,
    value: f64,
    captured_at: Option<DateTime<Utc>>,
    timestamp: Option<Value>,
    #[serde(default)]
    attributes: Attributes,
}

impl TryFrom<WireReading> for Reading {
    type Error = String;

    fn try_from(wire: WireReading) -> Result<Self, Self::Error> {
        let source_id = match (wire.source_id, wire.sensor_id) {
            (Some(id), _) => id,
            (None, Some(legacy)) => {
                serde_json::from_value(legacy).map_err(|e| format!("invalid sensor_id: {e}"))?
            }
            (None, None) => return Err("missing field `source_id`".to_string()),
        };
        let captured_at = match (wire.captured_at, wire.timestamp) {
            (Some(at), _) => at,
            (None, Some(legacy)) => {
                serde_json::from_value(legacy).map_err(|e| format!("invalid timestamp: {e}"))?
            }
            (None, None) => return Err("missing field `captured_at`".to_string()),
        };

        Ok(Self {
            source_id,
            value: wire.value,
            captured_at,
            attributes: wire.attributes,
        })
    }
}

impl Reading {
    /// Create a reading captured now, without attributes.
    pub fn new(source_id: impl Into<SourceId>, value: f64) -> Self {
        Self::builder(source_id, value).build()
    }

    /// Create a builder for a reading.
    pub fn builder(source_id: impl Into<SourceId>, value: f64) -> ReadingBuilder {
        ReadingBuilder::new(source_id.into(), value)
    }

    /// Encode as the JSON message body used on the queue.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decode a queue message body.
    pub fn from_json_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Look up a single attribute.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// Builder for [`Reading`].
#[derive(Debug)]
pub struct ReadingBuilder {
    source_id: SourceId,
    value: f64,
    captured_at: Option<DateTime<Utc>>,
    attributes: Attributes,
}

impl ReadingBuilder {
    fn new(source_id: SourceId, value: f64) -> Self {
        Self {
            source_id,
            value,
            captured_at: None,
            attributes: Attributes::new(),
        }
    }

    /// Set the capture time (defaults to now).
    pub fn captured_at(mut self, at: DateTime<Utc>) -> Self {
        self.captured_at = Some(at);
        self
    }

    /// Add one attribute.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Build the reading.
    pub fn build(self) -> Reading {
        Reading {
            source_id: self.source_id,
            value: self.value,
            captured_at: self.captured_at.unwrap_or_else(Utc::now),
            attributes: self.attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_builder() {
        let reading = Reading::builder("kitchen", 19.5)
            .captured_at(noon())
            .attribute("unit", "°C")
            .attribute("status", "active")
            .build();

        assert_eq!(reading.source_id, SourceId::from("kitchen"));
        assert_eq!(reading.value, 19.5);
        assert_eq!(reading.captured_at, noon());
        assert_eq!(reading.attribute("unit"), Some(&json!("°C")));
        assert_eq!(reading.attributes.len(), 2);
    }

    #[test]
    fn test_wire_format() {
        let reading = Reading::builder(1, 21.3)
            .captured_at(noon())
            .attribute("unit", "°C")
            .build();

        let value: Value = serde_json::from_slice(&reading.to_json_bytes().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "source_id": 1,
                "value": 21.3,
                "captured_at": "2024-01-01T12:00:00Z",
                "attributes": {"unit": "°C"}
            })
        );
    }

    #[test]
    fn decodes_legacy_simulator_payload() {
        let body = br#"{"sensor_id":1,"value":22.4,"timestamp":"2024-01-01T12:00:00+03:00"}"#;
        let reading = Reading::from_json_slice(body).unwrap();

        assert_eq!(reading.source_id, SourceId::Number(1));
        assert_eq!(reading.value, 22.4);
        assert_eq!(
            reading.captured_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
        );
        assert!(reading.attributes.is_empty());
    }

    #[test]
    fn canonical_key_wins_over_legacy() {
        let body = br#"{"source_id":1,"sensor_id":7,"value":1.0,"captured_at":"2024-01-01T12:00:00Z","timestamp":"yesterday"}"#;
        let reading = Reading::from_json_slice(body).unwrap();

        assert_eq!(reading.source_id, SourceId::Number(1));
        assert_eq!(reading.captured_at, noon());
    }

    #[test]
    fn test_missing_source_and_time() {
        let no_source = br#"{"value":1.0,"captured_at":"2024-01-01T12:00:00Z"}"#;
        assert!(Reading::from_json_slice(no_source).is_err());

        let no_time = br#"{"sensor_id":1,"value":1.0}"#;
        assert!(Reading::from_json_slice(no_time).is_err());

        let bad_legacy_time = br#"{"sensor_id":1,"value":1.0,"timestamp":"noon"}"#;
        assert!(Reading::from_json_slice(bad_legacy_time).is_err());
    }

    #[test]
    fn tolerates_unknown_fields() {
        let body = br#"{"source_id":"a","value":1.0,"captured_at":"2024-01-01T12:00:00Z","firmware":"1.2"}"#;
        let reading = Reading::from_json_slice(body).unwrap();
        assert_eq!(reading.source_id, SourceId::from("a"));
    }

    #[test]
    fn rejects_missing_value() {
        let body = br#"{"source_id":1,"captured_at":"2024-01-01T12:00:00Z"}"#;
        assert!(Reading::from_json_slice(body).is_err());
    }

    #[test]
    fn empty_attributes_are_omitted() {
        let reading = Reading::builder(3, 0.0).captured_at(noon()).build();
        let json = serde_json::to_string(&reading).unwrap();
        assert!(!json.contains("attributes"));
    }
}
