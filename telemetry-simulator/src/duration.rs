use std::time::Duration;

use anyhow::{bail, Result};
use serde::{de, Deserialize, Deserializer};

/// Suffix to nanoseconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("µs", 1_000.0),
    ("us", 1_000.0),
    ("ms", 1_000_000.0),
    ("s", 1_000_000_000.0),
    ("m", 60_000_000_000.0),
];

/// Parse duration strings like "5s", "500ms", "1.5m", "0ns"
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            let val: f64 = val_str.trim().parse()?;
            if !val.is_finite() || val < 0.0 {
                bail!("Duration must be a non-negative number: {}", s);
            }
            return Ok(Duration::from_nanos((val * multiplier) as u64));
        }
    }

    bail!("Unknown duration format: {}", s)
}

/// Serde adapter: accepts a duration string or a whole number of seconds.
pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        let d = parse_duration("5s").unwrap();
        assert_eq!(d, Duration::from_secs(5));
    }

    #[test]
    fn test_parse_milliseconds() {
        let d = parse_duration("250ms").unwrap();
        assert_eq!(d, Duration::from_millis(250));
    }

    #[test]
    fn test_parse_microseconds() {
        let d = parse_duration("16.958µs").unwrap();
        assert_eq!(d.as_nanos(), 16958);
    }

    #[test]
    fn test_parse_minutes() {
        let d = parse_duration("1.5m").unwrap();
        assert_eq!(d, Duration::from_secs(90));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("5").is_err());
        assert!(parse_duration("-1s").is_err());
    }

    #[test]
    fn test_deserialize_forms() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(deserialize_with = "deserialize")]
            every: Duration,
        }

        let text: Holder = serde_json::from_str(r#"{"every": "500ms"}"#).unwrap();
        assert_eq!(text.every, Duration::from_millis(500));

        let secs: Holder = serde_json::from_str(r#"{"every": 3}"#).unwrap();
        assert_eq!(secs.every, Duration::from_secs(3));

        assert!(serde_json::from_str::<Holder>(r#"{"every": "often"}"#).is_err());
    }
}
