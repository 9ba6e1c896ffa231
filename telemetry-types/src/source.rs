//! Device identifiers.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable identifier of the emitting device.
///
/// Producers are free to use integers or strings; both forms serialize as
/// the bare JSON value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceId {
    Number(i64),
    Name(String),
}

impl SourceId {
    /// Interpret an arbitrary JSON value as a source id.
    ///
    /// Only integers and strings qualify.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(SourceId::Number),
            Value::String(s) => Some(SourceId::Name(s.clone())),
            _ => None,
        }
    }

    /// Key used when grouping records per source.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::Number(n) => write!(f, "{}", n),
            SourceId::Name(s) => f.write_str(s),
        }
    }
}

/// Integers become [`SourceId::Number`], anything else a name.
impl FromStr for SourceId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().parse::<i64>() {
            Ok(n) => SourceId::Number(n),
            Err(_) => SourceId::Name(s.to_string()),
        })
    }
}

impl From<i64> for SourceId {
    fn from(n: i64) -> Self {
        SourceId::Number(n)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        SourceId::Name(s.to_string())
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        SourceId::Name(s)
    }
}
