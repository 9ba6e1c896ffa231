//! Synthetic sensor readings.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use telemetry_types::{Reading, SourceId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GeneratorError {
    #[error("Invalid value range: min {min} is greater than max {max}")]
    InvalidRange { min: f64, max: f64 },

    #[error("Value bounds must be finite numbers")]
    NonFinite,

    #[error("Value range {min}..={max} is too wide to sample")]
    RangeTooWide { min: f64, max: f64 },

    #[error("Precision {0} is too large (at most 6 decimal places)")]
    Precision(u32),
}

/// What the simulated device reports and how often.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub source_id: SourceId,
    pub min: f64,
    pub max: f64,
    /// Decimal places kept after rounding.
    pub precision: u32,
    pub unit: String,
    pub sensor_type: String,
    /// Overrides the well-known location for the source id.
    pub location: Option<String>,
    #[serde(deserialize_with = "crate::duration::deserialize")]
    pub interval: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            source_id: SourceId::Number(1),
            min: 20.0,
            max: 25.0,
            precision: 1,
            unit: "°C".to_string(),
            sensor_type: "temperature".to_string(),
            location: None,
            interval: Duration::from_secs(5),
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), GeneratorError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(GeneratorError::NonFinite);
        }
        if self.min > self.max {
            return Err(GeneratorError::InvalidRange {
                min: self.min,
                max: self.max,
            });
        }
        if !(self.max - self.min).is_finite() {
            return Err(GeneratorError::RangeTooWide {
                min: self.min,
                max: self.max,
            });
        }
        if self.precision > 6 {
            return Err(GeneratorError::Precision(self.precision));
        }
        Ok(())
    }

    /// Configured location, else the well-known room for numeric ids 1..=3.
    pub fn location(&self) -> Option<&str> {
        if let Some(location) = self.location.as_deref() {
            return Some(location);
        }
        match self.source_id {
            SourceId::Number(1) => Some("Living Room"),
            SourceId::Number(2) => Some("Bedroom"),
            SourceId::Number(3) => Some("Kitchen"),
            _ => None,
        }
    }
}

/// Produces one reading per call, uniformly distributed in `[min, max]`.
#[derive(Debug)]
pub struct Generator<R = StdRng> {
    config: GeneratorConfig,
    scale: f64,
    rng: R,
}

impl Generator<StdRng> {
    /// Generator seeded from the operating system.
    pub fn new(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Deterministic generator for reproducible runs.
    pub fn seeded(config: GeneratorConfig, seed: u64) -> Result<Self, GeneratorError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Generator<R> {
    pub fn with_rng(config: GeneratorConfig, rng: R) -> Result<Self, GeneratorError> {
        config.validate()?;
        let scale = 10f64.powi(config.precision as i32);
        Ok(Self { config, scale, rng })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Reading stamped with the current time.
    pub fn sample(&mut self) -> Reading {
        self.sample_at(Utc::now())
    }

    pub fn sample_at(&mut self, now: DateTime<Utc>) -> Reading {
        let (min, max) = (self.config.min, self.config.max);
        // Unit sample scaled by hand: the span is finite, so this cannot overflow
        let raw = min + self.rng.random::<f64>() * (max - min);
        // Rounding can step past a bound that is not itself a multiple of the precision
        let value = ((raw * self.scale).round() / self.scale).clamp(min, max);

        let mut builder = Reading::builder(self.config.source_id.clone(), value)
            .captured_at(now)
            .attribute("unit", self.config.unit.as_str())
            .attribute("status", "active")
            .attribute("sensor_type", self.config.sensor_type.as_str());
        if let Some(location) = self.config.location() {
            builder = builder.attribute("location", location);
        }
        builder.build()
    }
}
