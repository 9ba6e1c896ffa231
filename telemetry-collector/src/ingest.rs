//! Ingestion paths into the store.
//!
//! Both the HTTP handler and the queue drain go through [`Ingestor`], so
//! every accepted record gets its `received_at` stamp and lands in the
//! store through the same single append.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use telemetry_queue::Disposition;
use telemetry_types::{Origin, Reading, TelemetryRecord};
use thiserror::Error;
use tracing::{debug, warn};

use crate::store::{Appended, Store};

/// Why a pushed body was refused. Nothing is appended in either case.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid JSON format: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Telemetry body must be a JSON object")]
    NotAnObject,
}

/// Running totals per ingestion path.
#[derive(Debug, Default)]
pub struct IngestStats {
    accepted_http: AtomicU64,
    accepted_queue: AtomicU64,
    rejected: AtomicU64,
}

/// Point-in-time copy of [`IngestStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestCounts {
    pub accepted_http: u64,
    pub accepted_queue: u64,
    pub rejected: u64,
}

impl IngestStats {
    pub fn counts(&self) -> IngestCounts {
        IngestCounts {
            accepted_http: self.accepted_http.load(Ordering::Relaxed),
            accepted_queue: self.accepted_queue.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Validates inbound telemetry and appends it to the store.
#[derive(Debug, Clone)]
pub struct Ingestor {
    store: Store,
    stats: Arc<IngestStats>,
}

impl Ingestor {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            stats: Arc::new(IngestStats::default()),
        }
    }

    /// The store this ingestor appends to.
    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn stats(&self) -> IngestCounts {
        self.stats.counts()
    }

    /// Accept a directly pushed body.
    ///
    /// The body must be a JSON object of any shape; it becomes the record's
    /// attributes verbatim.
    pub fn ingest_body(&self, body: &[u8]) -> Result<Appended, IngestError> {
        let payload = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(payload)) => payload,
            Ok(_) => return Err(self.reject(IngestError::NotAnObject)),
            Err(e) => return Err(self.reject(IngestError::InvalidJson(e))),
        };

        let record = TelemetryRecord::from_payload(payload, Utc::now());
        let appended = self.store.append(record);
        self.stats.accepted_http.fetch_add(1, Ordering::Relaxed);
        debug!(
            count = appended.count,
            origin = appended.record.origin.as_str(),
            "Telemetry accepted"
        );
        Ok(appended)
    }

    /// Accept a reading decoded from the queue.
    pub fn ingest_reading(&self, reading: Reading) -> Appended {
        let record = TelemetryRecord::from_reading(reading, Origin::Queue, Utc::now());
        let appended = self.store.append(record);
        self.stats.accepted_queue.fetch_add(1, Ordering::Relaxed);
        appended
    }

    /// Queue delivery handler.
    ///
    /// Undecodable messages are logged and rejected; everything else is
    /// appended and acknowledged.
    pub fn ingest_delivery(&self, body: &[u8]) -> Disposition {
        match Reading::from_json_slice(body) {
            Ok(reading) => {
                let source_id = reading.source_id.clone();
                let appended = self.ingest_reading(reading);
                debug!(
                    source_id = %source_id,
                    count = appended.count,
                    origin = appended.record.origin.as_str(),
                    "Telemetry accepted"
                );
                Disposition::Ack
            }
            Err(e) => {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(
                    error = %e,
                    bytes = body.len(),
                    preview = %preview(body),
                    "Dropping undecodable queue message"
                );
                Disposition::Reject
            }
        }
    }

    fn reject(&self, err: IngestError) -> IngestError {
        self.stats.rejected.fetch_add(1, Ordering::Relaxed);
        warn!(error = %err, origin = "http", "Rejected telemetry body");
        err
    }
}

/// First bytes of a payload, lossily decoded, for log lines.
fn preview(body: &[u8]) -> String {
    const MAX: usize = 64;
    let end = body.len().min(MAX);
    let mut text = String::from_utf8_lossy(&body[..end]).into_owned();
    if body.len() > MAX {
        text.push('…');
    }
    text
}
