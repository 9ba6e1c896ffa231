//! Append-only in-memory record store.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use telemetry_types::TelemetryRecord;

/// Result of a successful append.
#[derive(Debug, Clone)]
pub struct Appended {
    /// The record as stored.
    pub record: Arc<TelemetryRecord>,
    /// Number of records in the store right after this append.
    pub count: usize,
}

/// Ordered, append-only sequence of accepted records.
///
/// Cloning the store is cheap and yields another handle to the same
/// sequence. Appends hold the write lock for a single push, so concurrent
/// writers are serialized; readers copy out the record handles under a
/// short shared lock. Records are never updated or removed.
#[derive(Debug, Clone, Default)]
pub struct Store {
    records: Arc<RwLock<Vec<Arc<TelemetryRecord>>>>,
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record at the end of the sequence.
    pub fn append(&self, record: TelemetryRecord) -> Appended {
        let record = Arc::new(record);
        let mut records = self.records.write();
        records.push(record.clone());
        Appended {
            record,
            count: records.len(),
        }
    }

    /// Copy of the sequence as it was when the call started.
    pub fn snapshot(&self) -> Vec<Arc<TelemetryRecord>> {
        self.records.read().clone()
    }

    /// Latest accepted record for every source that reported one.
    ///
    /// "Latest" follows acceptance order, not capture time.
    pub fn latest(&self) -> BTreeMap<String, Arc<TelemetryRecord>> {
        let records = self.records.read();
        let mut latest = BTreeMap::new();
        for record in records.iter() {
            if let Some(source_id) = &record.source_id {
                latest.insert(source_id.key(), record.clone());
            }
        }
        latest
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use telemetry_types::{Origin, Reading};

    fn record(source_id: i64, value: f64) -> TelemetryRecord {
        TelemetryRecord::from_reading(Reading::new(source_id, value), Origin::Queue, Utc::now())
    }

    #[test]
    fn test_empty_store() {
        let store = Store::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert!(store.snapshot().is_empty());
        assert!(store.latest().is_empty());
    }

    #[test]
    fn test_append_preserves_insertion_order() {
        let store = Store::new();
        store.append(record(1, 21.3));
        store.append(record(1, 21.5));
        let appended = store.append(record(2, 19.0));

        assert_eq!(appended.count, 3);
        let values: Vec<_> = store.snapshot().iter().map(|r| r.value).collect();
        assert_eq!(values, vec![Some(21.3), Some(21.5), Some(19.0)]);
    }

    #[test]
    fn duplicates_are_kept() {
        let store = Store::new();
        let reading = Reading::new(5, 1.0);
        let now = Utc::now();
        store.append(TelemetryRecord::from_reading(reading.clone(), Origin::Queue, now));
        store.append(TelemetryRecord::from_reading(reading, Origin::Queue, now));

        assert_eq!(store.len(), 2);
    }

    #[test]
    fn snapshot_does_not_see_later_appends() {
        let store = Store::new();
        store.append(record(1, 1.0));

        let snapshot = store.snapshot();
        store.append(record(1, 2.0));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn appended_record_is_shared_with_snapshot() {
        let store = Store::new();
        let appended = store.append(record(1, 1.0));
        let snapshot = store.snapshot();

        assert!(Arc::ptr_eq(&appended.record, &snapshot[0]));
    }

    #[test]
    fn clones_share_the_same_sequence() {
        let store = Store::new();
        let other = store.clone();
        other.append(record(1, 1.0));

        assert_eq!(store.len(), 1);
    }

    #[test]
    fn latest_follows_acceptance_order() {
        let store = Store::new();
        store.append(record(1, 21.3));
        store.append(record(2, 19.0));
        store.append(record(1, 21.5));

        let latest = store.latest();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest.get("1").unwrap().value, Some(21.5));
        assert_eq!(latest.get("2").unwrap().value, Some(19.0));
    }

    #[test]
    fn latest_skips_records_without_source() {
        let store = Store::new();
        store.append(TelemetryRecord::from_payload(Default::default(), Utc::now()));

        assert_eq!(store.len(), 1);
        assert!(store.latest().is_empty());
    }

    #[test]
    fn concurrent_appends_lose_nothing() {
        use std::thread;

        let store = Store::new();

        let mut handles = vec![];
        for writer in 0..8 {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                for i in 0..250 {
                    store.append(record(writer, i as f64));
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2000);

        // Each writer's own records stay in its issue order
        for writer in 0..8 {
            let values: Vec<f64> = snapshot
                .iter()
                .filter(|r| r.source_id == Some(writer.into()))
                .filter_map(|r| r.value)
                .collect();
            let expected: Vec<f64> = (0..250).map(|i| i as f64).collect();
            assert_eq!(values, expected);
        }
    }
}
