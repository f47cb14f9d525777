//! Cache entry type and its persisted record shape.
//!
//! Entries are immutable snapshots: a newer `save` supersedes the old
//! entry for a city rather than mutating it. The persisted shape
//! (`{city, events, cached_at, count, metadata}`) is stable across the
//! disk and remote tiers for compatibility with existing records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use citypulse_core::types::Event;

/// One cached list of events for a city, stamped at fetch time.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Original (non-canonical) city name as requested.
    pub city: String,
    pub events: Vec<Event>,
    pub cached_at: DateTime<Utc>,
    pub metadata: Map<String, Value>,
}

/// On-disk / remote record shape.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    city: String,
    #[serde(default)]
    events: Vec<Event>,
    cached_at: DateTime<Utc>,
    #[serde(default)]
    count: usize,
    #[serde(default)]
    metadata: Map<String, Value>,
}

impl CacheEntry {
    /// Construct a new entry stamped with the current time.
    pub fn new(city: impl Into<String>, events: Vec<Event>, metadata: Map<String, Value>) -> Self {
        Self {
            city: city.into(),
            events,
            cached_at: Utc::now(),
            metadata,
        }
    }

    /// Whether the entry is still within its TTL. An expired entry is
    /// functionally absent regardless of which tier holds it.
    pub fn is_valid(&self, ttl: Duration) -> bool {
        Utc::now() - self.cached_at < ttl
    }

    /// Entry age in fractional hours, clamped at zero.
    pub fn age_hours(&self) -> f64 {
        let secs = (Utc::now() - self.cached_at).num_milliseconds() as f64 / 1000.0;
        (secs / 3600.0).max(0.0)
    }

    /// Serialize to the stable persisted record shape.
    pub fn to_record(&self) -> Value {
        let record = StoredRecord {
            city: self.city.clone(),
            events: self.events.clone(),
            cached_at: self.cached_at,
            count: self.events.len(),
            metadata: self.metadata.clone(),
        };
        // StoredRecord contains only plain serializable fields.
        serde_json::to_value(record).unwrap_or(Value::Null)
    }

    /// Restore an entry from a persisted record.
    ///
    /// Returns `None` for malformed records; a tier holding one is
    /// treated as absent.
    pub fn from_record(value: Value) -> Option<Self> {
        match serde_json::from_value::<StoredRecord>(value) {
            Ok(record) => Some(Self {
                city: record.city,
                events: record.events,
                cached_at: record.cached_at,
                metadata: record.metadata,
            }),
            Err(e) => {
                warn!("Failed to restore cache entry: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_events(n: usize) -> Vec<Event> {
        (0..n)
            .map(|i| Event {
                event_id: format!("evt-{}", i),
                title: format!("Event {}", i),
                ..Event::default()
            })
            .collect()
    }

    // ---- Validity ----

    #[test]
    fn test_fresh_entry_is_valid() {
        let entry = CacheEntry::new("boston", sample_events(2), Map::new());
        assert!(entry.is_valid(Duration::hours(6)));
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let mut entry = CacheEntry::new("boston", sample_events(1), Map::new());
        entry.cached_at = Utc::now() - Duration::hours(7);
        assert!(!entry.is_valid(Duration::hours(6)));
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let entry = CacheEntry::new("boston", sample_events(1), Map::new());
        assert!(!entry.is_valid(Duration::zero()));
    }

    #[test]
    fn test_age_hours_nonnegative() {
        let mut entry = CacheEntry::new("boston", vec![], Map::new());
        // Clock skew can place cached_at in the future.
        entry.cached_at = Utc::now() + Duration::minutes(5);
        assert_eq!(entry.age_hours(), 0.0);
    }

    #[test]
    fn test_age_hours_tracks_elapsed_time() {
        let mut entry = CacheEntry::new("boston", vec![], Map::new());
        entry.cached_at = Utc::now() - Duration::minutes(90);
        let age = entry.age_hours();
        assert!(age > 1.49 && age < 1.51, "age was {}", age);
    }

    // ---- Record shape ----

    #[test]
    fn test_record_includes_count_and_iso_timestamp() {
        let entry = CacheEntry::new("San Francisco", sample_events(3), Map::new());
        let record = entry.to_record();
        assert_eq!(record["city"], "San Francisco");
        assert_eq!(record["count"], 3);
        // chrono serializes DateTime<Utc> as an RFC 3339 string.
        let ts = record["cached_at"].as_str().unwrap();
        assert!(ts.contains('T'));
    }

    #[test]
    fn test_record_round_trip() {
        let mut metadata = Map::new();
        metadata.insert("provider".to_string(), Value::from("eventbrite"));
        let entry = CacheEntry::new("chicago", sample_events(2), metadata);

        let restored = CacheEntry::from_record(entry.to_record()).unwrap();
        assert_eq!(restored.city, entry.city);
        assert_eq!(restored.events, entry.events);
        assert_eq!(restored.metadata, entry.metadata);
    }

    #[test]
    fn test_from_record_rejects_missing_cached_at() {
        let record = serde_json::json!({"city": "boston", "events": []});
        assert!(CacheEntry::from_record(record).is_none());
    }

    #[test]
    fn test_from_record_rejects_non_object() {
        assert!(CacheEntry::from_record(Value::from("garbage")).is_none());
        assert!(CacheEntry::from_record(Value::Null).is_none());
    }

    #[test]
    fn test_from_record_tolerates_missing_optional_fields() {
        let record = serde_json::json!({
            "city": "boston",
            "cached_at": Utc::now(),
        });
        let entry = CacheEntry::from_record(record).unwrap();
        assert!(entry.events.is_empty());
        assert!(entry.metadata.is_empty());
    }
}
