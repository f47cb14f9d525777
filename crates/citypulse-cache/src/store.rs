//! Three-tier cache store.
//!
//! Read path: memory -> disk -> remote, promoting deeper-tier hits into
//! shallower tiers. Write path: memory synchronously, disk synchronously
//! (atomic temp-write-then-rename), remote best-effort. A corrupt or
//! unreachable tier is logged and treated as absent; no operation fails
//! because one tier is degraded.
//!
//! The memory mutex is only ever held for map access, never across disk
//! or remote I/O, so one city's slow remote lookup cannot block another
//! city's cache operations.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Duration;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use citypulse_core::types::Event;

use crate::entry::CacheEntry;
use crate::error::CacheError;
use crate::remote::RemoteTier;

/// Per-tier entry counts, as reported by [`CacheStore::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierStats {
    pub total: usize,
    pub valid: usize,
}

/// Snapshot of cache state across all tiers.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub memory: TierStats,
    pub disk: TierStats,
    pub remote: TierStats,
    pub ttl_hours: f64,
    pub storage_type: &'static str,
}

/// TTL-bounded cache of per-city event lists across three tiers.
pub struct CacheStore {
    ttl: Duration,
    cache_dir: PathBuf,
    remote: Option<Arc<dyn RemoteTier>>,
    memory: Mutex<HashMap<String, CacheEntry>>,
}

/// Canonical cache key for a city: case-folded, whitespace and slashes
/// mapped to underscores. All tiers are keyed on this form.
pub fn canonical_key(city: &str) -> String {
    city.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' { '_' } else { c })
        .collect()
}

impl CacheStore {
    /// Create a store rooted at `cache_dir` with the given TTL.
    ///
    /// `remote` is optional; without it the store runs as a two-tier
    /// (memory + disk) cache.
    pub fn new(
        ttl: Duration,
        cache_dir: impl Into<PathBuf>,
        remote: Option<Arc<dyn RemoteTier>>,
    ) -> Result<Self, CacheError> {
        let cache_dir = cache_dir.into();
        std::fs::create_dir_all(&cache_dir).map_err(|e| CacheError::Disk(e.to_string()))?;
        info!(
            "Cache store initialized (ttl={}h, dir={}, remote={})",
            ttl.num_minutes() as f64 / 60.0,
            cache_dir.display(),
            remote.is_some()
        );
        Ok(Self {
            ttl,
            cache_dir,
            remote,
            memory: Mutex::new(HashMap::new()),
        })
    }

    /// Look up a valid entry for `city`, falling through the tiers.
    ///
    /// Returns `None` when no tier holds a valid (unexpired) entry; the
    /// caller decides whether to fetch fresh data.
    pub async fn load(&self, city: &str) -> Option<CacheEntry> {
        let key = canonical_key(city);

        if let Some(entry) = self.memory_get(&key) {
            if entry.is_valid(self.ttl) {
                return Some(entry);
            }
        }

        if let Some(entry) = self.load_from_disk(&key) {
            if entry.is_valid(self.ttl) {
                self.memory_put(&key, entry.clone());
                return Some(entry);
            }
        }

        if let Some(remote) = &self.remote {
            match remote.get(&key).await {
                Ok(Some(record)) => {
                    if let Some(entry) = CacheEntry::from_record(record) {
                        if entry.is_valid(self.ttl) {
                            self.memory_put(&key, entry.clone());
                            if let Err(e) = self.save_to_disk(&key, &entry) {
                                debug!("Failed to promote remote entry to disk for {}: {}", key, e);
                            }
                            return Some(entry);
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => debug!("Unable to load remote cache for {}: {}", key, e),
            }
        }

        None
    }

    /// Store a fresh entry for `city`, stamped with the current time.
    ///
    /// The memory write is authoritative for this process; disk and
    /// remote writes are best-effort and never fail the call.
    pub async fn save(
        &self,
        city: &str,
        events: Vec<Event>,
        metadata: Option<Map<String, Value>>,
    ) -> CacheEntry {
        let key = canonical_key(city);
        let entry = CacheEntry::new(city, events, metadata.unwrap_or_default());

        self.memory_put(&key, entry.clone());

        if let Err(e) = self.save_to_disk(&key, &entry) {
            debug!("Failed to write disk cache for {}: {}", key, e);
        }

        if let Some(remote) = &self.remote {
            if let Err(e) = remote.put(&key, &entry.to_record()).await {
                debug!("Failed to store remote cache for {}: {}", key, e);
            }
        }

        entry
    }

    /// Remove the entry for `city` from every tier.
    pub async fn invalidate(&self, city: &str) {
        let key = canonical_key(city);

        if let Ok(mut memory) = self.memory.lock() {
            memory.remove(&key);
        }

        let path = self.disk_path(&key);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                debug!("Failed to remove cache file {}: {}", path.display(), e);
            }
        }

        if let Some(remote) = &self.remote {
            if let Err(e) = remote.delete(&key).await {
                debug!("Failed to delete remote cache for {}: {}", key, e);
            }
        }
    }

    /// Sweep every tier, removing expired and unreadable entries.
    ///
    /// Unparseable disk files are deleted; an unreachable remote backend
    /// is skipped. No partial failure aborts the pass.
    pub async fn cleanup(&self) {
        if let Ok(mut memory) = self.memory.lock() {
            memory.retain(|_, entry| entry.is_valid(self.ttl));
        }

        for (path, entry) in self.disk_entries() {
            let keep = entry.map(|e| e.is_valid(self.ttl)).unwrap_or(false);
            if !keep {
                if let Err(e) = std::fs::remove_file(&path) {
                    debug!("Failed to remove cache file {}: {}", path.display(), e);
                }
            }
        }

        if let Some(remote) = &self.remote {
            match remote.list().await {
                Ok(records) => {
                    for (key, record) in records {
                        let keep = CacheEntry::from_record(record)
                            .map(|e| e.is_valid(self.ttl))
                            .unwrap_or(false);
                        if !keep {
                            if let Err(e) = remote.delete(&key).await {
                                debug!("Failed to delete remote cache for {}: {}", key, e);
                            }
                        }
                    }
                }
                Err(e) => debug!("Remote cleanup skipped: {}", e),
            }
        }
    }

    /// Per-tier entry counts. Read-only; never mutates any tier.
    pub async fn stats(&self) -> CacheStats {
        let memory = match self.memory.lock() {
            Ok(map) => TierStats {
                total: map.len(),
                valid: map.values().filter(|e| e.is_valid(self.ttl)).count(),
            },
            Err(_) => TierStats::default(),
        };

        let mut disk = TierStats::default();
        for (_, entry) in self.disk_entries() {
            disk.total += 1;
            if entry.map(|e| e.is_valid(self.ttl)).unwrap_or(false) {
                disk.valid += 1;
            }
        }

        let mut remote = TierStats::default();
        if let Some(tier) = &self.remote {
            match tier.list().await {
                Ok(records) => {
                    for (_, record) in records {
                        remote.total += 1;
                        if CacheEntry::from_record(record)
                            .map(|e| e.is_valid(self.ttl))
                            .unwrap_or(false)
                        {
                            remote.valid += 1;
                        }
                    }
                }
                Err(e) => debug!("Failed to compute remote cache stats: {}", e),
            }
        }

        CacheStats {
            memory,
            disk,
            remote,
            ttl_hours: self.ttl.num_minutes() as f64 / 60.0,
            storage_type: if self.remote.is_some() {
                "hybrid_memory_disk_remote"
            } else {
                "memory_disk"
            },
        }
    }

    /// Age in hours of the currently served entry for `city`, if any.
    pub async fn age_hours(&self, city: &str) -> Option<f64> {
        self.load(city).await.map(|entry| entry.age_hours())
    }

    // -- Tier helpers --

    fn memory_get(&self, key: &str) -> Option<CacheEntry> {
        match self.memory.lock() {
            Ok(map) => map.get(key).cloned(),
            Err(e) => {
                warn!("Memory tier lock poisoned: {}", e);
                None
            }
        }
    }

    fn memory_put(&self, key: &str, entry: CacheEntry) {
        if let Ok(mut map) = self.memory.lock() {
            map.insert(key.to_string(), entry);
        }
    }

    fn disk_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }

    fn load_from_disk(&self, key: &str) -> Option<CacheEntry> {
        Self::read_disk_file(&self.disk_path(key))
    }

    fn read_disk_file(path: &Path) -> Option<CacheEntry> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!("Failed to read cache file {}: {}", path.display(), e);
                }
                return None;
            }
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(record) => CacheEntry::from_record(record),
            Err(e) => {
                debug!("Corrupt cache file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Atomic per-file write: a uniquely named temp file in the same
    /// directory, then rename, so a concurrent reader never observes a
    /// half-written record and concurrent writers for the same key never
    /// share a temp file.
    fn save_to_disk(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        let path = self.disk_path(key);
        let content = serde_json::to_string_pretty(&entry.to_record())?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.cache_dir)
            .map_err(|e| CacheError::Disk(e.to_string()))?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| CacheError::Disk(e.to_string()))?;
        tmp.persist(&path)
            .map_err(|e| CacheError::Disk(e.to_string()))?;
        Ok(())
    }

    /// All `*.json` files in the cache directory with their parsed entries
    /// (`None` for unreadable/corrupt files).
    fn disk_entries(&self) -> Vec<(PathBuf, Option<CacheEntry>)> {
        let read_dir = match std::fs::read_dir(&self.cache_dir) {
            Ok(rd) => rd,
            Err(e) => {
                debug!("Failed to scan cache dir: {}", e);
                return Vec::new();
            }
        };

        read_dir
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .map(|p| {
                let entry = Self::read_disk_file(&p);
                (p, entry)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_events(n: usize) -> Vec<Event> {
        (0..n)
            .map(|i| Event {
                event_id: format!("evt-{}", i),
                title: format!("Event {}", i),
                ..Event::default()
            })
            .collect()
    }

    /// In-memory remote tier counting get/put/delete calls.
    #[derive(Default)]
    struct CountingRemote {
        records: Mutex<HashMap<String, Value>>,
        gets: AtomicUsize,
        puts: AtomicUsize,
        deletes: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl RemoteTier for CountingRemote {
        async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            Ok(self.records.lock().unwrap().get(key).cloned())
        }

        async fn put(&self, key: &str, record: &Value) -> Result<(), CacheError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.records
                .lock()
                .unwrap()
                .insert(key.to_string(), record.clone());
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.records.lock().unwrap().remove(key);
            Ok(())
        }

        async fn list(&self) -> Result<Vec<(String, Value)>, CacheError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect())
        }
    }

    /// Remote tier where every operation fails.
    struct UnreachableRemote;

    #[async_trait::async_trait]
    impl RemoteTier for UnreachableRemote {
        async fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
            Err(CacheError::Remote("unreachable".to_string()))
        }
        async fn put(&self, _key: &str, _record: &Value) -> Result<(), CacheError> {
            Err(CacheError::Remote("unreachable".to_string()))
        }
        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Remote("unreachable".to_string()))
        }
        async fn list(&self) -> Result<Vec<(String, Value)>, CacheError> {
            Err(CacheError::Remote("unreachable".to_string()))
        }
    }

    fn make_store(dir: &Path, ttl: Duration, remote: Option<Arc<dyn RemoteTier>>) -> CacheStore {
        CacheStore::new(ttl, dir, remote).unwrap()
    }

    // ---- Canonical keys ----

    #[test]
    fn test_canonical_key_forms() {
        assert_eq!(canonical_key("San Francisco"), "san_francisco");
        assert_eq!(canonical_key("san_francisco"), "san_francisco");
        assert_eq!(canonical_key("san francisco"), "san_francisco");
        assert_eq!(canonical_key("new york/ny"), "new_york_ny");
    }

    #[test]
    fn test_canonical_key_trims() {
        assert_eq!(canonical_key("  Boston "), "boston");
    }

    // ---- Save and load ----

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path(), Duration::hours(6), None);

        let events = sample_events(2);
        store.save("San Francisco", events.clone(), None).await;

        let loaded = store.load("San Francisco").await.unwrap();
        assert_eq!(loaded.events, events);
        assert_eq!(loaded.city, "San Francisco");
    }

    #[tokio::test]
    async fn test_key_forms_address_same_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path(), Duration::hours(6), None);

        store.save("San Francisco", sample_events(1), None).await;
        assert!(store.load("san_francisco").await.is_some());
        assert!(store.load("san francisco").await.is_some());
        assert!(store.load("SAN FRANCISCO").await.is_some());
    }

    #[tokio::test]
    async fn test_load_unknown_city_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path(), Duration::hours(6), None);
        assert!(store.load("atlantis").await.is_none());
    }

    #[tokio::test]
    async fn test_newer_save_supersedes() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path(), Duration::hours(6), None);

        store.save("boston", sample_events(1), None).await;
        store.save("boston", sample_events(3), None).await;

        let loaded = store.load("boston").await.unwrap();
        assert_eq!(loaded.events.len(), 3);
    }

    // ---- TTL boundary ----

    #[tokio::test]
    async fn test_expired_entry_is_absent_in_every_tier() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(CountingRemote::default());
        let store = make_store(dir.path(), Duration::zero(), Some(remote.clone()));

        store.save("New York", sample_events(1), None).await;

        // Entry exists in all three tiers but is expired everywhere.
        assert!(store.load("New York").await.is_none());
    }

    #[tokio::test]
    async fn test_entry_valid_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path(), Duration::hours(1), None);
        store.save("boston", sample_events(1), None).await;
        assert!(store.load("boston").await.is_some());
    }

    // ---- Tier promotion ----

    #[tokio::test]
    async fn test_disk_hit_promotes_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = make_store(dir.path(), Duration::hours(6), None);
            store.save("chicago", sample_events(2), None).await;
        }

        // Fresh store shares only the disk tier.
        let store = make_store(dir.path(), Duration::hours(6), None);
        assert!(store.load("chicago").await.is_some());

        let stats = store.stats().await;
        assert_eq!(stats.memory.total, 1);
    }

    #[tokio::test]
    async fn test_remote_hit_promotes_without_second_remote_call() {
        let dir1 = tempfile::tempdir().unwrap();
        let dir2 = tempfile::tempdir().unwrap();
        let remote: Arc<CountingRemote> = Arc::new(CountingRemote::default());

        {
            let store = make_store(dir1.path(), Duration::hours(6), Some(remote.clone()));
            store.save("miami", sample_events(2), None).await;
        }

        // New store with empty memory and disk tiers; only remote has it.
        let store = make_store(dir2.path(), Duration::hours(6), Some(remote.clone()));
        let before = remote.gets.load(Ordering::SeqCst);

        assert!(store.load("miami").await.is_some());
        assert_eq!(remote.gets.load(Ordering::SeqCst), before + 1);

        // Second load is served from memory; no further remote call.
        assert!(store.load("miami").await.is_some());
        assert_eq!(remote.gets.load(Ordering::SeqCst), before + 1);

        // Promotion also reached the disk tier.
        let stats = store.stats().await;
        assert_eq!(stats.disk.total, 1);
    }

    // ---- Degraded tiers ----

    #[tokio::test]
    async fn test_unreachable_remote_degrades_to_two_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path(), Duration::hours(6), Some(Arc::new(UnreachableRemote)));

        store.save("boston", sample_events(2), None).await;
        assert!(store.load("boston").await.is_some());

        store.invalidate("boston").await;
        assert!(store.load("boston").await.is_none());

        // Cleanup and stats tolerate the unreachable backend.
        store.cleanup().await;
        let stats = store.stats().await;
        assert_eq!(stats.remote.total, 0);
    }

    #[tokio::test]
    async fn test_corrupt_disk_record_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path(), Duration::hours(6), None);

        std::fs::write(dir.path().join("boston.json"), "{ not json").unwrap();
        assert!(store.load("boston").await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_remote_record_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(CountingRemote::default());
        remote
            .records
            .lock()
            .unwrap()
            .insert("boston".to_string(), Value::from("garbage"));

        let store = make_store(dir.path(), Duration::hours(6), Some(remote));
        assert!(store.load("boston").await.is_none());
    }

    // ---- Invalidate ----

    #[tokio::test]
    async fn test_invalidate_removes_from_all_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(CountingRemote::default());
        let store = make_store(dir.path(), Duration::hours(6), Some(remote.clone()));

        store.save("denver", sample_events(1), None).await;
        store.invalidate("denver").await;

        assert!(store.load("denver").await.is_none());
        assert!(!dir.path().join("denver.json").exists());
        assert!(remote.records.lock().unwrap().is_empty());
    }

    // ---- Cleanup ----

    #[tokio::test]
    async fn test_cleanup_removes_expired_keeps_valid() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(CountingRemote::default());

        // Seed an expired record directly into disk and remote tiers.
        let mut stale = CacheEntry::new("old town", sample_events(1), Map::new());
        stale.cached_at = chrono::Utc::now() - Duration::hours(48);
        std::fs::write(
            dir.path().join("old_town.json"),
            serde_json::to_string(&stale.to_record()).unwrap(),
        )
        .unwrap();
        remote
            .records
            .lock()
            .unwrap()
            .insert("old_town".to_string(), stale.to_record());

        let store = make_store(dir.path(), Duration::hours(6), Some(remote.clone()));
        store.save("fresh ville", sample_events(2), None).await;

        store.cleanup().await;

        assert!(!dir.path().join("old_town.json").exists());
        assert!(dir.path().join("fresh_ville.json").exists());
        assert!(!remote.records.lock().unwrap().contains_key("old_town"));
        assert!(remote.records.lock().unwrap().contains_key("fresh_ville"));
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path(), Duration::hours(6), None);

        store.save("boston", sample_events(1), None).await;
        std::fs::write(dir.path().join("bad.json"), "not json at all").unwrap();

        store.cleanup().await;
        let first = store.stats().await;
        store.cleanup().await;
        let second = store.stats().await;

        assert_eq!(first.disk, second.disk);
        assert_eq!(first.memory, second.memory);
        assert_eq!(first.disk.valid, 1);
        assert!(!dir.path().join("bad.json").exists());
    }

    // ---- Stats ----

    #[tokio::test]
    async fn test_stats_counts_and_storage_type() {
        let dir = tempfile::tempdir().unwrap();
        let remote = Arc::new(CountingRemote::default());
        let store = make_store(dir.path(), Duration::hours(6), Some(remote));

        store.save("a town", sample_events(1), None).await;
        store.save("b town", sample_events(1), None).await;

        let stats = store.stats().await;
        assert_eq!(stats.memory, TierStats { total: 2, valid: 2 });
        assert_eq!(stats.disk, TierStats { total: 2, valid: 2 });
        assert_eq!(stats.remote, TierStats { total: 2, valid: 2 });
        assert_eq!(stats.ttl_hours, 6.0);
        assert_eq!(stats.storage_type, "hybrid_memory_disk_remote");
    }

    #[tokio::test]
    async fn test_stats_without_remote() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path(), Duration::hours(6), None);
        let stats = store.stats().await;
        assert_eq!(stats.storage_type, "memory_disk");
    }

    #[tokio::test]
    async fn test_stats_does_not_mutate_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path(), Duration::zero(), None);
        store.save("boston", sample_events(1), None).await;

        // Entry is expired, but stats must not remove it.
        let before = store.stats().await;
        assert_eq!(before.disk.total, 1);
        assert_eq!(before.disk.valid, 0);
        let after = store.stats().await;
        assert_eq!(after.disk.total, 1);
    }

    // ---- Age ----

    #[tokio::test]
    async fn test_age_hours_for_fresh_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path(), Duration::hours(6), None);

        store.save("boston", sample_events(1), None).await;
        let age = store.age_hours("boston").await.unwrap();
        assert!(age >= 0.0 && age < 0.1);
        assert!(store.age_hours("nowhere").await.is_none());
    }

    // ---- Atomic disk writes ----

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = make_store(dir.path(), Duration::hours(6), None);

        for i in 0..5 {
            store
                .save(&format!("city {}", i), sample_events(1), None)
                .await;
        }

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| !e.path().extension().is_some_and(|ext| ext == "json"))
            .collect();
        assert!(leftovers.is_empty(), "leftovers: {:?}", leftovers);
    }

    #[tokio::test]
    async fn test_concurrent_saves_for_same_key_never_corrupt_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(make_store(dir.path(), Duration::hours(6), None));

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.save("boston", sample_events(i % 5 + 1), None).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Whichever write landed last, the file is one complete record.
        let entry = CacheStore::read_disk_file(&dir.path().join("boston.json")).unwrap();
        assert_eq!(entry.city, "boston");
        assert!(!entry.events.is_empty());
    }

    // ---- Concurrency ----

    #[tokio::test]
    async fn test_concurrent_saves_and_loads() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(make_store(dir.path(), Duration::hours(6), None));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let city = format!("city {}", i % 4);
                store.save(&city, sample_events(i + 1), None).await;
                store.load(&city).await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_some());
        }

        let stats = store.stats().await;
        assert_eq!(stats.memory.total, 4);
    }
}
