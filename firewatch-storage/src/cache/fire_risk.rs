//! Geohash-keyed fire-risk cache.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::Duration;
use firewatch_core::constants::{
    CACHE_ENTRY_PREFIX, CACHE_MAX_ENTRIES, CACHE_METADATA_KEY, CACHE_TTL_SECS,
};
use firewatch_core::{CacheError, Clock, Coordinates, FireRisk, Freshness, Geohash};
use tokio::sync::Mutex;

use super::entry::{CacheEntry, CacheMetadata};
use super::traits::{CacheStats, KeyValueStore};
use super::{entry_key, geohash_from_key};

/// Outcome of [`FireRiskCache::cleanup`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Entries removed because their TTL elapsed.
    pub expired_removed: usize,
    /// Entries removed because they could not be decoded.
    pub corrupt_removed: usize,
    /// Access-log keys dropped because no entry backed them.
    pub dangling_dropped: usize,
    /// Stored entries that were missing from the access log.
    pub untracked_adopted: usize,
    /// Entries left after the sweep.
    pub remaining: usize,
}

/// Persistent cache of [`FireRisk`] readings keyed by geohash.
///
/// Read-modify-write sections (access bump, eviction, metadata update) are
/// serialised by an async mutex. Entries are written before metadata, so an
/// interrupted write leaves at most one stale metadata record, which
/// [`cleanup`](Self::cleanup) reconciles.
pub struct FireRiskCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    capacity: usize,
    ttl: Duration,
    write_lock: Mutex<()>,
    stats: RwLock<CacheStats>,
}

impl FireRiskCache {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            capacity: CACHE_MAX_ENTRIES,
            ttl: Duration::seconds(CACHE_TTL_SECS),
            write_lock: Mutex::new(()),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// Override the entry capacity (minimum 1).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up the reading cached for `geohash`.
    ///
    /// Expired entries are removed and reported as `None`. Undecodable or
    /// foreign-version entries are also `None`. A hit comes back tagged
    /// `Freshness::Cached` with its original source, and refreshes the
    /// entry's access time. A failed access-time write is logged and the
    /// hit is still returned.
    pub async fn get(&self, geohash: &Geohash) -> Result<Option<FireRisk>, CacheError> {
        let _guard = self.write_lock.lock().await;
        let key = entry_key(geohash);

        let bytes = match self.store.get(&key).await? {
            Some(bytes) => bytes,
            None => {
                self.record(|s| s.misses += 1);
                return Ok(None);
            }
        };

        let entry = match CacheEntry::<FireRisk>::from_json(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(geohash = %geohash, error = %e, "Unreadable cache entry treated as miss");
                self.record(|s| s.misses += 1);
                return Ok(None);
            }
        };

        if entry.is_expired_after(self.clock.as_ref(), self.ttl) {
            self.store.delete(&key).await?;
            let mut metadata = self.load_metadata().await?;
            metadata.remove(geohash);
            self.save_metadata(&metadata).await?;
            tracing::debug!(
                geohash = %geohash,
                age_secs = entry.age(self.clock.as_ref()).num_seconds(),
                "Expired cache entry removed"
            );
            self.record(|s| {
                s.misses += 1;
                s.expirations += 1;
            });
            return Ok(None);
        }

        if let Err(e) = self.touch(geohash).await {
            tracing::warn!(geohash = %geohash, error = %e, "Failed to record cache access, serving entry anyway");
            self.record(|s| s.metadata_write_failures += 1);
        }
        self.record(|s| s.hits += 1);

        Ok(Some(entry.into_data().with_freshness(Freshness::Cached)))
    }

    /// Look up by coordinates.
    pub async fn get_at(&self, coords: &Coordinates) -> Result<Option<FireRisk>, CacheError> {
        self.get(&coords.geohash()).await
    }

    /// Store `data` under the geohash of `coords`.
    ///
    /// A new geohash inserted at capacity first evicts the least recently
    /// accessed entry. Overwriting an existing geohash never evicts.
    pub async fn set(&self, coords: &Coordinates, data: &FireRisk) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock().await;
        let geohash = coords.geohash();
        let now = self.clock.now();
        let mut metadata = self.load_metadata().await?;

        if !metadata.contains(&geohash) {
            while metadata.is_full_for(self.capacity) {
                let Some(victim) = metadata.lru_key() else {
                    break;
                };
                self.store.delete(&entry_key(&victim)).await?;
                metadata.remove(&victim);
                metadata.mark_cleanup(now);
                self.record(|s| s.evictions += 1);
                tracing::debug!(evicted = %victim, incoming = %geohash, "Evicted least recently used cache entry");
            }
        }

        let entry = CacheEntry::new(data.clone(), geohash.clone(), now);
        self.store.put(&entry_key(&geohash), &entry.to_json()?).await?;

        metadata.record_access(geohash, now);
        self.save_metadata(&metadata).await
    }

    /// Snapshot of the metadata record.
    pub async fn get_metadata(&self) -> Result<CacheMetadata, CacheError> {
        self.load_metadata().await
    }

    /// Reconcile metadata with the stored entries.
    ///
    /// Removes expired and undecodable entries, drops access-log keys with
    /// no entry, adopts stored entries missing from the log and recounts.
    pub async fn cleanup(&self) -> Result<CleanupReport, CacheError> {
        let _guard = self.write_lock.lock().await;
        let now = self.clock.now();
        let mut metadata = self.load_metadata().await?;
        let mut report = CleanupReport::default();
        let mut live = BTreeMap::new();

        for key in self.store.keys_with_prefix(CACHE_ENTRY_PREFIX).await? {
            let Some(bytes) = self.store.get(&key).await? else {
                continue;
            };
            let decoded = CacheEntry::<FireRisk>::from_json(&bytes);
            let entry = match (geohash_from_key(&key), decoded) {
                (Some(geohash), Ok(entry)) if entry.geohash() == &geohash => entry,
                (_, Err(e)) => {
                    tracing::warn!(key = %key, error = %e, "Removing unreadable cache entry");
                    self.store.delete(&key).await?;
                    report.corrupt_removed += 1;
                    continue;
                }
                _ => {
                    tracing::warn!(key = %key, "Removing cache entry stored under a mismatched key");
                    self.store.delete(&key).await?;
                    report.corrupt_removed += 1;
                    continue;
                }
            };

            if entry.is_expired_after(self.clock.as_ref(), self.ttl) {
                self.store.delete(&key).await?;
                report.expired_removed += 1;
                continue;
            }

            let geohash = entry.geohash().clone();
            let last_access = match metadata.last_access(&geohash) {
                Some(at) => at,
                None => {
                    report.untracked_adopted += 1;
                    entry.timestamp()
                }
            };
            live.insert(geohash, last_access);
        }

        report.dangling_dropped = metadata
            .access_log()
            .keys()
            .filter(|k| !live.contains_key(*k))
            .count();
        report.remaining = live.len();

        metadata.rebuild(live);
        metadata.mark_cleanup(now);
        self.save_metadata(&metadata).await?;
        self.record(|s| s.expirations += report.expired_removed as u64);

        tracing::info!(
            expired = report.expired_removed,
            corrupt = report.corrupt_removed,
            dangling = report.dangling_dropped,
            adopted = report.untracked_adopted,
            remaining = report.remaining,
            "Cache cleanup complete"
        );
        Ok(report)
    }

    /// Remove every entry and reset the metadata. Returns the number of
    /// entries removed.
    pub async fn clear(&self) -> Result<usize, CacheError> {
        let _guard = self.write_lock.lock().await;
        let mut removed = 0;
        for key in self.store.keys_with_prefix(CACHE_ENTRY_PREFIX).await? {
            if self.store.delete(&key).await? {
                removed += 1;
            }
        }
        self.save_metadata(&CacheMetadata::new(self.clock.now()))
            .await?;
        tracing::info!(removed, "Cache cleared");
        Ok(removed)
    }

    /// Hit/miss/eviction counters since construction.
    pub fn stats(&self) -> CacheStats {
        self.stats
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    async fn load_metadata(&self) -> Result<CacheMetadata, CacheError> {
        match self.store.get(CACHE_METADATA_KEY).await? {
            None => Ok(CacheMetadata::new(self.clock.now())),
            Some(bytes) => match CacheMetadata::from_json(&bytes) {
                Ok(metadata) => Ok(metadata),
                Err(e) => {
                    tracing::warn!(error = %e, "Unreadable cache metadata, starting a fresh index");
                    Ok(CacheMetadata::new(self.clock.now()))
                }
            },
        }
    }

    /// Bump the access time of `geohash` in the metadata record.
    async fn touch(&self, geohash: &Geohash) -> Result<(), CacheError> {
        let mut metadata = self.load_metadata().await?;
        metadata.record_access(geohash.clone(), self.clock.now());
        self.save_metadata(&metadata).await
    }

    async fn save_metadata(&self, metadata: &CacheMetadata) -> Result<(), CacheError> {
        self.store
            .put(CACHE_METADATA_KEY, &metadata.to_json()?)
            .await?;
        self.record(|s| s.entry_count = metadata.total_entries() as u64);
        Ok(())
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        if let Ok(mut stats) = self.stats.write() {
            update(&mut stats);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{InMemoryStore, LmdbStore};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use firewatch_core::{DataSource, ManualClock, RiskLevel};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap()
    }

    fn setup() -> (FireRiskCache, Arc<InMemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let cache = FireRiskCache::new(store.clone(), clock.clone());
        (cache, store, clock)
    }

    fn coords(lat: f64, lon: f64) -> Coordinates {
        Coordinates::new(lat, lon).unwrap()
    }

    /// Distinct geohash cells, one per index.
    fn nth_coords(i: usize) -> Coordinates {
        coords(-60.0 + i as f64 * 0.5, 12.0)
    }

    fn risk(fwi: f64, source: DataSource) -> FireRisk {
        FireRisk::from_fwi(fwi, source, Freshness::Live, t0()).unwrap()
    }

    #[tokio::test]
    async fn test_get_on_empty_cache_is_none() {
        let (cache, _, _) = setup();
        let hit = cache.get_at(&coords(55.95, -3.19)).await.unwrap();
        assert!(hit.is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_hit_is_cached_and_keeps_source() {
        let (cache, _, _) = setup();
        let here = coords(55.95, -3.19);
        cache.set(&here, &risk(25.0, DataSource::Sepa)).await.unwrap();

        let hit = cache.get_at(&here).await.unwrap().unwrap();
        assert_eq!(hit.freshness(), Freshness::Cached);
        assert_eq!(hit.source(), DataSource::Sepa);
        assert_eq!(hit.level(), RiskLevel::High);
        assert_eq!(hit.fwi(), Some(25.0));

        let meta = cache.get_metadata().await.unwrap();
        assert_eq!(meta.total_entries(), 1);
        assert!(meta.contains(&here.geohash()));
    }

    #[tokio::test]
    async fn test_nearby_points_share_an_entry() {
        let (cache, _, _) = setup();
        cache
            .set(&coords(55.9533, -3.1883), &risk(8.0, DataSource::Effis))
            .await
            .unwrap();
        assert!(cache
            .get_at(&coords(55.9534, -3.1882))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_ttl_boundary() {
        let (cache, store, clock) = setup();
        let here = coords(55.95, -3.19);
        cache.set(&here, &risk(10.0, DataSource::Effis)).await.unwrap();

        clock.advance(Duration::hours(6));
        assert!(cache.get_at(&here).await.unwrap().is_some());

        clock.advance(Duration::milliseconds(1));
        // A hit refreshes access time but not the write timestamp.
        assert!(cache.get_at(&here).await.unwrap().is_none());

        assert!(store.get(&entry_key(&here.geohash())).await.unwrap().is_none());
        let meta = cache.get_metadata().await.unwrap();
        assert_eq!(meta.total_entries(), 0);
        assert!(!meta.contains(&here.geohash()));
        assert_eq!(cache.stats().expirations, 1);
    }

    #[tokio::test]
    async fn test_lru_evicts_oldest_access_on_overflow() {
        let (cache, store, clock) = setup();
        for i in 0..CACHE_MAX_ENTRIES {
            cache.set(&nth_coords(i), &risk(3.0, DataSource::Effis)).await.unwrap();
            clock.advance(Duration::seconds(1));
        }
        assert!(cache.get_metadata().await.unwrap().is_full());

        let newcomer = nth_coords(CACHE_MAX_ENTRIES);
        cache.set(&newcomer, &risk(3.0, DataSource::Effis)).await.unwrap();

        let meta = cache.get_metadata().await.unwrap();
        assert_eq!(meta.total_entries(), CACHE_MAX_ENTRIES);
        assert!(!meta.contains(&nth_coords(0).geohash()));
        assert!(meta.contains(&nth_coords(1).geohash()));
        assert!(meta.contains(&newcomer.geohash()));
        assert!(store
            .get(&entry_key(&nth_coords(0).geohash()))
            .await
            .unwrap()
            .is_none());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_get_protects_from_next_eviction() {
        let (cache, _, clock) = setup();
        for i in 0..CACHE_MAX_ENTRIES {
            cache.set(&nth_coords(i), &risk(3.0, DataSource::Effis)).await.unwrap();
            clock.advance(Duration::seconds(1));
        }

        assert!(cache.get_at(&nth_coords(0)).await.unwrap().is_some());
        clock.advance(Duration::seconds(1));
        cache
            .set(&nth_coords(CACHE_MAX_ENTRIES), &risk(3.0, DataSource::Effis))
            .await
            .unwrap();

        let meta = cache.get_metadata().await.unwrap();
        assert!(meta.contains(&nth_coords(0).geohash()));
        assert!(!meta.contains(&nth_coords(1).geohash()));
    }

    #[tokio::test]
    async fn test_overwrite_at_capacity_does_not_evict() {
        let (cache, _, clock) = setup();
        let cache = cache.with_capacity(3);
        for i in 0..3 {
            cache.set(&nth_coords(i), &risk(3.0, DataSource::Effis)).await.unwrap();
            clock.advance(Duration::seconds(1));
        }
        cache.set(&nth_coords(0), &risk(40.0, DataSource::Sepa)).await.unwrap();

        let meta = cache.get_metadata().await.unwrap();
        assert_eq!(meta.total_entries(), 3);
        assert_eq!(cache.stats().evictions, 0);
        let hit = cache.get_at(&nth_coords(0)).await.unwrap().unwrap();
        assert_eq!(hit.level(), RiskLevel::VeryHigh);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_miss_and_cleanup_removes_it() {
        let (cache, store, _) = setup();
        let here = coords(55.95, -3.19);
        cache.set(&here, &risk(10.0, DataSource::Effis)).await.unwrap();
        store
            .put(&entry_key(&here.geohash()), b"{\"version\":\"1.0\",")
            .await
            .unwrap();

        assert!(cache.get_at(&here).await.unwrap().is_none());

        let report = cache.cleanup().await.unwrap();
        assert_eq!(report.corrupt_removed, 1);
        assert_eq!(report.dangling_dropped, 1);
        assert_eq!(report.remaining, 0);
        assert!(store.get(&entry_key(&here.geohash())).await.unwrap().is_none());
        assert_eq!(cache.get_metadata().await.unwrap().total_entries(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_version_is_miss() {
        let (cache, store, _) = setup();
        let here = coords(55.95, -3.19);
        let stale_format = format!(
            r#"{{"version":"2.0","timestamp":{},"geohash":"{}","data":{{}}}}"#,
            t0().timestamp_millis(),
            here.geohash()
        );
        store
            .put(&entry_key(&here.geohash()), stale_format.as_bytes())
            .await
            .unwrap();
        assert!(cache.get_at(&here).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_expires_and_adopts() {
        let (cache, store, clock) = setup();
        let old = coords(50.0, 5.0);
        let fresh = coords(40.0, -4.0);
        cache.set(&old, &risk(1.0, DataSource::Effis)).await.unwrap();

        clock.advance(Duration::hours(5));
        // Written behind the cache's back, so the access log does not know it.
        let orphan = CacheEntry::new(risk(30.0, DataSource::Sepa), fresh.geohash(), clock.now());
        store
            .put(&entry_key(&fresh.geohash()), &orphan.to_json().unwrap())
            .await
            .unwrap();

        clock.advance(Duration::hours(2));
        let report = cache.cleanup().await.unwrap();
        assert_eq!(report.expired_removed, 1);
        assert_eq!(report.untracked_adopted, 1);
        assert_eq!(report.remaining, 1);

        let meta = cache.get_metadata().await.unwrap();
        assert_eq!(meta.total_entries(), 1);
        assert!(meta.contains(&fresh.geohash()));
        assert_eq!(meta.last_cleanup(), clock.now());
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let (cache, store, _) = setup();
        for i in 0..5 {
            cache.set(&nth_coords(i), &risk(3.0, DataSource::Effis)).await.unwrap();
        }
        assert_eq!(cache.clear().await.unwrap(), 5);
        assert!(store
            .keys_with_prefix(CACHE_ENTRY_PREFIX)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(cache.get_metadata().await.unwrap().total_entries(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_metadata_starts_fresh_index() {
        let (cache, store, _) = setup();
        store.put(CACHE_METADATA_KEY, b"garbage").await.unwrap();
        let here = coords(55.95, -3.19);
        cache.set(&here, &risk(10.0, DataSource::Effis)).await.unwrap();
        assert_eq!(cache.get_metadata().await.unwrap().total_entries(), 1);
    }

    struct UnavailableStore;

    #[async_trait]
    impl KeyValueStore for UnavailableStore {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(CacheError::Store {
                reason: "disk gone".to_string(),
            })
        }

        async fn put(&self, _key: &str, _value: &[u8]) -> Result<(), CacheError> {
            Err(CacheError::Store {
                reason: "disk gone".to_string(),
            })
        }

        async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
            Err(CacheError::Store {
                reason: "disk gone".to_string(),
            })
        }

        async fn keys_with_prefix(&self, _prefix: &str) -> Result<Vec<String>, CacheError> {
            Err(CacheError::Store {
                reason: "disk gone".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_store_failures_are_typed_errors() {
        let cache = FireRiskCache::new(Arc::new(UnavailableStore), Arc::new(ManualClock::new(t0())));
        let here = coords(55.95, -3.19);
        assert!(matches!(
            cache.set(&here, &risk(1.0, DataSource::Effis)).await,
            Err(CacheError::Store { .. })
        ));
        assert!(matches!(
            cache.get_at(&here).await,
            Err(CacheError::Store { .. })
        ));
    }

    /// In-memory store whose writes can be switched off.
    struct FlakyStore {
        inner: InMemoryStore,
        fail_puts: AtomicBool,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: InMemoryStore::new(),
                fail_puts: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
            if self.fail_puts.load(Ordering::SeqCst) {
                return Err(CacheError::Store {
                    reason: "map full".to_string(),
                });
            }
            self.inner.put(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<bool, CacheError> {
            self.inner.delete(key).await
        }

        async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
            self.inner.keys_with_prefix(prefix).await
        }
    }

    #[tokio::test]
    async fn test_hit_survives_failed_access_write() {
        let store = Arc::new(FlakyStore::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let cache = FireRiskCache::new(store.clone(), clock);
        let here = coords(55.95, -3.19);
        cache.set(&here, &risk(14.0, DataSource::Sepa)).await.unwrap();

        store.fail_puts.store(true, Ordering::SeqCst);
        let hit = cache.get_at(&here).await.unwrap().unwrap();

        assert_eq!(hit.source(), DataSource::Sepa);
        assert_eq!(hit.freshness(), Freshness::Cached);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.metadata_write_failures, 1);
    }

    #[tokio::test]
    async fn test_ttl_boundary_with_sub_millisecond_write_time() {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(t0() + Duration::microseconds(700)));
        let cache = FireRiskCache::new(store, clock.clone());
        let here = coords(57.48, -4.22);
        cache.set(&here, &risk(9.0, DataSource::Effis)).await.unwrap();

        clock.advance(Duration::hours(6));
        assert!(cache.get_at(&here).await.unwrap().is_some());

        clock.advance(Duration::milliseconds(1));
        assert!(cache.get_at(&here).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_custom_ttl() {
        let (cache, _, clock) = setup();
        let cache = cache.with_ttl(Duration::hours(1));
        let here = coords(40.42, -3.70);
        cache.set(&here, &risk(30.0, DataSource::Effis)).await.unwrap();

        clock.advance(Duration::hours(1));
        assert!(cache.get_at(&here).await.unwrap().is_some());

        clock.advance(Duration::milliseconds(1));
        assert!(cache.get_at(&here).await.unwrap().is_none());
        assert_eq!(cache.stats().expirations, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_keep_index_consistent() {
        let (cache, store, _) = setup();
        let cache = Arc::new(cache.with_capacity(8));
        let mut tasks = tokio::task::JoinSet::new();

        for i in 0..64usize {
            let cache = cache.clone();
            tasks.spawn(async move {
                cache
                    .set(&nth_coords(i % 20), &risk(i as f64, DataSource::Effis))
                    .await
                    .unwrap();
                cache.get_at(&nth_coords((i * 7) % 20)).await.unwrap();
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap();
        }

        let meta = cache.get_metadata().await.unwrap();
        let stored = store.keys_with_prefix(CACHE_ENTRY_PREFIX).await.unwrap();
        assert!(meta.total_entries() <= 8);
        assert_eq!(stored.len(), meta.total_entries());
        assert_eq!(meta.access_log().len(), stored.len());
        for key in stored {
            let geohash = geohash_from_key(&key).unwrap();
            assert!(meta.contains(&geohash));
        }
    }

    #[tokio::test]
    async fn test_lmdb_backed_cache_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(t0()));
        let here = coords(57.48, -4.22);
        {
            let store = Arc::new(LmdbStore::open(dir.path(), 10).unwrap());
            let cache = FireRiskCache::new(store, clock.clone());
            cache.set(&here, &risk(55.0, DataSource::Effis)).await.unwrap();
        }

        let store = Arc::new(LmdbStore::open(dir.path(), 10).unwrap());
        let cache = FireRiskCache::new(store, clock);
        let hit = cache.get_at(&here).await.unwrap().unwrap();
        assert_eq!(hit.level(), RiskLevel::Extreme);
        assert_eq!(hit.freshness(), Freshness::Cached);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_entry_count_never_exceeds_capacity(
            picks in proptest::collection::vec(0usize..40, 1..80),
            capacity in 1usize..12,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let (cache, store, clock) = setup();
                let cache = cache.with_capacity(capacity);
                for pick in picks {
                    cache.set(&nth_coords(pick), &risk(3.0, DataSource::Effis)).await.unwrap();
                    clock.advance(Duration::seconds(1));
                    let meta = cache.get_metadata().await.unwrap();
                    assert!(meta.total_entries() <= capacity);
                    let stored = store.keys_with_prefix(CACHE_ENTRY_PREFIX).await.unwrap();
                    assert_eq!(stored.len(), meta.total_entries());
                }
            });
        }
    }
}
