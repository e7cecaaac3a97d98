//! Store trait and cache statistics.

use async_trait::async_trait;
use firewatch_core::CacheError;

/// Byte-oriented key-value store the cache persists into.
///
/// Implementations must be safe to share between tasks. Keys are UTF-8
/// strings; values are opaque bytes.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Insert or overwrite `key`.
    async fn put(&self, key: &str, value: &[u8]) -> Result<(), CacheError>;

    /// Remove `key`. Returns whether a value was present.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// All keys that start with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of misses, including expired and undecodable entries.
    pub misses: u64,
    /// Entries removed to make room for a new geohash.
    pub evictions: u64,
    /// Entries removed because their TTL elapsed.
    pub expirations: u64,
    /// Entry count recorded by the last metadata write.
    pub entry_count: u64,
    /// Hits whose access-time update could not be persisted.
    pub metadata_write_failures: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
