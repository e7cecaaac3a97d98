//! Cache layer with TTL expiry and LRU eviction.
//!
//! Entries are stored under `cache_entry_<geohash>` and a single metadata
//! record under `cache_metadata` tracks the entry count and an access log.
//!
//! # Expiry
//!
//! TTL is checked lazily: an expired entry is only removed when it is read,
//! or when [`FireRiskCache::cleanup`] sweeps the store.
//!
//! # Eviction
//!
//! Inserting a new geohash while the cache is at capacity first evicts the
//! geohash with the oldest access timestamp. Reads bump the access time, so
//! a recently read entry is protected from the next eviction.

pub mod entry;
pub mod fire_risk;
pub mod lmdb_backend;
pub mod memory;
pub mod traits;

pub use entry::{CacheEntry, CacheMetadata};
pub use fire_risk::{CleanupReport, FireRiskCache};
pub use lmdb_backend::LmdbStore;
pub use memory::InMemoryStore;
pub use traits::{CacheStats, KeyValueStore};

use firewatch_core::constants::CACHE_ENTRY_PREFIX;
use firewatch_core::Geohash;

/// Store key for the entry of `geohash`.
pub fn entry_key(geohash: &Geohash) -> String {
    format!("{}{}", CACHE_ENTRY_PREFIX, geohash)
}

/// Recover the geohash from an entry key, if it is one.
pub fn geohash_from_key(key: &str) -> Option<Geohash> {
    key.strip_prefix(CACHE_ENTRY_PREFIX)
        .and_then(|raw| Geohash::parse(raw).ok())
}
