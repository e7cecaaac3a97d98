//! FIREWATCH Storage - Fire-Risk Cache
//!
//! A geohash-keyed cache of [`FireRisk`](firewatch_core::FireRisk) readings
//! over a pluggable key-value store. The durable store is LMDB; an in-memory
//! store backs tests and ephemeral runs.

pub mod cache;

pub use cache::{
    CacheEntry, CacheMetadata, CacheStats, CleanupReport, FireRiskCache, InMemoryStore,
    KeyValueStore, LmdbStore,
};
