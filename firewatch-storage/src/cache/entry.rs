//! Versioned cache records and the LRU/TTL index.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use firewatch_core::constants::{CACHE_FORMAT_VERSION, CACHE_MAX_ENTRIES, CACHE_TTL_SECS};
use firewatch_core::{CacheError, Clock, Geohash};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A timestamped, versioned payload stored under one geohash.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    data: T,
    timestamp: DateTime<Utc>,
    geohash: Geohash,
    version: String,
}

impl<T> CacheEntry<T> {
    /// Wrap `data` written at `timestamp`.
    ///
    /// The timestamp is truncated to whole milliseconds, the resolution of
    /// the stored record.
    pub fn new(data: T, geohash: Geohash, timestamp: DateTime<Utc>) -> Self {
        Self {
            data,
            timestamp: timestamp.trunc_subsecs(3),
            geohash,
            version: CACHE_FORMAT_VERSION.to_string(),
        }
    }

    /// Wrap `data` stamped with the clock's current time.
    pub fn now(data: T, geohash: Geohash, clock: &dyn Clock) -> Self {
        Self::new(data, geohash, clock.now())
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn geohash(&self) -> &Geohash {
        &self.geohash
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Time since the entry was written, at the millisecond resolution of
    /// the stored timestamp.
    pub fn age(&self, clock: &dyn Clock) -> Duration {
        clock.now().trunc_subsecs(3) - self.timestamp
    }

    /// Older than the 6 hour TTL. An entry exactly at the TTL is still fresh.
    pub fn is_expired(&self, clock: &dyn Clock) -> bool {
        self.is_expired_after(clock, Duration::seconds(CACHE_TTL_SECS))
    }

    pub fn is_expired_after(&self, clock: &dyn Clock, ttl: Duration) -> bool {
        self.age(clock) > ttl
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryRecord<T> {
    version: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
    geohash: String,
    data: T,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: String,
}

impl<T: Serialize> CacheEntry<T> {
    pub fn to_json(&self) -> Result<Vec<u8>, CacheError> {
        let record = EntryRecord {
            version: self.version.clone(),
            timestamp: self.timestamp,
            geohash: self.geohash.to_string(),
            data: &self.data,
        };
        serde_json::to_vec(&record).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })
    }
}

impl<T: DeserializeOwned> CacheEntry<T> {
    /// Decode a stored record.
    ///
    /// The version is checked before the payload so that a record from a
    /// different format is reported as `UnsupportedVersion` even when its
    /// payload no longer matches `T`.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CacheError> {
        let probe: VersionProbe = serde_json::from_slice(bytes).map_err(deserialization)?;
        if probe.version != CACHE_FORMAT_VERSION {
            return Err(CacheError::UnsupportedVersion {
                found: probe.version,
                expected: CACHE_FORMAT_VERSION.to_string(),
            });
        }

        let record: EntryRecord<T> = serde_json::from_slice(bytes).map_err(deserialization)?;
        let geohash = Geohash::parse(&record.geohash).map_err(deserialization)?;
        Ok(Self {
            data: record.data,
            timestamp: record.timestamp,
            geohash,
            version: record.version,
        })
    }
}

fn deserialization(e: impl std::fmt::Display) -> CacheError {
    CacheError::Deserialization {
        reason: e.to_string(),
    }
}

/// Entry count, last sweep time and per-geohash access log.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheMetadata {
    total_entries: usize,
    last_cleanup: DateTime<Utc>,
    access_log: BTreeMap<Geohash, DateTime<Utc>>,
}

impl CacheMetadata {
    /// Empty index stamped with `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            total_entries: 0,
            last_cleanup: now.trunc_subsecs(3),
            access_log: BTreeMap::new(),
        }
    }

    pub fn total_entries(&self) -> usize {
        self.total_entries
    }

    pub fn last_cleanup(&self) -> DateTime<Utc> {
        self.last_cleanup
    }

    pub fn access_log(&self) -> &BTreeMap<Geohash, DateTime<Utc>> {
        &self.access_log
    }

    pub fn last_access(&self, geohash: &Geohash) -> Option<DateTime<Utc>> {
        self.access_log.get(geohash).copied()
    }

    pub fn contains(&self, geohash: &Geohash) -> bool {
        self.access_log.contains_key(geohash)
    }

    /// At the default capacity of 100 entries.
    pub fn is_full(&self) -> bool {
        self.is_full_for(CACHE_MAX_ENTRIES)
    }

    pub fn is_full_for(&self, capacity: usize) -> bool {
        self.total_entries >= capacity
    }

    /// Geohash with the oldest access time. Ties go to the smallest geohash.
    pub fn lru_key(&self) -> Option<Geohash> {
        self.access_log
            .iter()
            .min_by(|(ka, ta), (kb, tb)| ta.cmp(tb).then_with(|| ka.cmp(kb)))
            .map(|(key, _)| key.clone())
    }

    /// Record an access; a previously unseen geohash counts as a new entry.
    pub(crate) fn record_access(&mut self, geohash: Geohash, at: DateTime<Utc>) {
        if self.access_log.insert(geohash, at.trunc_subsecs(3)).is_none() {
            self.total_entries += 1;
        }
    }

    /// Drop a geohash. Returns whether it was tracked.
    pub(crate) fn remove(&mut self, geohash: &Geohash) -> bool {
        let removed = self.access_log.remove(geohash).is_some();
        if removed {
            self.total_entries = self.total_entries.saturating_sub(1);
        }
        removed
    }

    pub(crate) fn mark_cleanup(&mut self, at: DateTime<Utc>) {
        self.last_cleanup = at.trunc_subsecs(3);
    }

    /// Replace the log wholesale and recount.
    pub(crate) fn rebuild(&mut self, access_log: BTreeMap<Geohash, DateTime<Utc>>) {
        self.total_entries = access_log.len();
        self.access_log = access_log;
    }

    pub fn to_json(&self) -> Result<Vec<u8>, CacheError> {
        let record = MetadataRecord {
            total_entries: self.total_entries,
            last_cleanup: self.last_cleanup,
            access_log: self
                .access_log
                .iter()
                .map(|(k, v)| (k.to_string(), v.timestamp_millis()))
                .collect(),
        };
        serde_json::to_vec(&record).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, CacheError> {
        let record: MetadataRecord = serde_json::from_slice(bytes).map_err(deserialization)?;
        let mut access_log = BTreeMap::new();
        for (raw, millis) in record.access_log {
            let geohash = Geohash::parse(&raw).map_err(deserialization)?;
            let at = DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                deserialization(format!("access time {} out of range", millis))
            })?;
            access_log.insert(geohash, at);
        }
        Ok(Self {
            total_entries: record.total_entries,
            last_cleanup: record.last_cleanup,
            access_log,
        })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataRecord {
    total_entries: usize,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    last_cleanup: DateTime<Utc>,
    access_log: BTreeMap<String, i64>,
}
