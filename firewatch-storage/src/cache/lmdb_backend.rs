//! LMDB-backed store.
//!
//! Uses the heed crate (Rust bindings for LMDB) for a memory-mapped,
//! durable key-value store. A single unnamed database holds both entry
//! records and the metadata record.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The store uses:
//! - Read transactions for `get` and prefix scans
//! - Write transactions for `put` and `delete`

use std::path::Path;

use async_trait::async_trait;
use firewatch_core::CacheError;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use super::traits::KeyValueStore;

fn store_err(e: impl std::fmt::Display) -> CacheError {
    CacheError::Store {
        reason: e.to_string(),
    }
}

/// Durable [`KeyValueStore`] over an LMDB environment.
pub struct LmdbStore {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
}

impl LmdbStore {
    /// Open (or create) a store in `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the memory map in megabytes
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Store` if:
    /// - The map size in bytes overflows `usize`
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, CacheError> {
        let map_size = max_size_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| CacheError::Store {
                reason: format!("map size of {} MB overflows", max_size_mb),
            })?;
        std::fs::create_dir_all(&path).map_err(store_err)?;

        // SAFETY: the environment is opened once per path by this process and
        // the memory map is never accessed outside heed's transactions.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(store_err)?;

        let mut wtxn = env.write_txn().map_err(store_err)?;
        let db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, None).map_err(store_err)?;
        wtxn.commit().map_err(store_err)?;

        Ok(Self { env, db })
    }
}

#[async_trait]
impl KeyValueStore for LmdbStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let rtxn = self.env.read_txn().map_err(store_err)?;
        let value = self.db.get(&rtxn, key.as_bytes()).map_err(store_err)?;
        Ok(value.map(|bytes| bytes.to_vec()))
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        let mut wtxn = self.env.write_txn().map_err(store_err)?;
        self.db
            .put(&mut wtxn, key.as_bytes(), value)
            .map_err(store_err)?;
        wtxn.commit().map_err(store_err)
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut wtxn = self.env.write_txn().map_err(store_err)?;
        let deleted = self
            .db
            .delete(&mut wtxn, key.as_bytes())
            .map_err(store_err)?;
        wtxn.commit().map_err(store_err)?;
        Ok(deleted)
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let rtxn = self.env.read_txn().map_err(store_err)?;
        let iter = self.db.iter(&rtxn).map_err(store_err)?;
        let prefix = prefix.as_bytes();

        let mut keys = Vec::new();
        for result in iter {
            match result {
                Ok((key, _)) if key.starts_with(prefix) => {
                    if let Ok(key) = std::str::from_utf8(key) {
                        keys.push(key.to_string());
                    }
                }
                _ => continue,
            }
        }
        Ok(keys)
    }
}
