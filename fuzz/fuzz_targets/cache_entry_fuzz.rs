//! Fuzz target for persisted cache records.
//!
//! Arbitrary bytes must decode to a value or a `CacheError`, never panic.
//! Anything that decodes must survive a re-encode.
//!
//! Run with: cargo +nightly fuzz run cache_entry_fuzz -- -max_total_time=60

#![no_main]

use firewatch_core::FireRisk;
use firewatch_storage::{CacheEntry, CacheMetadata};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(entry) = CacheEntry::<FireRisk>::from_json(data) {
        let bytes = entry.to_json().expect("decoded entry must re-encode");
        let again = CacheEntry::<FireRisk>::from_json(&bytes).expect("re-encoded entry must decode");
        assert_eq!(again.geohash(), entry.geohash());
        assert_eq!(again.timestamp(), entry.timestamp());
    }

    if let Ok(meta) = CacheMetadata::from_json(data) {
        let bytes = meta.to_json().expect("decoded metadata must re-encode");
        let again = CacheMetadata::from_json(&bytes).expect("re-encoded metadata must decode");
        assert_eq!(again.total_entries(), meta.total_entries());
    }
});
