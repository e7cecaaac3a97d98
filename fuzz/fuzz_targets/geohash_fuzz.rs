//! Fuzz target for geohash parsing and coordinate validation.
//!
//! Run with: cargo +nightly fuzz run geohash_fuzz -- -max_total_time=60

#![no_main]

use firewatch_core::{Coordinates, Geohash};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(hash) = Geohash::parse(input) {
            let bounds = hash.bounds();
            assert!(bounds.min_lat <= bounds.max_lat);
            assert!(bounds.min_lon <= bounds.max_lon);
        }
    }

    if data.len() >= 16 {
        let lat = f64::from_le_bytes(data[0..8].try_into().unwrap());
        let lon = f64::from_le_bytes(data[8..16].try_into().unwrap());
        if let Ok(coords) = Coordinates::new(lat, lon) {
            let hash = coords.geohash();
            assert!(hash.bounds().contains(&coords));
        } else {
            assert!(!lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0);
        }
    }
});
