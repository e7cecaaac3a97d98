//! Fuzz target for EFFIS and SEPA response parsing.
//!
//! Upstream bodies are untrusted; parsing may fail but must not panic, and
//! an accepted reading must carry a non-negative FWI.
//!
//! Run with: cargo +nightly fuzz run upstream_payload_fuzz -- -max_total_time=60

#![no_main]

use chrono::{TimeZone, Utc};
use firewatch_core::Coordinates;
use firewatch_sources::effis::parse_feature_info;
use firewatch_sources::sepa::parse_fwi_response;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = std::str::from_utf8(data) else {
        return;
    };
    let coords = Coordinates::new(55.95, -3.19).unwrap();
    let now = Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap();

    if let Ok(result) = parse_feature_info(body, &coords, now) {
        assert!(result.fwi >= 0.0);
    }
    if let Ok(risk) = parse_fwi_response(body) {
        assert!(risk.fwi().map_or(true, |fwi| fwi >= 0.0));
    }
});
