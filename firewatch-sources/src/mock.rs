//! Deterministic mock adapter, the terminal tier of the fallback chain.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firewatch_core::{ApiError, Clock, Coordinates, FireRisk, SystemClock};

use crate::RiskProvider;

/// Upper bound of the synthetic FWI, in tenths (40.0).
const MOCK_FWI_TENTHS_SPAN: u32 = 401;

/// Synthesise the mock reading for `coords` observed at `now`.
///
/// The FWI depends only on the geohash cell, so every point in a cell gets
/// the same value across calls and processes.
pub fn deterministic_mock(coords: &Coordinates, now: DateTime<Utc>) -> FireRisk {
    let seed = fnv1a(coords.geohash().as_str().as_bytes());
    // Always < 401, so the narrowing is lossless.
    let tenths = (seed % MOCK_FWI_TENTHS_SPAN) as u16;
    FireRisk::mock(tenths, now)
}

/// 32-bit FNV-1a.
fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0x811c_9dc5_u32, |hash, b| {
        (hash ^ u32::from(*b)).wrapping_mul(0x0100_0193)
    })
}

/// Adapter that never fails.
pub struct MockProvider {
    clock: Arc<dyn Clock>,
}

impl MockProvider {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[async_trait]
impl RiskProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get_current(
        &self,
        coords: Coordinates,
        _timeout: Duration,
    ) -> Result<FireRisk, ApiError> {
        Ok(deterministic_mock(&coords, self.clock.now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use firewatch_core::{DataSource, Freshness, ManualClock, RiskLevel};
    use proptest::prelude::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_fnv1a_reference_values() {
        assert_eq!(fnv1a(b""), 0x811c_9dc5);
        assert_eq!(fnv1a(b"a"), 0xe40c_292c);
    }

    #[test]
    fn test_same_cell_same_value() {
        let a = deterministic_mock(&Coordinates::new(55.9533, -3.1883).unwrap(), at());
        let b = deterministic_mock(&Coordinates::new(55.9534, -3.1882).unwrap(), at());
        assert_eq!(a, b);
        assert_eq!(a.source(), DataSource::Mock);
        assert_eq!(a.freshness(), Freshness::Mock);
        assert_eq!(a.observed_at(), at());
    }

    #[tokio::test]
    async fn test_provider_uses_clock() {
        let provider = MockProvider::new(Arc::new(ManualClock::new(at())));
        let coords = Coordinates::new(51.5, -0.12).unwrap();
        let risk = provider
            .get_current(coords, Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(risk, deterministic_mock(&coords, at()));
    }

    proptest! {
        #[test]
        fn prop_mock_is_valid_everywhere(lat in -90.0f64..=90.0, lon in -180.0f64..=180.0) {
            let risk = deterministic_mock(&Coordinates::new(lat, lon).unwrap(), at());
            let fwi = risk.fwi().unwrap();
            prop_assert!((0.0..=40.0).contains(&fwi));
            prop_assert_eq!(risk.level(), RiskLevel::from_fwi(fwi).unwrap());
        }
    }
}
