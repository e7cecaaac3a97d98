//! FIREWATCH Test Utilities
//!
//! Shared test infrastructure for the FIREWATCH workspace:
//! - Scripted adapters that succeed, fail, stall or hang on demand
//! - A store that is always unavailable
//! - Proptest generators for coordinates and FWI values
//! - Fixtures for common locations and readings

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use firewatch_core::{
    ApiError, CacheError, Coordinates, DataSource, FireRisk, Freshness,
};
use firewatch_sources::{EffisFwiResult, FwiProvider, RiskProvider};
use firewatch_storage::KeyValueStore;

// Re-export core types for convenience
pub use firewatch_core::{Clock, ManualClock, RiskLevel};

// ============================================================================
// SCRIPTED ADAPTERS
// ============================================================================

/// What a scripted adapter does when called.
#[derive(Debug, Clone)]
pub enum Script {
    /// Respond immediately with this FWI.
    Fwi(f64),
    /// Respond with this FWI after the delay (tokio time).
    Delayed(Duration, f64),
    /// Fail immediately.
    Fail(ApiError),
    /// Never respond.
    Hang,
}

#[derive(Debug)]
struct ScriptState {
    script: Mutex<Script>,
    calls: AtomicUsize,
    last_timeout: Mutex<Option<Duration>>,
}

impl ScriptState {
    fn new(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
            last_timeout: Mutex::new(None),
        }
    }

    /// Record the call and return the script to run.
    fn enter(&self, timeout: Duration) -> Script {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_timeout.lock() {
            *last = Some(timeout);
        }
        self.script
            .lock()
            .map(|s| s.clone())
            .unwrap_or(Script::Hang)
    }

    /// Run `script`, producing the FWI to report.
    async fn run(script: Script) -> Result<f64, ApiError> {
        match script {
            Script::Fwi(fwi) => Ok(fwi),
            Script::Delayed(delay, fwi) => {
                tokio::time::sleep(delay).await;
                Ok(fwi)
            }
            Script::Fail(err) => Err(err),
            Script::Hang => std::future::pending().await,
        }
    }
}

macro_rules! scripted_accessors {
    () => {
        pub fn succeeding(fwi: f64) -> Self {
            Self::new(Script::Fwi(fwi))
        }

        /// Fails with an HTTP status (503 unless stated otherwise by the caller).
        pub fn failing(status: u16) -> Self {
            Self::new(Script::Fail(ApiError::with_status(
                format!("scripted failure {}", status),
                status,
            )))
        }

        pub fn hanging() -> Self {
            Self::new(Script::Hang)
        }

        pub fn delayed(delay: Duration, fwi: f64) -> Self {
            Self::new(Script::Delayed(delay, fwi))
        }

        /// Replace the script for subsequent calls.
        pub fn set_script(&self, script: Script) {
            if let Ok(mut current) = self.state.script.lock() {
                *current = script;
            }
        }

        /// Number of times the adapter was called.
        pub fn calls(&self) -> usize {
            self.state.calls.load(Ordering::SeqCst)
        }

        /// Timeout passed on the most recent call.
        pub fn last_timeout(&self) -> Option<Duration> {
            self.state.last_timeout.lock().ok().and_then(|t| *t)
        }
    };
}

/// Scripted [`FwiProvider`] standing in for EFFIS.
#[derive(Debug)]
pub struct ScriptedEffis {
    state: ScriptState,
}

impl ScriptedEffis {
    pub fn new(script: Script) -> Self {
        Self {
            state: ScriptState::new(script),
        }
    }

    scripted_accessors!();
}

#[async_trait]
impl FwiProvider for ScriptedEffis {
    fn name(&self) -> &str {
        "scripted-effis"
    }

    async fn get_fwi(
        &self,
        coords: Coordinates,
        timeout: Duration,
    ) -> Result<EffisFwiResult, ApiError> {
        let fwi = ScriptState::run(self.state.enter(timeout)).await?;
        Ok(EffisFwiResult {
            fwi,
            ffmc: None,
            dmc: None,
            dc: None,
            isi: None,
            bui: None,
            observed_at: fixtures::observed_at(),
            latitude: coords.lat(),
            longitude: coords.lon(),
        })
    }
}

/// Scripted [`RiskProvider`] reporting readings tagged with `source`.
///
/// Used for the SEPA tier and, with `DataSource::Mock`, for the mock tier.
#[derive(Debug)]
pub struct ScriptedRisk {
    state: ScriptState,
    source: DataSource,
}

impl ScriptedRisk {
    pub fn new(script: Script) -> Self {
        Self {
            state: ScriptState::new(script),
            source: DataSource::Sepa,
        }
    }

    /// Tag successful readings with `source` instead of `Sepa`.
    pub fn with_source(mut self, source: DataSource) -> Self {
        self.source = source;
        self
    }

    scripted_accessors!();
}

#[async_trait]
impl RiskProvider for ScriptedRisk {
    fn name(&self) -> &str {
        "scripted-risk"
    }

    async fn get_current(
        &self,
        _coords: Coordinates,
        timeout: Duration,
    ) -> Result<FireRisk, ApiError> {
        let fwi = ScriptState::run(self.state.enter(timeout)).await?;
        let freshness = match self.source {
            DataSource::Mock => Freshness::Mock,
            _ => Freshness::Live,
        };
        FireRisk::from_fwi(fwi, self.source, freshness, fixtures::observed_at())
            .map_err(ApiError::from)
    }
}

// ============================================================================
// STORES
// ============================================================================

/// [`KeyValueStore`] whose every operation fails.
#[derive(Debug, Default)]
pub struct UnavailableStore;

fn unavailable() -> CacheError {
    CacheError::Store {
        reason: "store unavailable".to_string(),
    }
}

#[async_trait]
impl KeyValueStore for UnavailableStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(unavailable())
    }

    async fn put(&self, _key: &str, _value: &[u8]) -> Result<(), CacheError> {
        Err(unavailable())
    }

    async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
        Err(unavailable())
    }

    async fn keys_with_prefix(&self, _prefix: &str) -> Result<Vec<String>, CacheError> {
        Err(unavailable())
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for FIREWATCH inputs.

    use firewatch_core::constants::{
        SCOTLAND_MAX_LAT, SCOTLAND_MAX_LON, SCOTLAND_MIN_LAT, SCOTLAND_MIN_LON,
    };
    use firewatch_core::Coordinates;
    use proptest::prelude::*;

    /// Any valid (lat, lon) pair, boundaries included.
    pub fn arb_lat_lon() -> impl Strategy<Value = (f64, f64)> {
        (-90.0f64..=90.0, -180.0f64..=180.0)
    }

    pub fn arb_coordinates() -> impl Strategy<Value = Coordinates> {
        arb_lat_lon().prop_filter_map("valid coordinates", |(lat, lon)| {
            Coordinates::new(lat, lon).ok()
        })
    }

    /// Points inside the default Scotland box.
    pub fn arb_scotland_lat_lon() -> impl Strategy<Value = (f64, f64)> {
        (
            SCOTLAND_MIN_LAT..=SCOTLAND_MAX_LAT,
            SCOTLAND_MIN_LON..=SCOTLAND_MAX_LON,
        )
    }

    /// Points south of the Scotland box, so never inside it.
    pub fn arb_outside_scotland_lat_lon() -> impl Strategy<Value = (f64, f64)> {
        (-90.0f64..(SCOTLAND_MIN_LAT - 0.01), -180.0f64..=180.0)
    }

    /// Non-negative FWI values across every band.
    pub fn arb_fwi() -> impl Strategy<Value = f64> {
        prop_oneof![0.0f64..5.0, 5.0f64..50.0, 50.0f64..150.0]
    }

    /// Latitudes that must be rejected.
    pub fn arb_invalid_latitude() -> impl Strategy<Value = f64> {
        prop_oneof![
            Just(f64::NAN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
            90.000_001f64..1.0e6,
            -1.0e6f64..-90.000_001,
        ]
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built locations, readings and caches.

    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};
    use firewatch_core::{Clock, Coordinates, DataSource, FireRisk, Freshness, ManualClock};
    use firewatch_storage::{FireRiskCache, InMemoryStore};

    /// Observation time stamped on scripted readings.
    pub fn observed_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    pub fn edinburgh() -> (f64, f64) {
        (55.9533, -3.1883)
    }

    pub fn inverness() -> (f64, f64) {
        (57.4778, -4.2247)
    }

    pub fn london() -> (f64, f64) {
        (51.5074, -0.1278)
    }

    pub fn madrid() -> (f64, f64) {
        (40.4168, -3.7038)
    }

    pub fn coords((lat, lon): (f64, f64)) -> Coordinates {
        match Coordinates::new(lat, lon) {
            Ok(coords) => coords,
            Err(e) => panic!("fixture coordinates must be valid: {e}"),
        }
    }

    /// Live reading from `source`.
    pub fn live_risk(fwi: f64, source: DataSource) -> FireRisk {
        match FireRisk::from_fwi(fwi, source, Freshness::Live, observed_at()) {
            Ok(risk) => risk,
            Err(e) => panic!("fixture FWI must be valid: {e}"),
        }
    }

    pub fn manual_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(observed_at()))
    }

    /// In-memory cache on `clock`, plus its store for direct inspection.
    pub fn memory_cache(clock: Arc<dyn Clock>) -> (Arc<FireRiskCache>, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(FireRiskCache::new(store.clone(), clock));
        (cache, store)
    }
}
