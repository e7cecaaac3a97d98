//! Fire-risk fallback orchestrator.
//!
//! A request walks an ordered tier plan (EFFIS, SEPA for Scottish
//! coordinates, cache, mock) until one tier resolves. Every tier runs under
//! its own timeout, clipped so the whole chain fits the global deadline
//! with a reserve left for the mock tier. Only invalid coordinates ever
//! produce an error.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use firewatch_core::constants::{
    DEFAULT_CACHE_TIMEOUT_MS, DEFAULT_EFFIS_TIMEOUT_MS, DEFAULT_GLOBAL_DEADLINE_MS,
    DEFAULT_MOCK_TIMEOUT_MS, DEFAULT_SEPA_TIMEOUT_MS,
};
use firewatch_core::{
    ApiError, Clock, Coordinates, DataSource, FireRisk, FirewatchConfig, FirewatchResult,
    RegionBounds, SystemClock,
};
use firewatch_sources::{
    deterministic_mock, EffisClient, FwiProvider, MockProvider, RiskProvider, SepaClient,
};
use firewatch_storage::{FireRiskCache, InMemoryStore, KeyValueStore, LmdbStore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::telemetry::{
    TelemetryChain, TelemetryEvent, TelemetryRecord, TelemetrySink, TracingTelemetry,
};

/// One step of the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Effis,
    Sepa,
    Cache,
    Mock,
}

impl Tier {
    /// Fallback depth reported for this tier.
    pub fn depth(&self) -> u8 {
        match self {
            Tier::Effis => 0,
            Tier::Sepa => 1,
            Tier::Cache => 2,
            Tier::Mock => 3,
        }
    }

    pub fn source(&self) -> DataSource {
        match self {
            Tier::Effis => DataSource::Effis,
            Tier::Sepa => DataSource::Sepa,
            Tier::Cache => DataSource::Cache,
            Tier::Mock => DataSource::Mock,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.source().as_str())
    }
}

/// Per-step and global budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceTimeouts {
    pub global: Duration,
    pub effis: Duration,
    pub sepa: Duration,
    pub cache: Duration,
    /// Held back from every earlier tier so the mock tier can always run.
    pub mock: Duration,
}

impl Default for ServiceTimeouts {
    fn default() -> Self {
        Self {
            global: Duration::from_millis(DEFAULT_GLOBAL_DEADLINE_MS),
            effis: Duration::from_millis(DEFAULT_EFFIS_TIMEOUT_MS),
            sepa: Duration::from_millis(DEFAULT_SEPA_TIMEOUT_MS),
            cache: Duration::from_millis(DEFAULT_CACHE_TIMEOUT_MS),
            mock: Duration::from_millis(DEFAULT_MOCK_TIMEOUT_MS),
        }
    }
}

impl ServiceTimeouts {
    pub fn from_config(config: &FirewatchConfig) -> Self {
        Self {
            global: config.global_deadline(),
            effis: config.effis_timeout(),
            sepa: config.sepa_timeout(),
            cache: config.cache_timeout(),
            mock: config.mock_timeout(),
        }
    }

    fn step(&self, tier: Tier) -> Duration {
        match tier {
            Tier::Effis => self.effis,
            Tier::Sepa => self.sepa,
            Tier::Cache => self.cache,
            Tier::Mock => self.mock,
        }
    }
}

/// Resolves fire risk for a location through the fallback chain.
pub struct FireRiskService {
    effis: Arc<dyn FwiProvider>,
    sepa: Option<Arc<dyn RiskProvider>>,
    cache: Option<Arc<FireRiskCache>>,
    mock: Arc<dyn RiskProvider>,
    telemetry: TelemetryChain,
    clock: Arc<dyn Clock>,
    region: RegionBounds,
    timeouts: ServiceTimeouts,
    write_backs: Mutex<JoinSet<()>>,
}

impl FireRiskService {
    pub fn builder(effis: Arc<dyn FwiProvider>) -> FireRiskServiceBuilder {
        FireRiskServiceBuilder::new(effis)
    }

    /// Wire the live adapters, cache store and tracing telemetry from
    /// configuration.
    ///
    /// The cache is LMDB-backed when `cache.path` is set and in-memory
    /// otherwise. SEPA is enabled only when `sepa.base_url` is set.
    pub fn from_config(config: &FirewatchConfig) -> FirewatchResult<Self> {
        config.validate()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let effis = EffisClient::from_config(&config.effis)?.with_clock(clock.clone());
        let store: Arc<dyn KeyValueStore> = match &config.cache.path {
            Some(path) => Arc::new(LmdbStore::open(path, config.cache.map_size_mb)?),
            None => Arc::new(InMemoryStore::new()),
        };
        let cache = FireRiskCache::new(store, clock.clone());

        let mut builder = Self::builder(Arc::new(effis))
            .cache(Arc::new(cache))
            .clock(clock)
            .region(config.region)
            .timeouts(ServiceTimeouts::from_config(config))
            .telemetry(Arc::new(TracingTelemetry));
        if let Some(url) = &config.sepa.base_url {
            builder = builder.sepa(Arc::new(SepaClient::new(url.clone())?));
        }

        tracing::debug!(
            effis = %config.effis.base_url,
            sepa = ?config.sepa.base_url,
            cache_path = ?config.cache.path,
            "Fire risk service configured"
        );
        Ok(builder.build())
    }

    /// Resolve fire risk under the configured global deadline.
    ///
    /// Returns `Err` only for non-finite or out-of-range coordinates, in
    /// which case no tier is attempted and no telemetry is emitted.
    pub async fn get_current(&self, lat: f64, lon: f64) -> Result<FireRisk, ApiError> {
        self.get_current_with_deadline(lat, lon, None).await
    }

    /// Like [`get_current`](Self::get_current), with an optional tighter
    /// deadline. A deadline above the configured one is clipped to it.
    ///
    /// A deadline at or below the mock timeout leaves no budget for the
    /// earlier tiers, so the request goes straight to the mock tier.
    pub async fn get_current_with_deadline(
        &self,
        lat: f64,
        lon: f64,
        deadline: Option<Duration>,
    ) -> Result<FireRisk, ApiError> {
        let coords = Coordinates::new(lat, lon).map_err(ApiError::from)?;
        let global = deadline.map_or(self.timeouts.global, |d| d.min(self.timeouts.global));
        let request_id = Uuid::now_v7();

        let span = tracing::info_span!(
            "fire_risk_request",
            request_id = %request_id,
            geohash = %coords.geohash(),
        );
        Ok(self
            .resolve(request_id, coords, global)
            .instrument(span)
            .await)
    }

    /// Ordered tiers for `coords`.
    ///
    /// SEPA appears only when configured and the point lies in the region;
    /// the cache only when configured. EFFIS and mock are always present.
    pub fn plan(&self, coords: &Coordinates) -> Vec<Tier> {
        let mut plan = vec![Tier::Effis];
        if self.sepa.is_some() && self.region.contains(coords) {
            plan.push(Tier::Sepa);
        }
        if self.cache.is_some() {
            plan.push(Tier::Cache);
        }
        plan.push(Tier::Mock);
        plan
    }

    /// Await every outstanding cache write-back.
    pub async fn flush_write_backs(&self) {
        let mut pending = match self.write_backs.lock() {
            Ok(mut set) => std::mem::take(&mut *set),
            Err(_) => return,
        };
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Cache write-back task aborted");
            }
        }
    }

    pub fn timeouts(&self) -> ServiceTimeouts {
        self.timeouts
    }

    pub fn region(&self) -> RegionBounds {
        self.region
    }

    async fn resolve(&self, request_id: Uuid, coords: Coordinates, global: Duration) -> FireRisk {
        let started = Instant::now();

        for tier in self.plan(&coords) {
            let remaining = global.saturating_sub(started.elapsed());
            let budget = match tier {
                Tier::Mock => self.timeouts.mock,
                _ => self
                    .timeouts
                    .step(tier)
                    .min(remaining.saturating_sub(self.timeouts.mock)),
            };
            if budget.is_zero() {
                tracing::debug!(tier = %tier, "No budget left, skipping tier");
                continue;
            }

            self.emit(request_id, TelemetryEvent::FallbackDepth { depth: tier.depth() })
                .await;
            self.emit(request_id, TelemetryEvent::AttemptStart { source: tier.source() })
                .await;

            let attempt_started = Instant::now();
            let outcome = tokio::time::timeout(budget, self.attempt(tier, coords, budget)).await;
            let elapsed = attempt_started.elapsed();

            let resolved = match outcome {
                Ok(Ok(Some(risk))) => Some(risk),
                Ok(Ok(None)) => {
                    tracing::debug!(tier = %tier, "Cache miss");
                    None
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        tier = %tier,
                        error = %e,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Tier failed, falling back"
                    );
                    None
                }
                Err(_) => {
                    tracing::warn!(
                        tier = %tier,
                        budget_ms = budget.as_millis() as u64,
                        "Tier timed out, falling back"
                    );
                    None
                }
            };

            self.emit(
                request_id,
                TelemetryEvent::AttemptEnd {
                    source: tier.source(),
                    success: resolved.is_some(),
                    elapsed,
                },
            )
            .await;

            if let Some(risk) = resolved {
                if matches!(tier, Tier::Effis | Tier::Sepa) {
                    self.write_back(coords, &risk);
                }
                return self.complete(request_id, tier, risk, started).await;
            }
        }

        // Only reachable when the mock tier itself failed.
        tracing::warn!("Mock tier failed, synthesising mock reading locally");
        let risk = deterministic_mock(&coords, self.clock.now());
        self.complete(request_id, Tier::Mock, risk, started).await
    }

    async fn attempt(
        &self,
        tier: Tier,
        coords: Coordinates,
        budget: Duration,
    ) -> FirewatchResult<Option<FireRisk>> {
        match tier {
            Tier::Effis => {
                let result = self.effis.get_fwi(coords, budget).await?;
                Ok(Some(result.to_fire_risk()?))
            }
            Tier::Sepa => match &self.sepa {
                Some(sepa) => Ok(Some(sepa.get_current(coords, budget).await?)),
                None => Ok(None),
            },
            Tier::Cache => match &self.cache {
                Some(cache) => Ok(cache.get(&coords.geohash()).await?),
                None => Ok(None),
            },
            Tier::Mock => Ok(Some(self.mock.get_current(coords, budget).await?)),
        }
    }

    async fn complete(
        &self,
        request_id: Uuid,
        tier: Tier,
        risk: FireRisk,
        started: Instant,
    ) -> FireRisk {
        self.emit(request_id, TelemetryEvent::Complete { source: tier.source() })
            .await;
        tracing::info!(
            tier = %tier,
            depth = tier.depth(),
            level = %risk.level(),
            source = %risk.source(),
            freshness = %risk.freshness(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fire risk resolved"
        );
        risk
    }

    /// Persist a live reading without delaying the response.
    fn write_back(&self, coords: Coordinates, risk: &FireRisk) {
        let Some(cache) = self.cache.clone() else {
            return;
        };
        let risk = risk.clone();
        let task = async move {
            if let Err(e) = cache.set(&coords, &risk).await {
                tracing::warn!(geohash = %coords.geohash(), error = %e, "Cache write-back failed");
            }
        };

        match self.write_backs.lock() {
            Ok(mut set) => {
                while set.try_join_next().is_some() {}
                set.spawn(task.in_current_span());
            }
            Err(_) => {
                tokio::spawn(task.in_current_span());
            }
        }
    }

    async fn emit(&self, request_id: Uuid, event: TelemetryEvent) {
        self.telemetry
            .emit(TelemetryRecord {
                request_id,
                at: self.clock.now(),
                event,
            })
            .await;
    }
}

impl fmt::Debug for FireRiskService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FireRiskService")
            .field("effis", &self.effis.name())
            .field("sepa", &self.sepa.as_ref().map(|s| s.name().to_string()))
            .field("cache", &self.cache.is_some())
            .field("mock", &self.mock.name())
            .field("region", &self.region)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

/// Builder for [`FireRiskService`].
pub struct FireRiskServiceBuilder {
    effis: Arc<dyn FwiProvider>,
    sepa: Option<Arc<dyn RiskProvider>>,
    cache: Option<Arc<FireRiskCache>>,
    mock: Option<Arc<dyn RiskProvider>>,
    telemetry: TelemetryChain,
    clock: Arc<dyn Clock>,
    region: RegionBounds,
    timeouts: ServiceTimeouts,
}

impl FireRiskServiceBuilder {
    pub fn new(effis: Arc<dyn FwiProvider>) -> Self {
        Self {
            effis,
            sepa: None,
            cache: None,
            mock: None,
            telemetry: TelemetryChain::new(),
            clock: Arc::new(SystemClock),
            region: RegionBounds::default(),
            timeouts: ServiceTimeouts::default(),
        }
    }

    pub fn sepa(mut self, sepa: Arc<dyn RiskProvider>) -> Self {
        self.sepa = Some(sepa);
        self
    }

    pub fn cache(mut self, cache: Arc<FireRiskCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the default [`MockProvider`].
    pub fn mock(mut self, mock: Arc<dyn RiskProvider>) -> Self {
        self.mock = Some(mock);
        self
    }

    /// Add a telemetry sink. May be called repeatedly.
    pub fn telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry.add(sink);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn region(mut self, region: RegionBounds) -> Self {
        self.region = region;
        self
    }

    pub fn timeouts(mut self, timeouts: ServiceTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn build(self) -> FireRiskService {
        let mock = match self.mock {
            Some(mock) => mock,
            None => Arc::new(MockProvider::new(self.clock.clone())),
        };
        FireRiskService {
            effis: self.effis,
            sepa: self.sepa,
            cache: self.cache,
            mock,
            telemetry: self.telemetry,
            clock: self.clock,
            region: self.region,
            timeouts: self.timeouts,
            write_backs: Mutex::new(JoinSet::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use firewatch_sources::EffisFwiResult;

    struct DownEffis;

    #[async_trait]
    impl FwiProvider for DownEffis {
        fn name(&self) -> &str {
            "down"
        }

        async fn get_fwi(
            &self,
            _coords: Coordinates,
            _timeout: Duration,
        ) -> Result<EffisFwiResult, ApiError> {
            Err(ApiError::with_status("down", 503))
        }
    }

    struct NoopRisk;

    #[async_trait]
    impl RiskProvider for NoopRisk {
        fn name(&self) -> &str {
            "noop"
        }

        async fn get_current(
            &self,
            _coords: Coordinates,
            _timeout: Duration,
        ) -> Result<FireRisk, ApiError> {
            Err(ApiError::new("noop"))
        }
    }

    fn coords(lat: f64, lon: f64) -> Coordinates {
        Coordinates::new(lat, lon).unwrap()
    }

    #[test]
    fn test_tier_depths_and_sources() {
        assert_eq!(Tier::Effis.depth(), 0);
        assert_eq!(Tier::Sepa.depth(), 1);
        assert_eq!(Tier::Cache.depth(), 2);
        assert_eq!(Tier::Mock.depth(), 3);
        assert_eq!(Tier::Cache.source(), DataSource::Cache);
        assert_eq!(Tier::Sepa.to_string(), "sepa");
    }

    #[test]
    fn test_plan_minimal() {
        let service = FireRiskService::builder(Arc::new(DownEffis)).build();
        assert_eq!(
            service.plan(&coords(55.95, -3.19)),
            vec![Tier::Effis, Tier::Mock]
        );
    }

    #[test]
    fn test_plan_includes_sepa_only_in_region() {
        let store = Arc::new(firewatch_storage::InMemoryStore::new());
        let cache = Arc::new(FireRiskCache::new(store, Arc::new(SystemClock)));
        let service = FireRiskService::builder(Arc::new(DownEffis))
            .sepa(Arc::new(NoopRisk))
            .cache(cache)
            .build();

        assert_eq!(
            service.plan(&coords(57.48, -4.22)),
            vec![Tier::Effis, Tier::Sepa, Tier::Cache, Tier::Mock]
        );
        assert_eq!(
            service.plan(&coords(51.51, -0.13)),
            vec![Tier::Effis, Tier::Cache, Tier::Mock]
        );
    }

    #[test]
    fn test_from_config_defaults() {
        let service = FireRiskService::from_config(&FirewatchConfig::default()).unwrap();
        assert_eq!(
            service.plan(&coords(57.48, -4.22)),
            vec![Tier::Effis, Tier::Cache, Tier::Mock]
        );
        assert_eq!(service.timeouts().global, Duration::from_secs(8));
    }

    #[test]
    fn test_from_config_with_sepa_and_lmdb() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = FirewatchConfig::default();
        config.sepa.base_url = Some("http://127.0.0.1:9/sepa".to_string());
        config.cache.path = Some(dir.path().join("cache"));

        let service = FireRiskService::from_config(&config).unwrap();
        assert_eq!(
            service.plan(&coords(57.48, -4.22)),
            vec![Tier::Effis, Tier::Sepa, Tier::Cache, Tier::Mock]
        );
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = FirewatchConfig::default();
        config.orchestrator.global_deadline_ms = 0;
        assert!(FireRiskService::from_config(&config).is_err());
    }

    #[test]
    fn test_default_timeouts_match_config_defaults() {
        assert_eq!(
            ServiceTimeouts::default(),
            ServiceTimeouts::from_config(&FirewatchConfig::default())
        );
    }

    #[tokio::test]
    async fn test_failing_mock_is_replaced_locally() {
        let service = FireRiskService::builder(Arc::new(DownEffis))
            .mock(Arc::new(NoopRisk))
            .build();
        let risk = service.get_current(48.85, 2.35).await.unwrap();
        assert_eq!(risk.source(), DataSource::Mock);
        assert_eq!(
            risk.fwi(),
            deterministic_mock(&coords(48.85, 2.35), risk.observed_at()).fwi()
        );
    }
}
