//! FIREWATCH Sources - Upstream Adapters
//!
//! Each adapter wraps one provider behind a uniform fetch contract:
//! validated coordinates and a timeout in, a payload or [`ApiError`] out.
//! Adapters do no caching, retries or cross-adapter fallback; sequencing
//! belongs to the orchestrator.

use std::time::Duration;

use async_trait::async_trait;
use firewatch_core::{ApiError, Coordinates, FireRisk};

pub mod effis;
pub mod http;
pub mod mock;
pub mod sepa;

pub use effis::{EffisClient, EffisFwiResult};
pub use mock::{deterministic_mock, MockProvider};
pub use sepa::SepaClient;

/// Provider of raw Fire Weather Index components.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait FwiProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    async fn get_fwi(
        &self,
        coords: Coordinates,
        timeout: Duration,
    ) -> Result<EffisFwiResult, ApiError>;
}

/// Provider of a ready-made [`FireRisk`] reading.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait RiskProvider: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    async fn get_current(&self, coords: Coordinates, timeout: Duration)
        -> Result<FireRisk, ApiError>;
}
