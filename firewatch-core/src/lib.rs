//! FIREWATCH Core - Value Types
//!
//! Validated coordinates, geohash cache keys, fire-risk readings, the
//! injectable clock and configuration. Every other crate depends on this.

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod geo;
pub mod region;
pub mod risk;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheSettings, EffisConfig, FirewatchConfig, OrchestratorConfig, SepaConfig};
pub use error::{
    ApiError, ApiErrorReason, CacheError, ConfigError, FirewatchError, FirewatchResult,
    ValidationError,
};
pub use geo::{Coordinates, Geohash, GeohashBounds};
pub use region::RegionBounds;
pub use risk::{parse_utc_timestamp, DataSource, FireRisk, Freshness, RiskLevel};

