//! FIREWATCH Service - Fallback Orchestrator
//!
//! [`FireRiskService`] resolves the fire risk for a coordinate through an
//! ordered chain of tiers: EFFIS, SEPA (Scottish coordinates only), the
//! local cache and finally a deterministic mock. A valid coordinate always
//! yields a reading.

pub mod cli;
pub mod logging;
pub mod orchestrator;
pub mod telemetry;

pub use orchestrator::{FireRiskService, FireRiskServiceBuilder, ServiceTimeouts, Tier};
pub use telemetry::{
    InMemoryTelemetry, TelemetryChain, TelemetryError, TelemetryEvent, TelemetryRecord,
    TelemetrySink, TracingTelemetry,
};
