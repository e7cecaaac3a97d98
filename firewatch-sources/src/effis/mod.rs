//! EFFIS (European Forest Fire Information System) adapter
//!
//! Queries the GWIS WMS endpoint for the daily FWI forecast at a point.

pub mod client;
pub mod types;

pub use client::EffisClient;
pub use types::{parse_feature_info, EffisFwiResult};
