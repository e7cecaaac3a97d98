//! EFFIS payload types and parsing

use chrono::{DateTime, NaiveDate, Utc};
use firewatch_core::{
    parse_utc_timestamp, ApiError, ApiErrorReason, Coordinates, DataSource, FireRisk, Freshness,
    ValidationError,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::http::malformed;

const SOURCE: &str = "effis";

/// FWI system components for one point, as reported by EFFIS.
#[derive(Debug, Clone, PartialEq)]
pub struct EffisFwiResult {
    pub fwi: f64,
    pub ffmc: Option<f64>,
    pub dmc: Option<f64>,
    pub dc: Option<f64>,
    pub isi: Option<f64>,
    pub bui: Option<f64>,
    pub observed_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
}

impl EffisFwiResult {
    /// Convert into a live EFFIS reading, banding the FWI.
    pub fn to_fire_risk(&self) -> Result<FireRisk, ValidationError> {
        FireRisk::from_fwi(self.fwi, DataSource::Effis, Freshness::Live, self.observed_at)
    }
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

/// Property names that carry the FWI itself, in priority order.
const FWI_KEYS: [&str; 3] = ["fwi", "value", "gray_index"];

/// Property names that carry the observation time, in priority order.
const TIME_KEYS: [&str; 4] = ["time", "date", "timestamp", "observed_at"];

/// Parse a WMS `GetFeatureInfo` GeoJSON body.
///
/// `features[0].properties` is scanned case-insensitively for the FWI and
/// its components. `requested_at` stands in for the observation time when
/// the payload carries none.
///
/// - no features: `NotFound`
/// - unparseable JSON, missing or invalid FWI: `General`
pub fn parse_feature_info(
    body: &str,
    coords: &Coordinates,
    requested_at: DateTime<Utc>,
) -> Result<EffisFwiResult, ApiError> {
    let collection: FeatureCollection =
        serde_json::from_str(body).map_err(|e| malformed(SOURCE, e))?;

    let feature = collection.features.into_iter().next().ok_or_else(|| {
        ApiError::with_reason(
            format!(
                "effis has no FWI feature at ({}, {})",
                coords.lat(),
                coords.lon()
            ),
            None,
            ApiErrorReason::NotFound,
        )
    })?;

    let properties: Map<String, Value> = feature
        .properties
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v))
        .collect();

    let fwi = FWI_KEYS
        .iter()
        .find_map(|key| number(&properties, key))
        .ok_or_else(|| malformed(SOURCE, "feature has no FWI value"))?;
    if !fwi.is_finite() || fwi < 0.0 {
        return Err(malformed(SOURCE, format!("FWI out of range: {}", fwi)));
    }

    let observed_at = match TIME_KEYS.iter().find_map(|key| text(&properties, key)) {
        Some(raw) => parse_observed_at(&raw)?,
        None => requested_at,
    };

    Ok(EffisFwiResult {
        fwi,
        ffmc: number(&properties, "ffmc"),
        dmc: number(&properties, "dmc"),
        dc: number(&properties, "dc"),
        isi: number(&properties, "isi"),
        bui: number(&properties, "bui"),
        observed_at,
        latitude: coords.lat(),
        longitude: coords.lon(),
    })
}

/// Numeric property; numeric strings are accepted.
fn number(properties: &Map<String, Value>, key: &str) -> Option<f64> {
    match properties.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(properties: &Map<String, Value>, key: &str) -> Option<String> {
    properties
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// RFC 3339 (UTC only) or a bare `YYYY-MM-DD` date, read as midnight UTC.
fn parse_observed_at(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| malformed(SOURCE, format!("invalid date {}", raw)));
    }
    parse_utc_timestamp(raw).map_err(|e| malformed(SOURCE, e))
}
