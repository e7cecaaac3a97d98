//! SEPA request and response types

use firewatch_core::{
    parse_utc_timestamp, ApiError, ApiErrorReason, DataSource, FireRisk, Freshness,
};
use serde::Deserialize;

use crate::http::malformed;

const SOURCE: &str = "sepa";

/// Body of `GET {base}/fwi`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SepaFwiResponse {
    pub fwi: Option<f64>,
    pub observed_at: String,
}

/// Parse a SEPA response body into a live SEPA reading.
///
/// A `null` FWI means the feed has no value for the location (`NotFound`).
/// Negative FWI and non-UTC timestamps are rejected as `General`.
pub fn parse_fwi_response(body: &str) -> Result<FireRisk, ApiError> {
    let response: SepaFwiResponse =
        serde_json::from_str(body).map_err(|e| malformed(SOURCE, e))?;

    let fwi = response.fwi.ok_or_else(|| {
        ApiError::with_reason(
            "sepa has no FWI for this location",
            None,
            ApiErrorReason::NotFound,
        )
    })?;
    let observed_at = parse_utc_timestamp(&response.observed_at).map_err(|e| malformed(SOURCE, e))?;

    FireRisk::from_fwi(fwi, DataSource::Sepa, Freshness::Live, observed_at)
        .map_err(|e| malformed(SOURCE, e))
}
