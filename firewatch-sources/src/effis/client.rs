//! EFFIS WMS client

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firewatch_core::constants::{DEFAULT_EFFIS_BASE_URL, DEFAULT_EFFIS_LAYER};
use firewatch_core::{ApiError, Clock, Coordinates, EffisConfig, SystemClock};
use reqwest::Client;

use super::types::{parse_feature_info, EffisFwiResult};
use crate::http::{build_client, error_for_status, error_for_transport};
use crate::FwiProvider;

/// Half-width in degrees of the query box centred on the point.
const QUERY_HALF_WIDTH_DEG: f64 = 0.01;

/// WMS `GetFeatureInfo` client for the GWIS FWI forecast layer.
pub struct EffisClient {
    client: Client,
    base_url: String,
    layer: String,
    clock: Arc<dyn Clock>,
}

impl EffisClient {
    /// Create a client for `base_url` querying `layer`.
    pub fn new(base_url: impl Into<String>, layer: impl Into<String>) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            layer: layer.into(),
            clock: Arc::new(SystemClock),
        })
    }

    /// Create a client against the public GWIS endpoint.
    pub fn with_defaults() -> Result<Self, ApiError> {
        Self::new(DEFAULT_EFFIS_BASE_URL, DEFAULT_EFFIS_LAYER)
    }

    pub fn from_config(config: &EffisConfig) -> Result<Self, ApiError> {
        Self::new(config.base_url.clone(), config.layer.clone())
    }

    /// Clock used for the `TIME` parameter and as the fallback observation time.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query parameters for a WMS 1.1.1 `GetFeatureInfo` on a 3x3 pixel box.
    pub fn query_params(&self, coords: &Coordinates, at: DateTime<Utc>) -> Vec<(&'static str, String)> {
        let bbox = format!(
            "{},{},{},{}",
            coords.lon() - QUERY_HALF_WIDTH_DEG,
            coords.lat() - QUERY_HALF_WIDTH_DEG,
            coords.lon() + QUERY_HALF_WIDTH_DEG,
            coords.lat() + QUERY_HALF_WIDTH_DEG,
        );
        vec![
            ("SERVICE", "WMS".to_string()),
            ("VERSION", "1.1.1".to_string()),
            ("REQUEST", "GetFeatureInfo".to_string()),
            ("LAYERS", self.layer.clone()),
            ("QUERY_LAYERS", self.layer.clone()),
            ("STYLES", String::new()),
            ("SRS", "EPSG:4326".to_string()),
            ("BBOX", bbox),
            ("WIDTH", "3".to_string()),
            ("HEIGHT", "3".to_string()),
            ("X", "1".to_string()),
            ("Y", "1".to_string()),
            ("INFO_FORMAT", "application/json".to_string()),
            ("FEATURE_COUNT", "1".to_string()),
            ("TIME", at.format("%Y-%m-%d").to_string()),
        ]
    }
}

#[async_trait]
impl FwiProvider for EffisClient {
    fn name(&self) -> &str {
        "effis"
    }

    async fn get_fwi(
        &self,
        coords: Coordinates,
        timeout: Duration,
    ) -> Result<EffisFwiResult, ApiError> {
        let requested_at = self.clock.now();
        let response = self
            .client
            .get(&self.base_url)
            .query(&self.query_params(&coords, requested_at))
            .header("Accept", "application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| error_for_transport("effis", &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| error_for_transport("effis", &e))?;

        if !status.is_success() {
            return Err(error_for_status("effis", status, &body));
        }

        let result = parse_feature_info(&body, &coords, requested_at)?;
        tracing::debug!(
            fwi = result.fwi,
            lat = coords.lat(),
            lon = coords.lon(),
            "EFFIS FWI received"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for EffisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffisClient")
            .field("base_url", &self.base_url)
            .field("layer", &self.layer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_query_params() {
        let client = EffisClient::with_defaults().unwrap();
        let coords = Coordinates::new(40.0, -3.5).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 8, 10, 15, 0, 0).unwrap();
        let params = client.query_params(&coords, at);

        let get = |name: &str| {
            params
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("REQUEST"), "GetFeatureInfo");
        assert_eq!(get("QUERY_LAYERS"), DEFAULT_EFFIS_LAYER);
        assert_eq!(get("INFO_FORMAT"), "application/json");
        assert_eq!(get("TIME"), "2025-08-10");

        let bbox: Vec<f64> = get("BBOX").split(',').map(|v| v.parse().unwrap()).collect();
        assert!(bbox[0] < -3.5 && bbox[2] > -3.5);
        assert!(bbox[1] < 40.0 && bbox[3] > 40.0);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = EffisClient::new("http://localhost:8080/gwis/", "layer").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080/gwis");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_api_error() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let client = EffisClient::new("http://127.0.0.1:9/gwis", "layer").unwrap();
        let coords = Coordinates::new(40.0, -3.5).unwrap();
        let result = client.get_fwi(coords, Duration::from_millis(500)).await;
        assert!(result.is_err());
    }
}
