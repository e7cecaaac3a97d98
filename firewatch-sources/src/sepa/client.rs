//! SEPA HTTP client

use std::time::Duration;

use async_trait::async_trait;
use firewatch_core::{ApiError, Coordinates, FireRisk};
use reqwest::Client;

use super::types::parse_fwi_response;
use crate::http::{build_client, error_for_status, error_for_transport};
use crate::RiskProvider;

/// JSON client for the SEPA FWI feed.
pub struct SepaClient {
    client: Client,
    base_url: String,
}

impl SepaClient {
    /// Create a client for the feed rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/fwi", self.base_url)
    }
}

#[async_trait]
impl RiskProvider for SepaClient {
    fn name(&self) -> &str {
        "sepa"
    }

    async fn get_current(
        &self,
        coords: Coordinates,
        timeout: Duration,
    ) -> Result<FireRisk, ApiError> {
        let response = self
            .client
            .get(self.endpoint())
            .query(&[("lat", coords.lat()), ("lon", coords.lon())])
            .header("Accept", "application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| error_for_transport("sepa", &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| error_for_transport("sepa", &e))?;

        if !status.is_success() {
            return Err(error_for_status("sepa", status, &body));
        }

        let risk = parse_fwi_response(&body)?;
        tracing::debug!(
            level = %risk.level(),
            lat = coords.lat(),
            lon = coords.lon(),
            "SEPA reading received"
        );
        Ok(risk)
    }
}

impl std::fmt::Debug for SepaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SepaClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
