//! Shared HTTP plumbing for the live adapters.

use firewatch_core::{ApiError, ApiErrorReason};
use reqwest::{Client, StatusCode};

/// User agent sent with every upstream request.
pub const USER_AGENT: &str = concat!(
    "firewatch/",
    env!("CARGO_PKG_VERSION"),
    " (fire-risk fallback core)"
);

/// Longest slice of an error body carried into an [`ApiError`] message.
const MAX_ERROR_BODY: usize = 200;

/// Build the HTTP client used by an adapter.
pub fn build_client() -> Result<Client, ApiError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ApiError::new(format!("Failed to build HTTP client: {}", e)))
}

/// Map a non-success HTTP response onto an [`ApiError`].
///
/// The reason is derived from the status (404, 503); every other status
/// is `General`.
pub fn error_for_status(source: &str, status: StatusCode, body: &str) -> ApiError {
    let detail = body.trim();
    let message = if detail.is_empty() {
        format!("{} returned HTTP {}", source, status.as_u16())
    } else {
        let snippet: String = detail.chars().take(MAX_ERROR_BODY).collect();
        format!("{} returned HTTP {}: {}", source, status.as_u16(), snippet)
    };
    ApiError::with_status(message, status.as_u16())
}

/// Map a transport failure onto an [`ApiError`].
///
/// Timeouts and connection failures mean the service is unreachable.
pub fn error_for_transport(source: &str, err: &reqwest::Error) -> ApiError {
    let status = err.status().map(|s| s.as_u16());
    if err.is_timeout() {
        ApiError::with_reason(
            format!("{} request timed out", source),
            status,
            ApiErrorReason::ServiceUnavailable,
        )
    } else if err.is_connect() {
        ApiError::with_reason(
            format!("{} unreachable: {}", source, err),
            status,
            ApiErrorReason::ServiceUnavailable,
        )
    } else {
        ApiError::with_reason(
            format!("{} request failed: {}", source, err),
            status,
            ApiErrorReason::General,
        )
    }
}

/// Error for a 2xx response whose body could not be understood.
pub fn malformed(source: &str, detail: impl std::fmt::Display) -> ApiError {
    ApiError::new(format!("{} returned a malformed payload: {}", source, detail))
}
