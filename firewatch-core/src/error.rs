//! Error types for FIREWATCH operations

use thiserror::Error;

/// Input validation errors.
///
/// These are the only errors that ever reach a consumer of the
/// orchestrator; every other failure is absorbed by the fallback chain.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("{field} out of range [{min}, {max}]: {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("FWI must be non-negative, got {value}")]
    NegativeFwi { value: f64 },

    #[error("Timestamp must be UTC, got offset {offset_seconds}s")]
    NonUtcTimestamp { offset_seconds: i32 },

    #[error("Invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("Invalid geohash {value:?}: {reason}")]
    InvalidGeohash { value: String, reason: String },
}

/// Categorical reason attached to an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorReason {
    NotFound,
    ServiceUnavailable,
    General,
}

impl ApiErrorReason {
    /// Derive the reason from an HTTP status code.
    pub fn from_status(status_code: Option<u16>) -> Self {
        match status_code {
            Some(404) => Self::NotFound,
            Some(503) => Self::ServiceUnavailable,
            _ => Self::General,
        }
    }
}

/// Failure reported by an upstream adapter, or by the orchestrator for
/// rejected input.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct ApiError {
    message: String,
    status_code: Option<u16>,
    reason: ApiErrorReason,
}

const UNSPECIFIED_MESSAGE: &str = "unspecified error";

impl ApiError {
    /// Create an error with no status code (reason `General`).
    pub fn new(message: impl Into<String>) -> Self {
        Self::build(message.into(), None, None)
    }

    /// Create an error whose reason is derived from `status_code`.
    pub fn with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self::build(message.into(), Some(status_code), None)
    }

    /// Create an error with an explicit reason, overriding status derivation.
    pub fn with_reason(
        message: impl Into<String>,
        status_code: Option<u16>,
        reason: ApiErrorReason,
    ) -> Self {
        Self::build(message.into(), status_code, Some(reason))
    }

    fn build(message: String, status_code: Option<u16>, reason: Option<ApiErrorReason>) -> Self {
        let message = if message.trim().is_empty() {
            UNSPECIFIED_MESSAGE.to_string()
        } else {
            message
        };
        Self {
            message,
            status_code,
            reason: reason.unwrap_or_else(|| ApiErrorReason::from_status(status_code)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn reason(&self) -> ApiErrorReason {
        self.reason
    }

    pub fn is_not_found(&self) -> bool {
        self.reason == ApiErrorReason::NotFound
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::new(err.to_string())
    }
}

/// Cache layer errors.
///
/// Every variant is treated as a miss by the orchestrator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache store failure: {reason}")]
    Store { reason: String },

    #[error("Cache serialization failed: {reason}")]
    Serialization { reason: String },

    #[error("Cache deserialization failed: {reason}")]
    Deserialization { reason: String },

    #[error("Unsupported cache entry version {found:?} (expected {expected:?})")]
    UnsupportedVersion { found: String, expected: String },

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse config TOML: {reason}")]
    Parse { reason: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all FIREWATCH errors.
#[derive(Debug, Clone, Error)]
pub enum FirewatchError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for FIREWATCH operations.
pub type FirewatchResult<T> = Result<T, FirewatchError>;

// =============================================================================
// TESTS
// =============================================================================
