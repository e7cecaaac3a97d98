//! Configuration loading.
//!
//! Every field has a documented default, so an empty TOML file is a valid
//! configuration. Unknown keys are rejected.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::ConfigError;
use crate::region::RegionBounds;

/// EFFIS adapter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EffisConfig {
    pub base_url: String,
    pub layer: String,
    pub timeout_ms: u64,
}

impl Default for EffisConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_EFFIS_BASE_URL.to_string(),
            layer: DEFAULT_EFFIS_LAYER.to_string(),
            timeout_ms: DEFAULT_EFFIS_TIMEOUT_MS,
        }
    }
}

/// SEPA adapter settings. The tier is disabled when `base_url` is unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SepaConfig {
    pub base_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for SepaConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: DEFAULT_SEPA_TIMEOUT_MS,
        }
    }
}

/// Cache persistence settings. No `path` means an in-memory store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    pub path: Option<PathBuf>,
    pub map_size_mb: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            path: None,
            map_size_mb: DEFAULT_CACHE_MAP_SIZE_MB,
        }
    }
}

/// Fallback-chain budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    pub global_deadline_ms: u64,
    pub cache_timeout_ms: u64,
    pub mock_timeout_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            global_deadline_ms: DEFAULT_GLOBAL_DEADLINE_MS,
            cache_timeout_ms: DEFAULT_CACHE_TIMEOUT_MS,
            mock_timeout_ms: DEFAULT_MOCK_TIMEOUT_MS,
        }
    }
}

/// Master configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FirewatchConfig {
    pub effis: EffisConfig,
    pub sepa: SepaConfig,
    pub cache: CacheSettings,
    pub orchestrator: OrchestratorConfig,
    pub region: RegionBounds,
}

impl FirewatchConfig {
    /// Resolve configuration from `path` (usually the `--config` flag), then
    /// `FIREWATCH_CONFIG`, falling back to defaults; environment overrides
    /// are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// [`load`](Self::load) with an explicit variable lookup.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| lookup("FIREWATCH_CONFIG").map(PathBuf::from));
        let mut config = match path {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        config.apply_env(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    /// Apply `FIREWATCH_*` overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FIREWATCH_EFFIS_URL") {
            self.effis.base_url = url;
        }
        if let Some(ms) = lookup("FIREWATCH_EFFIS_TIMEOUT_MS") {
            self.effis.timeout_ms = parse_ms("FIREWATCH_EFFIS_TIMEOUT_MS", &ms)?;
        }
        if let Some(url) = lookup("FIREWATCH_SEPA_URL") {
            self.sepa.base_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(ms) = lookup("FIREWATCH_SEPA_TIMEOUT_MS") {
            self.sepa.timeout_ms = parse_ms("FIREWATCH_SEPA_TIMEOUT_MS", &ms)?;
        }
        if let Some(path) = lookup("FIREWATCH_CACHE_PATH") {
            self.cache.path = Some(PathBuf::from(path)).filter(|p| !p.as_os_str().is_empty());
        }
        if let Some(ms) = lookup("FIREWATCH_DEADLINE_MS") {
            self.orchestrator.global_deadline_ms = parse_ms("FIREWATCH_DEADLINE_MS", &ms)?;
        }
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - endpoint URLs are non-empty http(s) URLs
    /// - every step timeout is > 0 and strictly below the global deadline
    /// - region bounds are finite and not inverted
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("effis.base_url", &self.effis.base_url)?;
        if self.effis.layer.trim().is_empty() {
            return Err(invalid("effis.layer", "", "must not be empty"));
        }
        if let Some(url) = &self.sepa.base_url {
            check_url("sepa.base_url", url)?;
        }
        if self.cache.map_size_mb == 0 {
            return Err(invalid("cache.map_size_mb", "0", "must be > 0"));
        }
        if self.cache.map_size_mb > MAX_CACHE_MAP_SIZE_MB {
            return Err(invalid(
                "cache.map_size_mb",
                &self.cache.map_size_mb.to_string(),
                &format!("must be at most {}", MAX_CACHE_MAP_SIZE_MB),
            ));
        }

        let global = self.orchestrator.global_deadline_ms;
        if global == 0 {
            return Err(invalid("orchestrator.global_deadline_ms", "0", "must be > 0"));
        }
        for (field, value) in [
            ("effis.timeout_ms", self.effis.timeout_ms),
            ("sepa.timeout_ms", self.sepa.timeout_ms),
            ("orchestrator.cache_timeout_ms", self.orchestrator.cache_timeout_ms),
            ("orchestrator.mock_timeout_ms", self.orchestrator.mock_timeout_ms),
        ] {
            if value == 0 {
                return Err(invalid(field, "0", "must be > 0"));
            }
            if value >= global {
                return Err(invalid(
                    field,
                    &value.to_string(),
                    "must be strictly below orchestrator.global_deadline_ms",
                ));
            }
        }

        if !self.region.is_well_formed() {
            return Err(invalid(
                "region",
                &format!("{:?}", self.region),
                "bounds must be finite with min <= max",
            ));
        }
        Ok(())
    }

    pub fn global_deadline(&self) -> Duration {
        Duration::from_millis(self.orchestrator.global_deadline_ms)
    }

    pub fn effis_timeout(&self) -> Duration {
        Duration::from_millis(self.effis.timeout_ms)
    }

    pub fn sepa_timeout(&self) -> Duration {
        Duration::from_millis(self.sepa.timeout_ms)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.orchestrator.cache_timeout_ms)
    }

    pub fn mock_timeout(&self) -> Duration {
        Duration::from_millis(self.orchestrator.mock_timeout_ms)
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn check_url(field: &str, url: &str) -> Result<(), ConfigError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(invalid(field, url, "must not be empty"));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(invalid(field, url, "must be an http(s) URL"));
    }
    Ok(())
}

fn parse_ms(field: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| invalid(field, raw, "must be an integer number of milliseconds"))
}
