//! Constants for FIREWATCH
//!
//! Values that must agree across crates (cache format, key layout,
//! capacity) live here together with the default timeouts.

// ============================================================================
// GEOHASH
// ============================================================================

/// Geohash length used for every cache key (~4.9 km cells).
pub const GEOHASH_PRECISION: usize = 5;

// ============================================================================
// CACHE
// ============================================================================

/// Entries older than this are treated as misses (6 hours).
pub const CACHE_TTL_SECS: i64 = 6 * 60 * 60;

/// Hard capacity of the fire-risk cache.
pub const CACHE_MAX_ENTRIES: usize = 100;

/// Version stamped on every persisted cache entry.
pub const CACHE_FORMAT_VERSION: &str = "1.0";

/// Store key prefix for cache entries; the geohash is appended.
pub const CACHE_ENTRY_PREFIX: &str = "cache_entry_";

/// Store key for the single metadata record.
pub const CACHE_METADATA_KEY: &str = "cache_metadata";

/// Default LMDB map size in megabytes.
pub const DEFAULT_CACHE_MAP_SIZE_MB: usize = 16;

/// Largest accepted LMDB map size in megabytes (1 TiB).
pub const MAX_CACHE_MAP_SIZE_MB: usize = 1 << 20;

// ============================================================================
// TIMEOUTS
// ============================================================================

/// Global wall-clock budget for one fallback chain.
pub const DEFAULT_GLOBAL_DEADLINE_MS: u64 = 8_000;

/// EFFIS step timeout.
pub const DEFAULT_EFFIS_TIMEOUT_MS: u64 = 3_000;

/// SEPA step timeout.
pub const DEFAULT_SEPA_TIMEOUT_MS: u64 = 2_000;

/// Cache lookup step timeout.
pub const DEFAULT_CACHE_TIMEOUT_MS: u64 = 200;

/// Budget held back for the terminal mock tier.
pub const DEFAULT_MOCK_TIMEOUT_MS: u64 = 100;

// ============================================================================
// UPSTREAM ENDPOINTS
// ============================================================================

/// EFFIS / GWIS WMS endpoint.
pub const DEFAULT_EFFIS_BASE_URL: &str = "https://maps.effis.emergency.copernicus.eu/gwis";

/// EFFIS WMS layer carrying the daily FWI forecast.
pub const DEFAULT_EFFIS_LAYER: &str = "ecmwf007.fwi";

// ============================================================================
// REGION
// ============================================================================

/// Southern edge of the Scotland bounding box.
pub const SCOTLAND_MIN_LAT: f64 = 54.6;
/// Northern edge of the Scotland bounding box (Shetland).
pub const SCOTLAND_MAX_LAT: f64 = 60.9;
/// Western edge of the Scotland bounding box (Outer Hebrides).
pub const SCOTLAND_MIN_LON: f64 = -9.0;
/// Eastern edge of the Scotland bounding box.
pub const SCOTLAND_MAX_LON: f64 = -0.7;
