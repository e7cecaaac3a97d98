//! Regional routing policy.

use serde::{Deserialize, Serialize};

use crate::constants::{SCOTLAND_MAX_LAT, SCOTLAND_MAX_LON, SCOTLAND_MIN_LAT, SCOTLAND_MIN_LON};
use crate::geo::Coordinates;

/// Inclusive latitude/longitude box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl RegionBounds {
    /// Default box used to decide whether the SEPA tier applies.
    pub fn scotland() -> Self {
        Self {
            min_lat: SCOTLAND_MIN_LAT,
            max_lat: SCOTLAND_MAX_LAT,
            min_lon: SCOTLAND_MIN_LON,
            max_lon: SCOTLAND_MAX_LON,
        }
    }

    /// Boundary points count as inside.
    pub fn contains(&self, coords: &Coordinates) -> bool {
        coords.lat() >= self.min_lat
            && coords.lat() <= self.max_lat
            && coords.lon() >= self.min_lon
            && coords.lon() <= self.max_lon
    }

    pub fn is_well_formed(&self) -> bool {
        self.min_lat <= self.max_lat
            && self.min_lon <= self.max_lon
            && [self.min_lat, self.max_lat, self.min_lon, self.max_lon]
                .iter()
                .all(|v| v.is_finite())
    }
}

impl Default for RegionBounds {
    fn default() -> Self {
        Self::scotland()
    }
}
