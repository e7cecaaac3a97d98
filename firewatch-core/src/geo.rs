//! Validated coordinates and geohash cache keys.
//!
//! The geohash precision is a crate-wide constant so that keys derived
//! anywhere in the system are always comparable.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::GEOHASH_PRECISION;
use crate::error::ValidationError;

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// A WGS84 point that has passed range validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    lat: f64,
    lon: f64,
}

impl Coordinates {
    /// Validate and wrap a latitude/longitude pair.
    ///
    /// Non-finite values are reported before range violations, latitude
    /// before longitude.
    pub fn new(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        check_axis("Latitude", lat, 90.0)?;
        check_axis("Longitude", lon, 180.0)?;
        Ok(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Geohash of this point at [`GEOHASH_PRECISION`].
    pub fn geohash(&self) -> Geohash {
        Geohash::encode(self)
    }
}

fn check_axis(field: &'static str, value: f64, limit: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite { field, value });
    }
    if !(-limit..=limit).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min: -limit,
            max: limit,
        });
    }
    Ok(())
}

/// Fixed-precision base-32 geohash.
///
/// Deserialization goes through [`Geohash::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Geohash(String);

/// Cell bounds returned by [`Geohash::bounds`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeohashBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeohashBounds {
    pub fn contains(&self, coords: &Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&coords.lat())
            && (self.min_lon..=self.max_lon).contains(&coords.lon())
    }
}

impl Geohash {
    /// Encode validated coordinates.
    pub fn encode(coords: &Coordinates) -> Self {
        let mut lat_range = (-90.0_f64, 90.0_f64);
        let mut lon_range = (-180.0_f64, 180.0_f64);
        let mut hash = String::with_capacity(GEOHASH_PRECISION);
        let mut even_bit = true;
        let mut bit = 0u8;
        let mut idx = 0usize;

        while hash.len() < GEOHASH_PRECISION {
            let (range, value) = if even_bit {
                (&mut lon_range, coords.lon())
            } else {
                (&mut lat_range, coords.lat())
            };
            let mid = (range.0 + range.1) / 2.0;
            if value >= mid {
                idx = idx * 2 + 1;
                range.0 = mid;
            } else {
                idx *= 2;
                range.1 = mid;
            }
            even_bit = !even_bit;

            bit += 1;
            if bit == 5 {
                hash.push(BASE32[idx] as char);
                bit = 0;
                idx = 0;
            }
        }

        Geohash(hash)
    }

    /// Validate and encode a raw latitude/longitude pair.
    pub fn from_lat_lon(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        Ok(Self::encode(&Coordinates::new(lat, lon)?))
    }

    /// Parse a stored geohash, checking length and alphabet.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        if value.len() != GEOHASH_PRECISION {
            return Err(ValidationError::InvalidGeohash {
                value: value.to_string(),
                reason: format!("expected {} characters", GEOHASH_PRECISION),
            });
        }
        if let Some(bad) = value.bytes().find(|b| !BASE32.contains(b)) {
            return Err(ValidationError::InvalidGeohash {
                value: value.to_string(),
                reason: format!("invalid character {:?}", bad as char),
            });
        }
        Ok(Geohash(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the cell this hash covers.
    pub fn bounds(&self) -> GeohashBounds {
        let mut lat_range = (-90.0_f64, 90.0_f64);
        let mut lon_range = (-180.0_f64, 180.0_f64);
        let mut even_bit = true;

        for byte in self.0.bytes() {
            let idx = BASE32.iter().position(|b| *b == byte).unwrap_or(0);
            for shift in (0..5).rev() {
                let range = if even_bit {
                    &mut lon_range
                } else {
                    &mut lat_range
                };
                let mid = (range.0 + range.1) / 2.0;
                if (idx >> shift) & 1 == 1 {
                    range.0 = mid;
                } else {
                    range.1 = mid;
                }
                even_bit = !even_bit;
            }
        }

        GeohashBounds {
            min_lat: lat_range.0,
            max_lat: lat_range.1,
            min_lon: lon_range.0,
            max_lon: lon_range.1,
        }
    }
}

impl fmt::Display for Geohash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Geohash {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Geohash> for String {
    fn from(hash: Geohash) -> Self {
        hash.0
    }
}

impl AsRef<str> for Geohash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
