//! Fire-risk value types.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Risk band derived from the Fire Weather Index.
///
/// Ordered from least to most dangerous so that `Ord` matches severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
    Extreme,
}

/// Lower bound (inclusive) of each band above `VeryLow`.
const FWI_THRESHOLDS: [(f64, RiskLevel); 5] = [
    (50.0, RiskLevel::Extreme),
    (38.0, RiskLevel::VeryHigh),
    (21.0, RiskLevel::High),
    (12.0, RiskLevel::Moderate),
    (5.0, RiskLevel::Low),
];

impl RiskLevel {
    /// All levels in severity order.
    pub const ALL: [RiskLevel; 6] = [
        RiskLevel::VeryLow,
        RiskLevel::Low,
        RiskLevel::Moderate,
        RiskLevel::High,
        RiskLevel::VeryHigh,
        RiskLevel::Extreme,
    ];

    /// Map an FWI value onto its band.
    ///
    /// Boundary values belong to the higher band (`5.0` is `Low`).
    pub fn from_fwi(fwi: f64) -> Result<Self, ValidationError> {
        validate_fwi(fwi)?;
        Ok(Self::band(fwi))
    }

    fn band(fwi: f64) -> Self {
        FWI_THRESHOLDS
            .iter()
            .find(|(lower, _)| fwi >= *lower)
            .map(|(_, level)| *level)
            .unwrap_or(RiskLevel::VeryLow)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "veryLow",
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
            RiskLevel::VeryHigh => "veryHigh",
            RiskLevel::Extreme => "extreme",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider that produced the underlying value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Effis,
    Sepa,
    Cache,
    Mock,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Effis => "effis",
            DataSource::Sepa => "sepa",
            DataSource::Cache => "cache",
            DataSource::Mock => "mock",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Staleness tag, independent of [`DataSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Live,
    Cached,
    Mock,
}

impl Freshness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Freshness::Live => "live",
            Freshness::Cached => "cached",
            Freshness::Mock => "mock",
        }
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved fire-risk reading for one location.
///
/// Fields are private; construction goes through [`FireRisk::new`] or
/// [`FireRisk::from_fwi`], which enforce the FWI invariant. Updates are
/// copy-on-write via the `with_*` methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "FireRiskRecord")]
pub struct FireRisk {
    level: RiskLevel,
    fwi: Option<f64>,
    source: DataSource,
    freshness: Freshness,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    observed_at: DateTime<Utc>,
}

impl FireRisk {
    pub fn new(
        level: RiskLevel,
        fwi: Option<f64>,
        source: DataSource,
        freshness: Freshness,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if let Some(value) = fwi {
            validate_fwi(value)?;
        }
        Ok(Self {
            level,
            fwi,
            source,
            freshness,
            observed_at,
        })
    }

    /// Build a reading whose level is derived from `fwi`.
    pub fn from_fwi(
        fwi: f64,
        source: DataSource,
        freshness: Freshness,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let level = RiskLevel::from_fwi(fwi)?;
        Self::new(level, Some(fwi), source, freshness, observed_at)
    }

    /// Synthetic reading tagged `Mock`/`Mock`.
    ///
    /// The FWI is expressed in tenths so it is finite and non-negative by
    /// construction; this constructor cannot fail.
    pub fn mock(fwi_tenths: u16, observed_at: DateTime<Utc>) -> Self {
        let fwi = f64::from(fwi_tenths) / 10.0;
        Self {
            level: RiskLevel::band(fwi),
            fwi: Some(fwi),
            source: DataSource::Mock,
            freshness: Freshness::Mock,
            observed_at,
        }
    }

    pub fn level(&self) -> RiskLevel {
        self.level
    }

    pub fn fwi(&self) -> Option<f64> {
        self.fwi
    }

    pub fn source(&self) -> DataSource {
        self.source
    }

    pub fn freshness(&self) -> Freshness {
        self.freshness
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    /// Copy with a different freshness tag.
    pub fn with_freshness(&self, freshness: Freshness) -> Self {
        Self {
            freshness,
            ..self.clone()
        }
    }
}

/// Unvalidated wire shape; decoding goes through [`FireRisk::new`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FireRiskRecord {
    level: RiskLevel,
    fwi: Option<f64>,
    source: DataSource,
    freshness: Freshness,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    observed_at: DateTime<Utc>,
}

impl TryFrom<FireRiskRecord> for FireRisk {
    type Error = ValidationError;

    fn try_from(record: FireRiskRecord) -> Result<Self, Self::Error> {
        FireRisk::new(
            record.level,
            record.fwi,
            record.source,
            record.freshness,
            record.observed_at,
        )
    }
}

fn validate_fwi(fwi: f64) -> Result<(), ValidationError> {
    if !fwi.is_finite() {
        return Err(ValidationError::NonFinite {
            field: "FWI",
            value: fwi,
        });
    }
    if fwi < 0.0 {
        return Err(ValidationError::NegativeFwi { value: fwi });
    }
    Ok(())
}

/// Parse an RFC 3339 timestamp, rejecting anything not expressed in UTC.
pub fn parse_utc_timestamp(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let parsed: DateTime<FixedOffset> =
        DateTime::parse_from_rfc3339(value).map_err(|e| ValidationError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })?;
    let offset_seconds = parsed.offset().local_minus_utc();
    if offset_seconds != 0 {
        return Err(ValidationError::NonUtcTimestamp { offset_seconds });
    }
    Ok(parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_from_fwi_bands() {
        assert_eq!(RiskLevel::from_fwi(0.0).unwrap(), RiskLevel::VeryLow);
        assert_eq!(RiskLevel::from_fwi(4.99).unwrap(), RiskLevel::VeryLow);
        assert_eq!(RiskLevel::from_fwi(11.9).unwrap(), RiskLevel::Low);
        assert_eq!(RiskLevel::from_fwi(20.5).unwrap(), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_fwi(37.0).unwrap(), RiskLevel::High);
        assert_eq!(RiskLevel::from_fwi(49.99).unwrap(), RiskLevel::VeryHigh);
        assert_eq!(RiskLevel::from_fwi(120.0).unwrap(), RiskLevel::Extreme);
    }

    #[test]
    fn test_from_fwi_boundaries_map_to_higher_band() {
        assert_eq!(RiskLevel::from_fwi(5.0).unwrap(), RiskLevel::Low);
        assert_eq!(RiskLevel::from_fwi(12.0).unwrap(), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_fwi(21.0).unwrap(), RiskLevel::High);
        assert_eq!(RiskLevel::from_fwi(38.0).unwrap(), RiskLevel::VeryHigh);
        assert_eq!(RiskLevel::from_fwi(50.0).unwrap(), RiskLevel::Extreme);
    }

    #[test]
    fn test_from_fwi_rejects_negative_and_nan() {
        assert!(matches!(
            RiskLevel::from_fwi(-0.1),
            Err(ValidationError::NegativeFwi { .. })
        ));
        assert!(matches!(
            RiskLevel::from_fwi(f64::NAN),
            Err(ValidationError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_fire_risk_rejects_negative_fwi() {
        let result = FireRisk::new(
            RiskLevel::Low,
            Some(-3.0),
            DataSource::Effis,
            Freshness::Live,
            at(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_with_freshness_is_copy_on_write() {
        let live = FireRisk::from_fwi(15.0, DataSource::Sepa, Freshness::Live, at()).unwrap();
        let cached = live.with_freshness(Freshness::Cached);
        assert_eq!(live.freshness(), Freshness::Live);
        assert_eq!(cached.freshness(), Freshness::Cached);
        assert_eq!(cached.source(), DataSource::Sepa);
        assert_eq!(cached.level(), RiskLevel::Moderate);
    }

    #[test]
    fn test_mock_constructor() {
        let risk = FireRisk::mock(215, at());
        assert_eq!(risk.fwi(), Some(21.5));
        assert_eq!(risk.level(), RiskLevel::High);
        assert_eq!(risk.source(), DataSource::Mock);
        assert_eq!(risk.freshness(), Freshness::Mock);
    }

    #[test]
    fn test_fire_risk_wire_format() {
        let risk = FireRisk::from_fwi(22.5, DataSource::Effis, Freshness::Live, at()).unwrap();
        let json = serde_json::to_value(&risk).unwrap();
        assert_eq!(json["level"], "high");
        assert_eq!(json["source"], "effis");
        assert_eq!(json["freshness"], "live");
        assert_eq!(json["observedAt"], at().timestamp_millis());
    }

    #[test]
    fn test_decode_rejects_negative_fwi() {
        let json = r#"{"level":"low","fwi":-2.0,"source":"sepa","freshness":"live","observedAt":0}"#;
        assert!(serde_json::from_str::<FireRisk>(json).is_err());
    }

    #[test]
    fn test_parse_utc_timestamp() {
        let parsed = parse_utc_timestamp("2025-07-01T12:00:00Z").unwrap();
        assert_eq!(parsed, at());
        assert!(parse_utc_timestamp("2025-07-01T12:00:00+00:00").is_ok());
        assert!(matches!(
            parse_utc_timestamp("2025-07-01T13:00:00+01:00"),
            Err(ValidationError::NonUtcTimestamp {
                offset_seconds: 3600
            })
        ));
        assert!(matches!(
            parse_utc_timestamp("yesterday"),
            Err(ValidationError::InvalidTimestamp { .. })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_from_fwi_is_monotonic(a in 0.0f64..200.0, b in 0.0f64..200.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let lo_level = RiskLevel::from_fwi(lo).unwrap();
            let hi_level = RiskLevel::from_fwi(hi).unwrap();
            prop_assert!(lo_level <= hi_level);
        }

        #[test]
        fn prop_from_fwi_total_for_non_negative(fwi in 0.0f64..1.0e6) {
            prop_assert!(RiskLevel::from_fwi(fwi).is_ok());
        }
    }
}
