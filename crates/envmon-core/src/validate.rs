//! Range validation for individual readings

use crate::types::Reading;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scalar quantities the validator knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Temperature,
    Humidity,
    Pressure,
    Tvoc,
    Eco2,
    Aqi,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Temperature => "temperature",
            MetricKind::Humidity => "humidity",
            MetricKind::Pressure => "pressure",
            MetricKind::Tvoc => "tvoc",
            MetricKind::Eco2 => "eco2",
            MetricKind::Aqi => "aqi",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown metric kind: {0}")]
pub struct UnknownMetric(pub String);

impl FromStr for MetricKind {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temperature" => Ok(MetricKind::Temperature),
            "humidity" => Ok(MetricKind::Humidity),
            "pressure" => Ok(MetricKind::Pressure),
            "tvoc" => Ok(MetricKind::Tvoc),
            "eco2" => Ok(MetricKind::Eco2),
            "aqi" => Ok(MetricKind::Aqi),
            other => Err(UnknownMetric(other.to_string())),
        }
    }
}

/// Inclusive range of accepted values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// NaN is never contained
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Documented physical ranges for every metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidRanges {
    pub temperature: ValueRange,
    pub humidity: ValueRange,
    pub pressure: ValueRange,
    pub tvoc: ValueRange,
    pub eco2: ValueRange,
    pub aqi: ValueRange,
}

impl Default for ValidRanges {
    fn default() -> Self {
        Self {
            temperature: ValueRange::new(-40.0, 85.0),
            humidity: ValueRange::new(0.0, 100.0),
            pressure: ValueRange::new(300.0, 1100.0),
            tvoc: ValueRange::new(0.0, 65_000.0),
            eco2: ValueRange::new(400.0, 65_000.0),
            aqi: ValueRange::new(1.0, 5.0),
        }
    }
}

impl ValidRanges {
    pub fn range(&self, kind: MetricKind) -> ValueRange {
        match kind {
            MetricKind::Temperature => self.temperature,
            MetricKind::Humidity => self.humidity,
            MetricKind::Pressure => self.pressure,
            MetricKind::Tvoc => self.tvoc,
            MetricKind::Eco2 => self.eco2,
            MetricKind::Aqi => self.aqi,
        }
    }

    pub fn validate(&self, kind: MetricKind, value: f64) -> bool {
        self.range(kind).contains(value)
    }

    /// String-keyed validation. Unknown kinds pass.
    pub fn validate_named(&self, kind: &str, value: f64) -> bool {
        match kind.parse::<MetricKind>() {
            Ok(kind) => self.validate(kind, value),
            Err(_) => true,
        }
    }

    /// First metric of a reading that falls outside its range
    pub fn first_violation(&self, reading: &Reading) -> Option<(MetricKind, f64)> {
        [
            (MetricKind::Temperature, reading.temperature_c),
            (MetricKind::Pressure, reading.pressure_hpa),
            (MetricKind::Humidity, reading.humidity_pct),
            (MetricKind::Aqi, f64::from(reading.aqi)),
            (MetricKind::Tvoc, f64::from(reading.tvoc_ppb)),
            (MetricKind::Eco2, f64::from(reading.eco2_ppm)),
        ]
        .into_iter()
        .find(|(kind, value)| !self.validate(*kind, *value))
    }

    /// Every field of the reading is within range
    pub fn admits(&self, reading: &Reading) -> bool {
        self.first_violation(reading).is_none()
    }

    /// Ranges are well formed (min <= max, no NaN bounds)
    pub fn is_consistent(&self) -> bool {
        [
            self.temperature,
            self.humidity,
            self.pressure,
            self.tvoc,
            self.eco2,
            self.aqi,
        ]
        .iter()
        .all(|r| r.min <= r.max)
    }
}
