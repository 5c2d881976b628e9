//! Core data types for environmental readings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one physical sensor on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorId {
    #[serde(rename = "temperature-sensor")]
    Temperature,
    #[serde(rename = "air-quality-sensor")]
    AirQuality,
    #[serde(rename = "atmospheric-sensor")]
    Atmospheric,
}

impl SensorId {
    pub const ALL: [SensorId; 3] = [
        SensorId::Temperature,
        SensorId::AirQuality,
        SensorId::Atmospheric,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SensorId::Temperature => "temperature-sensor",
            SensorId::AirQuality => "air-quality-sensor",
            SensorId::Atmospheric => "atmospheric-sensor",
        }
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operating status reported by the air-quality sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperatingStatus {
    Ok,
    Error,
    Warmup,
    Startup,
    Invalid,
}

impl OperatingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingStatus::Ok => "OK",
            OperatingStatus::Error => "ERROR",
            OperatingStatus::Warmup => "WARMUP",
            OperatingStatus::Startup => "STARTUP",
            OperatingStatus::Invalid => "INVALID",
        }
    }

    /// Human text as the sensor vendor prints it
    pub fn description(&self) -> &'static str {
        match self {
            OperatingStatus::Ok => "operating ok",
            OperatingStatus::Error => "read error",
            OperatingStatus::Warmup => "warm-up",
            OperatingStatus::Startup => "initial start-up",
            OperatingStatus::Invalid => "invalid output",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, OperatingStatus::Ok)
    }
}

impl fmt::Display for OperatingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UBA air quality rating, one per AQI step
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AqiRating {
    Excellent,
    Good,
    Moderate,
    Poor,
    Unhealthy,
}

impl AqiRating {
    /// Map an AQI index (1 = best) onto its rating. Out-of-scale values clamp.
    pub fn from_index(aqi: u8) -> Self {
        match aqi {
            0 | 1 => AqiRating::Excellent,
            2 => AqiRating::Good,
            3 => AqiRating::Moderate,
            4 => AqiRating::Poor,
            _ => AqiRating::Unhealthy,
        }
    }

    /// Zero-based position on the scale, used to look up configured labels
    pub fn ordinal(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AqiRating::Excellent => "excellent",
            AqiRating::Good => "good",
            AqiRating::Moderate => "moderate",
            AqiRating::Poor => "poor",
            AqiRating::Unhealthy => "unhealthy",
        }
    }
}

/// Display names for the five AQI ratings, best first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AqiLabels(pub [String; 5]);

impl Default for AqiLabels {
    fn default() -> Self {
        Self(["Excellent", "Good", "Moderate", "Poor", "Unhealthy"].map(String::from))
    }
}

impl AqiLabels {
    pub fn label(&self, rating: AqiRating) -> &str {
        &self.0[rating.ordinal()]
    }
}

/// Rating of an equivalent CO2 concentration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Co2Rating {
    Excellent,
    Good,
    Fair,
    Poor,
    Unhealthy,
}

impl Co2Rating {
    pub fn from_ppm(eco2: u16) -> Self {
        match eco2 {
            0..=599 => Co2Rating::Excellent,
            600..=799 => Co2Rating::Good,
            800..=999 => Co2Rating::Fair,
            1000..=1499 => Co2Rating::Poor,
            _ => Co2Rating::Unhealthy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Co2Rating::Excellent => "excellent",
            Co2Rating::Good => "good",
            Co2Rating::Fair => "fair",
            Co2Rating::Poor => "poor",
            Co2Rating::Unhealthy => "unhealthy",
        }
    }
}

/// Values produced by one atmospheric sensor read, pressure already in hPa
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Atmospheric {
    pub temperature_c: f64,
    pub pressure_hpa: f64,
    pub humidity_pct: f64,
}

impl Atmospheric {
    /// Stand-in used before the first good atmospheric read
    pub const DEFAULT: Atmospheric = Atmospheric {
        temperature_c: 20.0,
        pressure_hpa: 1013.25,
        humidity_pct: 50.0,
    };
}

/// Stand-in for the precision thermometer before its first good read
pub const DEFAULT_TEMPERATURE_C: f64 = 20.0;

/// Values produced by one air-quality sensor read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirQuality {
    pub status: OperatingStatus,
    pub aqi: u8,
    pub aqi_rating: AqiRating,
    pub tvoc_ppb: u16,
    pub eco2_ppm: u16,
    pub eco2_rating: Co2Rating,
}

impl AirQuality {
    /// Stand-in used before the first trusted air-quality read
    pub const DEFAULT: AirQuality = AirQuality {
        status: OperatingStatus::Error,
        aqi: 1,
        aqi_rating: AqiRating::Excellent,
        tvoc_ppb: 0,
        eco2_ppm: 400,
        eco2_rating: Co2Rating::Excellent,
    };

    /// Build a sample with ratings derived from the raw values
    pub fn new(status: OperatingStatus, aqi: u8, tvoc_ppb: u16, eco2_ppm: u16) -> Self {
        Self {
            status,
            aqi,
            aqi_rating: AqiRating::from_index(aqi),
            tvoc_ppb,
            eco2_ppm,
            eco2_rating: Co2Rating::from_ppm(eco2_ppm),
        }
    }

    /// Same values, different status. Used when substituting trusted values
    /// into a cycle whose sensor did not report ok.
    pub fn with_status(self, status: OperatingStatus) -> Self {
        Self { status, ..self }
    }
}

/// Immutable snapshot of one polling cycle
///
/// Every field always carries a value; the assembler substitutes
/// last-known-good or default values instead of leaving gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Celsius, from the precision thermometer
    pub temperature_c: f64,
    /// Hectopascal
    pub pressure_hpa: f64,
    /// Relative humidity, percent
    pub humidity_pct: f64,
    pub aqi: u8,
    pub aqi_rating: AqiRating,
    pub tvoc_ppb: u16,
    pub eco2_ppm: u16,
    pub eco2_rating: Co2Rating,
    pub status: OperatingStatus,
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    pub fn new(
        temperature_c: f64,
        atmospheric: Atmospheric,
        air: AirQuality,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            temperature_c,
            pressure_hpa: atmospheric.pressure_hpa,
            humidity_pct: atmospheric.humidity_pct,
            aqi: air.aqi,
            aqi_rating: air.aqi_rating,
            tvoc_ppb: air.tvoc_ppb,
            eco2_ppm: air.eco2_ppm,
            eco2_rating: air.eco2_rating,
            status: air.status,
            timestamp,
        }
    }

    /// Air-quality part of the reading
    pub fn air_quality(&self) -> AirQuality {
        AirQuality {
            status: self.status,
            aqi: self.aqi,
            aqi_rating: self.aqi_rating,
            tvoc_ppb: self.tvoc_ppb,
            eco2_ppm: self.eco2_ppm,
            eco2_rating: self.eco2_rating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_aqi_labels_follow_scale() {
        let labels = AqiLabels::default();
        assert_eq!(labels.label(AqiRating::from_index(1)), "Excellent");
        assert_eq!(labels.label(AqiRating::from_index(5)), "Unhealthy");

        let custom = AqiLabels(["Sehr gut", "Gut", "Mittel", "Schlecht", "Ungesund"].map(String::from));
        assert_eq!(custom.label(AqiRating::Moderate), "Mittel");
    }

    #[test]
    fn test_rating_scales() {
        assert_eq!(AqiRating::from_index(1), AqiRating::Excellent);
        assert_eq!(AqiRating::from_index(3), AqiRating::Moderate);
        assert_eq!(AqiRating::from_index(9), AqiRating::Unhealthy);

        assert_eq!(Co2Rating::from_ppm(400), Co2Rating::Excellent);
        assert_eq!(Co2Rating::from_ppm(800), Co2Rating::Fair);
        assert_eq!(Co2Rating::from_ppm(2500), Co2Rating::Unhealthy);
    }

    #[test]
    fn test_reading_serde() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let reading = Reading::new(
            21.5,
            Atmospheric::DEFAULT,
            AirQuality::new(OperatingStatus::Ok, 2, 120, 650),
            ts,
        );

        let json = serde_json::to_string(&reading).unwrap();
        assert!(json.contains("\"status\":\"OK\""));
        assert!(json.contains("\"eco2_rating\":\"good\""));

        let back: Reading = serde_json::from_str(&json).unwrap();
        assert_eq!(back, reading);
    }

    #[test]
    fn test_sensor_names() {
        assert_eq!(SensorId::AirQuality.to_string(), "air-quality-sensor");
        let json = serde_json::to_string(&SensorId::Atmospheric).unwrap();
        assert_eq!(json, "\"atmospheric-sensor\"");
    }
}
