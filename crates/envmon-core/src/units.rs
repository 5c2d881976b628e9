//! Unit conversion utilities

use serde::{Deserialize, Serialize};

/// Temperature unit for presentation. Readings are always stored in Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[default]
    #[serde(rename = "C")]
    Celsius,
    #[serde(rename = "F")]
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "C",
            TemperatureUnit::Fahrenheit => "F",
        }
    }

    /// Convert a Celsius value into this unit
    pub fn from_celsius(&self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius_to_fahrenheit(celsius),
        }
    }
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// The atmospheric sensor reports Pascal; readings carry hPa
pub fn pascal_to_hpa(pascal: f64) -> f64 {
    pascal / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_conversion() {
        assert!((celsius_to_fahrenheit(0.0) - 32.0).abs() < 0.001);
        assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < 0.001);
        assert_eq!(TemperatureUnit::Celsius.from_celsius(21.5), 21.5);
    }

    #[test]
    fn test_pressure_conversion() {
        assert!((pascal_to_hpa(101_325.0) - 1013.25).abs() < 1e-9);
    }
}
