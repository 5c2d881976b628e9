//! Comfort scoring and recommendations derived from a reading

use crate::types::Reading;
use serde::{Deserialize, Serialize};

/// Shown when no metric asks for action
pub const COMFORT_MESSAGE: &str = "Conditions are comfortable";

/// At most this many recommendations are returned
pub const MAX_RECOMMENDATIONS: usize = 2;

/// How pressing a single finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

/// Overall comfort of the room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComfortRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ComfortRating {
    fn from_worst(worst: Option<Severity>) -> Self {
        match worst {
            None => ComfortRating::Excellent,
            Some(Severity::Mild) => ComfortRating::Good,
            Some(Severity::Moderate) => ComfortRating::Fair,
            Some(Severity::Severe) => ComfortRating::Poor,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ComfortRating::Excellent => "Excellent",
            ComfortRating::Good => "Good",
            ComfortRating::Fair => "Fair",
            ComfortRating::Poor => "Poor",
        }
    }
}

/// Result of scoring one reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assessment {
    pub rating: ComfortRating,
    /// Unique, at most [`MAX_RECOMMENDATIONS`], most important metric first
    pub recommendations: Vec<&'static str>,
}

impl Assessment {
    /// Lines to show a person: the recommendations or the comfort message
    pub fn advice(&self) -> Vec<&'static str> {
        if self.recommendations.is_empty() {
            vec![COMFORT_MESSAGE]
        } else {
            self.recommendations.clone()
        }
    }
}

type Finding = (Severity, &'static str);

fn co2_finding(eco2_ppm: u16) -> Option<Finding> {
    match eco2_ppm {
        p if p > 2000 => Some((Severity::Severe, "Ventilate now!")),
        p if p > 1200 => Some((Severity::Moderate, "Open a window")),
        p if p > 800 => Some((Severity::Mild, "Consider fresh air")),
        _ => None,
    }
}

fn tvoc_finding(tvoc_ppb: u16) -> Option<Finding> {
    match tvoc_ppb {
        t if t > 2200 => Some((Severity::Severe, "Air out the room")),
        t if t > 660 => Some((Severity::Moderate, "Reduce VOC sources")),
        t if t > 220 => Some((Severity::Mild, "Mild VOCs present")),
        _ => None,
    }
}

fn humidity_finding(humidity_pct: f64) -> Option<Finding> {
    if humidity_pct < 30.0 {
        Some((Severity::Moderate, "Too dry - humidify"))
    } else if humidity_pct > 60.0 {
        Some((Severity::Moderate, "Open a window"))
    } else {
        None
    }
}

fn temperature_finding(temperature_c: f64) -> Option<Finding> {
    if temperature_c < 18.0 {
        Some((Severity::Mild, "Too cold - add heat"))
    } else if temperature_c > 26.0 {
        Some((Severity::Mild, "Too warm - cool down"))
    } else {
        None
    }
}

fn aqi_finding(aqi: u8) -> Option<Finding> {
    match aqi {
        a if a >= 4 => Some((Severity::Severe, "Poor air - find source")),
        3 => Some((Severity::Mild, "Moderate air quality")),
        _ => None,
    }
}

/// Score a reading. Pure and deterministic.
pub fn score(reading: &Reading) -> Assessment {
    // evaluation order doubles as priority order
    let findings: Vec<Finding> = [
        co2_finding(reading.eco2_ppm),
        tvoc_finding(reading.tvoc_ppb),
        humidity_finding(reading.humidity_pct),
        temperature_finding(reading.temperature_c),
        aqi_finding(reading.aqi),
    ]
    .into_iter()
    .flatten()
    .collect();

    let worst = findings.iter().map(|(severity, _)| *severity).max();

    let mut recommendations: Vec<&'static str> = Vec::with_capacity(MAX_RECOMMENDATIONS);
    for &(_, message) in &findings {
        if !recommendations.contains(&message) {
            recommendations.push(message);
        }
    }
    recommendations.truncate(MAX_RECOMMENDATIONS);

    Assessment {
        rating: ComfortRating::from_worst(worst),
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AirQuality, Atmospheric, OperatingStatus};
    use chrono::Utc;

    fn reading(temp: f64, humidity: f64, aqi: u8, tvoc: u16, eco2: u16) -> Reading {
        Reading::new(
            temp,
            Atmospheric {
                temperature_c: temp,
                pressure_hpa: 1013.0,
                humidity_pct: humidity,
            },
            AirQuality::new(OperatingStatus::Ok, aqi, tvoc, eco2),
            Utc::now(),
        )
    }

    #[test]
    fn test_high_co2_is_urgent() {
        let assessment = score(&reading(22.0, 45.0, 2, 200, 2500));
        assert_eq!(assessment.recommendations, vec!["Ventilate now!"]);
        assert_eq!(assessment.rating, ComfortRating::Poor);
        assert!(!assessment.advice().contains(&COMFORT_MESSAGE));
    }

    #[test]
    fn test_comfortable_room() {
        let assessment = score(&reading(21.0, 45.0, 1, 50, 450));
        assert!(assessment.recommendations.is_empty());
        assert_eq!(assessment.rating, ComfortRating::Excellent);
        assert_eq!(assessment.advice(), vec![COMFORT_MESSAGE]);
    }

    #[test]
    fn test_duplicates_removed_before_truncation() {
        // CO2 and humidity both ask for a window; TVOC comes next
        let assessment = score(&reading(22.0, 70.0, 2, 700, 1500));
        assert_eq!(
            assessment.recommendations,
            vec!["Open a window", "Reduce VOC sources"]
        );
        assert_eq!(assessment.rating, ComfortRating::Fair);
    }

    #[test]
    fn test_truncated_in_evaluation_order() {
        let assessment = score(&reading(30.0, 20.0, 5, 3000, 2100));
        assert_eq!(
            assessment.recommendations,
            vec!["Ventilate now!", "Air out the room"]
        );
    }

    #[test]
    fn test_deterministic() {
        let r = reading(17.0, 25.0, 3, 300, 900);
        let first = score(&r);
        for _ in 0..10 {
            assert_eq!(score(&r), first);
        }
        assert!(first.recommendations.len() <= MAX_RECOMMENDATIONS);
        assert_eq!(first.rating, ComfortRating::Fair);
    }
}
