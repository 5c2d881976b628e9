use envmon_core::{
    AqiLabels, AqiRating, Assessment, Co2Rating, ComfortRating, OperatingStatus, Reading, SeriesStats,
    TemperatureUnit,
};
use envmon_ingest::{HealthSnapshot, ReadingHistory, SensorStatus};
use serde::{Deserialize, Serialize};

/// The pages the display can cycle through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Readings,
    AirQuality,
    TemperatureTrend,
    SensorHealth,
    Recommendations,
}

impl PageKind {
    pub const DEFAULT_ORDER: [PageKind; 5] = [
        PageKind::Readings,
        PageKind::AirQuality,
        PageKind::TemperatureTrend,
        PageKind::SensorHealth,
        PageKind::Recommendations,
    ];
}

/// Presentation knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentOptions {
    pub temperature_unit: TemperatureUnit,
    /// Names shown for the AQI ratings
    pub aqi_labels: AqiLabels,
    /// Number of history points in the trend graph
    pub trend_points: usize,
}

impl Default for PresentOptions {
    fn default() -> Self {
        Self {
            temperature_unit: TemperatureUnit::Celsius,
            aqi_labels: AqiLabels::default(),
            trend_points: 24,
        }
    }
}

/// Everything needed to draw one page
#[derive(Debug, Clone, PartialEq)]
pub enum PageDescriptor {
    Readings {
        temperature: f64,
        unit: TemperatureUnit,
        humidity_pct: f64,
        pressure_hpa: f64,
    },
    AirQuality {
        status: OperatingStatus,
        aqi: u8,
        aqi_rating: AqiRating,
        aqi_label: String,
        tvoc_ppb: u16,
        eco2_ppm: u16,
        eco2_rating: Co2Rating,
    },
    TemperatureTrend {
        series: Vec<f64>,
        stats: Option<SeriesStats>,
        unit: TemperatureUnit,
    },
    SensorHealth {
        sensors: Vec<SensorStatus>,
    },
    Recommendations {
        rating: ComfortRating,
        advice: Vec<&'static str>,
    },
}

const SPARK: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

fn sparkline(series: &[f64], stats: &SeriesStats) -> String {
    let span = stats.max - stats.min;
    series
        .iter()
        .map(|v| {
            if span <= f64::EPSILON {
                return SPARK[SPARK.len() / 2];
            }
            let idx = ((v - stats.min) / span * (SPARK.len() - 1) as f64).round() as usize;
            SPARK[idx.min(SPARK.len() - 1)]
        })
        .collect()
}

fn health_line(status: &SensorStatus) -> String {
    let state = if !status.healthy {
        format!("failing ({} errors)", status.consecutive_errors)
    } else if status.seconds_since_success.is_none() {
        "no data".to_string()
    } else if !status.fresh {
        "stale".to_string()
    } else {
        "ok".to_string()
    };
    format!("{}: {}", status.sensor.name(), state)
}

impl PageDescriptor {
    pub fn kind(&self) -> PageKind {
        match self {
            PageDescriptor::Readings { .. } => PageKind::Readings,
            PageDescriptor::AirQuality { .. } => PageKind::AirQuality,
            PageDescriptor::TemperatureTrend { .. } => PageKind::TemperatureTrend,
            PageDescriptor::SensorHealth { .. } => PageKind::SensorHealth,
            PageDescriptor::Recommendations { .. } => PageKind::Recommendations,
        }
    }

    pub fn title(&self) -> String {
        match self {
            PageDescriptor::Readings { .. } => "Readings".to_string(),
            PageDescriptor::AirQuality { .. } => "Air Quality".to_string(),
            PageDescriptor::TemperatureTrend { .. } => "Temperature Trend".to_string(),
            PageDescriptor::SensorHealth { .. } => "Sensor Health".to_string(),
            PageDescriptor::Recommendations { rating, .. } => format!("Comfort: {}", rating.label()),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        match self {
            PageDescriptor::Readings {
                temperature,
                unit,
                humidity_pct,
                pressure_hpa,
            } => vec![
                format!("Temp: {:.1} {}", temperature, unit.symbol()),
                format!("Humidity: {:.1} %", humidity_pct),
                format!("Pressure: {:.1} hPa", pressure_hpa),
            ],
            PageDescriptor::AirQuality {
                status,
                aqi,
                aqi_label,
                tvoc_ppb,
                eco2_ppm,
                eco2_rating,
                ..
            } => {
                if !status.is_ok() {
                    return vec![
                        "Sensor not ready".to_string(),
                        format!("Status: {}", status.description()),
                    ];
                }
                vec![
                    format!("AQI: {} ({})", aqi, aqi_label),
                    format!("TVOC: {} ppb", tvoc_ppb),
                    format!("eCO2: {} ppm ({})", eco2_ppm, eco2_rating.as_str()),
                ]
            }
            PageDescriptor::TemperatureTrend {
                series,
                stats,
                unit,
            } => match stats {
                None => vec!["No history yet".to_string()],
                Some(stats) => vec![
                    sparkline(series, stats),
                    format!("Min {:.1} Max {:.1}", stats.min, stats.max),
                    format!("Avg {:.1} {} ({} pts)", stats.avg, unit.symbol(), stats.count),
                ],
            },
            PageDescriptor::SensorHealth { sensors } => sensors.iter().map(health_line).collect(),
            PageDescriptor::Recommendations { advice, .. } => {
                advice.iter().map(|s| s.to_string()).collect()
            }
        }
    }
}

/// Build the descriptor for `page`. Pure; values are converted to the
/// configured temperature unit here.
pub fn present(
    reading: &Reading,
    page: PageKind,
    health: &HealthSnapshot,
    history: &ReadingHistory,
    assessment: &Assessment,
    options: &PresentOptions,
) -> PageDescriptor {
    let unit = options.temperature_unit;
    match page {
        PageKind::Readings => PageDescriptor::Readings {
            temperature: unit.from_celsius(reading.temperature_c),
            unit,
            humidity_pct: reading.humidity_pct,
            pressure_hpa: reading.pressure_hpa,
        },
        PageKind::AirQuality => PageDescriptor::AirQuality {
            status: reading.status,
            aqi: reading.aqi,
            aqi_rating: reading.aqi_rating,
            aqi_label: options.aqi_labels.label(reading.aqi_rating).to_string(),
            tvoc_ppb: reading.tvoc_ppb,
            eco2_ppm: reading.eco2_ppm,
            eco2_rating: reading.eco2_rating,
        },
        PageKind::TemperatureTrend => {
            let series: Vec<f64> = history
                .recent(options.trend_points)
                .iter()
                .map(|r| unit.from_celsius(r.temperature_c))
                .collect();
            let stats = envmon_core::summarize(series.iter().copied());
            PageDescriptor::TemperatureTrend {
                series,
                stats,
                unit,
            }
        }
        PageKind::SensorHealth => PageDescriptor::SensorHealth {
            sensors: health.sensors.clone(),
        },
        PageKind::Recommendations => PageDescriptor::Recommendations {
            rating: assessment.rating,
            advice: assessment.advice(),
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use envmon_core::{score, AirQuality, Atmospheric, SensorId};

    pub(crate) fn reading(temp: f64, status: OperatingStatus, eco2: u16) -> Reading {
        Reading::new(
            temp,
            Atmospheric {
                temperature_c: temp,
                pressure_hpa: 1009.4,
                humidity_pct: 44.0,
            },
            AirQuality::new(status, 2, 140, eco2),
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        )
    }

    pub(crate) fn healthy() -> HealthSnapshot {
        HealthSnapshot {
            sensors: SensorId::ALL
                .iter()
                .map(|&sensor| SensorStatus {
                    sensor,
                    consecutive_errors: 0,
                    healthy: true,
                    fresh: true,
                    seconds_since_success: Some(1.0),
                })
                .collect(),
        }
    }

    fn show(reading: &Reading, page: PageKind, history: &ReadingHistory, options: &PresentOptions) -> PageDescriptor {
        present(reading, page, &healthy(), history, &score(reading), options)
    }

    #[test]
    fn readings_page_in_fahrenheit() {
        let r = reading(20.0, OperatingStatus::Ok, 600);
        let options = PresentOptions {
            temperature_unit: TemperatureUnit::Fahrenheit,
            ..Default::default()
        };
        let page = show(&r, PageKind::Readings, &ReadingHistory::default(), &options);
        assert_eq!(page.kind(), PageKind::Readings);
        assert_eq!(
            page.lines(),
            vec!["Temp: 68.0 F", "Humidity: 44.0 %", "Pressure: 1009.4 hPa"]
        );
    }

    #[test]
    fn air_quality_page_not_ready() {
        let r = reading(21.0, OperatingStatus::Warmup, 400);
        let page = show(&r, PageKind::AirQuality, &ReadingHistory::default(), &PresentOptions::default());
        assert_eq!(page.lines(), vec!["Sensor not ready", "Status: warm-up"]);
    }

    #[test]
    fn air_quality_page_labels() {
        let r = reading(21.0, OperatingStatus::Ok, 900);
        let page = show(&r, PageKind::AirQuality, &ReadingHistory::default(), &PresentOptions::default());
        assert_eq!(page.lines(), vec!["AQI: 2 (Good)", "TVOC: 140 ppb", "eCO2: 900 ppm (fair)"]);

        let options = PresentOptions {
            aqi_labels: AqiLabels(["A", "B", "C", "D", "E"].map(String::from)),
            ..Default::default()
        };
        let custom = show(&r, PageKind::AirQuality, &ReadingHistory::default(), &options);
        assert_eq!(custom.lines()[0], "AQI: 2 (B)");
    }

    #[test]
    fn trend_page_series_and_stats() {
        let mut history = ReadingHistory::new(16);
        for t in [20.0, 21.0, 22.0, 23.0, 24.0] {
            history.push(reading(t, OperatingStatus::Ok, 600));
        }
        let options = PresentOptions {
            trend_points: 4,
            ..Default::default()
        };
        let page = show(&reading(24.0, OperatingStatus::Ok, 600), PageKind::TemperatureTrend, &history, &options);
        match &page {
            PageDescriptor::TemperatureTrend { series, stats, .. } => {
                assert_eq!(series, &vec![21.0, 22.0, 23.0, 24.0]);
                let stats = stats.unwrap();
                assert_eq!(stats.min, 21.0);
                assert_eq!(stats.max, 24.0);
                assert_eq!(stats.avg, 22.5);
            }
            other => panic!("unexpected page {:?}", other),
        }
        insta::assert_snapshot!(page.lines().join("\n"), @r###"
        ▁▃▆█
        Min 21.0 Max 24.0
        Avg 22.5 C (4 pts)
        "###);
    }

    #[test]
    fn trend_page_without_history() {
        let r = reading(21.0, OperatingStatus::Ok, 600);
        let page = show(&r, PageKind::TemperatureTrend, &ReadingHistory::default(), &PresentOptions::default());
        assert_eq!(page.lines(), vec!["No history yet"]);
    }

    #[test]
    fn health_page_lists_problems() {
        let mut snapshot = healthy();
        snapshot.sensors[1].healthy = false;
        snapshot.sensors[1].consecutive_errors = 4;
        snapshot.sensors[2].fresh = false;
        let r = reading(21.0, OperatingStatus::Ok, 600);
        let page = present(
            &r,
            PageKind::SensorHealth,
            &snapshot,
            &ReadingHistory::default(),
            &score(&r),
            &PresentOptions::default(),
        );
        insta::assert_snapshot!(page.lines().join("\n"), @r###"
        temperature-sensor: ok
        air-quality-sensor: failing (4 errors)
        atmospheric-sensor: stale
        "###);
    }

    #[test]
    fn recommendations_page() {
        let r = reading(21.0, OperatingStatus::Ok, 2500);
        let page = show(&r, PageKind::Recommendations, &ReadingHistory::default(), &PresentOptions::default());
        assert_eq!(page.title(), "Comfort: Poor");
        assert_eq!(page.lines()[0], "Ventilate now!");

        let calm = reading(21.0, OperatingStatus::Ok, 500);
        let page = show(&calm, PageKind::Recommendations, &ReadingHistory::default(), &PresentOptions::default());
        assert_eq!(page.lines(), vec!["Conditions are comfortable"]);
    }
}
