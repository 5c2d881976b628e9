//! One complete reading per poll cycle, whatever the sensors do

use crate::{
    HealthThresholds, HealthTracker, ReadingHistory, SensorError, SensorResult, SensorSet,
};
use chrono::{DateTime, Utc};
use envmon_core::{
    pascal_to_hpa, AirQuality, Atmospheric, MetricKind, OperatingStatus, Reading, SensorId,
    ValidRanges, DEFAULT_TEMPERATURE_C,
};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// What happened to one sensor group during a cycle
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    /// Read and validated
    Fresh,
    /// Read, but a value is outside its documented range
    OutOfRange { metric: MetricKind, value: f64 },
    /// Read failed; last-known-good or default substituted
    Failed(String),
    /// Sensor answered but is not operating ok; values substituted
    NotOperating(OperatingStatus),
}

impl ReadOutcome {
    pub fn is_fresh(&self) -> bool {
        matches!(self, ReadOutcome::Fresh)
    }
}

impl fmt::Display for ReadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadOutcome::Fresh => f.write_str("fresh"),
            ReadOutcome::OutOfRange { metric, value } => {
                write!(f, "{} out of range ({})", metric, value)
            }
            ReadOutcome::Failed(reason) => write!(f, "failed: {}", reason),
            ReadOutcome::NotOperating(status) => write!(f, "not ready: {}", status.description()),
        }
    }
}

/// Per-group outcomes of one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub atmospheric: ReadOutcome,
    pub temperature: ReadOutcome,
    pub air_quality: ReadOutcome,
}

impl CycleOutcome {
    pub fn all_fresh(&self) -> bool {
        self.atmospheric.is_fresh() && self.temperature.is_fresh() && self.air_quality.is_fresh()
    }
}

/// Reading of one cycle plus how it came about
#[derive(Debug, Clone)]
pub struct AssembledReading {
    pub reading: Reading,
    pub outcome: CycleOutcome,
    /// Whether the reading went into history
    pub trusted: bool,
}

/// Polls all sensors and folds every failure into health state
pub struct ReadingAssembler {
    sensors: SensorSet,
    ranges: ValidRanges,
    health: HealthTracker,
    history: ReadingHistory,
    read_timeout: Duration,
}

/// NaN or infinity from a device is garbage, not a measurement
fn finite(device: &str, values: &[f64]) -> SensorResult<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SensorError::InvalidData(format!("{} returned a non-finite value", device)))
    }
}

async fn bounded<T, F>(limit: Duration, read: F) -> SensorResult<T>
where
    F: Future<Output = SensorResult<T>>,
{
    match tokio::time::timeout(limit, read).await {
        Ok(result) => result,
        Err(_) => Err(SensorError::Timeout),
    }
}

impl ReadingAssembler {
    pub fn new(
        sensors: SensorSet,
        ranges: ValidRanges,
        thresholds: HealthThresholds,
        read_timeout: Duration,
    ) -> Self {
        Self {
            sensors,
            ranges,
            health: HealthTracker::new(thresholds),
            history: ReadingHistory::default(),
            read_timeout,
        }
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history = ReadingHistory::new(capacity);
        self
    }

    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    pub fn history(&self) -> &ReadingHistory {
        &self.history
    }

    pub async fn assemble(&mut self) -> AssembledReading {
        self.assemble_at(Instant::now(), Utc::now()).await
    }

    /// Produce exactly one reading. Never fails.
    #[instrument(skip(self, now))]
    pub async fn assemble_at(&mut self, now: Instant, timestamp: DateTime<Utc>) -> AssembledReading {
        let (atmospheric, atmospheric_good, atmospheric_outcome) =
            self.read_atmospheric(now).await;
        let (temperature_c, temperature_good, temperature_outcome) =
            self.read_temperature(now).await;

        // compensation inputs must be trusted values, never a raw excursion
        let compensation_temp = temperature_good
            .unwrap_or_else(|| self.health.temperature().last_good_or(DEFAULT_TEMPERATURE_C));
        let compensation_humidity = atmospheric_good
            .unwrap_or_else(|| self.health.atmospheric().last_good_or(Atmospheric::DEFAULT))
            .humidity_pct;

        let (air, air_good, air_outcome) = self
            .read_air_quality(now, compensation_temp, compensation_humidity)
            .await;

        let reading = Reading::new(temperature_c, atmospheric, air, timestamp);

        let operating = air.status.is_ok();
        if operating {
            if let Some(value) = atmospheric_good {
                self.health.atmospheric_mut().remember(value);
            }
            if let Some(value) = temperature_good {
                self.health.temperature_mut().remember(value);
            }
            if let Some(value) = air_good {
                self.health.air_quality_mut().remember(value);
            }
        }

        let trusted = operating && self.ranges.admits(&reading);
        if trusted {
            self.history.push(reading.clone());
        } else {
            debug!(status = %reading.status, "Reading kept out of history");
        }

        AssembledReading {
            reading,
            outcome: CycleOutcome {
                atmospheric: atmospheric_outcome,
                temperature: temperature_outcome,
                air_quality: air_outcome,
            },
            trusted,
        }
    }

    /// Returns (value for the reading, validated value, outcome)
    async fn read_atmospheric(
        &mut self,
        now: Instant,
    ) -> (Atmospheric, Option<Atmospheric>, ReadOutcome) {
        let sensor = SensorId::Atmospheric;
        let read = bounded(self.read_timeout, self.sensors.atmospheric.read())
            .await
            .and_then(|sample| {
                finite(
                    "atmospheric",
                    &[sample.temperature_c, sample.pressure_pa, sample.humidity_pct],
                )
                .map(|_| sample)
            });
        match read {
            Ok(sample) => {
                let value = Atmospheric {
                    temperature_c: sample.temperature_c,
                    pressure_hpa: pascal_to_hpa(sample.pressure_pa),
                    humidity_pct: sample.humidity_pct,
                };
                let violation = [
                    (MetricKind::Temperature, value.temperature_c),
                    (MetricKind::Pressure, value.pressure_hpa),
                    (MetricKind::Humidity, value.humidity_pct),
                ]
                .into_iter()
                .find(|(kind, v)| !self.ranges.validate(*kind, *v));

                match violation {
                    None => {
                        self.health.record_success_at(sensor, now);
                        (value, Some(value), ReadOutcome::Fresh)
                    }
                    Some((metric, bad)) => {
                        warn!(sensor = %sensor, %metric, value = bad, "Reading out of range");
                        self.health.record_failure(sensor);
                        (value, None, ReadOutcome::OutOfRange { metric, value: bad })
                    }
                }
            }
            Err(e) => {
                warn!(sensor = %sensor, error = %e, "Sensor read failed, substituting");
                self.health.record_failure(sensor);
                let value = self.health.atmospheric().last_good_or(Atmospheric::DEFAULT);
                (value, None, ReadOutcome::Failed(e.to_string()))
            }
        }
    }

    async fn read_temperature(&mut self, now: Instant) -> (f64, Option<f64>, ReadOutcome) {
        let sensor = SensorId::Temperature;
        let read = bounded(self.read_timeout, self.sensors.thermometer.read_celsius())
            .await
            .and_then(|celsius| finite("thermometer", &[celsius]).map(|_| celsius));
        match read {
            Ok(celsius) if self.ranges.validate(MetricKind::Temperature, celsius) => {
                self.health.record_success_at(sensor, now);
                (celsius, Some(celsius), ReadOutcome::Fresh)
            }
            Ok(celsius) => {
                warn!(sensor = %sensor, value = celsius, "Temperature out of range");
                self.health.record_failure(sensor);
                (
                    celsius,
                    None,
                    ReadOutcome::OutOfRange {
                        metric: MetricKind::Temperature,
                        value: celsius,
                    },
                )
            }
            Err(e) => {
                warn!(sensor = %sensor, error = %e, "Sensor read failed, substituting");
                self.health.record_failure(sensor);
                let value = self.health.temperature().last_good_or(DEFAULT_TEMPERATURE_C);
                (value, None, ReadOutcome::Failed(e.to_string()))
            }
        }
    }

    async fn read_air_quality(
        &mut self,
        now: Instant,
        temperature_c: f64,
        humidity_pct: f64,
    ) -> (AirQuality, Option<AirQuality>, ReadOutcome) {
        let sensor = SensorId::AirQuality;
        let fallback = self.health.air_quality().last_good_or(AirQuality::DEFAULT);

        match bounded(
            self.read_timeout,
            self.sensors.air_quality.read(temperature_c, humidity_pct),
        )
        .await
        {
            Ok(sample) if !sample.status.is_ok() => {
                warn!(sensor = %sensor, status = %sample.status, "Sensor not operating ok, substituting");
                self.health.record_failure(sensor);
                (
                    fallback.with_status(sample.status),
                    None,
                    ReadOutcome::NotOperating(sample.status),
                )
            }
            Ok(sample) => {
                let violation = [
                    (MetricKind::Aqi, f64::from(sample.aqi)),
                    (MetricKind::Tvoc, f64::from(sample.tvoc_ppb)),
                    (MetricKind::Eco2, f64::from(sample.eco2_ppm)),
                ]
                .into_iter()
                .find(|(kind, v)| !self.ranges.validate(*kind, *v));

                match violation {
                    None => {
                        self.health.record_success_at(sensor, now);
                        (sample, Some(sample), ReadOutcome::Fresh)
                    }
                    Some((metric, bad)) => {
                        warn!(sensor = %sensor, %metric, value = bad, "Reading out of range");
                        self.health.record_failure(sensor);
                        (sample, None, ReadOutcome::OutOfRange { metric, value: bad })
                    }
                }
            }
            Err(e) => {
                warn!(sensor = %sensor, error = %e, "Sensor read failed, substituting");
                self.health.record_failure(sensor);
                (
                    fallback.with_status(OperatingStatus::Error),
                    None,
                    ReadOutcome::Failed(e.to_string()),
                )
            }
        }
    }
}
