//! Per-sensor error counting, freshness and last-known-good values

use envmon_core::{AirQuality, Atmospheric, SensorId};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Limits deciding when a sensor is considered healthy and fresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthThresholds {
    /// Consecutive failures at which a sensor becomes unhealthy
    pub error_threshold: u32,
    /// Maximum age of the last successful read
    pub max_age: Duration,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            error_threshold: 3,
            max_age: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthCounter {
    consecutive_errors: u32,
    last_success: Option<Instant>,
}

impl HealthCounter {
    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn last_success(&self) -> Option<Instant> {
        self.last_success
    }
}

/// Health of one sensor plus the last value read from it while trusted
#[derive(Debug, Clone)]
pub struct SensorHealthState<T> {
    sensor: SensorId,
    counter: HealthCounter,
    last_good: Option<T>,
}

impl<T: Copy> SensorHealthState<T> {
    fn new(sensor: SensorId) -> Self {
        Self {
            sensor,
            counter: HealthCounter::default(),
            last_good: None,
        }
    }

    pub fn sensor(&self) -> SensorId {
        self.sensor
    }

    pub fn counter(&self) -> &HealthCounter {
        &self.counter
    }

    pub fn last_good(&self) -> Option<T> {
        self.last_good
    }

    /// Last-known-good value, or the given default
    pub fn last_good_or(&self, default: T) -> T {
        self.last_good.unwrap_or(default)
    }

    pub(crate) fn remember(&mut self, value: T) {
        self.last_good = Some(value);
    }
}

/// Health of one sensor at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorStatus {
    pub sensor: SensorId,
    pub consecutive_errors: u32,
    pub healthy: bool,
    pub fresh: bool,
    /// `None` until the first successful read
    pub seconds_since_success: Option<f64>,
}

impl SensorStatus {
    pub fn is_ok(&self) -> bool {
        self.healthy && self.fresh
    }
}

/// Point-in-time view of every sensor's health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub sensors: Vec<SensorStatus>,
}

impl HealthSnapshot {
    /// Every sensor is healthy and fresh
    pub fn all_ok(&self) -> bool {
        self.sensors.iter().all(SensorStatus::is_ok)
    }

    pub fn get(&self, sensor: SensorId) -> Option<&SensorStatus> {
        self.sensors.iter().find(|s| s.sensor == sensor)
    }

    /// Sensors that are unhealthy or stale
    pub fn problems(&self) -> impl Iterator<Item = &SensorStatus> {
        self.sensors.iter().filter(|s| !s.is_ok())
    }
}

/// Tracks health for the three board sensors
#[derive(Debug, Clone)]
pub struct HealthTracker {
    thresholds: HealthThresholds,
    temperature: SensorHealthState<f64>,
    atmospheric: SensorHealthState<Atmospheric>,
    air_quality: SensorHealthState<AirQuality>,
}

impl HealthTracker {
    pub fn new(thresholds: HealthThresholds) -> Self {
        Self {
            thresholds,
            temperature: SensorHealthState::new(SensorId::Temperature),
            atmospheric: SensorHealthState::new(SensorId::Atmospheric),
            air_quality: SensorHealthState::new(SensorId::AirQuality),
        }
    }

    pub fn thresholds(&self) -> HealthThresholds {
        self.thresholds
    }

    fn counter(&self, sensor: SensorId) -> &HealthCounter {
        match sensor {
            SensorId::Temperature => &self.temperature.counter,
            SensorId::Atmospheric => &self.atmospheric.counter,
            SensorId::AirQuality => &self.air_quality.counter,
        }
    }

    fn counter_mut(&mut self, sensor: SensorId) -> &mut HealthCounter {
        match sensor {
            SensorId::Temperature => &mut self.temperature.counter,
            SensorId::Atmospheric => &mut self.atmospheric.counter,
            SensorId::AirQuality => &mut self.air_quality.counter,
        }
    }

    pub fn record_success(&mut self, sensor: SensorId) {
        self.record_success_at(sensor, Instant::now());
    }

    /// Reset the error count and stamp the success time
    pub fn record_success_at(&mut self, sensor: SensorId, now: Instant) {
        let counter = self.counter_mut(sensor);
        let previous = counter.consecutive_errors;
        counter.consecutive_errors = 0;
        counter.last_success = Some(now);

        if previous > 0 {
            info!(sensor = %sensor, previous_errors = previous, "Sensor recovered, error count reset");
        } else {
            debug!(sensor = %sensor, "Sensor read ok");
        }
    }

    /// Count one more consecutive failure. The success timestamp is kept.
    pub fn record_failure(&mut self, sensor: SensorId) {
        let threshold = self.thresholds.error_threshold;
        let counter = self.counter_mut(sensor);
        counter.consecutive_errors = counter.consecutive_errors.saturating_add(1);
        let errors = counter.consecutive_errors;

        if errors == threshold {
            error!(sensor = %sensor, errors, "Sensor reached error threshold, marked unhealthy");
        } else {
            warn!(sensor = %sensor, errors, "Sensor error count incremented");
        }
    }

    pub fn consecutive_errors(&self, sensor: SensorId) -> u32 {
        self.counter(sensor).consecutive_errors
    }

    pub fn is_healthy(&self, sensor: SensorId) -> bool {
        self.consecutive_errors(sensor) < self.thresholds.error_threshold
    }

    pub fn is_fresh(&self, sensor: SensorId) -> bool {
        self.is_fresh_at(sensor, Instant::now())
    }

    /// Never-read sensors are not fresh
    pub fn is_fresh_at(&self, sensor: SensorId, now: Instant) -> bool {
        self.counter(sensor)
            .last_success
            .map(|at| now.saturating_duration_since(at) < self.thresholds.max_age)
            .unwrap_or(false)
    }

    pub fn temperature(&self) -> &SensorHealthState<f64> {
        &self.temperature
    }

    pub fn atmospheric(&self) -> &SensorHealthState<Atmospheric> {
        &self.atmospheric
    }

    pub fn air_quality(&self) -> &SensorHealthState<AirQuality> {
        &self.air_quality
    }

    pub(crate) fn temperature_mut(&mut self) -> &mut SensorHealthState<f64> {
        &mut self.temperature
    }

    pub(crate) fn atmospheric_mut(&mut self) -> &mut SensorHealthState<Atmospheric> {
        &mut self.atmospheric
    }

    pub(crate) fn air_quality_mut(&mut self) -> &mut SensorHealthState<AirQuality> {
        &mut self.air_quality
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> HealthSnapshot {
        let sensors = SensorId::ALL
            .iter()
            .map(|&sensor| {
                let counter = self.counter(sensor);
                SensorStatus {
                    sensor,
                    consecutive_errors: counter.consecutive_errors,
                    healthy: self.is_healthy(sensor),
                    fresh: self.is_fresh_at(sensor, now),
                    seconds_since_success: counter
                        .last_success
                        .map(|at| now.saturating_duration_since(at).as_secs_f64()),
                }
            })
            .collect();

        HealthSnapshot { sensors }
    }
}
