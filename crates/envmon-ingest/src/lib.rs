//! Sensor acquisition for envmon
//!
//! This crate defines the port through which physical sensors are read,
//! tracks per-sensor health, and assembles one complete reading per poll
//! cycle. Hardware drivers live outside the workspace; a simulated sensor
//! set is provided for development and tests.

pub mod assembler;
pub mod health;
pub mod history;
pub mod simulator;

pub use assembler::*;
pub use health::*;
pub use history::*;
pub use simulator::*;

use envmon_core::AirQuality;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("Bus error: {0}")]
    Bus(String),

    #[error("Device not responding: {0}")]
    NotResponding(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Timeout waiting for sensor")]
    Timeout,
}

pub type SensorResult<T> = Result<T, SensorError>;

/// Raw atmospheric sample as the device reports it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphericSample {
    pub temperature_c: f64,
    pub pressure_pa: f64,
    pub humidity_pct: f64,
}

/// Combined temperature / pressure / humidity sensor
#[async_trait::async_trait]
pub trait AtmosphericSensor: Send + Sync {
    async fn read(&mut self) -> SensorResult<AtmosphericSample>;
}

/// Precision thermometer, the authoritative temperature source
#[async_trait::async_trait]
pub trait PrecisionThermometer: Send + Sync {
    async fn read_celsius(&mut self) -> SensorResult<f64>;
}

/// Air-quality sensor. Takes the current temperature and humidity for
/// on-chip compensation.
#[async_trait::async_trait]
pub trait AirQualitySensor: Send + Sync {
    async fn read(&mut self, temperature_c: f64, humidity_pct: f64) -> SensorResult<AirQuality>;
}

/// The full set of sensors polled each cycle
pub struct SensorSet {
    pub atmospheric: Box<dyn AtmosphericSensor>,
    pub thermometer: Box<dyn PrecisionThermometer>,
    pub air_quality: Box<dyn AirQualitySensor>,
}
