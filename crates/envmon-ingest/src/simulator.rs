//! Simulated sensor board for development without hardware

use crate::{
    AirQualitySensor, AtmosphericSample, AtmosphericSensor, PrecisionThermometer, SensorError,
    SensorResult, SensorSet,
};
use envmon_core::{AirQuality, OperatingStatus};

/// Knobs shared by the simulated sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatorOptions {
    /// Every n-th read of each sensor fails; 0 disables fault injection
    pub fault_every: u32,
    /// Air-quality reads reporting warm-up before operating ok
    pub warmup_reads: u32,
}

impl Default for SimulatorOptions {
    fn default() -> Self {
        Self {
            fault_every: 0,
            warmup_reads: 3,
        }
    }
}

/// Shared read counter with fault injection
#[derive(Debug, Clone, Copy)]
struct Ticker {
    reads: u32,
    fault_every: u32,
}

impl Ticker {
    fn new(fault_every: u32) -> Self {
        Self {
            reads: 0,
            fault_every,
        }
    }

    /// Advance; returns the read number or an injected fault
    fn tick(&mut self, device: &str) -> SensorResult<u32> {
        self.reads = self.reads.wrapping_add(1);
        if self.fault_every > 0 && self.reads % self.fault_every == 0 {
            return Err(SensorError::NotResponding(format!(
                "{} (simulated fault on read {})",
                device, self.reads
            )));
        }
        Ok(self.reads)
    }
}

/// Slow deterministic wave in [-1, 1]
fn wave(n: u32, period: u32) -> f64 {
    let phase = f64::from(n % period) / f64::from(period);
    (phase * std::f64::consts::TAU).sin()
}

pub struct SimulatedAtmospheric {
    ticker: Ticker,
}

impl SimulatedAtmospheric {
    pub fn new(options: SimulatorOptions) -> Self {
        Self {
            ticker: Ticker::new(options.fault_every),
        }
    }

    fn sample(n: u32) -> AtmosphericSample {
        let w = wave(n, 120);
        AtmosphericSample {
            temperature_c: 21.0 + 2.0 * w,
            pressure_pa: 101_325.0 + 150.0 * w,
            humidity_pct: 45.0 - 5.0 * w,
        }
    }
}

#[async_trait::async_trait]
impl AtmosphericSensor for SimulatedAtmospheric {
    async fn read(&mut self) -> SensorResult<AtmosphericSample> {
        let n = self.ticker.tick("atmospheric")?;
        Ok(Self::sample(n))
    }
}

pub struct SimulatedThermometer {
    ticker: Ticker,
}

impl SimulatedThermometer {
    pub fn new(options: SimulatorOptions) -> Self {
        Self {
            ticker: Ticker::new(options.fault_every),
        }
    }
}

#[async_trait::async_trait]
impl PrecisionThermometer for SimulatedThermometer {
    async fn read_celsius(&mut self) -> SensorResult<f64> {
        let n = self.ticker.tick("thermometer")?;
        Ok(21.2 + 2.0 * wave(n, 120))
    }
}

pub struct SimulatedAirQuality {
    ticker: Ticker,
    warmup_reads: u32,
}

impl SimulatedAirQuality {
    pub fn new(options: SimulatorOptions) -> Self {
        Self {
            ticker: Ticker::new(options.fault_every),
            warmup_reads: options.warmup_reads,
        }
    }
}

#[async_trait::async_trait]
impl AirQualitySensor for SimulatedAirQuality {
    async fn read(&mut self, _temperature_c: f64, humidity_pct: f64) -> SensorResult<AirQuality> {
        let n = self.ticker.tick("air-quality")?;
        let status = if n <= self.warmup_reads {
            OperatingStatus::Warmup
        } else {
            OperatingStatus::Ok
        };

        // CO2 builds up and clears over a ~10 minute cycle
        let w = (wave(n, 600) + 1.0) / 2.0;
        let eco2 = 450.0 + 1100.0 * w + humidity_pct.clamp(0.0, 100.0);
        let tvoc = 60.0 + 400.0 * w;
        let aqi = 1 + (w * 3.0).round() as u8;

        Ok(AirQuality::new(status, aqi, tvoc as u16, eco2 as u16))
    }
}

/// Complete simulated board
pub fn simulated_sensor_set(options: SimulatorOptions) -> SensorSet {
    SensorSet {
        atmospheric: Box::new(SimulatedAtmospheric::new(options)),
        thermometer: Box::new(SimulatedThermometer::new(options)),
        air_quality: Box::new(SimulatedAirQuality::new(options)),
    }
}
