use envmon_core::{AqiLabels, TemperatureUnit, ValidRanges};
use envmon_delivery::BatchPolicy;
use envmon_display::{PageKind, PresentOptions};
use envmon_ingest::{HealthThresholds, SimulatorOptions, DEFAULT_HISTORY_CAPACITY};
use envmon_obs::LogFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "ENVMON_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "envmon.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub interval_ms: u64,
    pub read_timeout_ms: u64,
    /// Sensor driver; only "simulator" ships with envmon
    pub driver: String,
    /// Simulator only: every n-th read fails
    pub fault_every: u32,
    pub history_capacity: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            read_timeout_ms: 1000,
            driver: "simulator".to_string(),
            fault_every: 0,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub page_order: Vec<PageKind>,
    pub page_dwell_s: u64,
    pub skip_healthy_health_page: bool,
    /// Names for AQI 1..=5
    pub aqi_labels: AqiLabels,
    pub temperature_unit: TemperatureUnit,
    pub width: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            page_order: PageKind::DEFAULT_ORDER.to_vec(),
            page_dwell_s: 5,
            skip_healthy_health_page: true,
            aqi_labels: AqiLabels::default(),
            temperature_unit: TemperatureUnit::Celsius,
            width: envmon_display::DEFAULT_WIDTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub error_threshold: u32,
    pub max_reading_age_s: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            error_threshold: 3,
            max_reading_age_s: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub cache_capacity: usize,
    pub batch_size: usize,
    pub flush_interval_s: u64,
    pub write_timeout_s: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 1000,
            batch_size: 10,
            flush_interval_s: 60,
            write_timeout_s: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Influx,
    #[default]
    Jsonl,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    pub url: String,
    pub org: String,
    pub bucket: String,
    pub token: Option<String>,
    /// Output directory for the file sinks
    pub dir: PathBuf,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Jsonl,
            url: "http://localhost:8086".to_string(),
            org: "home".to_string(),
            bucket: "envmon".to_string(),
            token: None,
            dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HttpConfig {
    /// Status API listen address; unset disables the API
    pub bind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Location tag attached to every delivered point
    pub location: String,
    /// Sensor identity tag attached to every delivered point
    pub device: String,
    pub sampling: SamplingConfig,
    pub display: DisplayConfig,
    pub ranges: ValidRanges,
    pub health: HealthConfig,
    pub delivery: DeliveryConfig,
    pub sink: SinkConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            location: "home".to_string(),
            device: "envmon".to_string(),
            sampling: SamplingConfig::default(),
            display: DisplayConfig::default(),
            ranges: ValidRanges::default(),
            health: HealthConfig::default(),
            delivery: DeliveryConfig::default(),
            sink: SinkConfig::default(),
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

impl AppConfig {
    /// Load from the ENVMON_CONFIG path (TOML) if present, apply environment
    /// overrides and validate
    pub fn load() -> ConfigResult<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut cfg = Self::from_path(&path)?;
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML file; a missing file yields the defaults
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            let s = fs::read_to_string(path)?;
            Self::from_toml(&s)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(s: &str) -> ConfigResult<Self> {
        Ok(toml::from_str::<AppConfig>(s)?)
    }

    /// Apply ENVMON_* and INFLUX_* overrides from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(location) = lookup("ENVMON_LOCATION") {
            self.location = location;
        }
        if let Some(interval) = lookup("ENVMON_INTERVAL_MS") {
            self.sampling.interval_ms = interval
                .trim()
                .parse()
                .map_err(|_| invalid(format!("ENVMON_INTERVAL_MS is not a number: {}", interval)))?;
        }
        if let Some(url) = lookup("INFLUX_URL") {
            self.sink.url = url;
        }
        if let Some(org) = lookup("INFLUX_ORG") {
            self.sink.org = org;
        }
        if let Some(bucket) = lookup("INFLUX_BUCKET") {
            self.sink.bucket = bucket;
        }
        if let Some(token) = lookup("INFLUX_TOKEN") {
            self.sink.token = Some(token);
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.sampling.interval_ms == 0 {
            return Err(invalid("sampling.interval_ms must be > 0"));
        }
        if self.sampling.read_timeout_ms == 0 {
            return Err(invalid("sampling.read_timeout_ms must be > 0"));
        }
        if self.display.page_order.is_empty() {
            return Err(invalid("display.page_order must not be empty"));
        }
        if self.health.error_threshold == 0 {
            return Err(invalid("health.error_threshold must be > 0"));
        }
        if self.health.max_reading_age_s == 0 {
            return Err(invalid("health.max_reading_age_s must be > 0"));
        }
        if self.delivery.cache_capacity == 0 {
            return Err(invalid("delivery.cache_capacity must be > 0"));
        }
        if self.delivery.flush_interval_s == 0 {
            return Err(invalid("delivery.flush_interval_s must be > 0"));
        }
        if !self.ranges.is_consistent() {
            return Err(invalid("ranges must have min <= max"));
        }
        self.batch_policy()
            .validate(self.delivery.cache_capacity)
            .map_err(|e| invalid(e.to_string()))?;
        if self.sink.kind == SinkKind::Influx
            && self.sink.token.as_deref().map_or(true, str::is_empty)
        {
            return Err(invalid("influx sink requires a token (INFLUX_TOKEN)"));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.sampling.interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.sampling.read_timeout_ms)
    }

    pub fn health_thresholds(&self) -> HealthThresholds {
        HealthThresholds {
            error_threshold: self.health.error_threshold,
            max_age: Duration::from_secs(self.health.max_reading_age_s),
        }
    }

    pub fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy {
            batch_size: self.delivery.batch_size,
            flush_interval: Duration::from_secs(self.delivery.flush_interval_s),
            write_timeout: Duration::from_secs(self.delivery.write_timeout_s),
        }
    }

    pub fn simulator_options(&self) -> SimulatorOptions {
        SimulatorOptions {
            fault_every: self.sampling.fault_every,
            ..Default::default()
        }
    }

    pub fn present_options(&self) -> PresentOptions {
        PresentOptions {
            temperature_unit: self.display.temperature_unit,
            aqi_labels: self.display.aqi_labels.clone(),
            ..Default::default()
        }
    }

    pub fn page_dwell(&self) -> Duration {
        Duration::from_secs(self.display.page_dwell_s)
    }
}
