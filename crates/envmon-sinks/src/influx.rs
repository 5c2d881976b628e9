use anyhow::{anyhow, Context, Result};
use envmon_core::{BatchSink, Reading};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Connection settings for an InfluxDB v2 bucket
#[derive(Debug, Clone)]
pub struct InfluxSettings {
    pub base_url: String,
    pub org: String,
    pub bucket: String,
    pub token: String,
    /// Tag values attached to every point
    pub device: String,
    pub location: String,
    /// Request timeout for a single batch write
    pub timeout: Duration,
}

pub struct InfluxSink {
    client: Client,
    write_url: Url,
    token: String,
    device: String,
    location: String,
}

fn escape_tag(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

impl InfluxSink {
    pub fn new(settings: InfluxSettings) -> Result<Self> {
        let InfluxSettings {
            base_url,
            org,
            bucket,
            token,
            device,
            location,
            timeout,
        } = settings;
        if base_url.is_empty() || org.is_empty() || bucket.is_empty() || token.is_empty() {
            return Err(anyhow!("invalid influx configuration"));
        }

        let mut write_url = Url::parse(&base_url).context("invalid influx url")?;
        let path = format!("{}/api/v2/write", write_url.path().trim_end_matches('/'));
        write_url.set_path(&path);
        write_url
            .query_pairs_mut()
            .append_pair("org", &org)
            .append_pair("bucket", &bucket)
            .append_pair("precision", "s");

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            write_url,
            token,
            device,
            location,
        })
    }

    pub fn write_url(&self) -> &Url {
        &self.write_url
    }

    /// One point per reading: measurement "environment", tagged with the
    /// device and location, nine fields, second precision
    pub fn to_line_protocol(&self, reading: &Reading) -> String {
        let fields = [
            format!("temperature={}", reading.temperature_c),
            format!("pressure={}", reading.pressure_hpa),
            format!("humidity={}", reading.humidity_pct),
            format!("aqi={}i", reading.aqi),
            format!("aqi_rating={}", quote_field(reading.aqi_rating.as_str())),
            format!("tvoc={}i", reading.tvoc_ppb),
            format!("eco2={}i", reading.eco2_ppm),
            format!("eco2_rating={}", quote_field(reading.eco2_rating.as_str())),
            format!("status={}", quote_field(reading.status.as_str())),
        ];
        format!(
            "environment,location={},sensor={} {} {}",
            escape_tag(&self.location),
            escape_tag(&self.device),
            fields.join(","),
            reading.timestamp.timestamp()
        )
    }
}

#[async_trait::async_trait]
impl BatchSink for InfluxSink {
    fn name(&self) -> &str {
        "influx"
    }

    async fn write_batch(&mut self, points: &[Reading]) -> Result<()> {
        let body = points
            .iter()
            .map(|r| self.to_line_protocol(r))
            .collect::<Vec<_>>()
            .join("\n");
        let resp = self
            .client
            .post(self.write_url.clone())
            .bearer_auth(&self.token)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("influx write failed: {} {}", status, text));
        }
        tracing::debug!(points = points.len(), "influx batch written");
        Ok(())
    }
}
