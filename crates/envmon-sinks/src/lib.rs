//! Batch sinks for delivered readings
//!
//! `FsSink` appends JSON lines, `CsvSink` keeps a spreadsheet-friendly log,
//! and `InfluxSink` (feature `influx`) writes line protocol over HTTP.

use anyhow::Result;
pub mod csv;
#[cfg(feature = "influx")]
pub mod influx;

pub use csv::CsvSink;

use envmon_core::{BatchSink, Reading};
use std::fs::{create_dir_all, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct FsSink {
    file: PathBuf,
}

impl FsSink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        create_dir_all(dir)?;
        Ok(Self {
            file: dir.join("readings.jsonl"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file
    }
}

#[async_trait::async_trait]
impl BatchSink for FsSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn write_batch(&mut self, points: &[Reading]) -> Result<()> {
        let mut buf = Vec::new();
        for reading in points {
            serde_json::to_writer(&mut buf, reading)?;
            buf.push(b'\n');
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)?;
        f.write_all(&buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use envmon_core::{AirQuality, Atmospheric, OperatingStatus};

    #[tokio::test]
    async fn writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FsSink::new(dir.path().join("out")).unwrap();
        let reading = Reading::new(
            20.0,
            Atmospheric::DEFAULT,
            AirQuality::new(OperatingStatus::Ok, 1, 50, 450),
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        );
        sink.write_batch(&[reading.clone(), reading]).await.unwrap();
        sink.write_batch(&[]).await.unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: Reading = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.eco2_ppm, 450);
    }
}
