use anyhow::Result;
use envmon_core::{BatchSink, Reading};
use std::fs::{create_dir_all, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const HEADER: &str = "Date,Time,Temperature,Humidity,Pressure,eCO2,TVOC,AQI,Status\r\n";

/// Appends readings to a CSV log, one row per reading
pub struct CsvSink {
    file: PathBuf,
}

impl CsvSink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        create_dir_all(dir)?;
        Ok(Self {
            file: dir.join("readings.csv"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    fn row(reading: &Reading) -> String {
        format!(
            "{},{},{:.1},{:.1}%,{:.1},{},{},{},{}\r\n",
            reading.timestamp.format("%d/%m/%y"),
            reading.timestamp.format("%H:%M"),
            reading.temperature_c,
            reading.humidity_pct,
            reading.pressure_hpa,
            reading.eco2_ppm,
            reading.tvoc_ppb,
            reading.aqi,
            reading.status,
        )
    }
}

#[async_trait::async_trait]
impl BatchSink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    async fn write_batch(&mut self, points: &[Reading]) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)?;
        // header only for a fresh log
        if f.metadata()?.len() == 0 {
            f.write_all(HEADER.as_bytes())?;
        }
        let rows: String = points.iter().map(Self::row).collect();
        f.write_all(rows.as_bytes())?;
        Ok(())
    }
}
