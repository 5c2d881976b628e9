//! envmond - environmental monitoring daemon
//!
//! This binary coordinates:
//! - Sensor polling and reading assembly
//! - The rotating status display
//! - Batched delivery to the configured time-series sink
//! - The optional local status API

mod scheduler;

use anyhow::{bail, Context, Result};
use std::net::SocketAddr;
use tracing::{info, warn};

use envmon_config::{AppConfig, SinkKind};
use envmon_core::BatchSink;
use envmon_delivery::{DeliveryBatcher, DeliveryCache};
use envmon_display::{ConsoleDisplay, PageRotation};
use envmon_ingest::{simulated_sensor_set, ReadingAssembler, SensorSet};
use envmon_sinks::influx::{InfluxSettings, InfluxSink};
use envmon_sinks::{CsvSink, FsSink};

use crate::scheduler::Scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    let config = AppConfig::load().context("Failed to load configuration")?;
    envmon_obs::init("envmond", config.logging.format);

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Ignoring unreadable .env"),
    }

    info!(
        location = %config.location,
        device = %config.device,
        driver = %config.sampling.driver,
        sink = ?config.sink.kind,
        "Starting envmon daemon"
    );

    let sensors = build_sensors(&config)?;
    let sink = build_sink(&config)?;

    let assembler = ReadingAssembler::new(
        sensors,
        config.ranges.clone(),
        config.health_thresholds(),
        config.read_timeout(),
    )
    .with_history_capacity(config.sampling.history_capacity);
    let batcher = DeliveryBatcher::new(
        DeliveryCache::new(config.delivery.cache_capacity, config.ranges.clone()),
        config.batch_policy(),
    );
    let display = ConsoleDisplay::new(std::io::stdout(), config.display.width);
    let rotation = PageRotation::new(
        config.display.page_order.clone(),
        config.page_dwell(),
        config.display.skip_healthy_health_page,
    );

    let mut scheduler = Scheduler::new(
        assembler,
        batcher,
        sink,
        Box::new(display),
        rotation,
        config.present_options(),
        config.interval(),
    );

    if let Some(bind) = &config.http.bind {
        let addr: SocketAddr = bind
            .parse()
            .with_context(|| format!("Invalid HTTP bind address {}", bind))?;
        let (local, state, _handle) = envmon_http::start(addr)
            .await
            .context("Failed to start status API")?;
        envmon_http::set_ready(&state, true);
        info!(%local, "Status API listening");
        scheduler = scheduler.with_status(state);
    }

    info!("Daemon running - press Ctrl+C to stop");
    scheduler.run(shutdown_signal()).await;
    scheduler.stop().await;

    info!("envmon daemon stopped");
    Ok(())
}

fn build_sensors(config: &AppConfig) -> Result<SensorSet> {
    match config.sampling.driver.as_str() {
        "simulator" => Ok(simulated_sensor_set(config.simulator_options())),
        other => bail!("Unknown sensor driver: {}", other),
    }
}

fn build_sink(config: &AppConfig) -> Result<Box<dyn BatchSink>> {
    let sink: Box<dyn BatchSink> = match config.sink.kind {
        SinkKind::Influx => {
            let token = config
                .sink
                .token
                .clone()
                .context("INFLUX_TOKEN is not set")?;
            Box::new(InfluxSink::new(InfluxSettings {
                base_url: config.sink.url.clone(),
                org: config.sink.org.clone(),
                bucket: config.sink.bucket.clone(),
                token,
                device: config.device.clone(),
                location: config.location.clone(),
                timeout: config.batch_policy().write_timeout,
            })?)
        }
        SinkKind::Jsonl => Box::new(
            FsSink::new(&config.sink.dir).context("Failed to open JSON lines sink")?,
        ),
        SinkKind::Csv => {
            Box::new(CsvSink::new(&config.sink.dir).context("Failed to open CSV sink")?)
        }
    };
    Ok(sink)
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
