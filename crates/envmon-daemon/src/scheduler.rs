//! Poll, present and deliver, once per tick

use chrono::{DateTime, Utc};
use envmon_core::{score, Assessment, BatchSink, Reading};
use envmon_delivery::{Admission, DeliveryBatcher, DeliveryResult};
use envmon_display::{present, DisplaySink, PageKind, PageRotation, PresentOptions};
use envmon_http::{AppState, StatusUpdate};
use envmon_ingest::ReadingAssembler;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// What one tick did
#[derive(Debug)]
pub struct TickReport {
    pub reading: Reading,
    pub assessment: Assessment,
    pub page: PageKind,
    pub admission: Admission,
    /// `None` when no flush was due
    pub flushed: Option<DeliveryResult<usize>>,
}

/// Owns every piece of per-tick state; nothing here is shared
pub struct Scheduler {
    assembler: ReadingAssembler,
    batcher: DeliveryBatcher,
    sink: Box<dyn BatchSink>,
    display: Box<dyn DisplaySink>,
    rotation: PageRotation,
    present_options: PresentOptions,
    interval: Duration,
    status: Option<Arc<AppState>>,
}

impl Scheduler {
    pub fn new(
        assembler: ReadingAssembler,
        batcher: DeliveryBatcher,
        sink: Box<dyn BatchSink>,
        display: Box<dyn DisplaySink>,
        rotation: PageRotation,
        present_options: PresentOptions,
        interval: Duration,
    ) -> Self {
        Self {
            assembler,
            batcher,
            sink,
            display,
            rotation,
            present_options,
            interval,
            status: None,
        }
    }

    /// Publish every tick to the status API
    pub fn with_status(mut self, state: Arc<AppState>) -> Self {
        self.status = Some(state);
        self
    }

    /// Tick until `shutdown` resolves. Shutdown is only observed between
    /// ticks, never in the middle of one.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            sink = self.sink.name(),
            "Scheduler started"
        );
        tokio::pin!(shutdown);

        loop {
            let report = self.tick().await;
            debug!(
                timestamp = %report.reading.timestamp,
                comfort = report.assessment.rating.label(),
                page = ?report.page,
                admission = ?report.admission,
                flushed = ?report.flushed,
                "Tick complete"
            );
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    pub async fn tick(&mut self) -> TickReport {
        self.tick_at(Instant::now(), Utc::now()).await
    }

    pub async fn tick_at(&mut self, now: Instant, timestamp: DateTime<Utc>) -> TickReport {
        let assembled = self.assembler.assemble_at(now, timestamp).await;
        let reading = assembled.reading;
        let assessment = score(&reading);
        let health = self.assembler.health().snapshot_at(now);

        let page = self.rotation.select(now, &health);
        let descriptor = present(
            &reading,
            page,
            &health,
            self.assembler.history(),
            &assessment,
            &self.present_options,
        );
        if let Err(e) = self.display.render(&descriptor) {
            warn!(error = %e, ?page, "Display render failed");
        }

        let admission = self.batcher.offer(reading.clone());
        let flushed = self.batcher.flush_if_due(self.sink.as_mut(), now).await;

        if let Some(state) = &self.status {
            envmon_http::publish(
                state,
                StatusUpdate {
                    reading: reading.clone(),
                    assessment: assessment.clone(),
                    health: health.clone(),
                    delivery: self.batcher.stats(),
                },
            )
            .await;
        }

        info!(
            temperature = %format_args!("{:.1}", reading.temperature_c),
            humidity = %format_args!("{:.1}", reading.humidity_pct),
            pressure = %format_args!("{:.1}", reading.pressure_hpa),
            eco2 = reading.eco2_ppm,
            tvoc = reading.tvoc_ppb,
            aqi = reading.aqi,
            status = %reading.status,
            comfort = assessment.rating.label(),
            pending = self.batcher.pending(),
            "Reading"
        );
        if !assembled.outcome.all_fresh() {
            info!(
                atmospheric = %assembled.outcome.atmospheric,
                temperature = %assembled.outcome.temperature,
                air_quality = %assembled.outcome.air_quality,
                "Values substituted"
            );
        }
        for problem in health.problems() {
            warn!(
                sensor = %problem.sensor,
                consecutive_errors = problem.consecutive_errors,
                fresh = problem.fresh,
                "Sensor needs attention"
            );
        }

        TickReport {
            reading,
            assessment,
            page,
            admission,
            flushed,
        }
    }

    /// Final best-effort flush and blank display
    pub async fn stop(&mut self) {
        info!("Stopping scheduler...");
        match self.batcher.flush_remaining(self.sink.as_mut()).await {
            Ok(count) => info!(count, "Final flush complete"),
            Err(e) => error!(error = %e, lost = self.batcher.pending(), "Final flush failed"),
        }
        if let Err(e) = self.display.clear() {
            warn!(error = %e, "Display clear failed");
        }
        info!(stats = ?self.batcher.stats(), "Scheduler stopped");
    }

    #[cfg(test)]
    pub fn batcher(&self) -> &DeliveryBatcher {
        &self.batcher
    }
}
