//! Local status API: probes, Prometheus metrics and the latest reading

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use envmon_core::{Assessment, Reading};
use envmon_delivery::DeliveryStats;
use envmon_ingest::HealthSnapshot;
use opentelemetry::metrics::{Counter, MeterProvider};
use opentelemetry_prometheus::exporter;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const HISTORY_CAP: usize = 1000;

/// What the run loop hands over after each tick
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub reading: Reading,
    pub assessment: Assessment,
    pub health: HealthSnapshot,
    pub delivery: DeliveryStats,
}

#[derive(Debug, Clone, Serialize)]
struct CurrentView {
    reading: Reading,
    assessment: Assessment,
}

#[derive(Debug, Clone, Serialize)]
struct HealthView {
    healthy: bool,
    sensors: HealthSnapshot,
    delivery: DeliveryStats,
}

struct Meters {
    requests_total: Counter<u64>,
    readings_total: Counter<u64>,
    rejected_total: Counter<u64>,
    evicted_total: Counter<u64>,
    flush_failures_total: Counter<u64>,
}

pub struct AppState {
    ready: AtomicBool,
    registry: Registry,
    #[allow(dead_code)]
    provider: SdkMeterProvider,
    meters: Meters,
    latest: Mutex<Option<CurrentView>>,
    history: Mutex<VecDeque<Reading>>,
    health: Mutex<Option<HealthView>>,
}

pub fn build_app() -> Result<(Router, Arc<AppState>)> {
    // Prometheus exporter via OpenTelemetry
    let registry = Registry::new();
    let reader = exporter().with_registry(registry.clone()).build()?;
    let provider = SdkMeterProvider::builder().with_reader(reader).build();
    let meter = provider.meter("envmon-http");

    let meters = Meters {
        requests_total: meter
            .u64_counter("envmon_requests_total")
            .with_description("Total HTTP requests served")
            .init(),
        readings_total: meter
            .u64_counter("envmon_readings_total")
            .with_description("Readings assembled")
            .init(),
        rejected_total: meter
            .u64_counter("envmon_readings_rejected_total")
            .with_description("Readings refused by delivery admission")
            .init(),
        evicted_total: meter
            .u64_counter("envmon_readings_evicted_total")
            .with_description("Cached readings overwritten before delivery")
            .init(),
        flush_failures_total: meter
            .u64_counter("envmon_flush_failures_total")
            .with_description("Failed batch deliveries")
            .init(),
    };

    let state = Arc::new(AppState {
        ready: AtomicBool::new(false),
        registry,
        provider,
        meters,
        latest: Mutex::new(None),
        history: Mutex::new(VecDeque::with_capacity(256)),
        health: Mutex::new(None),
    });

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/current", get(current))
        .route("/api/v1/history", get(history))
        .route("/api/v1/health", get(health))
        .with_state(Arc::clone(&state));

    Ok((router, state))
}

/// Bind and serve in the background; returns the bound address
pub async fn start(bind: SocketAddr) -> Result<(SocketAddr, Arc<AppState>, JoinHandle<()>)> {
    let (app, state) = build_app()?;
    let listener = TcpListener::bind(bind).await?;
    let local = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = ?e, "status API stopped");
        }
    });
    Ok((local, state, handle))
}

pub fn set_ready(state: &Arc<AppState>, is_ready: bool) {
    state.ready.store(is_ready, Ordering::Relaxed);
}

pub async fn publish(state: &Arc<AppState>, update: StatusUpdate) {
    let StatusUpdate {
        reading,
        assessment,
        health,
        delivery,
    } = update;

    state.meters.readings_total.add(1, &[]);
    {
        let mut latest = state.latest.lock().await;
        *latest = Some(CurrentView {
            reading: reading.clone(),
            assessment,
        });
    }
    {
        let mut hist = state.history.lock().await;
        if hist.len() == HISTORY_CAP {
            hist.pop_front();
        }
        hist.push_back(reading);
    }

    let mut current = state.health.lock().await;
    // Counters only move forward: add what changed since the last update
    let previous = current.as_ref().map(|h| h.delivery).unwrap_or_default();
    let meters = &state.meters;
    meters
        .rejected_total
        .add(delivery.rejected.saturating_sub(previous.rejected), &[]);
    meters
        .evicted_total
        .add(delivery.evicted.saturating_sub(previous.evicted), &[]);
    meters
        .flush_failures_total
        .add(delivery.failed_flushes.saturating_sub(previous.failed_flushes), &[]);
    *current = Some(HealthView {
        healthy: health.all_ok(),
        sensors: health,
        delivery,
    });
}

async fn healthz(State(state): State<Arc<AppState>>) -> StatusCode {
    state.meters.requests_total.add(1, &[]);
    StatusCode::OK
}

async fn readyz(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn metrics(
    State(state): State<Arc<AppState>>,
) -> (
    [(axum::http::header::HeaderName, axum::http::HeaderValue); 1],
    String,
) {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::warn!(error=?e, "failed to encode metrics");
    }
    let body = String::from_utf8(buf).unwrap_or_default();
    let header = (
        header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    ([header], body)
}

async fn current(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.meters.requests_total.add(1, &[]);
    let latest = state.latest.lock().await;
    if let Some(view) = latest.as_ref() {
        return (StatusCode::OK, Json(view.clone())).into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn history(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> impl IntoResponse {
    state.meters.requests_total.add(1, &[]);
    let limit = q.limit.unwrap_or(100).min(HISTORY_CAP);
    let hist = state.history.lock().await;
    let start = hist.len().saturating_sub(limit);
    let slice: Vec<Reading> = hist.iter().skip(start).cloned().collect();
    (StatusCode::OK, Json(slice)).into_response()
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.meters.requests_total.add(1, &[]);
    let health = state.health.lock().await;
    match health.as_ref() {
        Some(view) => (StatusCode::OK, Json(view.clone())).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
