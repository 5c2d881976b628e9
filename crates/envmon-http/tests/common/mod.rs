#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use envmon_core::{score, AirQuality, Atmospheric, OperatingStatus, Reading, SensorId};
use envmon_delivery::DeliveryStats;
use envmon_http::StatusUpdate;
use envmon_ingest::{HealthSnapshot, SensorStatus};

pub fn reading(secs: i64, eco2: u16) -> Reading {
    Reading::new(
        21.0,
        Atmospheric::DEFAULT,
        AirQuality::new(OperatingStatus::Ok, 2, 90, eco2),
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
    )
}

pub fn update(secs: i64, eco2: u16, healthy: bool, delivery: DeliveryStats) -> StatusUpdate {
    let reading = reading(secs, eco2);
    let sensors = SensorId::ALL
        .iter()
        .map(|&sensor| SensorStatus {
            sensor,
            consecutive_errors: if healthy { 0 } else { 5 },
            healthy,
            fresh: true,
            seconds_since_success: Some(2.0),
        })
        .collect();
    StatusUpdate {
        assessment: score(&reading),
        reading,
        health: HealthSnapshot { sensors },
        delivery,
    }
}
