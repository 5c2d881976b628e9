use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use envmon_core::Reading;
use envmon_delivery::DeliveryStats;
use tower::ServiceExt;

mod common;

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn current_endpoint() {
    let (app, state) = envmon_http::build_app().unwrap();

    // Initially no data => current is 204
    let res = app.clone().oneshot(get("/api/v1/current")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    envmon_http::publish(&state, common::update(1, 2500, true, DeliveryStats::default())).await;

    let res = app.clone().oneshot(get("/api/v1/current")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["reading"]["eco2_ppm"], 2500);
    assert_eq!(json["assessment"]["rating"], "Poor");
    assert_eq!(json["assessment"]["recommendations"][0], "Ventilate now!");
}

#[tokio::test]
async fn history_endpoint_respects_limit() {
    let (app, state) = envmon_http::build_app().unwrap();

    for i in 0..3 {
        envmon_http::publish(&state, common::update(i, 600, true, DeliveryStats::default())).await;
    }

    let res = app.oneshot(get("/api/v1/history?limit=2")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let readings: Vec<Reading> = serde_json::from_slice(&body).unwrap();
    assert_eq!(readings.len(), 2);
    assert!(readings
        .iter()
        .all(|r| r.timestamp.timestamp() >= 1_700_000_001));
}
