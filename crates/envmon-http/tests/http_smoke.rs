use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use envmon_delivery::DeliveryStats;
use tower::ServiceExt;

mod common;

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_ready_metrics_endpoints() {
    let (app, state) = envmon_http::build_app().unwrap();

    // /healthz returns 200 and increments a counter
    let res = app.clone().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // /readyz initially 503
    let res = app.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    envmon_http::set_ready(&state, true);

    let res = app.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let stats = DeliveryStats {
        rejected: 3,
        failed_flushes: 1,
        ..Default::default()
    };
    envmon_http::publish(&state, common::update(0, 600, true, stats)).await;

    // /metrics returns prometheus text with our counters
    let res = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let ct = res.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(ct.starts_with("text/plain"));
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("envmon_requests_total"));
    assert!(text.contains("envmon_readings_total"));
    assert!(text.contains("envmon_readings_rejected_total"));
    assert!(text.contains("envmon_flush_failures_total"));
}

#[tokio::test]
async fn health_endpoint_reports_sensors_and_delivery() {
    let (app, state) = envmon_http::build_app().unwrap();

    let res = app.clone().oneshot(get("/api/v1/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let stats = DeliveryStats {
        pending: 4,
        admitted: 4,
        ..Default::default()
    };
    envmon_http::publish(&state, common::update(0, 600, false, stats)).await;

    let res = app.oneshot(get("/api/v1/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["healthy"], false);
    assert_eq!(json["sensors"]["sensors"][0]["consecutive_errors"], 5);
    assert_eq!(json["delivery"]["pending"], 4);
}
