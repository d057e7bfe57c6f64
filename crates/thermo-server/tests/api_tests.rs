use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use std::time::Duration;
use thermo_core::{format_timestamp, SigningKey};
use thermo_server::{create_router, AppState, BoundedSeries, Verifier};
use thermo_types::{HEADER_DEVICE_ID, HEADER_SIGNATURE, HEADER_TIMESTAMP};
use tower::ServiceExt;

const SECRET: &str = "api-test-secret";

fn create_test_state(retention: usize) -> AppState {
    let verifier = Verifier::new(SECRET, Duration::from_secs(300)).unwrap();
    AppState::new(verifier, BoundedSeries::new(retention))
}

fn signed_request(body: &str, timestamp: &str, secret: &str) -> Request<Body> {
    let signature = SigningKey::new(secret).unwrap().sign(timestamp, body.as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/ingest")
        .header("content-type", "application/json")
        .header(HEADER_DEVICE_ID, "pi-1")
        .header(HEADER_TIMESTAMP, timestamp)
        .header(HEADER_SIGNATURE, signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn now_ts() -> String {
    format_timestamp(Utc::now())
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_router(create_test_state(50));

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn test_empty_temperature_query() {
    let app = create_router(create_test_state(50));

    let request = Request::builder()
        .uri("/api/temperature")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"current": null, "history": [], "stats": null}));
}

#[tokio::test]
async fn test_ingest_then_query() {
    let app = create_router(create_test_state(50));

    for value in ["1.0", "2.0", "3.0"] {
        let body = format!(r#"{{"value":{}}}"#, value);
        let (status, ack) = send(&app, signed_request(&body, &now_ts(), SECRET)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack["ok"], json!(true));
    }

    let request = Request::builder()
        .uri("/api/temperature")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"], json!({"min": 1.0, "max": 3.0, "avg": 2.0, "count": 3}));
    assert_eq!(body["history"].as_array().unwrap().len(), 3);
    assert_eq!(body["current"]["value"], json!(3.0));
    assert_eq!(body["current"]["value_f"], json!(37.4));
    assert_eq!(body["current"]["device_id"], json!("pi-1"));
}

#[tokio::test]
async fn test_ingest_ack_count() {
    let app = create_router(create_test_state(2));

    let mut counts = Vec::new();
    for _ in 0..3 {
        let (_, ack) = send(&app, signed_request(r#"{"value":20.0}"#, &now_ts(), SECRET)).await;
        counts.push(ack["count"].as_u64().unwrap());
    }

    assert_eq!(counts, vec![1, 2, 2]);
}

#[tokio::test]
async fn test_wrong_secret_is_401() {
    let app = create_router(create_test_state(50));

    let (status, body) = send(&app, signed_request(r#"{"value":20.0}"#, &now_ts(), "other")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["ok"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("Signature mismatch"));
}

#[tokio::test]
async fn test_stale_timestamp_is_401() {
    let app = create_router(create_test_state(50));
    let stale = format_timestamp(Utc::now() - ChronoDuration::seconds(400));

    let (status, body) = send(&app, signed_request(r#"{"value":20.0}"#, &stale, SECRET)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["ok"], json!(false));
}

#[tokio::test]
async fn test_missing_signature_headers_is_401() {
    let app = create_router(create_test_state(50));

    let request = Request::builder()
        .method("POST")
        .uri("/api/ingest")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"value":20.0}"#))
        .unwrap();
    let (status, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_legacy_payload_is_400() {
    let app = create_router(create_test_state(50));

    let (status, body) =
        send(&app, signed_request(r#"{"temperature":20.0}"#, &now_ts(), SECRET)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], json!(false));
}

#[tokio::test]
async fn test_rejection_leaves_store_untouched() {
    let state = create_test_state(50);
    let app = create_router(state.clone());

    send(&app, signed_request(r#"{"value":20.0}"#, &now_ts(), "other")).await;
    send(&app, signed_request(r#"{"c":20.0}"#, &now_ts(), SECRET)).await;

    assert!(state.series.is_empty().await);
}
