//! API Regression Tests
//!
//! In-process tests that build the Axum app via `create_app()` and exercise
//! the /api/v1/* endpoints using `tower::ServiceExt::oneshot()`.
//! No network port is opened.

use std::sync::Arc;

use airspottr::api::{create_app, ApiState};
use airspottr::pipeline::shared_snapshot;
use airspottr::{Coordinates, RarityPolicy, ReferenceTables, SightingStore};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

fn create_test_state() -> ApiState {
    let store = SightingStore::new(
        Arc::new(ReferenceTables::new()),
        Coordinates::new(1.359_297, 103.989_348),
        RarityPolicy::default(),
    );
    ApiState::new(shared_snapshot(&store), "SIN")
}

async fn get(uri: &str) -> (StatusCode, serde_json::Value) {
    let app = create_app(create_test_state());
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// All read-only endpoints answer on an empty store.
#[tokio::test]
async fn test_v1_endpoints_on_empty_store() {
    for uri in [
        "/api/v1/status",
        "/api/v1/sightings",
        "/api/v1/current",
        "/api/v1/extremes",
        "/api/v1/rarity/type",
        "/api/v1/rarity/operator",
        "/api/v1/rarity/country",
        "/api/v1/summary",
    ] {
        let (status, json) = get(uri).await;
        assert_eq!(status, StatusCode::OK, "GET {uri} returned {status}");
        assert!(json["meta"]["timestamp"].is_string(), "GET {uri} has no meta");
        assert_eq!(json["meta"]["warming_up"], true, "GET {uri} meta");
        assert_eq!(json["meta"]["cycle"], 0, "GET {uri} meta");
    }
}

#[tokio::test]
async fn test_empty_store_payloads() {
    let (_, json) = get("/api/v1/sightings").await;
    assert_eq!(json["data"], serde_json::json!([]));

    let (_, json) = get("/api/v1/extremes").await;
    assert!(json["data"]["fastest"].is_null());
    assert!(json["data"]["highest"].is_null());

    let (_, json) = get("/api/v1/summary").await;
    let text = json["data"]["text"].as_str().unwrap();
    assert!(text.starts_with("=== Summary ==="));
    assert!(text.trim_end().ends_with("=== End Summary ==="));
}

#[tokio::test]
async fn test_unknown_dimension_returns_400() {
    let (status, json) = get("/api/v1/rarity/airframe").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("airframe"));
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let (status, _) = get("/api/v1/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
