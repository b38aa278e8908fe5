//! API route definitions
//!
//! - /api/v1/status - Reference point, policy, warm-up and ingest counters
//! - /api/v1/sightings - Every airframe seen since start
//! - /api/v1/current - Latest non-empty batch
//! - /api/v1/extremes - Fastest and highest aircraft
//! - /api/v1/rarity/:dimension - Least-common-first ranking for one dimension
//! - /api/v1/summary - The periodic summary, structured and as text

use axum::{routing::get, Router};

use super::handlers::{self, ApiState};

/// Create all API routes.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(handlers::get_status))
        .route("/sightings", get(handlers::get_sightings))
        .route("/sightings/:hex", get(handlers::get_sighting))
        .route("/current", get(handlers::get_current))
        .route("/extremes", get(handlers::get_extremes))
        .route("/rarity/:dimension", get(handlers::get_rarity))
        .route("/summary", get(handlers::get_summary))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinates;
    use crate::pipeline::shared_snapshot;
    use crate::rarity::RarityPolicy;
    use crate::reference::ReferenceTables;
    use crate::store::SightingStore;
    use crate::types::{AircraftBatch, AircraftObservation, Altitude};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn create_test_state() -> ApiState {
        let tables = ReferenceTables::new().with_type("A359", "AIRBUS, A-350-900");
        let mut store = SightingStore::new(
            Arc::new(tables),
            Coordinates::new(1.36, 103.99),
            RarityPolicy::default(),
        );
        store.ingest(AircraftBatch::new(vec![AircraftObservation {
            hex: "76CDB4".to_string(),
            flight: "SIA321  ".to_string(),
            type_code: Some("A359".to_string()),
            alt_baro: Some(Altitude::Feet(39000.0)),
            ground_speed: Some(480.0),
            lat: Some(1.5),
            lon: Some(104.1),
            ..Default::default()
        }]));
        ApiState::new(shared_snapshot(&store), "SIN")
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let app = api_routes(create_test_state());
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_all_get_routes_return_ok() {
        for uri in [
            "/status",
            "/sightings",
            "/sightings/76cdb4",
            "/current",
            "/extremes",
            "/rarity/type",
            "/rarity/operator",
            "/rarity/country",
            "/summary",
        ] {
            let (status, json) = get_json(uri).await;
            assert_eq!(status, StatusCode::OK, "GET {uri}");
            assert!(json.get("data").is_some(), "GET {uri} missing data");
            assert!(json.get("meta").is_some(), "GET {uri} missing meta");
        }
    }

    #[tokio::test]
    async fn test_unknown_dimension_is_bad_request() {
        let (status, json) = get_json("/rarity/colour").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_unknown_hex_is_not_found() {
        let (status, json) = get_json("/sightings/ffffff").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_status_reports_counts() {
        let (_, json) = get_json("/status").await;
        assert_eq!(json["data"]["location"], "SIN");
        assert_eq!(json["data"]["sightings"], 1);
        assert_eq!(json["data"]["types"]["total"], 1);
        assert_eq!(json["data"]["warming_up"], true);
    }

    #[tokio::test]
    async fn test_rarity_ranking_payload() {
        let (_, json) = get_json("/rarity/type").await;
        assert_eq!(json["data"]["dimension"], "type");
        assert_eq!(json["data"]["ranking"][0]["category"], "AIRBUS, A-350-900");
        assert_eq!(json["data"]["ranking"][0]["count"], 1);
    }

    #[tokio::test]
    async fn test_extremes_payload() {
        let (_, json) = get_json("/extremes").await;
        assert_eq!(json["data"]["fastest"]["value"], 480.0);
        assert_eq!(json["data"]["highest"]["value"], 39000.0);
    }
}
