//! JSON envelope shared by every API response.
//!
//! Success: `{ "data": ..., "meta": {...} }`.
//! Failure: `{ "error": { "code": "...", "message": "..." }, "meta": {...} }`.
//!
//! `meta` says which published snapshot answered the request, so a client
//! polling several routes can tell whether two answers came from the same
//! ingest cycle.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::StoreSnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotMeta {
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warming_up: Option<bool>,
}

impl SnapshotMeta {
    /// Meta for a response not tied to any snapshot.
    pub fn detached() -> Self {
        Self {
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
            snapshot_at: None,
            cycle: None,
            warming_up: None,
        }
    }

    pub fn of(snapshot: &StoreSnapshot) -> Self {
        Self {
            snapshot_at: Some(snapshot.taken_at),
            cycle: Some(snapshot.stats.cycles),
            warming_up: Some(snapshot.warming_up),
            ..Self::detached()
        }
    }
}

#[derive(Debug, Serialize)]
struct DataBody<T> {
    data: T,
    meta: SnapshotMeta,
}

/// 200 with `data` answered from `snapshot`.
pub fn respond<T: Serialize>(snapshot: &StoreSnapshot, data: T) -> Response {
    let body = DataBody {
        data,
        meta: SnapshotMeta::of(snapshot),
    };
    (StatusCode::OK, Json(body)).into_response()
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("no sighting for hex '{0}'")]
    UnknownHex(String),

    #[error("{0}")]
    UnknownDimension(String),
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
    meta: SnapshotMeta,
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::UnknownHex(_) => StatusCode::NOT_FOUND,
            Self::UnknownDimension(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownHex(_) => "NOT_FOUND",
            Self::UnknownDimension(_) => "BAD_REQUEST",
        }
    }

    pub fn respond_with(self, meta: SnapshotMeta) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
            },
            meta,
        };
        (self.status(), Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.respond_with(SnapshotMeta::detached())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinates;
    use crate::reference::ReferenceTables;
    use crate::rarity::RarityPolicy;
    use crate::store::SightingStore;
    use std::sync::Arc;

    async fn json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn snapshot() -> StoreSnapshot {
        SightingStore::new(
            Arc::new(ReferenceTables::new()),
            Coordinates::new(1.0, 104.0),
            RarityPolicy::default(),
        )
        .snapshot()
    }

    #[tokio::test]
    async fn test_meta_describes_snapshot() {
        let snapshot = snapshot();
        let resp = respond(&snapshot, serde_json::json!({"aircraft": 3}));
        assert_eq!(resp.status(), StatusCode::OK);

        let v = json(resp).await;
        assert_eq!(v["data"]["aircraft"], 3);
        assert_eq!(v["meta"]["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(v["meta"]["cycle"], 0);
        assert_eq!(v["meta"]["warming_up"], true);
        assert!(v["meta"]["snapshot_at"].is_string());
    }

    #[tokio::test]
    async fn test_detached_error_omits_snapshot_fields() {
        let resp = ApiError::UnknownDimension("unknown dimension 'colour'".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let v = json(resp).await;
        assert_eq!(v["error"]["code"], "BAD_REQUEST");
        assert_eq!(v["error"]["message"], "unknown dimension 'colour'");
        assert!(v["meta"]["timestamp"].is_string());
        assert!(v["meta"].get("snapshot_at").is_none());
    }

    #[tokio::test]
    async fn test_unknown_hex_is_not_found() {
        let resp = ApiError::UnknownHex("abc123".into()).respond_with(SnapshotMeta::of(&snapshot()));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let v = json(resp).await;
        assert_eq!(v["error"]["message"], "no sighting for hex 'abc123'");
        assert_eq!(v["meta"]["warming_up"], true);
    }
}
