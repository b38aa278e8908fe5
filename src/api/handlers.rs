//! API handlers
//!
//! Every handler loads the currently published [`StoreSnapshot`] once and
//! answers from it, so a response never mixes two ingest cycles.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::envelope::{respond, ApiError, SnapshotMeta};
use crate::geo::Coordinates;
use crate::notify::render_summary;
use crate::pipeline::SharedSnapshot;
use crate::rarity::{rank_by_rarity, CategoryCount, RarityPolicy, Summary};
use crate::store::{ExtremeRecord, IngestStats};
use crate::types::{AircraftSighting, Dimension, TrackedAircraft};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct ApiState {
    pub snapshot: SharedSnapshot,
    pub location: Arc<str>,
}

impl ApiState {
    pub fn new(snapshot: SharedSnapshot, location: &str) -> Self {
        Self {
            snapshot,
            location: Arc::from(location),
        }
    }
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DimensionTotals {
    pub total: u64,
    pub distinct: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub location: String,
    pub reference: Coordinates,
    pub policy: RarityPolicy,
    pub warming_up: bool,
    pub snapshot_at: DateTime<Utc>,
    pub sightings: usize,
    pub current_aircraft: usize,
    pub types: DimensionTotals,
    pub operators: DimensionTotals,
    pub countries: DimensionTotals,
    pub stats: IngestStats,
}

#[derive(Debug, Serialize)]
pub struct CurrentAircraft<'a> {
    pub status_line: String,
    #[serde(flatten)]
    pub aircraft: &'a TrackedAircraft,
}

#[derive(Debug, Serialize)]
pub struct ExtremesResponse<'a> {
    pub fastest: Option<&'a ExtremeRecord>,
    pub highest: Option<&'a ExtremeRecord>,
}

#[derive(Debug, Serialize)]
pub struct RarityResponse {
    pub dimension: Dimension,
    pub total: u64,
    /// Least common first
    pub ranking: Vec<CategoryCount>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub summary: Summary,
    pub text: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/status
pub async fn get_status(State(state): State<ApiState>) -> Response {
    let snapshot = state.snapshot.load();
    let totals = |dimension| {
        let tally = snapshot.tally(dimension);
        DimensionTotals {
            total: tally.total(),
            distinct: tally.distinct(),
        }
    };

    respond(&snapshot, StatusResponse {
        location: state.location.to_string(),
        reference: snapshot.reference,
        policy: snapshot.policy,
        warming_up: snapshot.warming_up,
        snapshot_at: snapshot.taken_at,
        sightings: snapshot.sightings.len(),
        current_aircraft: snapshot.current.len(),
        types: totals(Dimension::Type),
        operators: totals(Dimension::Operator),
        countries: totals(Dimension::Country),
        stats: snapshot.stats.clone(),
    })
}

/// GET /api/v1/sightings
pub async fn get_sightings(State(state): State<ApiState>) -> Response {
    let snapshot = state.snapshot.load();
    let sightings: Vec<&AircraftSighting> = snapshot.sightings.values().collect();
    respond(&snapshot, sightings)
}

/// GET /api/v1/sightings/:hex
pub async fn get_sighting(State(state): State<ApiState>, Path(hex): Path<String>) -> Response {
    let snapshot = state.snapshot.load();
    let key = hex.trim().to_ascii_lowercase();
    match snapshot.sightings.get(&key) {
        Some(sighting) => respond(&snapshot, sighting),
        None => ApiError::UnknownHex(key).respond_with(SnapshotMeta::of(&snapshot)),
    }
}

/// GET /api/v1/current
pub async fn get_current(State(state): State<ApiState>) -> Response {
    let snapshot = state.snapshot.load();
    let current: Vec<CurrentAircraft<'_>> = snapshot
        .current
        .iter()
        .map(|aircraft| CurrentAircraft {
            status_line: aircraft.status_line(),
            aircraft,
        })
        .collect();
    respond(&snapshot, current)
}

/// GET /api/v1/extremes
pub async fn get_extremes(State(state): State<ApiState>) -> Response {
    let snapshot = state.snapshot.load();
    respond(&snapshot, ExtremesResponse {
        fastest: snapshot.fastest.as_ref(),
        highest: snapshot.highest.as_ref(),
    })
}

/// GET /api/v1/rarity/:dimension
pub async fn get_rarity(
    State(state): State<ApiState>,
    Path(dimension): Path<String>,
) -> Response {
    let dimension = match Dimension::from_str(&dimension) {
        Ok(d) => d,
        Err(e) => return ApiError::UnknownDimension(e.to_string()).into_response(),
    };
    let snapshot = state.snapshot.load();
    let tally = snapshot.tally(dimension);
    respond(&snapshot, RarityResponse {
        dimension,
        total: tally.total(),
        ranking: rank_by_rarity(tally),
    })
}

/// GET /api/v1/summary
pub async fn get_summary(State(state): State<ApiState>) -> Response {
    let snapshot = state.snapshot.load();
    let summary = Summary::from_snapshot(&snapshot, &state.location);
    let text = render_summary(&summary);
    respond(&snapshot, SummaryResponse { summary, text })
}
