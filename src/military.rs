//! Military Watch
//!
//! Independent of rarity: periodically fetches the worldwide military feed
//! and reports the military aircraft near the spotting location, nearest
//! first. Aircraft without a position, or with a (0, 0) placeholder, are
//! ignored.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::geo::Coordinates;
use crate::pipeline::AdsbClient;
use crate::reference::ReferenceTables;
use crate::store::parse_payload;
use crate::types::{AircraftBatch, AircraftObservation};

pub const REPORT_HEADER: &str = "Military aircraft in increasing distance from here:";

/// One military aircraft within range.
#[derive(Debug, Clone, PartialEq)]
pub struct MilitaryContact {
    pub distance_km: f64,
    pub position: Coordinates,
    pub observation: AircraftObservation,
    /// Model name from the type table
    pub model: Option<String>,
}

impl MilitaryContact {
    pub fn report_line(&self) -> String {
        let obs = &self.observation;
        format!(
            "({:5.1} Km) ALT {} SPD {:3.0} POS ({:7.3}, {:7.3}) HDG {:6.2} ID {:?} ({})",
            self.distance_km,
            obs.altitude_label(),
            obs.ground_speed.unwrap_or(0.0),
            self.position.latitude,
            self.position.longitude,
            obs.true_heading.unwrap_or(0.0),
            self.model.as_deref().unwrap_or_default(),
            obs.registration().unwrap_or_default(),
        )
    }
}

/// Military aircraft within `max_km` of `reference`, nearest first.
pub fn nearby_military(
    batch: &AircraftBatch,
    reference: Coordinates,
    max_km: f64,
    tables: &ReferenceTables,
) -> Vec<MilitaryContact> {
    let mut contacts: Vec<MilitaryContact> = batch
        .aircraft
        .iter()
        .filter_map(|obs| {
            let position = obs.position()?;
            if position.latitude == 0.0 && position.longitude == 0.0 {
                return None;
            }
            let distance_km = reference.distance_to(&position).kilometers();
            (distance_km <= max_km).then(|| MilitaryContact {
                distance_km,
                position,
                observation: obs.clone(),
                model: obs
                    .type_code()
                    .and_then(|code| tables.aircraft_type(code))
                    .map(|t| t.model.clone()),
            })
        })
        .collect();
    contacts.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    contacts
}

/// Header plus one line per contact; `None` when nothing is in range.
pub fn render_report(contacts: &[MilitaryContact]) -> Option<String> {
    if contacts.is_empty() {
        return None;
    }
    let mut out = String::from(REPORT_HEADER);
    out.push('\n');
    for contact in contacts {
        out.push_str(&contact.report_line());
        out.push('\n');
    }
    Some(out)
}

// ============================================================================
// Poll Task
// ============================================================================

/// Settings for [`run_military_watch`].
#[derive(Debug, Clone)]
pub struct MilitaryWatch {
    pub url: String,
    pub reference: Coordinates,
    pub max_distance_km: f64,
    pub start_delay: Duration,
    pub interval: Duration,
}

/// Poll the military feed until cancelled, printing a report each time
/// something is in range.
pub async fn run_military_watch(
    watch: MilitaryWatch,
    client: AdsbClient,
    tables: Arc<ReferenceTables>,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + watch.start_delay, watch.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        interval_secs = watch.interval.as_secs(),
        max_km = watch.max_distance_km,
        "🎖️ Military watch started"
    );

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let body = match client.fetch(&watch.url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %watch.url, error = %e, "Military fetch failed");
                continue;
            }
        };
        let batch = match parse_payload(&body) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, "Discarding malformed military payload");
                continue;
            }
        };

        let contacts = nearby_military(&batch, watch.reference, watch.max_distance_km, &tables);
        if let Some(report) = render_report(&contacts) {
            print!("{report}");
        }
    }
}
