//! Sighting Store
//!
//! The stateful core of the spotter. Owns one [`AircraftSighting`] per hex
//! id, the three rarity tallies, the fastest/highest records, the current
//! traffic list and the warm-up flag.
//!
//! ## Ingest Cycle
//!
//! `ingest` is the only mutating entry point. Observations are handled in
//! flight-number order (stable sort). For each one:
//!
//! 1. Resolve or create the sighting for the hex id
//! 2. Apply the flight-continuity rule (`is_new_flight`)
//! 3. Recompute distance, bearing and compass sector
//! 4. Classify type, operator and country
//! 5. Update the fastest/highest records
//! 6. Emit a [`RarityEvent`] when any dimension came out rare
//!
//! The store does no I/O and never suspends; the processing loop owns it
//! and publishes immutable [`StoreSnapshot`]s for every other reader.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::geo::{CompassSector, Coordinates};
use crate::rarity::{RarityClassifier, RarityPolicy, RarityTally};
use crate::reference::{parse_hex_id, ReferenceTables};
use crate::types::{
    AircraftBatch, AircraftObservation, AircraftSighting, Dimension, RarityEvent, RarityFlag,
    TrackedAircraft,
};

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("malformed aircraft payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a raw snapshot payload.
pub fn parse_payload(bytes: &[u8]) -> Result<AircraftBatch, PayloadError> {
    Ok(serde_json::from_slice(bytes)?)
}

// ============================================================================
// Records
// ============================================================================

/// An all-time record holder (fastest or highest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtremeRecord {
    pub hex: String,
    /// Ground speed (kt) or altitude (ft)
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
    pub aircraft: TrackedAircraft,
}

impl ExtremeRecord {
    pub fn status_line(&self) -> String {
        self.aircraft.status_line()
    }
}

/// Replace `slot` only when `value` strictly exceeds the held record.
fn consider_extreme(
    slot: &mut Option<ExtremeRecord>,
    value: Option<f64>,
    aircraft: &TrackedAircraft,
    hex: &str,
    now: DateTime<Utc>,
) -> bool {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return false;
    };
    if slot.as_ref().is_some_and(|held| value <= held.value) {
        return false;
    }
    *slot = Some(ExtremeRecord {
        hex: hex.to_string(),
        value,
        recorded_at: now,
        aircraft: aircraft.clone(),
    });
    true
}

/// Running counters, carried into every snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Non-empty batches ingested
    pub cycles: u64,
    pub observations: u64,
    pub rarity_events: u64,
    /// Observations without a hex id
    pub skipped_observations: u64,
    /// Airframes whose id is not a hex address (TIS-B `~` ids)
    pub non_icao_ids: u64,
    pub last_ingest: Option<DateTime<Utc>>,
}

// ============================================================================
// Snapshot
// ============================================================================

/// Immutable copy of everything queryable, published after each cycle.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSnapshot {
    pub taken_at: DateTime<Utc>,
    pub reference: Coordinates,
    pub policy: RarityPolicy,
    pub warming_up: bool,
    pub sightings: BTreeMap<String, AircraftSighting>,
    pub current: Vec<TrackedAircraft>,
    pub types: RarityTally,
    pub operators: RarityTally,
    pub countries: RarityTally,
    pub fastest: Option<ExtremeRecord>,
    pub highest: Option<ExtremeRecord>,
    pub stats: IngestStats,
}

impl StoreSnapshot {
    pub const fn tally(&self, dimension: Dimension) -> &RarityTally {
        match dimension {
            Dimension::Type => &self.types,
            Dimension::Operator => &self.operators,
            Dimension::Country => &self.countries,
        }
    }
}

// ============================================================================
// Sighting Store
// ============================================================================

pub struct SightingStore {
    tables: Arc<ReferenceTables>,
    reference: Coordinates,
    classifier: RarityClassifier,
    sightings: HashMap<String, AircraftSighting>,
    current: Vec<TrackedAircraft>,
    fastest: Option<ExtremeRecord>,
    highest: Option<ExtremeRecord>,
    warming_up: bool,
    stats: IngestStats,
}

impl SightingStore {
    /// Create an empty store measuring from `reference`.
    ///
    /// The store starts in warm-up.
    pub fn new(tables: Arc<ReferenceTables>, reference: Coordinates, policy: RarityPolicy) -> Self {
        Self {
            tables,
            reference,
            classifier: RarityClassifier::new(policy),
            sightings: HashMap::new(),
            current: Vec::new(),
            fastest: None,
            highest: None,
            warming_up: true,
            stats: IngestStats::default(),
        }
    }

    // ------------------------------------------------------------------------
    // Ingest
    // ------------------------------------------------------------------------

    /// Ingest a batch using the wall clock.
    pub fn ingest(&mut self, batch: AircraftBatch) -> Vec<RarityEvent> {
        self.ingest_at(batch, Utc::now())
    }

    /// Parse and ingest a raw payload. Malformed payloads are logged and
    /// treated as an empty batch.
    pub fn ingest_payload(&mut self, bytes: &[u8]) -> Vec<RarityEvent> {
        match parse_payload(bytes) {
            Ok(batch) => self.ingest(batch),
            Err(e) => {
                warn!(error = %e, bytes = bytes.len(), "Discarding malformed aircraft payload");
                Vec::new()
            }
        }
    }

    /// Ingest a batch against an explicit reference clock.
    ///
    /// An empty batch is a no-op: the current-traffic list keeps the last
    /// non-empty batch.
    pub fn ingest_at(&mut self, batch: AircraftBatch, now: DateTime<Utc>) -> Vec<RarityEvent> {
        if batch.is_empty() {
            return Vec::new();
        }

        let mut aircraft = batch.aircraft;
        aircraft.sort_by(|a, b| a.flight.trim().cmp(b.flight.trim()));

        let mut current = Vec::with_capacity(aircraft.len());
        let mut events = Vec::new();

        for observation in aircraft {
            let hex = observation.hex.trim().to_ascii_lowercase();
            if hex.is_empty() {
                debug!(flight = %observation.flight, "Skipping observation without hex id");
                self.stats.skipped_observations += 1;
                continue;
            }

            let (tracked, event) = self.process(hex, observation, now);
            if let Some(event) = event {
                events.push(event);
            }
            current.push(tracked);
        }

        self.stats.cycles += 1;
        self.stats.observations += current.len() as u64;
        self.stats.rarity_events += events.len() as u64;
        self.stats.last_ingest = Some(now);
        self.current = current;

        debug!(
            aircraft = self.current.len(),
            events = events.len(),
            sightings = self.sightings.len(),
            "Batch ingested"
        );

        events
    }

    fn process(
        &mut self,
        hex: String,
        observation: AircraftObservation,
        now: DateTime<Utc>,
    ) -> (TrackedAircraft, Option<RarityEvent>) {
        let seen_at = observation.seen_at(now);
        let is_first = !self.sightings.contains_key(&hex);
        if is_first {
            if let Err(e) = parse_hex_id(&hex) {
                warn!(hex = %hex, error = %e, "Hex id is not an ICAO address, country from registration only");
                self.stats.non_icao_ids += 1;
            }
        }
        let sighting = self
            .sightings
            .entry(hex.clone())
            .or_insert_with(|| AircraftSighting::new(hex.clone(), seen_at));

        sighting.last_seen = seen_at;
        if sighting.registration.is_none() {
            sighting.registration = observation.registration().map(str::to_string);
        }

        let is_new_flight = sighting.advance_flight(&observation, is_first);

        // Distance and sector are refreshed every cycle the position is known
        let mut distance_km = None;
        let mut sector = None;
        if let Some(position) = observation.position() {
            let km = self.reference.distance_to(&position).kilometers();
            let bearing = self.reference.bearing_to(&position);
            distance_km = Some(km);
            sector = Some(CompassSector::from_bearing(bearing));
            sighting.position = Some(position);
            sighting.distance_km = distance_km;
            sighting.bearing_deg = Some(bearing);
            sighting.sector = sector;
        }

        if sighting.type_short.is_none() {
            sighting.type_short = observation.description().map(str::to_string);
        }

        let tables = &self.tables;
        let mut outcome = [false; 3];
        for (slot, dimension) in outcome.iter_mut().zip(Dimension::ALL) {
            *slot = self.classifier.classify(
                tables,
                dimension,
                &observation,
                sighting,
                is_new_flight,
            );
        }
        let flag = RarityFlag::from_outcomes(outcome[0], outcome[1], outcome[2]);

        sighting.info = observation.status_line(distance_km, sighting.type_desc.as_deref());

        let tracked = TrackedAircraft {
            distance_km,
            sector,
            type_desc: sighting.type_desc.clone(),
            observation,
        };

        if consider_extreme(
            &mut self.fastest,
            tracked.observation.ground_speed,
            &tracked,
            &hex,
            now,
        ) {
            debug!(hex = %hex, speed_kt = ?tracked.observation.ground_speed, "New fastest aircraft");
        }
        if consider_extreme(
            &mut self.highest,
            tracked.observation.numeric_altitude(),
            &tracked,
            &hex,
            now,
        ) {
            debug!(hex = %hex, altitude_ft = ?tracked.observation.numeric_altitude(), "New highest aircraft");
        }

        let event = flag.is_rare().then(|| RarityEvent {
            flag,
            hex,
            sighting: sighting.clone(),
            observation: tracked.observation.clone(),
        });

        (tracked, event)
    }

    // ------------------------------------------------------------------------
    // Warm-up
    // ------------------------------------------------------------------------

    pub fn finish_warmup(&mut self) {
        if self.warming_up {
            self.warming_up = false;
            debug!(sightings = self.sightings.len(), "Warm-up finished");
        }
    }

    pub const fn is_warming_up(&self) -> bool {
        self.warming_up
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn sighting(&self, hex: &str) -> Option<&AircraftSighting> {
        self.sightings.get(&hex.trim().to_ascii_lowercase())
    }

    pub fn sightings(&self) -> impl Iterator<Item = &AircraftSighting> {
        self.sightings.values()
    }

    pub fn sighting_count(&self) -> usize {
        self.sightings.len()
    }

    pub fn current_aircraft(&self) -> &[TrackedAircraft] {
        &self.current
    }

    pub const fn tally(&self, dimension: Dimension) -> &RarityTally {
        self.classifier.tally(dimension)
    }

    pub const fn fastest(&self) -> Option<&ExtremeRecord> {
        self.fastest.as_ref()
    }

    pub const fn highest(&self) -> Option<&ExtremeRecord> {
        self.highest.as_ref()
    }

    pub const fn reference(&self) -> Coordinates {
        self.reference
    }

    pub const fn policy(&self) -> RarityPolicy {
        self.classifier.policy()
    }

    pub const fn stats(&self) -> &IngestStats {
        &self.stats
    }

    pub fn tables(&self) -> &ReferenceTables {
        &self.tables
    }

    /// Copy the queryable state for publication.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            taken_at: Utc::now(),
            reference: self.reference,
            policy: self.policy(),
            warming_up: self.warming_up,
            sightings: self
                .sightings
                .iter()
                .map(|(hex, s)| (hex.clone(), s.clone()))
                .collect(),
            current: self.current.clone(),
            types: self.tally(Dimension::Type).clone(),
            operators: self.tally(Dimension::Operator).clone(),
            countries: self.tally(Dimension::Country).clone(),
            fastest: self.fastest.clone(),
            highest: self.highest.clone(),
            stats: self.stats.clone(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Altitude;

    const SIN: Coordinates = Coordinates::new(1.359_297, 103.989_348);

    fn tables() -> Arc<ReferenceTables> {
        Arc::new(
            ReferenceTables::new()
                .with_type("B738", "BOEING, 737-800")
                .with_type("A388", "AIRBUS, A-380-800")
                .with_operator("SIA", "Singapore Airlines", "Singapore")
                .with_operator("QFA", "Qantas", "Australia")
                .with_hex_range(0x76_8000, 0x76_8FFF, "Singapore"),
        )
    }

    fn store(policy: RarityPolicy) -> SightingStore {
        SightingStore::new(tables(), SIN, policy)
    }

    fn ac(hex: &str, flight: &str, type_code: &str) -> AircraftObservation {
        AircraftObservation {
            hex: hex.to_string(),
            flight: flight.to_string(),
            type_code: Some(type_code.to_string()),
            lat: Some(1.5),
            lon: Some(104.0),
            ..Default::default()
        }
    }

    fn batch(aircraft: Vec<AircraftObservation>) -> AircraftBatch {
        AircraftBatch::new(aircraft)
    }

    #[test]
    fn test_new_store_is_empty_and_warming_up() {
        let store = store(RarityPolicy::default());
        assert!(store.is_warming_up());
        assert_eq!(store.sighting_count(), 0);
        assert!(store.fastest().is_none());
        assert!(store.current_aircraft().is_empty());
    }

    #[test]
    fn test_one_sighting_per_hex() {
        let mut store = store(RarityPolicy::default());
        store.ingest(batch(vec![ac("768001", "SIA1", "B738")]));
        store.ingest(batch(vec![ac("768001", "SIA1", "B738")]));
        store.ingest(batch(vec![ac("768001", "SIA2", "B738")]));
        assert_eq!(store.sighting_count(), 1);
        assert_eq!(store.sighting("768001").unwrap().flights_seen, 2);
    }

    #[test]
    fn test_rare_type_fires_once_per_flight() {
        let mut store = store(RarityPolicy::Ratio { threshold: 0.5 });
        let events = store.ingest(batch(vec![
            ac("000001", "", "B738"),
            ac("000002", "", "B738"),
            ac("000003", "", "B738"),
        ]));
        assert!(events.is_empty());

        let events = store.ingest(batch(vec![ac("000004", "", "A388")]));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].flag, RarityFlag::Type);
        assert_eq!(events[0].hex, "000004");
        assert_eq!(
            events[0].sighting.type_desc.as_deref(),
            Some("AIRBUS, A-380-800")
        );

        // Same flight seen again: no re-classification, no event
        let events = store.ingest(batch(vec![ac("000004", "", "A388")]));
        assert!(events.is_empty());
        assert_eq!(store.tally(Dimension::Type).count("AIRBUS, A-380-800"), 1);
    }

    #[test]
    fn test_late_callsign_does_not_reclassify() {
        let mut store = store(RarityPolicy::default());
        store.ingest(batch(vec![ac("768001", "", "B738")]));
        assert_eq!(store.tally(Dimension::Type).total(), 1);

        store.ingest(batch(vec![ac("768001", "SIA1", "B738")]));
        let sighting = store.sighting("768001").unwrap();
        assert_eq!(sighting.flight.as_deref(), Some("SIA1"));
        assert_eq!(store.tally(Dimension::Type).total(), 1);
        // Operator was never resolved, so it is classified now
        assert_eq!(sighting.operator.as_deref(), Some("Singapore Airlines"));
        assert_eq!(store.tally(Dimension::Operator).total(), 1);
    }

    #[test]
    fn test_new_flight_reclassifies() {
        let mut store = store(RarityPolicy::default());
        store.ingest(batch(vec![ac("768001", "SIA123", "B738")]));
        store.ingest(batch(vec![ac("768001", "QFA789", "B738")]));

        assert_eq!(store.tally(Dimension::Type).count("BOEING, 737-800"), 2);
        assert_eq!(store.tally(Dimension::Operator).count("Qantas"), 1);
        let sighting = store.sighting("768001").unwrap();
        assert_eq!(sighting.operator.as_deref(), Some("Qantas"));
        assert_eq!(sighting.country.as_deref(), Some("AUSTRALIA"));
    }

    #[test]
    fn test_unresolved_new_flight_clears_previous_categories() {
        let mut store = store(RarityPolicy::default());
        store.ingest(batch(vec![ac("a00001", "SIA1", "B738")]));
        let sighting = store.sighting("a00001").unwrap();
        assert_eq!(sighting.operator.as_deref(), Some("Singapore Airlines"));
        assert_eq!(sighting.country.as_deref(), Some("SINGAPORE"));

        store.ingest(batch(vec![ac("a00001", "ZZZ9", "B738")]));
        let sighting = store.sighting("a00001").unwrap();
        assert_eq!(sighting.operator, None);
        assert_eq!(sighting.country, None);
        assert_eq!(sighting.type_desc.as_deref(), Some("BOEING, 737-800"));

        // Same flight, operator text arrives later and is counted
        let mut late = ac("a00001", "ZZZ9", "B738");
        late.owner_operator = Some("Charter Co".to_string());
        store.ingest(batch(vec![late]));
        let sighting = store.sighting("a00001").unwrap();
        assert_eq!(sighting.operator.as_deref(), Some("Charter Co"));
        assert_eq!(store.tally(Dimension::Operator).count("Charter Co"), 1);
        assert_eq!(store.tally(Dimension::Operator).total(), 2);
    }

    #[test]
    fn test_non_icao_id_counted_once_per_airframe() {
        let mut store = store(RarityPolicy::default());
        for _ in 0..3 {
            store.ingest(batch(vec![ac("~1a2b3c", "", "B738"), ac("768001", "", "B738")]));
        }
        assert_eq!(store.stats().non_icao_ids, 1);
        assert_eq!(store.sighting("~1a2b3c").unwrap().country, None);
    }

    #[test]
    fn test_tallies_never_decrease() {
        let mut store = store(RarityPolicy::default());
        let mut last = 0;
        for i in 0..20 {
            let flight = format!("SIA{}", i % 3);
            store.ingest(batch(vec![ac("768001", &flight, "B738")]));
            let total = store.tally(Dimension::Type).total();
            assert!(total >= last);
            last = total;
        }
    }

    #[test]
    fn test_extremes_strictly_greater() {
        let mut store = store(RarityPolicy::default());
        let mut high = ac("000001", "", "B738");
        high.alt_baro = Some(Altitude::Feet(40_000.0));
        let mut lower = ac("000002", "", "B738");
        lower.alt_baro = Some(Altitude::Feet(35_000.0));
        let mut ground = ac("000003", "", "B738");
        ground.alt_baro = Some(Altitude::Label("ground".to_string()));

        store.ingest(batch(vec![high]));
        store.ingest(batch(vec![lower, ground]));
        let highest = store.highest().unwrap();
        assert_eq!(highest.hex, "000001");
        assert_eq!(highest.value, 40_000.0);

        // Equal value does not replace the holder
        let mut equal = ac("000004", "", "B738");
        equal.alt_baro = Some(Altitude::Feet(40_000.0));
        store.ingest(batch(vec![equal]));
        assert_eq!(store.highest().unwrap().hex, "000001");
    }

    #[test]
    fn test_fastest_ignores_missing_speed() {
        let mut store = store(RarityPolicy::default());
        let mut fast = ac("000001", "", "B738");
        fast.ground_speed = Some(510.0);
        store.ingest(batch(vec![fast, ac("000002", "", "B738")]));
        assert_eq!(store.fastest().unwrap().hex, "000001");
    }

    #[test]
    fn test_distance_and_sector_updated_each_cycle() {
        let mut store = store(RarityPolicy::default());
        let mut north = ac("000001", "", "B738");
        north.lat = Some(2.359_297);
        north.lon = Some(103.989_348);
        store.ingest(batch(vec![north]));
        let s = store.sighting("000001").unwrap();
        assert_eq!(s.sector, Some(CompassSector::N));
        assert!((s.distance_km.unwrap() - 111.19).abs() < 0.1);

        let mut east = ac("000001", "", "B738");
        east.lat = Some(1.359_297);
        east.lon = Some(104.989_348);
        store.ingest(batch(vec![east]));
        assert_eq!(store.sighting("000001").unwrap().sector, Some(CompassSector::E));
    }

    #[test]
    fn test_missing_position_keeps_last_known() {
        let mut store = store(RarityPolicy::default());
        store.ingest(batch(vec![ac("000001", "", "B738")]));
        let mut blind = ac("000001", "", "B738");
        blind.lat = None;
        blind.lon = None;
        store.ingest(batch(vec![blind]));
        assert!(store.sighting("000001").unwrap().distance_km.is_some());
        assert!(store.current_aircraft()[0].distance_km.is_none());
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut store = store(RarityPolicy::default());
        store.ingest(batch(vec![ac("000001", "", "B738")]));
        let before = store.snapshot();
        assert!(store.ingest(batch(vec![])).is_empty());
        assert_eq!(store.current_aircraft().len(), 1);
        assert_eq!(store.stats(), &before.stats);
    }

    #[test]
    fn test_malformed_payload_is_noop() {
        let mut store = store(RarityPolicy::default());
        assert!(store.ingest_payload(b"{not json").is_empty());
        assert_eq!(store.sighting_count(), 0);
        assert_eq!(store.stats().cycles, 0);
    }

    #[test]
    fn test_ingest_payload_parses_wire_format() {
        let mut store = store(RarityPolicy::default());
        let payload = br#"{"now":1700000000000,"resultCount":1,"ptime":3,
            "aircraft":[{"hex":"768001","flight":"SIA321  ","t":"B738","alt_baro":"ground"}]}"#;
        store.ingest_payload(payload);
        let s = store.sighting("768001").unwrap();
        assert_eq!(s.type_desc.as_deref(), Some("BOEING, 737-800"));
        assert_eq!(s.country.as_deref(), Some("SINGAPORE"));
        assert!(store.highest().is_none());
    }

    #[test]
    fn test_absurd_seen_age_does_not_abort_ingest() {
        let mut store = store(RarityPolicy::default());
        store.ingest_payload(
            br#"{"now":1700000000000,"aircraft":[{"hex":"768001","flight":"SIA1","seen":1e13}]}"#,
        );
        let s = store.sighting("768001").unwrap();
        assert_eq!(s.operator.as_deref(), Some("Singapore Airlines"));
        assert_eq!(store.stats().cycles, 1);
    }

    #[test]
    fn test_batch_processed_in_flight_order() {
        let mut store = store(RarityPolicy::default());
        store.ingest(batch(vec![
            ac("000003", "ZZZ1", "B738"),
            ac("000001", "AAA1", "B738"),
            ac("000002", "", "B738"),
        ]));
        let order: Vec<_> = store
            .current_aircraft()
            .iter()
            .map(|t| t.observation.hex.as_str())
            .collect();
        assert_eq!(order, vec!["000002", "000001", "000003"]);
    }

    #[test]
    fn test_observation_without_hex_is_skipped() {
        let mut store = store(RarityPolicy::default());
        store.ingest(batch(vec![ac("", "SIA1", "B738"), ac("000001", "", "B738")]));
        assert_eq!(store.sighting_count(), 1);
        assert_eq!(store.stats().skipped_observations, 1);
    }

    #[test]
    fn test_warmup_flag() {
        let mut store = store(RarityPolicy::default());
        store.finish_warmup();
        assert!(!store.is_warming_up());
        assert!(!store.snapshot().warming_up);
    }
}
