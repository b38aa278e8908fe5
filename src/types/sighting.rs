//! Per-aircraft continuity record and current-traffic entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AircraftObservation;
use crate::geo::{CompassSector, Coordinates};

/// Rendered in place of any unresolved field.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Everything the store remembers about one hex id.
///
/// Created on the first observation and mutated in place afterwards; never
/// replaced. Resolved categories stay `None` until a lookup succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftSighting {
    pub hex: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Last known flight number; a change marks a new flight
    pub flight: Option<String>,
    pub registration: Option<String>,
    pub position: Option<Coordinates>,
    /// Distance from the spotting location (km)
    pub distance_km: Option<f64>,
    /// Bearing from the spotting location (degrees)
    pub bearing_deg: Option<f64>,
    pub sector: Option<CompassSector>,
    /// Short description as broadcast, kept for display
    pub type_short: Option<String>,
    /// Manufacturer and model from the type table
    pub type_desc: Option<String>,
    pub operator: Option<String>,
    pub country: Option<String>,
    /// Number of distinct flights observed for this airframe
    pub flights_seen: u32,
    /// Latest status line
    pub info: String,
}

impl AircraftSighting {
    pub fn new(hex: impl Into<String>, seen_at: DateTime<Utc>) -> Self {
        Self {
            hex: hex.into(),
            first_seen: seen_at,
            last_seen: seen_at,
            flight: None,
            registration: None,
            position: None,
            distance_km: None,
            bearing_deg: None,
            sector: None,
            type_short: None,
            type_desc: None,
            operator: None,
            country: None,
            flights_seen: 0,
            info: String::new(),
        }
    }

    /// Apply the flight-continuity rule and report whether this observation
    /// starts a new flight.
    ///
    /// A previously unknown flight number becoming known is recorded but is
    /// not a new flight. Two known, different flight numbers are.
    pub fn advance_flight(&mut self, observation: &AircraftObservation, is_first: bool) -> bool {
        let observed = observation.flight_number();
        let changed = match (self.flight.as_deref(), observed) {
            (None, Some(_)) => {
                self.flight = observed.map(str::to_string);
                false
            }
            (Some(previous), Some(current)) if previous != current => {
                self.flight = Some(current.to_string());
                true
            }
            _ => false,
        };

        let is_new_flight = is_first || changed;
        if is_new_flight {
            self.flights_seen += 1;
        }
        is_new_flight
    }

    /// Short description if broadcast, else the resolved model name.
    pub fn display_type(&self) -> &str {
        self.type_short
            .as_deref()
            .or(self.type_desc.as_deref())
            .unwrap_or(UNKNOWN_LABEL)
    }

    pub fn type_label(&self) -> &str {
        label(self.type_desc.as_deref())
    }

    pub fn operator_label(&self) -> &str {
        label(self.operator.as_deref())
    }

    pub fn country_label(&self) -> &str {
        label(self.country.as_deref())
    }

    pub fn registration_label(&self) -> &str {
        label(self.registration.as_deref())
    }

    pub fn flight_label(&self) -> &str {
        label(self.flight.as_deref())
    }

    pub fn sector_label(&self) -> &str {
        self.sector.map_or("?", CompassSector::as_str)
    }
}

fn label(value: Option<&str>) -> &str {
    value.unwrap_or(UNKNOWN_LABEL)
}

/// One entry of the current-traffic list (the latest non-empty batch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedAircraft {
    pub observation: AircraftObservation,
    pub distance_km: Option<f64>,
    pub sector: Option<CompassSector>,
    /// Resolved model name, if the type table knows it
    pub type_desc: Option<String>,
}

impl TrackedAircraft {
    pub fn status_line(&self) -> String {
        self.observation
            .status_line(self.distance_km, self.type_desc.as_deref())
    }
}
