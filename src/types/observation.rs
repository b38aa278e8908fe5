//! ADS-B snapshot payload types
//!
//! Field names follow the aggregator's v2 JSON (`gs`, `t`, `r`, `ownOp`, ...).
//! Everything is optional on the wire; the accessors below normalise the
//! awkward cases (blank flight numbers, `"ground"` altitudes, missing
//! positions).

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::geo::Coordinates;

/// Shown in status lines when the flight number was not transmitted.
/// Padded to the width of a typical callsign.
pub const FLIGHT_UNKNOWN_LABEL: &str = "unknown ";

/// Shown in status lines when no altitude was transmitted.
pub const ALTITUDE_UNKNOWN_LABEL: &str = "  n/a";

/// Barometric altitude as reported: feet, or a label such as `"ground"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Altitude {
    Feet(f64),
    Label(String),
}

/// One aircraft in one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AircraftObservation {
    /// 24-bit transponder address as hex; primary key for continuity
    #[serde(default)]
    pub hex: String,
    /// Callsign, often space padded, sometimes blank
    #[serde(default)]
    pub flight: String,
    #[serde(default)]
    pub alt_baro: Option<Altitude>,
    /// Ground speed (knots)
    #[serde(default, rename = "gs")]
    pub ground_speed: Option<f64>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    /// Seconds since the last message, relative to the batch's `now`
    #[serde(default)]
    pub seen: Option<f64>,
    /// Short type description, e.g. "BOEING 777-300ER"
    #[serde(default, rename = "desc")]
    pub description: Option<String>,
    /// Owner / operator free text
    #[serde(default, rename = "ownOp")]
    pub owner_operator: Option<String>,
    /// ICAO type designator
    #[serde(default, rename = "t")]
    pub type_code: Option<String>,
    #[serde(default, rename = "r")]
    pub registration: Option<String>,

    // Pass-through fields, not interpreted by the engine
    #[serde(default)]
    pub squawk: Option<String>,
    #[serde(default, rename = "category")]
    pub emitter_category: Option<String>,
    #[serde(default)]
    pub nav_heading: Option<f64>,
    #[serde(default)]
    pub true_heading: Option<f64>,
    #[serde(default)]
    pub track: Option<f64>,
}

impl AircraftObservation {
    /// Flight number with surrounding whitespace removed, `None` if blank.
    pub fn flight_number(&self) -> Option<&str> {
        let trimmed = self.flight.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Operator code derived from the flight number: whitespace trimmed and
    /// every digit removed ("SIA321 " -> "SIA"). `None` without a flight
    /// number or when nothing but digits remain.
    pub fn operator_code(&self) -> Option<String> {
        let code: String = self
            .flight_number()?
            .chars()
            .filter(|c| !c.is_ascii_digit())
            .collect();
        let code = code.trim().to_string();
        (!code.is_empty()).then_some(code)
    }

    pub fn registration(&self) -> Option<&str> {
        non_blank(self.registration.as_deref())
    }

    pub fn type_code(&self) -> Option<&str> {
        non_blank(self.type_code.as_deref())
    }

    pub fn description(&self) -> Option<&str> {
        non_blank(self.description.as_deref())
    }

    pub fn owner_operator(&self) -> Option<&str> {
        non_blank(self.owner_operator.as_deref())
    }

    /// Position, if both latitude and longitude were reported.
    pub fn position(&self) -> Option<Coordinates> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        }
    }

    /// Numeric barometric altitude; `"ground"` and missing values are `None`.
    pub fn numeric_altitude(&self) -> Option<f64> {
        match self.alt_baro {
            Some(Altitude::Feet(ft)) => Some(ft),
            _ => None,
        }
    }

    /// Altitude for display: five-wide feet, the raw label, or `n/a`.
    pub fn altitude_label(&self) -> String {
        match &self.alt_baro {
            Some(Altitude::Feet(ft)) => format!("{ft:5.0}"),
            Some(Altitude::Label(label)) => label.clone(),
            None => ALTITUDE_UNKNOWN_LABEL.to_string(),
        }
    }

    /// Wall-clock time of the last message, given the batch reference clock.
    ///
    /// A `seen` age that would land outside chrono's range yields `now`.
    pub fn seen_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let seen = self.seen.filter(|s| s.is_finite() && *s > 0.0).unwrap_or(0.0);
        #[allow(clippy::cast_possible_truncation)]
        let millis = (seen * 1000.0).round() as i64;
        TimeDelta::try_milliseconds(millis)
            .and_then(|age| now.checked_sub_signed(age))
            .unwrap_or(now)
    }

    /// One-line summary used in logs, summaries and the sighting record.
    ///
    /// `resolved_type` is used when the payload carries no short description.
    pub fn status_line(&self, distance_km: Option<f64>, resolved_type: Option<&str>) -> String {
        let distance = distance_km.map_or_else(|| " n/a".to_string(), |d| format!("{d:4.0}"));
        format!(
            "FNO {} DST {} km ALT {} SPD {:3.0} HDG {:3.0} TID {} ({})",
            self.flight_number().unwrap_or(FLIGHT_UNKNOWN_LABEL),
            distance,
            self.altitude_label(),
            self.ground_speed.unwrap_or(0.0),
            self.nav_heading.unwrap_or(0.0),
            self.description().or(resolved_type).unwrap_or("unknown"),
            self.registration().unwrap_or("unknown"),
        )
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// One snapshot as delivered by the aggregator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AircraftBatch {
    /// Generation time (ms since epoch)
    #[serde(default)]
    pub now: Option<f64>,
    #[serde(default, rename = "resultCount")]
    pub result_count: Option<u64>,
    /// Server processing time (ms)
    #[serde(default)]
    pub ptime: Option<f64>,
    #[serde(default, alias = "ac", deserialize_with = "null_as_empty")]
    pub aircraft: Vec<AircraftObservation>,
}

impl AircraftBatch {
    pub const fn new(aircraft: Vec<AircraftObservation>) -> Self {
        Self {
            now: None,
            result_count: None,
            ptime: None,
            aircraft,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }

    /// Generation time of the snapshot, when the payload carried one.
    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        #[allow(clippy::cast_possible_truncation)]
        self.now
            .filter(|ms| ms.is_finite())
            .and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<AircraftObservation>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<AircraftObservation>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(json: &str) -> AircraftObservation {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parses_wire_field_names() {
        let ac = observation(
            r#"{"hex":"76cdb4","flight":"SIA321  ","alt_baro":37000,"gs":480.5,
                "lat":1.5,"lon":104.1,"seen":1.2,"desc":"AIRBUS A-350-900",
                "ownOp":"Singapore Airlines","t":"A359","r":"9V-SMF","squawk":"2341",
                "category":"A5","nav_heading":123.0,"track":121.4}"#,
        );
        assert_eq!(ac.hex, "76cdb4");
        assert_eq!(ac.flight_number(), Some("SIA321"));
        assert_eq!(ac.numeric_altitude(), Some(37000.0));
        assert_eq!(ac.ground_speed, Some(480.5));
        assert_eq!(ac.type_code(), Some("A359"));
        assert_eq!(ac.registration(), Some("9V-SMF"));
        assert_eq!(ac.owner_operator(), Some("Singapore Airlines"));
        assert_eq!(ac.emitter_category.as_deref(), Some("A5"));
    }

    #[test]
    fn test_ground_altitude_is_not_numeric() {
        let ac = observation(r#"{"hex":"abc123","alt_baro":"ground"}"#);
        assert_eq!(ac.numeric_altitude(), None);
        assert_eq!(ac.altitude_label(), "ground");
    }

    #[test]
    fn test_missing_altitude_label() {
        let ac = observation(r#"{"hex":"abc123"}"#);
        assert_eq!(ac.altitude_label(), "  n/a");
    }

    #[test]
    fn test_operator_code_strips_digits_and_whitespace() {
        let ac = observation(r#"{"hex":"1","flight":" QTR8TK  "}"#);
        assert_eq!(ac.operator_code().as_deref(), Some("QTRTK"));

        let blank = observation(r#"{"hex":"1","flight":"        "}"#);
        assert_eq!(blank.flight_number(), None);
        assert_eq!(blank.operator_code(), None);

        let digits = observation(r#"{"hex":"1","flight":"1234"}"#);
        assert_eq!(digits.operator_code(), None);
    }

    #[test]
    fn test_position_requires_both_coordinates() {
        assert!(observation(r#"{"hex":"1","lat":1.0}"#).position().is_none());
        assert!(observation(r#"{"hex":"1","lat":1.0,"lon":2.0}"#).position().is_some());
    }

    #[test]
    fn test_seen_at_subtracts_offset() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let ac = observation(r#"{"hex":"1","seen":2.5}"#);
        assert_eq!((now - ac.seen_at(now)).num_milliseconds(), 2_500);
    }

    #[test]
    fn test_seen_at_out_of_range_falls_back_to_now() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        for seen in ["1e13", "1e300"] {
            let ac = observation(&format!(r#"{{"hex":"1","seen":{seen}}}"#));
            assert_eq!(ac.seen_at(now), now, "seen = {seen}");
        }
    }

    #[test]
    fn test_status_line_format() {
        let ac = observation(
            r#"{"hex":"1","flight":"SIA321  ","alt_baro":37000,"gs":480,"nav_heading":90,
                "r":"9V-SMF"}"#,
        );
        assert_eq!(
            ac.status_line(Some(12.4), Some("AIRBUS A-350-900")),
            "FNO SIA321 DST   12 km ALT 37000 SPD 480 HDG  90 TID AIRBUS A-350-900 (9V-SMF)"
        );
    }

    #[test]
    fn test_status_line_unknown_flight() {
        let ac = observation(r#"{"hex":"1"}"#);
        assert!(ac.status_line(None, None).starts_with("FNO unknown  DST  n/a km"));
    }

    #[test]
    fn test_batch_accepts_ac_alias_and_null() {
        let batch: AircraftBatch =
            serde_json::from_str(r#"{"now":1700000000000,"ac":[{"hex":"a"}]}"#).unwrap();
        assert_eq!(batch.aircraft.len(), 1);
        assert!(batch.generated_at().is_some());

        let empty: AircraftBatch = serde_json::from_str(r#"{"aircraft":null}"#).unwrap();
        assert!(empty.is_empty());
    }
}
