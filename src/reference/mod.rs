//! Reference Tables
//!
//! Static lookup data injected into the store at construction:
//!
//! | Table                 | Key                 | Value                      |
//! |-----------------------|---------------------|----------------------------|
//! | aircraft types        | ICAO type-code      | class, engine, model name  |
//! | operators             | 3-letter code       | company, country           |
//! | hex ranges            | address range       | country                    |
//! | registration prefixes | prefix              | country                    |
//! | military codes        | callsign code       | operator name              |
//!
//! ## Category Resolution
//!
//! This module also owns the fallback chains used by the classifier:
//!
//! - **Type**: type-code lookup; the canonical model name is tallied.
//! - **Operator** (flight number required): the derived code is looked up in
//!   the operator table, then the military table, then the broadcast
//!   owner/operator text is used.
//! - **Country**: operator table country for the derived code, then the
//!   hex-id range table, then registration prefixes (longest first).
//!   Always uppercased.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::types::AircraftObservation;

pub use loader::{load_reference_tables, ReferenceError};

// ============================================================================
// Table Records
// ============================================================================

/// Entry of the aircraft type table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AircraftType {
    /// Aircraft class, e.g. "L2J" (landplane, 2 engines, jet)
    pub class: String,
    /// Engine descriptor
    pub engine: String,
    /// "MANUFACTURER, model" as listed by ICAO
    pub model: String,
}

/// Entry of the operator (airline) table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRecord {
    pub company: String,
    pub country: String,
}

/// Transponder address block. Both bounds are excluded when matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexRange {
    pub lower: u64,
    pub upper: u64,
    pub country: String,
}

impl HexRange {
    pub const fn contains(&self, address: u64) -> bool {
        address > self.lower && address < self.upper
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationPrefix {
    pub prefix: String,
    pub country: String,
}

/// Where a resolved operator came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorSource {
    Airline,
    Military,
    OwnerField,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOperator {
    pub name: String,
    pub source: OperatorSource,
    /// Registered country, only known for [`OperatorSource::Airline`]
    pub country: Option<String>,
}

// ============================================================================
// Reference Tables
// ============================================================================

/// All five lookup tables.
///
/// Registration prefixes are kept ordered longest first so that "VH" wins
/// over "V" regardless of file order. Hex ranges keep file order and the
/// first containing range wins.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    types: HashMap<String, AircraftType>,
    operators: HashMap<String, OperatorRecord>,
    hex_ranges: Vec<HexRange>,
    registration_prefixes: Vec<RegistrationPrefix>,
    military_codes: HashMap<String, String>,
}

impl ReferenceTables {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    pub fn insert_type(&mut self, code: impl Into<String>, aircraft_type: AircraftType) {
        self.types.insert(code.into(), aircraft_type);
    }

    pub fn insert_operator(&mut self, code: impl Into<String>, record: OperatorRecord) {
        self.operators.insert(code.into(), record);
    }

    pub fn push_hex_range(&mut self, range: HexRange) {
        self.hex_ranges.push(range);
    }

    pub fn insert_registration_prefix(&mut self, prefix: impl Into<String>, country: impl Into<String>) {
        let prefix = prefix.into();
        let at = self
            .registration_prefixes
            .partition_point(|p| p.prefix.len() >= prefix.len());
        self.registration_prefixes.insert(
            at,
            RegistrationPrefix {
                prefix,
                country: country.into(),
            },
        );
    }

    pub fn insert_military_code(&mut self, code: impl Into<String>, operator: impl Into<String>) {
        self.military_codes.insert(code.into(), operator.into());
    }

    /// Shorthand used by tests and fixtures: type-code -> model name.
    #[must_use]
    pub fn with_type(mut self, code: &str, model: &str) -> Self {
        self.insert_type(
            code,
            AircraftType {
                class: String::new(),
                engine: String::new(),
                model: model.to_string(),
            },
        );
        self
    }

    #[must_use]
    pub fn with_operator(mut self, code: &str, company: &str, country: &str) -> Self {
        self.insert_operator(
            code,
            OperatorRecord {
                company: company.to_string(),
                country: country.to_string(),
            },
        );
        self
    }

    #[must_use]
    pub fn with_hex_range(mut self, lower: u64, upper: u64, country: &str) -> Self {
        self.push_hex_range(HexRange {
            lower,
            upper,
            country: country.to_string(),
        });
        self
    }

    #[must_use]
    pub fn with_registration_prefix(mut self, prefix: &str, country: &str) -> Self {
        self.insert_registration_prefix(prefix, country);
        self
    }

    #[must_use]
    pub fn with_military_code(mut self, code: &str, operator: &str) -> Self {
        self.insert_military_code(code, operator);
        self
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    pub fn aircraft_type(&self, code: &str) -> Option<&AircraftType> {
        self.types.get(code)
    }

    pub fn operator(&self, code: &str) -> Option<&OperatorRecord> {
        self.operators.get(code)
    }

    pub fn military_operator(&self, code: &str) -> Option<&str> {
        self.military_codes.get(code).map(String::as_str)
    }

    /// Country whose address block strictly contains `hex`.
    ///
    /// Fails only when `hex` is not a base-16 number.
    pub fn country_by_hex(&self, hex: &str) -> Result<Option<&str>, std::num::ParseIntError> {
        let address = parse_hex_id(hex)?;
        Ok(self
            .hex_ranges
            .iter()
            .find(|r| r.contains(address))
            .map(|r| r.country.as_str()))
    }

    /// Country of the longest registration prefix contained in `registration`.
    pub fn country_by_registration(&self, registration: &str) -> Option<&str> {
        self.registration_prefixes
            .iter()
            .find(|p| !p.prefix.is_empty() && registration.contains(p.prefix.as_str()))
            .map(|p| p.country.as_str())
    }

    pub fn sizes(&self) -> TableSizes {
        TableSizes {
            types: self.types.len(),
            operators: self.operators.len(),
            hex_ranges: self.hex_ranges.len(),
            registration_prefixes: self.registration_prefixes.len(),
            military_codes: self.military_codes.len(),
        }
    }

    // ------------------------------------------------------------------------
    // Category Resolution
    // ------------------------------------------------------------------------

    /// Canonical model name for the observation's type-code.
    pub fn resolve_type(&self, observation: &AircraftObservation) -> Option<&str> {
        let code = observation.type_code()?;
        self.aircraft_type(code)
            .map(|t| t.model.as_str())
            .filter(|m| !m.is_empty())
    }

    /// Operator via airline table, military table, then owner/operator text.
    ///
    /// Requires a flight number; aircraft without one stay unresolved.
    pub fn resolve_operator(&self, observation: &AircraftObservation) -> Option<ResolvedOperator> {
        observation.flight_number()?;

        if let Some(code) = observation.operator_code() {
            if let Some(record) = self.operator(&code).filter(|r| !r.company.is_empty()) {
                return Some(ResolvedOperator {
                    name: record.company.clone(),
                    source: OperatorSource::Airline,
                    country: Some(record.country.clone()),
                });
            }
            if let Some(name) = self.military_operator(&code).filter(|n| !n.is_empty()) {
                return Some(ResolvedOperator {
                    name: name.to_string(),
                    source: OperatorSource::Military,
                    country: None,
                });
            }
        }

        observation.owner_operator().map(|name| ResolvedOperator {
            name: name.to_string(),
            source: OperatorSource::OwnerField,
            country: None,
        })
    }

    /// Country via the airline that operates the flight, hex range, then
    /// registration prefix.
    pub fn resolve_country(&self, observation: &AircraftObservation) -> Option<String> {
        let from_operator = self
            .resolve_operator(observation)
            .filter(|op| op.source == OperatorSource::Airline)
            .and_then(|op| op.country)
            .filter(|c| !c.trim().is_empty());
        if let Some(country) = from_operator {
            return Some(country.trim().to_uppercase());
        }

        if !observation.hex.trim().is_empty() {
            match self.country_by_hex(&observation.hex) {
                Ok(Some(country)) if !country.trim().is_empty() => {
                    return Some(country.trim().to_uppercase());
                }
                Ok(_) => {}
                // Warned once per airframe by the store
                Err(e) => {
                    debug!(hex = %observation.hex, error = %e, "Unparseable hex id, skipping range lookup");
                }
            }
        }

        let from_registration = observation
            .registration()
            .and_then(|reg| self.country_by_registration(reg))
            .filter(|c| !c.trim().is_empty());
        if let Some(country) = from_registration {
            return Some(country.trim().to_uppercase());
        }

        debug!(hex = %observation.hex, "Country unresolved");
        None
    }
}

/// 24-bit ICAO address from its hex form. TIS-B ids such as `~1a2b3c`
/// are not addresses and fail.
pub fn parse_hex_id(hex: &str) -> Result<u64, std::num::ParseIntError> {
    u64::from_str_radix(hex.trim(), 16)
}

/// Row counts per table, logged after loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableSizes {
    pub types: usize,
    pub operators: usize,
    pub hex_ranges: usize,
    pub registration_prefixes: usize,
    pub military_codes: usize,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> ReferenceTables {
        ReferenceTables::new()
            .with_type("A359", "AIRBUS, A-350-900")
            .with_operator("SIA", "Singapore Airlines", "Singapore")
            .with_military_code("RCH", "United States Air Force")
            .with_hex_range(0x76_8000, 0x76_8FFF, "Singapore")
            .with_hex_range(0x7C_0000, 0x7F_FFFF, "Australia")
            .with_registration_prefix("V", "Generic")
            .with_registration_prefix("VH-", "Australia")
            .with_registration_prefix("9V-", "Singapore")
    }

    fn obs(hex: &str, flight: &str) -> AircraftObservation {
        AircraftObservation {
            hex: hex.to_string(),
            flight: flight.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_type_by_code() {
        let t = tables();
        let mut ac = obs("1", "");
        ac.type_code = Some("A359".to_string());
        assert_eq!(t.resolve_type(&ac), Some("AIRBUS, A-350-900"));

        ac.type_code = Some("ZZZZ".to_string());
        assert_eq!(t.resolve_type(&ac), None);

        ac.type_code = None;
        assert_eq!(t.resolve_type(&ac), None);
    }

    #[test]
    fn test_operator_chain_airline_first() {
        let r = tables().resolve_operator(&obs("1", "SIA321 ")).unwrap();
        assert_eq!(r.name, "Singapore Airlines");
        assert_eq!(r.source, OperatorSource::Airline);
    }

    #[test]
    fn test_operator_chain_military_second() {
        let r = tables().resolve_operator(&obs("1", "RCH123")).unwrap();
        assert_eq!(r.name, "United States Air Force");
        assert_eq!(r.source, OperatorSource::Military);
    }

    #[test]
    fn test_operator_chain_owner_field_last() {
        let mut ac = obs("1", "N123AB");
        ac.owner_operator = Some("Private Owner LLC".to_string());
        let r = tables().resolve_operator(&ac).unwrap();
        assert_eq!(r.name, "Private Owner LLC");
        assert_eq!(r.source, OperatorSource::OwnerField);
    }

    #[test]
    fn test_operator_requires_flight_number() {
        let mut ac = obs("1", "   ");
        ac.owner_operator = Some("Private Owner LLC".to_string());
        assert!(tables().resolve_operator(&ac).is_none());
    }

    #[test]
    fn test_country_from_operator_is_uppercased() {
        assert_eq!(
            tables().resolve_country(&obs("7c0001", "SIA1")).as_deref(),
            Some("SINGAPORE")
        );
    }

    #[test]
    fn test_military_operator_does_not_supply_country() {
        let airline = tables().resolve_operator(&obs("1", "SIA1")).unwrap();
        assert_eq!(airline.country.as_deref(), Some("Singapore"));

        // RCH resolves via the military table, so the hex range decides
        assert_eq!(
            tables().resolve_country(&obs("7c0001", "RCH1")).as_deref(),
            Some("AUSTRALIA")
        );
    }

    #[test]
    fn test_country_from_hex_range_without_flight() {
        assert_eq!(
            tables().resolve_country(&obs("7c1234", "")).as_deref(),
            Some("AUSTRALIA")
        );
    }

    #[test]
    fn test_hex_range_bounds_are_exclusive() {
        let t = tables();
        assert_eq!(t.country_by_hex("768000").unwrap(), None);
        assert_eq!(t.country_by_hex("768001").unwrap(), Some("Singapore"));
        assert_eq!(t.country_by_hex("768fff").unwrap(), None);
    }

    #[test]
    fn test_unparseable_hex_falls_through_to_registration() {
        let mut ac = obs("~xyz", "");
        ac.registration = Some("9V-SMF".to_string());
        assert_eq!(tables().resolve_country(&ac).as_deref(), Some("SINGAPORE"));
    }

    #[test]
    fn test_registration_prefix_longest_first() {
        let t = tables();
        assert_eq!(t.country_by_registration("VH-OQA"), Some("Australia"));
        assert_eq!(t.country_by_registration("VT-ANA"), Some("Generic"));
        assert_eq!(t.country_by_registration("N12345"), None);
    }

    #[test]
    fn test_country_unresolved() {
        assert_eq!(tables().resolve_country(&obs("000001", "")), None);
    }
}
