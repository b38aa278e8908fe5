//! Rarity dimensions, combined rarity flags and emitted events

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{AircraftObservation, AircraftSighting};

/// One of the three independent axes along which rarity is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Type,
    Operator,
    Country,
}

impl Dimension {
    pub const ALL: [Self; 3] = [Self::Type, Self::Operator, Self::Country];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Operator => "operator",
            Self::Country => "country",
        }
    }

    /// Bit contributed to a [`RarityFlag`].
    pub const fn bit(self) -> u8 {
        match self {
            Self::Type => 0b001,
            Self::Operator => 0b010,
            Self::Country => 0b100,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown rarity dimension '{0}', expected one of: type, operator, country")]
pub struct UnknownDimension(pub String);

impl FromStr for Dimension {
    type Err = UnknownDimension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "type" => Ok(Self::Type),
            "operator" => Ok(Self::Operator),
            "country" => Ok(Self::Country),
            _ => Err(UnknownDimension(s.to_string())),
        }
    }
}

/// Which dimensions crossed the rarity threshold for one observation.
///
/// Closed set of the eight combinations; bit values are type = 1,
/// operator = 2, country = 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RarityFlag {
    None,
    Type,
    Operator,
    Country,
    TypeAndOperator,
    TypeAndCountry,
    OperatorAndCountry,
    Trifecta,
}

impl RarityFlag {
    /// Combine the three per-dimension outcomes.
    pub const fn from_outcomes(rare_type: bool, rare_operator: bool, rare_country: bool) -> Self {
        match (rare_type, rare_operator, rare_country) {
            (false, false, false) => Self::None,
            (true, false, false) => Self::Type,
            (false, true, false) => Self::Operator,
            (false, false, true) => Self::Country,
            (true, true, false) => Self::TypeAndOperator,
            (true, false, true) => Self::TypeAndCountry,
            (false, true, true) => Self::OperatorAndCountry,
            (true, true, true) => Self::Trifecta,
        }
    }

    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits > 0b111 {
            return None;
        }
        Some(Self::from_outcomes(
            bits & 0b001 != 0,
            bits & 0b010 != 0,
            bits & 0b100 != 0,
        ))
    }

    pub const fn bits(self) -> u8 {
        match self {
            Self::None => 0b000,
            Self::Type => 0b001,
            Self::Operator => 0b010,
            Self::Country => 0b100,
            Self::TypeAndOperator => 0b011,
            Self::TypeAndCountry => 0b101,
            Self::OperatorAndCountry => 0b110,
            Self::Trifecta => 0b111,
        }
    }

    pub const fn is_rare(self) -> bool {
        !matches!(self, Self::None)
    }

    pub const fn contains(self, dimension: Dimension) -> bool {
        self.bits() & dimension.bit() != 0
    }
}

impl fmt::Display for RarityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Type => "type",
            Self::Operator => "operator",
            Self::Country => "country",
            Self::TypeAndOperator => "type+operator",
            Self::TypeAndCountry => "type+country",
            Self::OperatorAndCountry => "operator+country",
            Self::Trifecta => "trifecta",
        };
        f.write_str(s)
    }
}

/// Emitted by an ingest cycle for every observation with a rare dimension.
///
/// Carries copies so the event outlives the next mutation of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RarityEvent {
    pub flag: RarityFlag,
    pub hex: String,
    pub sighting: AircraftSighting,
    pub observation: AircraftObservation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_outcomes_covers_all_eight_states() {
        for bits in 0u8..8 {
            let flag = RarityFlag::from_bits(bits).unwrap();
            assert_eq!(flag.bits(), bits);
        }
        assert_eq!(RarityFlag::from_bits(8), None);
    }

    #[test]
    fn test_bit_values() {
        assert_eq!(RarityFlag::from_outcomes(true, false, false).bits(), 1);
        assert_eq!(RarityFlag::from_outcomes(false, true, false).bits(), 2);
        assert_eq!(RarityFlag::from_outcomes(false, false, true).bits(), 4);
        assert_eq!(
            RarityFlag::from_outcomes(true, true, true),
            RarityFlag::Trifecta
        );
    }

    #[test]
    fn test_contains_dimension() {
        let flag = RarityFlag::TypeAndCountry;
        assert!(flag.contains(Dimension::Type));
        assert!(!flag.contains(Dimension::Operator));
        assert!(flag.contains(Dimension::Country));
        assert!(!RarityFlag::None.is_rare());
    }

    #[test]
    fn test_dimension_from_str() {
        assert_eq!("Operator".parse::<Dimension>(), Ok(Dimension::Operator));
        assert!("airline".parse::<Dimension>().is_err());
    }
}
