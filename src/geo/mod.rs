//! Geospatial helpers
//!
//! Great-circle distance (haversine), initial bearing and the 32-point compass
//! rose used to describe where an aircraft is relative to the spotting
//! location.
//!
//! ## Conventions
//!
//! - All public inputs are decimal degrees (latitude north-positive,
//!   longitude east-positive).
//! - Bearings are true bearings in `[0, 360)` degrees, clockwise from north.
//! - [`GreatCircle`] stores the central angle so the caller picks the unit.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Constants
// ============================================================================

/// Mean Earth radius (km).
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Mean Earth radius (statute miles).
pub const EARTH_RADIUS_MILES: f64 = 3958.0;

/// Mean Earth radius (nautical miles).
pub const EARTH_RADIUS_NM: f64 = 3443.0;

/// Width of one of the 32 compass sectors (degrees).
pub const SECTOR_WIDTH_DEG: f64 = 360.0 / 32.0;

// ============================================================================
// Coordinates
// ============================================================================

/// A point on the Earth's surface in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other`.
    pub fn distance_to(&self, other: &Self) -> GreatCircle {
        distance(self, other)
    }

    /// Initial bearing from `self` towards `other`.
    pub fn bearing_to(&self, other: &Self) -> f64 {
        bearing(self, other)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3})", self.latitude, self.longitude)
    }
}

// ============================================================================
// Distance
// ============================================================================

/// Central angle between two points (radians).
///
/// Multiply by an Earth radius to obtain a length; the helper methods cover
/// the units used across the app.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GreatCircle {
    pub central_angle: f64,
}

impl GreatCircle {
    pub fn kilometers(&self) -> f64 {
        self.central_angle * EARTH_RADIUS_KM
    }

    pub fn miles(&self) -> f64 {
        self.central_angle * EARTH_RADIUS_MILES
    }

    pub fn nautical_miles(&self) -> f64 {
        self.central_angle * EARTH_RADIUS_NM
    }
}

/// Haversine great-circle distance between `from` and `to`.
pub fn distance(from: &Coordinates, to: &Coordinates) -> GreatCircle {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    GreatCircle { central_angle: c }
}

// ============================================================================
// Bearing
// ============================================================================

/// Initial bearing (forward azimuth) from `from` to `to`, in `[0, 360)`.
pub fn bearing(from: &Coordinates, to: &Coordinates) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let x = delta_lon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();

    normalize_degrees(x.atan2(y).to_degrees())
}

/// Wrap any angle into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

// ============================================================================
// Compass Sectors
// ============================================================================

/// One of the 32 points of the compass rose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompassSector {
    N,
    NbE,
    NNE,
    NEbN,
    NE,
    NEbE,
    ENE,
    EbN,
    E,
    EbS,
    ESE,
    SEbE,
    SE,
    SEbS,
    SSE,
    SbE,
    S,
    SbW,
    SSW,
    SWbS,
    SW,
    SWbW,
    WSW,
    WbS,
    W,
    WbN,
    WNW,
    NWbW,
    NW,
    NWbN,
    NNW,
    NbW,
}

impl CompassSector {
    /// All sectors, clockwise from north.
    pub const ALL: [Self; 32] = [
        Self::N,
        Self::NbE,
        Self::NNE,
        Self::NEbN,
        Self::NE,
        Self::NEbE,
        Self::ENE,
        Self::EbN,
        Self::E,
        Self::EbS,
        Self::ESE,
        Self::SEbE,
        Self::SE,
        Self::SEbS,
        Self::SSE,
        Self::SbE,
        Self::S,
        Self::SbW,
        Self::SSW,
        Self::SWbS,
        Self::SW,
        Self::SWbW,
        Self::WSW,
        Self::WbS,
        Self::W,
        Self::WbN,
        Self::WNW,
        Self::NWbW,
        Self::NW,
        Self::NWbN,
        Self::NNW,
        Self::NbW,
    ];

    /// Bucket a bearing into its sector.
    ///
    /// Sectors are centred on their named direction, so `N` covers
    /// `[354.375, 5.625)` and `NbE` starts at 5.625 degrees.
    pub fn from_bearing(bearing_deg: f64) -> Self {
        let shifted = normalize_degrees(bearing_deg + SECTOR_WIDTH_DEG / 2.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let index = (shifted / SECTOR_WIDTH_DEG).floor() as usize % Self::ALL.len();
        Self::ALL[index]
    }

    /// Centre bearing of the sector.
    pub fn center_degrees(self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let index = Self::ALL.iter().position(|s| *s == self).unwrap_or(0) as f64;
        index * SECTOR_WIDTH_DEG
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::N => "N",
            Self::NbE => "NbE",
            Self::NNE => "NNE",
            Self::NEbN => "NEbN",
            Self::NE => "NE",
            Self::NEbE => "NEbE",
            Self::ENE => "ENE",
            Self::EbN => "EbN",
            Self::E => "E",
            Self::EbS => "EbS",
            Self::ESE => "ESE",
            Self::SEbE => "SEbE",
            Self::SE => "SE",
            Self::SEbS => "SEbS",
            Self::SSE => "SSE",
            Self::SbE => "SbE",
            Self::S => "S",
            Self::SbW => "SbW",
            Self::SSW => "SSW",
            Self::SWbS => "SWbS",
            Self::SW => "SW",
            Self::SWbW => "SWbW",
            Self::WSW => "WSW",
            Self::WbS => "WbS",
            Self::W => "W",
            Self::WbN => "WbN",
            Self::WNW => "WNW",
            Self::NWbW => "NWbW",
            Self::NW => "NW",
            Self::NWbN => "NWbN",
            Self::NNW => "NNW",
            Self::NbW => "NbW",
        }
    }
}

impl fmt::Display for CompassSector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
