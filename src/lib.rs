//! airspottr: ADS-B sighting aggregation and rarity classification
//!
//! Ingests periodic snapshots of nearby aircraft, keeps one continuity
//! record per airframe, and tallies aircraft type, operator and registration
//! country. A category that is still uncommon relative to everything tallied
//! in its dimension raises a rarity event.
//!
//! ## Architecture
//!
//! - **Store**: owns sightings, tallies, extremes and the warm-up flag
//! - **Rarity**: threshold policies, per-dimension tallies, rankings
//! - **Reference**: lookup tables and category resolution
//! - **Pipeline**: batch sources and the ingest loop
//! - **Notify**: message rendering and delivery
//! - **API / Military watch**: optional outer surfaces

pub mod api;
pub mod config;
pub mod geo;
pub mod military;
pub mod notify;
pub mod pipeline;
pub mod rarity;
pub mod reference;
pub mod store;
pub mod types;

pub use config::SpotterConfig;
pub use geo::{CompassSector, Coordinates};
pub use rarity::{RarityPolicy, Summary};
pub use reference::{load_reference_tables, ReferenceTables};
pub use store::{SightingStore, StoreSnapshot};
pub use types::{
    AircraftBatch, AircraftObservation, AircraftSighting, Dimension, RarityEvent, RarityFlag,
};
