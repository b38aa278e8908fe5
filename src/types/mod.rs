//! Shared data structures for the sighting pipeline
//!
//! - `AircraftBatch` / `AircraftObservation`: the snapshot payload as received
//! - `AircraftSighting`: per-hex continuity record owned by the store
//! - `TrackedAircraft`: one entry of the current-traffic list
//! - `RarityFlag` / `RarityEvent`: classifier output handed to notifiers

mod observation;
mod rarity;
mod sighting;

pub use observation::*;
pub use rarity::*;
pub use sighting::*;
