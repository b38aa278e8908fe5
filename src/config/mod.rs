//! Spotter Configuration Module
//!
//! Provides the spotter configuration loaded from a TOML file: spotting
//! location, rarity policy, polling cadence, reference data paths and the
//! optional outer surfaces (API server, military watch).
//!
//! ## Loading Order
//!
//! 1. `AIRSPOTTR_CONFIG` environment variable (path to TOML file)
//! 2. `airspottr.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! // In main():
//! config::init(SpotterConfig::load());
//!
//! // Anywhere in the codebase:
//! let interval = config::get().polling.interval_secs;
//! ```

mod spotter_config;
pub mod defaults;
pub mod validation;

pub use spotter_config::*;

use std::sync::OnceLock;

/// Global spotter configuration, initialized once at startup.
static SPOTTER_CONFIG: OnceLock<SpotterConfig> = OnceLock::new();

/// Initialize the global spotter configuration.
///
/// Later calls are ignored with a warning.
pub fn init(config: SpotterConfig) {
    if SPOTTER_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get a reference to the global spotter configuration.
///
/// Falls back to built-in defaults when `init()` has not been called yet.
pub fn get() -> &'static SpotterConfig {
    SPOTTER_CONFIG.get_or_init(|| {
        tracing::warn!("config::get() called before config::init(), using defaults");
        SpotterConfig::default()
    })
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    SPOTTER_CONFIG.get().is_some()
}
