//! Spotter Configuration - every tunable of the spotting engine as TOML values
//!
//! Each struct implements `Default` with the values from [`super::defaults`],
//! so running without a config file behaves exactly like the built-in setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults;
use crate::geo::Coordinates;
use crate::rarity::RarityPolicy;

/// Environment variable pointing at a config file.
pub const CONFIG_ENV_VAR: &str = "AIRSPOTTR_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "airspottr.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one spotting location.
///
/// Load with `SpotterConfig::load()` which searches:
/// 1. `$AIRSPOTTR_CONFIG` env var
/// 2. `./airspottr.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpotterConfig {
    /// Reference point all distances and bearings are measured from
    #[serde(default)]
    pub location: LocationConfig,

    /// Rarity threshold policy
    #[serde(default)]
    pub rarity: RarityConfig,

    /// Aggregator polling and timing
    #[serde(default)]
    pub polling: PollingConfig,

    /// Reference table locations
    #[serde(default)]
    pub reference: ReferenceConfig,

    /// Rarity notification delivery
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Read-only snapshot API
    #[serde(default)]
    pub server: ServerConfig,

    /// Military proximity watch
    #[serde(default)]
    pub military: MilitaryConfig,
}

impl SpotterConfig {
    /// Load configuration using the standard search order:
    /// 1. `$AIRSPOTTR_CONFIG` environment variable
    /// 2. `./airspottr.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), location = %config.location.name, "Loaded spotter config from AIRSPOTTR_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from AIRSPOTTR_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "AIRSPOTTR_CONFIG points to non-existent file, falling back");
            }
        }

        // 2. Check ./airspottr.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(location = %config.location.name, "Loaded spotter config from ./airspottr.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./airspottr.toml, using defaults");
                }
            }
        }

        // 3. Defaults
        info!("No airspottr.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config = Self::from_toml_str(&contents)
            .map_err(|e| match e {
                ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
                other => other,
            })?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are reported as warnings and never fail the load.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        // Two-pass: check for unknown keys first (warnings only)
        for w in &super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all values, collecting every problem before failing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (errors, warnings) = super::validation::validate_ranges(self);
        for w in &warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Apply command-line coordinate overrides on top of the loaded file.
    pub fn with_location_override(mut self, latitude: Option<f64>, longitude: Option<f64>) -> Self {
        if let Some(lat) = latitude {
            self.location.latitude = lat;
        }
        if let Some(lon) = longitude {
            self.location.longitude = lon;
        }
        self
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<String>),
}

fn format_validation_errors(errors: &[String]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Location
// ============================================================================

/// The spotting location. Shown in logs and summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Short name of the location (airport code or similar)
    #[serde(default = "default_location_name")]
    pub name: String,

    /// Latitude in decimal degrees, north positive
    #[serde(default = "default_latitude")]
    pub latitude: f64,

    /// Longitude in decimal degrees, east positive
    #[serde(default = "default_longitude")]
    pub longitude: f64,
}

fn default_location_name() -> String {
    defaults::DEFAULT_LOCATION_NAME.to_string()
}
const fn default_latitude() -> f64 {
    defaults::DEFAULT_LATITUDE
}
const fn default_longitude() -> f64 {
    defaults::DEFAULT_LONGITUDE
}

impl LocationConfig {
    pub const fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            name: default_location_name(),
            latitude: default_latitude(),
            longitude: default_longitude(),
        }
    }
}

// ============================================================================
// Rarity
// ============================================================================

/// Which threshold rule decides rarity. Applied to all three dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RarityPolicyKind {
    /// Rare iff `count < ln(total) - log_offset`
    #[default]
    Logarithmic,
    /// Rare iff `count / total < ratio_threshold`
    Ratio,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RarityConfig {
    #[serde(default)]
    pub policy: RarityPolicyKind,

    /// Offset for the logarithmic policy
    #[serde(default = "default_log_offset")]
    pub log_offset: f64,

    /// Frequency threshold for the ratio policy, in (0, 1)
    #[serde(default = "default_ratio_threshold")]
    pub ratio_threshold: f64,
}

const fn default_log_offset() -> f64 {
    defaults::RARITY_LOG_OFFSET
}
const fn default_ratio_threshold() -> f64 {
    defaults::RARITY_RATIO_THRESHOLD
}

impl RarityConfig {
    /// Build the runtime policy from the selected kind.
    pub fn policy(&self) -> RarityPolicy {
        match self.policy {
            RarityPolicyKind::Logarithmic => RarityPolicy::Logarithmic {
                offset: self.log_offset,
            },
            RarityPolicyKind::Ratio => RarityPolicy::Ratio {
                threshold: self.ratio_threshold,
            },
        }
    }
}

impl Default for RarityConfig {
    fn default() -> Self {
        Self {
            policy: RarityPolicyKind::default(),
            log_offset: default_log_offset(),
            ratio_threshold: default_ratio_threshold(),
        }
    }
}

// ============================================================================
// Polling
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds between aircraft snapshot requests
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Seconds between periodic summaries
    #[serde(default = "default_summary_interval_secs")]
    pub summary_interval_secs: u64,

    /// Seconds after start during which rarity events are not notified
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: u64,

    /// HTTP request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Search radius around the location (nautical miles)
    #[serde(default = "default_radius_nm")]
    pub radius_nm: u32,

    /// Aggregator host; must be on the allow-list
    #[serde(default = "default_api_host")]
    pub api_host: String,
}

const fn default_interval_secs() -> u64 {
    defaults::AIRCRAFT_POLL_INTERVAL_SECS
}
const fn default_summary_interval_secs() -> u64 {
    defaults::SUMMARY_INTERVAL_SECS
}
const fn default_warmup_secs() -> u64 {
    defaults::WARMUP_SECS
}
const fn default_request_timeout_secs() -> u64 {
    defaults::REQUEST_TIMEOUT_SECS
}
const fn default_radius_nm() -> u32 {
    defaults::SEARCH_RADIUS_NM
}
fn default_api_host() -> String {
    defaults::ADSB_API_HOST.to_string()
}

impl PollingConfig {
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub const fn summary_interval(&self) -> Duration {
        Duration::from_secs(self.summary_interval_secs)
    }

    pub const fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            summary_interval_secs: default_summary_interval_secs(),
            warmup_secs: default_warmup_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            radius_nm: default_radius_nm(),
            api_host: default_api_host(),
        }
    }
}

// ============================================================================
// Reference Tables
// ============================================================================

/// Where the five reference CSV files live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_types_file")]
    pub types_file: String,

    #[serde(default = "default_operators_file")]
    pub operators_file: String,

    #[serde(default = "default_hex_ranges_file")]
    pub hex_ranges_file: String,

    #[serde(default = "default_registration_prefixes_file")]
    pub registration_prefixes_file: String,

    #[serde(default = "default_military_codes_file")]
    pub military_codes_file: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(defaults::REFERENCE_DATA_DIR)
}
fn default_types_file() -> String {
    defaults::TYPE_TABLE_FILE.to_string()
}
fn default_operators_file() -> String {
    defaults::OPERATOR_TABLE_FILE.to_string()
}
fn default_hex_ranges_file() -> String {
    defaults::HEX_RANGE_TABLE_FILE.to_string()
}
fn default_registration_prefixes_file() -> String {
    defaults::REGISTRATION_PREFIX_TABLE_FILE.to_string()
}
fn default_military_codes_file() -> String {
    defaults::MILITARY_CODE_TABLE_FILE.to_string()
}

impl ReferenceConfig {
    pub fn types_path(&self) -> PathBuf {
        self.data_dir.join(&self.types_file)
    }

    pub fn operators_path(&self) -> PathBuf {
        self.data_dir.join(&self.operators_file)
    }

    pub fn hex_ranges_path(&self) -> PathBuf {
        self.data_dir.join(&self.hex_ranges_file)
    }

    pub fn registration_prefixes_path(&self) -> PathBuf {
        self.data_dir.join(&self.registration_prefixes_file)
    }

    pub fn military_codes_path(&self) -> PathBuf {
        self.data_dir.join(&self.military_codes_file)
    }
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            types_file: default_types_file(),
            operators_file: default_operators_file(),
            hex_ranges_file: default_hex_ranges_file(),
            registration_prefixes_file: default_registration_prefixes_file(),
            military_codes_file: default_military_codes_file(),
        }
    }
}

// ============================================================================
// Notify
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Emit rendered rarity messages on the console
    #[serde(default = "default_true")]
    pub enabled: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

// ============================================================================
// Server
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Serve the snapshot API. Also enabled by the `--api` CLI flag.
    #[serde(default)]
    pub enabled: bool,

    /// HTTP server bind address.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_server_addr(),
        }
    }
}

// ============================================================================
// Military Watch
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilitaryConfig {
    /// Poll the military feed. Also enabled by the `--military` CLI flag.
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between military feed requests
    #[serde(default = "default_military_interval_secs")]
    pub interval_secs: u64,

    /// Aircraft further away than this are left out of the report (km)
    #[serde(default = "default_military_max_distance_km")]
    pub max_distance_km: f64,
}

const fn default_military_interval_secs() -> u64 {
    defaults::MILITARY_POLL_INTERVAL_SECS
}
const fn default_military_max_distance_km() -> f64 {
    defaults::MILITARY_MAX_DISTANCE_KM
}

impl MilitaryConfig {
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for MilitaryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_military_interval_secs(),
            max_distance_km: default_military_max_distance_km(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
