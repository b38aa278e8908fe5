//! System-wide default constants.
//!
//! Values that seed [`super::SpotterConfig`] defaults plus the fixed numbers
//! used by the pipeline and the aggregator client. Grouped by subsystem.

// ============================================================================
// Location
// ============================================================================

/// Default spotting location name (Singapore Changi).
pub const DEFAULT_LOCATION_NAME: &str = "SIN";

/// Latitude of Singapore Changi airport (decimal degrees).
pub const DEFAULT_LATITUDE: f64 = 1.359_297;

/// Longitude of Singapore Changi airport (decimal degrees).
pub const DEFAULT_LONGITUDE: f64 = 103.989_348;

// ============================================================================
// Rarity
// ============================================================================

/// Offset subtracted from `ln(total)` by the logarithmic policy.
///
/// With 6.0 nothing can be rare before roughly 1 100 sightings of a dimension.
pub const RARITY_LOG_OFFSET: f64 = 6.0;

/// Frequency below which a category is rare under the ratio policy.
pub const RARITY_RATIO_THRESHOLD: f64 = 0.001;

// ============================================================================
// Polling
// ============================================================================

/// Aircraft snapshot polling interval (seconds).
pub const AIRCRAFT_POLL_INTERVAL_SECS: u64 = 30;

/// Interval between periodic summaries (seconds). 3 600 = 1 hour.
pub const SUMMARY_INTERVAL_SECS: u64 = 3_600;

/// Warm-up period during which rarity events are tallied but not notified.
pub const WARMUP_SECS: u64 = 3_600;

/// HTTP request timeout towards the aggregator (seconds).
pub const REQUEST_TIMEOUT_SECS: u64 = 25;

/// Search radius around the spotting location (nautical miles).
pub const SEARCH_RADIUS_NM: u32 = 250;

/// Aggregator host serving the v2 ADS-B API.
pub const ADSB_API_HOST: &str = "opendata.adsb.fi";

/// Hosts the aggregator client is allowed to talk to.
pub const ALLOWED_API_HOSTS: &[&str] = &["opendata.adsb.fi"];

// ============================================================================
// Military Watch
// ============================================================================

/// Military feed polling interval (seconds). 900 = 15 minutes.
pub const MILITARY_POLL_INTERVAL_SECS: u64 = 900;

/// Delay before the first military poll so it never coincides with the
/// civilian poll (seconds).
pub const MILITARY_START_DELAY_SECS: u64 = 15;

/// Military aircraft further away than this are not reported (km).
pub const MILITARY_MAX_DISTANCE_KM: f64 = 1_000.0;

// ============================================================================
// Reference Data
// ============================================================================

/// Directory holding the reference CSV files.
pub const REFERENCE_DATA_DIR: &str = "./data";

pub const TYPE_TABLE_FILE: &str = "ICAOList.csv";
pub const OPERATOR_TABLE_FILE: &str = "Airlines.csv";
pub const HEX_RANGE_TABLE_FILE: &str = "ICAOHexRange.csv";
pub const REGISTRATION_PREFIX_TABLE_FILE: &str = "RegPrefixList.csv";
pub const MILITARY_CODE_TABLE_FILE: &str = "MilICAOOperatorLookUp.csv";

// ============================================================================
// Server
// ============================================================================

/// Bind address for the read-only snapshot API.
pub const SERVER_ADDR: &str = "127.0.0.1:8080";
