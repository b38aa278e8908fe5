//! Config validation: unknown-key detection with Levenshtein suggestions
//! and value range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use super::defaults::ALLOWED_API_HOSTS;
use super::{RarityPolicyKind, SpotterConfig};

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `SpotterConfig`.
///
/// Maintained by hand against the structs in `spotter_config.rs`.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [location]
        "location",
        "location.name",
        "location.latitude",
        "location.longitude",
        // [rarity]
        "rarity",
        "rarity.policy",
        "rarity.log_offset",
        "rarity.ratio_threshold",
        // [polling]
        "polling",
        "polling.interval_secs",
        "polling.summary_interval_secs",
        "polling.warmup_secs",
        "polling.request_timeout_secs",
        "polling.radius_nm",
        "polling.api_host",
        // [reference]
        "reference",
        "reference.data_dir",
        "reference.types_file",
        "reference.operators_file",
        "reference.hex_ranges_file",
        "reference.registration_prefixes_file",
        "reference.military_codes_file",
        // [notify]
        "notify",
        "notify.enabled",
        // [server]
        "server",
        "server.enabled",
        "server.addr",
        // [military]
        "military",
        "military.enabled",
        "military.interval_secs",
        "military.max_distance_km",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve to the alphabetically first key so suggestions are stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (levenshtein(unknown, k), *k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// Never fails on unknown keys; parse errors are left to serde.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Validate value ranges on a parsed `SpotterConfig`.
///
/// Returns (errors, warnings). Errors are impossible values that must
/// prevent startup; warnings are suspicious but not fatal.
pub fn validate_ranges(config: &SpotterConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let loc = &config.location;
    if !loc.latitude.is_finite() || !(-90.0..=90.0).contains(&loc.latitude) {
        errors.push(format!(
            "location.latitude = {} is outside [-90, 90]",
            loc.latitude
        ));
    }
    if !loc.longitude.is_finite() || !(-180.0..=180.0).contains(&loc.longitude) {
        errors.push(format!(
            "location.longitude = {} is outside [-180, 180]",
            loc.longitude
        ));
    }

    let rarity = &config.rarity;
    if !rarity.log_offset.is_finite() || rarity.log_offset < 0.0 {
        errors.push(format!(
            "rarity.log_offset = {} must be a finite number >= 0",
            rarity.log_offset
        ));
    }
    if !(rarity.ratio_threshold > 0.0 && rarity.ratio_threshold < 1.0) {
        errors.push(format!(
            "rarity.ratio_threshold = {} must be in (0, 1)",
            rarity.ratio_threshold
        ));
    }
    if rarity.policy == RarityPolicyKind::Ratio && rarity.ratio_threshold > 0.1 {
        warnings.push(ValidationWarning {
            field: "rarity.ratio_threshold".to_string(),
            message: format!(
                "rarity.ratio_threshold = {} will flag a large share of sightings as rare",
                rarity.ratio_threshold
            ),
            suggestion: None,
        });
    }

    let polling = &config.polling;
    for (name, value) in [
        ("polling.interval_secs", polling.interval_secs),
        ("polling.summary_interval_secs", polling.summary_interval_secs),
        ("polling.request_timeout_secs", polling.request_timeout_secs),
        ("military.interval_secs", config.military.interval_secs),
    ] {
        if value == 0 {
            errors.push(format!("{name} must be > 0"));
        }
    }
    if polling.radius_nm == 0 {
        errors.push("polling.radius_nm must be > 0".to_string());
    }
    if !ALLOWED_API_HOSTS.contains(&polling.api_host.as_str()) {
        errors.push(format!(
            "polling.api_host = '{}' is not an allowed host ({})",
            polling.api_host,
            ALLOWED_API_HOSTS.join(", ")
        ));
    }
    if polling.request_timeout_secs > polling.interval_secs {
        warnings.push(ValidationWarning {
            field: "polling.request_timeout_secs".to_string(),
            message: format!(
                "polling.request_timeout_secs ({}) exceeds polling.interval_secs ({}), requests may overlap ticks",
                polling.request_timeout_secs, polling.interval_secs
            ),
            suggestion: None,
        });
    }

    let mil_km = config.military.max_distance_km;
    if !mil_km.is_finite() || mil_km <= 0.0 {
        errors.push(format!("military.max_distance_km = {mil_km} must be > 0"));
    }

    if config.server.addr.parse::<std::net::SocketAddr>().is_err() {
        errors.push(format!(
            "server.addr = '{}' is not a valid socket address",
            config.server.addr
        ));
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
