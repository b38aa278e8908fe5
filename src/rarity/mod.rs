//! Rarity Classifier
//!
//! Keeps one running tally per dimension (type, operator, country) and
//! decides, every time a category is counted, whether it is still rare
//! relative to everything counted so far in that dimension.
//!
//! ## Threshold Policies
//!
//! | Policy        | Rare iff                        |
//! |---------------|---------------------------------|
//! | `Logarithmic` | `count < ln(total) - offset`    |
//! | `Ratio`       | `count / total < threshold`     |
//!
//! The logarithmic bar grows with traffic volume, so early low-traffic
//! sightings are not flagged. One policy is chosen at startup and applied
//! to all three dimensions.
//!
//! Tallies only ever grow. There is no decay and no reset.

pub mod ranking;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::reference::ReferenceTables;
use crate::types::{AircraftObservation, AircraftSighting, Dimension};

pub use ranking::{rank_by_rarity, CategoryCount, Summary};

// ============================================================================
// Threshold Policy
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum RarityPolicy {
    Ratio { threshold: f64 },
    Logarithmic { offset: f64 },
}

impl Default for RarityPolicy {
    fn default() -> Self {
        Self::Logarithmic {
            offset: crate::config::defaults::RARITY_LOG_OFFSET,
        }
    }
}

impl RarityPolicy {
    /// Whether a category seen `count` times out of `total` is rare.
    ///
    /// An empty dimension has nothing rare in it.
    #[allow(clippy::cast_precision_loss)]
    pub fn is_rare(&self, count: u64, total: u64) -> bool {
        if total == 0 {
            return false;
        }
        let count = count as f64;
        let total = total as f64;
        match *self {
            Self::Ratio { threshold } => count / total < threshold,
            Self::Logarithmic { offset } => count < total.ln() - offset,
        }
    }
}

// ============================================================================
// Tallies
// ============================================================================

/// Category -> count for one dimension, plus the dimension total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RarityTally {
    counts: HashMap<String, u64>,
    total: u64,
}

impl RarityTally {
    /// Count one more sighting of `category`; returns its new count.
    pub fn record(&mut self, category: &str) -> u64 {
        let count = self.counts.entry(category.to_string()).or_insert(0);
        *count += 1;
        self.total += 1;
        *count
    }

    pub fn count(&self, category: &str) -> u64 {
        self.counts.get(category).copied().unwrap_or(0)
    }

    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct categories.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// The three tallies and the policy that judges them.
#[derive(Debug, Clone, Default)]
pub struct RarityClassifier {
    policy: RarityPolicy,
    types: RarityTally,
    operators: RarityTally,
    countries: RarityTally,
}

impl RarityClassifier {
    pub fn new(policy: RarityPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub const fn policy(&self) -> RarityPolicy {
        self.policy
    }

    pub const fn tally(&self, dimension: Dimension) -> &RarityTally {
        match dimension {
            Dimension::Type => &self.types,
            Dimension::Operator => &self.operators,
            Dimension::Country => &self.countries,
        }
    }

    fn tally_mut(&mut self, dimension: Dimension) -> &mut RarityTally {
        match dimension {
            Dimension::Type => &mut self.types,
            Dimension::Operator => &mut self.operators,
            Dimension::Country => &mut self.countries,
        }
    }

    /// Count `category` in `dimension` and judge it against the policy.
    pub fn observe(&mut self, dimension: Dimension, category: &str) -> bool {
        let policy = self.policy;
        let tally = self.tally_mut(dimension);
        let count = tally.record(category);
        let total = tally.total();
        let rare = policy.is_rare(count, total);
        debug!(
            dimension = %dimension,
            category,
            count,
            total,
            rare,
            "Rarity evaluated"
        );
        rare
    }

    /// Classify one dimension of one observation.
    ///
    /// Skipped (false, no tally change) when the sighting already holds a
    /// value for the dimension and this is not a new flight. Unresolvable
    /// categories are also false with no tally change. The resolved value,
    /// or `None`, is written into the sighting, so a new flight never
    /// inherits the previous flight's category.
    pub fn classify(
        &mut self,
        tables: &ReferenceTables,
        dimension: Dimension,
        observation: &AircraftObservation,
        sighting: &mut AircraftSighting,
        is_new_flight: bool,
    ) -> bool {
        let slot = match dimension {
            Dimension::Type => &mut sighting.type_desc,
            Dimension::Operator => &mut sighting.operator,
            Dimension::Country => &mut sighting.country,
        };
        if slot.is_some() && !is_new_flight {
            return false;
        }

        let resolved = match dimension {
            Dimension::Type => tables.resolve_type(observation).map(str::to_string),
            Dimension::Operator => tables.resolve_operator(observation).map(|op| op.name),
            Dimension::Country => tables.resolve_country(observation),
        };
        let Some(category) = resolved else {
            *slot = None;
            return false;
        };

        let rare = self.observe(dimension, &category);
        *slot = Some(category);
        rare
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_policy_boundary() {
        let policy = RarityPolicy::Ratio { threshold: 0.01 };
        // 1/100 == 0.01 is not strictly below the ratio
        assert!(!policy.is_rare(1, 100));
        assert!(policy.is_rare(1, 101));
    }

    #[test]
    fn test_log_policy_needs_traffic() {
        let policy = RarityPolicy::Logarithmic { offset: 6.0 };
        // ln(403) - 6 = -0.001: nothing can be rare yet
        assert!(!policy.is_rare(1, 403));
        // ln(1097) - 6 = 1.0003
        assert!(policy.is_rare(1, 1097));
        assert!(!policy.is_rare(2, 1097));
        // ln(8104) - 6 = 3.0
        assert!(policy.is_rare(2, 8104));
    }

    #[test]
    fn test_empty_dimension_is_never_rare() {
        assert!(!RarityPolicy::Ratio { threshold: 0.5 }.is_rare(0, 0));
        assert!(!RarityPolicy::default().is_rare(0, 0));
    }

    #[test]
    fn test_tally_counts_monotonically() {
        let mut tally = RarityTally::default();
        assert_eq!(tally.record("A"), 1);
        assert_eq!(tally.record("A"), 2);
        assert_eq!(tally.record("B"), 1);
        assert_eq!(tally.total(), 3);
        assert_eq!(tally.count("A"), 2);
        assert_eq!(tally.count("missing"), 0);
        assert_eq!(tally.distinct(), 2);
    }

    #[test]
    fn test_observe_uses_per_dimension_totals() {
        let mut classifier = RarityClassifier::new(RarityPolicy::Ratio { threshold: 0.5 });
        assert!(!classifier.observe(Dimension::Type, "B")); // 1/1
        assert!(!classifier.observe(Dimension::Type, "B")); // 2/2
        assert!(!classifier.observe(Dimension::Type, "B")); // 3/3
        assert!(classifier.observe(Dimension::Type, "A")); // 1/4
        // Operators have their own total
        assert!(!classifier.observe(Dimension::Operator, "A")); // 1/1
        assert_eq!(classifier.tally(Dimension::Type).total(), 4);
        assert_eq!(classifier.tally(Dimension::Operator).total(), 1);
        assert_eq!(classifier.tally(Dimension::Country).total(), 0);
    }

    fn observation(type_code: &str) -> AircraftObservation {
        AircraftObservation {
            hex: "abc123".to_string(),
            flight: "SIA1".to_string(),
            type_code: Some(type_code.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_classify_skips_resolved_dimension_on_same_flight() {
        let tables = ReferenceTables::new().with_type("A359", "AIRBUS, A-350-900");
        let mut classifier = RarityClassifier::new(RarityPolicy::Ratio { threshold: 0.5 });
        let mut sighting = AircraftSighting::new("abc123", chrono::Utc::now());
        let ac = observation("A359");

        classifier.classify(&tables, Dimension::Type, &ac, &mut sighting, true);
        assert_eq!(sighting.type_desc.as_deref(), Some("AIRBUS, A-350-900"));
        assert_eq!(classifier.tally(Dimension::Type).total(), 1);

        classifier.classify(&tables, Dimension::Type, &ac, &mut sighting, false);
        assert_eq!(classifier.tally(Dimension::Type).total(), 1);

        classifier.classify(&tables, Dimension::Type, &ac, &mut sighting, true);
        assert_eq!(classifier.tally(Dimension::Type).total(), 2);
    }

    #[test]
    fn test_classify_unresolved_leaves_tally_untouched() {
        let tables = ReferenceTables::new();
        let mut classifier = RarityClassifier::new(RarityPolicy::Ratio { threshold: 0.5 });
        let mut sighting = AircraftSighting::new("abc123", chrono::Utc::now());

        let rare = classifier.classify(
            &tables,
            Dimension::Type,
            &observation("ZZZZ"),
            &mut sighting,
            true,
        );
        assert!(!rare);
        assert!(sighting.type_desc.is_none());
        assert_eq!(classifier.tally(Dimension::Type).total(), 0);
    }
}
