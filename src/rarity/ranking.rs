//! Least-common-first ranking of a tally and periodic summary shaping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RarityTally;
use crate::store::{ExtremeRecord, StoreSnapshot};
use crate::types::Dimension;

/// One row of a ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

/// Order a tally by ascending count. Ties are ordered by category name so
/// the output is stable across runs.
pub fn rank_by_rarity(tally: &RarityTally) -> Vec<CategoryCount> {
    let mut ranked: Vec<CategoryCount> = tally
        .iter()
        .map(|(category, count)| CategoryCount {
            category: category.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| a.count.cmp(&b.count).then_with(|| a.category.cmp(&b.category)));
    ranked
}

/// Everything the periodic summary reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub generated_at: DateTime<Utc>,
    pub location: String,
    pub types: Vec<CategoryCount>,
    pub operators: Vec<CategoryCount>,
    pub countries: Vec<CategoryCount>,
    pub fastest: Option<ExtremeRecord>,
    pub highest: Option<ExtremeRecord>,
    pub sightings: usize,
}

impl Summary {
    pub fn from_snapshot(snapshot: &StoreSnapshot, location: &str) -> Self {
        Self {
            generated_at: Utc::now(),
            location: location.to_string(),
            types: rank_by_rarity(snapshot.tally(Dimension::Type)),
            operators: rank_by_rarity(snapshot.tally(Dimension::Operator)),
            countries: rank_by_rarity(snapshot.tally(Dimension::Country)),
            fastest: snapshot.fastest.clone(),
            highest: snapshot.highest.clone(),
            sightings: snapshot.sightings.len(),
        }
    }

    pub fn ranking(&self, dimension: Dimension) -> &[CategoryCount] {
        match dimension {
            Dimension::Type => &self.types,
            Dimension::Operator => &self.operators,
            Dimension::Country => &self.countries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_ascending_by_count() {
        let mut tally = RarityTally::default();
        for category in ["B738", "B738", "B738", "A388", "A320", "A320"] {
            tally.record(category);
        }
        let ranked = rank_by_rarity(&tally);
        let order: Vec<_> = ranked.iter().map(|c| (c.category.as_str(), c.count)).collect();
        assert_eq!(order, vec![("A388", 1), ("A320", 2), ("B738", 3)]);
    }

    #[test]
    fn test_rank_ties_by_name() {
        let mut tally = RarityTally::default();
        for category in ["ZETA", "ALPHA", "MIKE"] {
            tally.record(category);
        }
        let names: Vec<_> = rank_by_rarity(&tally)
            .into_iter()
            .map(|c| c.category)
            .collect();
        assert_eq!(names, vec!["ALPHA", "MIKE", "ZETA"]);
    }

    #[test]
    fn test_rank_empty_tally() {
        assert!(rank_by_rarity(&RarityTally::default()).is_empty());
    }
}
