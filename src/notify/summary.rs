//! Periodic summary text

use std::fmt::Write;

use crate::rarity::{CategoryCount, Summary};
use crate::store::ExtremeRecord;
use crate::types::Dimension;

const NO_RECORD: &str = "none yet";

fn dimension_heading(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Type => "aircraft",
        Dimension::Operator => "operator",
        Dimension::Country => "country",
    }
}

fn push_ranking(out: &mut String, dimension: Dimension, ranking: &[CategoryCount]) {
    let _ = writeln!(
        out,
        "Rarity from least to most common {}",
        dimension_heading(dimension)
    );
    for row in ranking {
        let _ = writeln!(out, "{:6} - {}", row.count, row.category);
    }
}

fn push_extreme(out: &mut String, heading: &str, record: Option<&ExtremeRecord>) {
    let _ = writeln!(out, "{heading}");
    let line = record.map_or_else(|| NO_RECORD.to_string(), ExtremeRecord::status_line);
    let _ = writeln!(out, "{line}");
}

/// Render the three rankings (least common first) and both extremes.
pub fn render_summary(summary: &Summary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Summary ===");
    let _ = writeln!(
        out,
        "{} - {} aircraft seen since start",
        summary.location, summary.sightings
    );
    for dimension in Dimension::ALL {
        push_ranking(&mut out, dimension, summary.ranking(dimension));
    }
    push_extreme(&mut out, "Fastest Aircraft:", summary.fastest.as_ref());
    push_extreme(&mut out, "Highest Aircraft:", summary.highest.as_ref());
    let _ = writeln!(out, "=== End Summary ===");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(category: &str, count: u64) -> CategoryCount {
        CategoryCount {
            category: category.to_string(),
            count,
        }
    }

    #[test]
    fn test_summary_layout() {
        let summary = Summary {
            generated_at: Utc::now(),
            location: "SIN".to_string(),
            types: vec![row("AIRBUS, A-380-800", 1), row("BOEING, 737-800", 12)],
            operators: vec![row("Qantas", 2)],
            countries: vec![],
            fastest: None,
            highest: None,
            sightings: 15,
        };

        let text = render_summary(&summary);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "=== Summary ===");
        assert_eq!(lines[1], "SIN - 15 aircraft seen since start");
        assert_eq!(lines[2], "Rarity from least to most common aircraft");
        assert_eq!(lines[3], "     1 - AIRBUS, A-380-800");
        assert_eq!(lines[4], "    12 - BOEING, 737-800");
        assert_eq!(lines[5], "Rarity from least to most common operator");
        assert_eq!(lines[6], "     2 - Qantas");
        assert_eq!(lines[7], "Rarity from least to most common country");
        assert_eq!(lines[8], "Fastest Aircraft:");
        assert_eq!(lines[9], "none yet");
        assert_eq!(lines[10], "Highest Aircraft:");
        assert_eq!(lines[11], "none yet");
        assert_eq!(lines.last(), Some(&"=== End Summary ==="));
    }
}
