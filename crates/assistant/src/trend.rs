//! Trend statements from the two most recent snapshots.

use flightdeck_core::telemetry::TrendField;
use std::collections::BTreeMap;
use tracing::debug;

use crate::history::SnapshotHistory;

/// Describes how tracked fields changed between the last two snapshots.
#[derive(Debug, Clone, Default)]
pub struct TrendAnalyzer {
    fields: Vec<TrendField>,
}

impl TrendAnalyzer {
    pub fn new(fields: Vec<TrendField>) -> Self {
        Self { fields }
    }

    /// Replace thresholds for matching keys. Keys the source does not track
    /// are ignored.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, f64>) -> Self {
        for (key, threshold) in overrides {
            match self.fields.iter_mut().find(|f| &f.key == key) {
                Some(field) => field.threshold = *threshold,
                None => debug!(key = %key, "Trend threshold override for untracked field"),
            }
        }
        self
    }

    pub fn fields(&self) -> &[TrendField] {
        &self.fields
    }

    /// One sentence per field whose change reaches its threshold, in field
    /// order. Fields missing from either snapshot or not numeric are skipped.
    pub fn analyze(&self, history: &SnapshotHistory) -> Vec<String> {
        let (Some(latest), Some(previous)) = (history.latest(), history.previous()) else {
            return Vec::new();
        };

        self.fields
            .iter()
            .filter_map(|field| {
                let delta = latest.number(&field.key)? - previous.number(&field.key)?;
                if delta == 0.0 || delta.abs() < field.threshold {
                    return None;
                }
                let direction = if delta > 0.0 { "increasing" } else { "decreasing" };
                Some(format!(
                    "{} is {direction} at {:.1} {} per update",
                    field.label,
                    delta.abs(),
                    field.unit
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flightdeck_core::snapshot::{Snapshot, Value};

    fn history(points: &[&[(&str, Value)]]) -> SnapshotHistory {
        let mut history = SnapshotHistory::new(10);
        for fields in points {
            history.push(Snapshot::new(fields.iter().cloned()));
        }
        history
    }

    fn altitude(threshold: f64) -> TrendAnalyzer {
        TrendAnalyzer::new(vec![TrendField::new("alt", "Altitude", "feet", threshold)])
    }

    #[test]
    fn needs_two_snapshots() {
        let one = history(&[&[("alt", Value::from(1000.0))]]);
        assert!(altitude(50.0).analyze(&one).is_empty());
        assert!(altitude(50.0).analyze(&SnapshotHistory::new(5)).is_empty());
    }

    #[test]
    fn reports_climb_above_threshold() {
        let h = history(&[&[("alt", Value::from(1000.0))], &[("alt", Value::from(1200.0))]]);
        for threshold in [0.0, 50.0, 200.0] {
            assert_eq!(
                altitude(threshold).analyze(&h),
                vec!["Altitude is increasing at 200.0 feet per update"]
            );
        }
        assert!(altitude(200.5).analyze(&h).is_empty());
    }

    #[test]
    fn reports_descent_with_magnitude() {
        let h = history(&[&[("alt", Value::from(5000.0))], &[("alt", Value::from(4874.75))]]);
        assert_eq!(
            altitude(50.0).analyze(&h),
            vec!["Altitude is decreasing at 125.2 feet per update"]
        );
    }

    #[test]
    fn unchanged_field_is_silent_even_at_zero_threshold() {
        let h = history(&[&[("alt", Value::from(1000.0))], &[("alt", Value::from(1000.0))]]);
        assert!(altitude(0.0).analyze(&h).is_empty());
    }

    #[test]
    fn skips_small_missing_and_text_fields() {
        let analyzer = TrendAnalyzer::new(vec![
            TrendField::new("alt", "Altitude", "feet", 50.0),
            TrendField::new("spd", "Airspeed", "knots", 5.0),
            TrendField::new("phase", "Phase", "", 0.0),
            TrendField::new("hdg", "Heading", "degrees", 1.0),
        ]);
        let h = history(&[
            &[("alt", Value::from(1000.0)), ("spd", Value::from(100.0)), ("phase", Value::from("climb"))],
            &[
                ("alt", Value::from(1020.0)),
                ("spd", Value::from(110.0)),
                ("phase", Value::from("cruise")),
                ("hdg", Value::from(90.0)),
            ],
        ]);
        assert_eq!(analyzer.analyze(&h), vec!["Airspeed is increasing at 10.0 knots per update"]);
    }

    #[test]
    fn overrides_replace_known_thresholds() {
        let mut overrides = BTreeMap::new();
        overrides.insert("alt".to_string(), 500.0);
        overrides.insert("unknown".to_string(), 1.0);

        let analyzer = altitude(50.0).with_overrides(&overrides);
        assert_eq!(analyzer.fields().len(), 1);
        assert_eq!(analyzer.fields()[0].threshold, 500.0);

        let h = history(&[&[("alt", Value::from(1000.0))], &[("alt", Value::from(1200.0))]]);
        assert!(analyzer.analyze(&h).is_empty());
    }
}
