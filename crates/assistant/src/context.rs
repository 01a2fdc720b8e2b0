//! Telemetry context handed to the LLM with every question.

use crate::history::SnapshotHistory;
use crate::trend::TrendAnalyzer;

const HEADER: &str = "Current game data:";
const TRENDS_HEADER: &str = "Recent trends:";
const NO_DATA: &str = "No telemetry captured yet.";

/// Renders the latest snapshot and trend statements as prompt text.
#[derive(Debug, Clone, Default)]
pub struct ContextAssembler {
    trends: TrendAnalyzer,
}

impl ContextAssembler {
    pub fn new(trends: TrendAnalyzer) -> Self {
        Self { trends }
    }

    pub fn trends(&self) -> &TrendAnalyzer {
        &self.trends
    }

    pub fn build(&self, history: &SnapshotHistory) -> String {
        let Some(latest) = history.latest() else {
            return format!("{HEADER}\n{NO_DATA}");
        };

        let data = serde_json::to_string_pretty(&latest.to_json())
            .unwrap_or_else(|_| "{}".to_string());
        let mut context = format!("{HEADER}\n{data}");

        let trends = self.trends.analyze(history);
        if !trends.is_empty() {
            context.push_str("\n\n");
            context.push_str(TRENDS_HEADER);
            context.push('\n');
            context.push_str(&trends.join("\n"));
        }
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flightdeck_core::snapshot::{Snapshot, Value};
    use flightdeck_core::telemetry::TrendField;

    fn assembler() -> ContextAssembler {
        ContextAssembler::new(TrendAnalyzer::new(vec![TrendField::new(
            "altitude_ft",
            "Altitude",
            "feet",
            50.0,
        )]))
    }

    #[test]
    fn empty_history_says_so() {
        let context = assembler().build(&SnapshotHistory::new(10));
        assert_eq!(context, "Current game data:\nNo telemetry captured yet.");
    }

    #[test]
    fn latest_snapshot_is_pretty_json() {
        let mut history = SnapshotHistory::new(10);
        history.push(Snapshot::new([
            ("altitude_ft", Value::from(3000.0)),
            ("phase", Value::from("climb")),
        ]));

        let context = assembler().build(&history);
        assert!(context.starts_with("Current game data:\n{\n"));
        assert!(context.contains("\"altitude_ft\": 3000.0"));
        assert!(context.contains("\"phase\": \"climb\""));
        assert!(!context.contains("Recent trends:"));
    }

    #[test]
    fn trends_follow_the_data() {
        let mut history = SnapshotHistory::new(10);
        history.push(Snapshot::new([("altitude_ft", Value::from(3000.0))]));
        history.push(Snapshot::new([("altitude_ft", Value::from(3400.0))]));

        let context = assembler().build(&history);
        assert!(context.ends_with(
            "\n\nRecent trends:\nAltitude is increasing at 400.0 feet per update"
        ));
        assert!(context.contains("3400.0"));
        assert!(!context.contains("3000.0"));
    }
}
