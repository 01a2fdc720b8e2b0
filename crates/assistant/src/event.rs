//! Events the assistant loop reports while it runs.
//!
//! The loop itself never prints; a front end subscribes to these and
//! decides how to show them.

use flightdeck_core::telemetry::Priority;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantEvent {
    /// Telemetry capture is running and the loop has entered its first tick.
    Started { session_id: String, source: String },

    /// A snapshot was added to history.
    SnapshotCaptured { fields: usize },

    /// A warning was announced.
    Warning {
        key: String,
        message: String,
        priority: Priority,
    },

    /// The pilot said something.
    Heard { utterance: String },

    Reply { text: String },

    /// A turn could not be completed; the loop keeps going.
    TurnFailed { stage: String, error: String },

    Stopped { reason: String },
}

impl AssistantEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::SnapshotCaptured { .. } => "snapshot_captured",
            Self::Warning { .. } => "warning",
            Self::Heard { .. } => "heard",
            Self::Reply { .. } => "reply",
            Self::TurnFailed { .. } => "turn_failed",
            Self::Stopped { .. } => "stopped",
        }
    }
}
