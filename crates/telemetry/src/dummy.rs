//! Static test game. Useful for exercising the assistant without a simulator.

use async_trait::async_trait;
use flightdeck_core::error::TelemetryError;
use flightdeck_core::snapshot::Snapshot;
use flightdeck_core::telemetry::TelemetrySource;
use serde_json::json;
use std::time::Duration;

use crate::refresher::{Capture, Refresher};

const ASSISTANT_CONTEXT: &str = "\
You are a virtual game assistant for a test game environment used to exercise \
the assistant itself.

The game data contains player position (x, y, z), health, energy and speed; \
environment time of day, weather and temperature; and the current score, level \
and objective.

Health is at most 100. Energy below 50 is low. Temperature is in Celsius. \
Give status updates, hints about the objective and strategy suggestions based \
on the player's state. The values stay mostly static.";

pub struct DummySource {
    refresher: Refresher,
}

impl DummySource {
    pub fn new() -> Self {
        Self {
            refresher: Refresher::new("dummy"),
        }
    }

    fn sample() -> Result<Capture, TelemetryError> {
        Ok(Capture::new(Snapshot::from_json(&json!({
            "player": {
                "position_x": 100.0,
                "position_y": 200.0,
                "position_z": 50.0,
                "health": 100,
                "energy": 85,
                "speed": 10.5
            },
            "environment": {
                "time_of_day": "day",
                "weather": "clear",
                "temperature": 22.5
            },
            "game_state": {
                "score": 1250,
                "level": 3,
                "objective": "Find the hidden treasure"
            }
        }))))
    }
}

impl Default for DummySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetrySource for DummySource {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn start(&self, interval: Duration) -> Result<(), TelemetryError> {
        self.refresher.start(interval, Self::sample)
    }

    fn fetch_snapshot(&self) -> Snapshot {
        self.refresher.latest().snapshot
    }

    fn assistant_context(&self) -> Option<String> {
        Some(ASSISTANT_CONTEXT.to_string())
    }

    fn stop(&self) {
        self.refresher.stop();
    }
}
