//! Telemetry source registry: picks a source by game name.

use flightdeck_core::error::TelemetryError;
use flightdeck_core::telemetry::TelemetrySource;

use crate::dummy::DummySource;
use crate::flight::FlightSource;

/// Options applied when constructing a source.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    /// Warnings forced on for the whole session (flight only)
    pub faults: Vec<String>,
}

/// Names accepted by [`create_source`], with a short description each.
pub const GAMES: &[(&str, &str)] = &[
    ("dummy", "static test game, no warnings"),
    ("flight", "synthetic light aircraft with trends and warnings"),
    ("msfs", "Microsoft Flight Simulator (requires a SimConnect bridge)"),
    ("iracing", "iRacing (not yet implemented)"),
];

/// Build the telemetry source for `game`.
///
/// An empty name selects the dummy game.
pub fn create_source(
    game: &str,
    options: &SourceOptions,
) -> Result<Box<dyn TelemetrySource>, TelemetryError> {
    let game = game.trim().to_ascii_lowercase();

    if !options.faults.is_empty() && game != "flight" {
        return Err(TelemetryError::UnknownWarning {
            source_name: game,
            key: options.faults.join(", "),
        });
    }

    match game.as_str() {
        "" | "dummy" => Ok(Box::new(DummySource::new())),
        "flight" => Ok(Box::new(FlightSource::new().with_faults(&options.faults)?)),
        "msfs" => Err(TelemetryError::Unavailable(
            "msfs needs a SimConnect bridge, which is not available on this platform".into(),
        )),
        "iracing" => Err(TelemetryError::NotImplemented("iRacing".into())),
        _ => Err(TelemetryError::UnsupportedGame(game)),
    }
}
