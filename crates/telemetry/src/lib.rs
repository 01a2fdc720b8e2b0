//! Telemetry sources for FlightDeck.
//!
//! Every source implements `flightdeck_core::TelemetrySource` and captures
//! on a background [`Refresher`]. The registry maps game names to sources.

pub mod dummy;
pub mod flight;
pub mod refresher;
pub mod registry;

pub use dummy::DummySource;
pub use flight::{FlightModel, FlightSource, Phase};
pub use refresher::{Capture, Refresher, Sampler};
pub use registry::{GAMES, SourceOptions, create_source};
