//! # FlightDeck Core
//!
//! Domain types, traits, and error definitions for the FlightDeck voice
//! co-pilot. This crate has **no framework dependencies** beyond the async
//! trait machinery; it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the simulator loop is defined as a trait here.
//! Implementations live in their respective crates. This enables:
//! - Swapping telemetry sources and LLM backends via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod snapshot;
pub mod speech;
pub mod telemetry;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, SpeechError, TelemetryError};
pub use message::{Conversation, ConversationId, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Responder, StreamChunk, Usage};
pub use snapshot::{Snapshot, Value};
pub use speech::{SpeechInput, SpeechOutput};
pub use telemetry::{Capabilities, Priority, TelemetrySource, TrendField, WarningSet};
