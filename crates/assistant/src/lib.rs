//! The real-time simulator assistant.
//!
//! One cooperative loop ties the collaborators together:
//!
//! 1. **Capture** telemetry into a bounded history on a fixed cadence
//! 2. **Check warnings** and announce the most urgent one not on cooldown
//! 3. **Listen** for an utterance without blocking
//! 4. **Answer** it through the LLM with the current telemetry as context
//!
//! The loop sleeps one tick between iterations and only observes shutdown
//! there.

pub mod context;
pub mod event;
pub mod history;
pub mod loop_runner;
pub mod responder;
pub mod trend;
pub mod warnings;

pub use context::ContextAssembler;
pub use event::AssistantEvent;
pub use history::SnapshotHistory;
pub use loop_runner::{AssistantLoop, LoopExit, LoopSettings, LoopState, is_exit_phrase};
pub use responder::LlmResponder;
pub use trend::TrendAnalyzer;
pub use warnings::{Announcement, WarningTracker};
