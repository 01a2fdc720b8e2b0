//! Speech traits: how the assistant hears the pilot and talks back.
//!
//! Input is polled, never awaited, so the simulator loop can keep its tick
//! cadence while nobody is speaking. Output is awaited and may take as long
//! as the utterance lasts.

use async_trait::async_trait;
use crate::error::SpeechError;

/// Source of recognized utterances.
pub trait SpeechInput: Send {
    /// Return the next completed utterance, if one is ready.
    ///
    /// Must not block. `Ok(None)` means nothing was heard since the last poll.
    fn poll_utterance(&mut self) -> std::result::Result<Option<String>, SpeechError>;
}

/// Sink for spoken (or printed) assistant output.
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    async fn speak(&self, text: &str) -> std::result::Result<(), SpeechError>;
}
