//! Speech adapters for FlightDeck.
//!
//! Input side: a polled utterance queue fed by stdin or any other producer.
//! Output side: console printing and external TTS engines.

pub mod input;
pub mod output;
pub mod text;

pub use input::{ConsoleInput, QueuedInput, UtteranceSender};
pub use output::{Broadcast, CommandSpeaker, ConsoleSpeaker};
pub use text::{clean_for_speech, split_sentences};
