//! Utterance sources.
//!
//! [`QueuedInput`] is the non-blocking end of a channel; anything that can
//! produce text (stdin, a recognizer thread, a test) pushes into the
//! [`UtteranceSender`] half.

use flightdeck_core::error::SpeechError;
use flightdeck_core::speech::SpeechInput;
use std::io::BufRead;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, warn};

const QUEUE_DEPTH: usize = 32;

/// Producer half of a [`QueuedInput`].
#[derive(Debug, Clone)]
pub struct UtteranceSender(mpsc::Sender<String>);

impl UtteranceSender {
    pub async fn send(&self, utterance: impl Into<String>) -> Result<(), SpeechError> {
        self.0
            .send(utterance.into())
            .await
            .map_err(|_| SpeechError::InputFailed("utterance queue closed".into()))
    }

    pub fn try_send(&self, utterance: impl Into<String>) -> Result<(), SpeechError> {
        self.0
            .try_send(utterance.into())
            .map_err(|e| SpeechError::InputFailed(e.to_string()))
    }
}

/// Speech input fed through a bounded queue.
#[derive(Debug)]
pub struct QueuedInput {
    rx: mpsc::Receiver<String>,
    closed: bool,
}

impl QueuedInput {
    pub fn channel() -> (UtteranceSender, Self) {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        (UtteranceSender(tx), Self { rx, closed: false })
    }

    /// Whether every sender has gone away and the queue is drained.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl SpeechInput for QueuedInput {
    fn poll_utterance(&mut self) -> Result<Option<String>, SpeechError> {
        loop {
            match self.rx.try_recv() {
                Ok(text) => {
                    let text = text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    return Ok(Some(text.to_string()));
                }
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => {
                    if !self.closed {
                        debug!("Utterance queue closed");
                        self.closed = true;
                    }
                    return Ok(None);
                }
            }
        }
    }
}

/// Typed input: each stdin line is one utterance.
pub struct ConsoleInput;

impl ConsoleInput {
    /// Start reading stdin on a dedicated thread. EOF closes the queue.
    ///
    /// A pending read never holds up runtime shutdown.
    pub fn spawn() -> QueuedInput {
        let (tx, input) = QueuedInput::channel();

        let spawned = std::thread::Builder::new()
            .name("flightdeck-stdin".into())
            .spawn(move || {
                for line in std::io::stdin().lock().lines() {
                    match line {
                        Ok(line) if line.trim().is_empty() => continue,
                        Ok(line) => {
                            if tx.0.blocking_send(line).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Failed to read from stdin");
                            break;
                        }
                    }
                }
                debug!("Console input finished");
            });

        if let Err(e) = spawned {
            warn!(error = %e, "Failed to start console input");
        }
        input
    }
}
