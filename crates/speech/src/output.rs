//! Speech outputs: the terminal, an external TTS command, or several at once.

use async_trait::async_trait;
use flightdeck_core::error::SpeechError;
use flightdeck_core::speech::SpeechOutput;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use crate::text::{clean_for_speech, split_sentences};

/// Engines probed on `PATH`, in order of preference.
const KNOWN_ENGINES: &[&str] = &["say", "espeak-ng", "espeak", "spd-say"];

/// Prints what would be spoken.
pub struct ConsoleSpeaker {
    prefix: String,
}

impl ConsoleSpeaker {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for ConsoleSpeaker {
    fn default() -> Self {
        Self::new("Assistant: ")
    }
}

#[async_trait]
impl SpeechOutput for ConsoleSpeaker {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        println!("{}{}", self.prefix, text.trim());
        Ok(())
    }
}

/// Speaks through an external text-to-speech program.
#[derive(Debug, Clone)]
pub struct CommandSpeaker {
    program: String,
    voice: Option<String>,
    rate: Option<u32>,
}

impl CommandSpeaker {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            voice: None,
            rate: None,
        }
    }

    /// First known engine found on `PATH`.
    pub fn detect() -> Option<Self> {
        let path = std::env::var_os("PATH")?;
        let dirs: Vec<PathBuf> = std::env::split_paths(&path).collect();
        KNOWN_ENGINES
            .iter()
            .find(|engine| dirs.iter().any(|dir| is_executable(&dir.join(engine))))
            .map(|engine| Self::new(*engine))
    }

    pub fn with_voice(mut self, voice: Option<String>) -> Self {
        self.voice = voice;
        self
    }

    /// Words per minute.
    pub fn with_rate(mut self, rate: Option<u32>) -> Self {
        self.rate = rate;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn engine(&self) -> &str {
        Path::new(&self.program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.program)
    }

    /// Arguments for speaking one sentence.
    fn args_for(&self, sentence: &str) -> Vec<String> {
        let mut args = Vec::new();
        match self.engine() {
            "say" => {
                if let Some(voice) = &self.voice {
                    args.extend(["-v".to_string(), voice.clone()]);
                }
                if let Some(rate) = self.rate {
                    args.extend(["-r".to_string(), rate.to_string()]);
                }
            }
            "espeak" | "espeak-ng" => {
                if let Some(voice) = &self.voice {
                    args.extend(["-v".to_string(), voice.clone()]);
                }
                if let Some(rate) = self.rate {
                    args.extend(["-s".to_string(), rate.to_string()]);
                }
            }
            "spd-say" => {
                args.push("--wait".to_string());
                if let Some(voice) = &self.voice {
                    args.extend(["-l".to_string(), voice.clone()]);
                }
            }
            _ => {}
        }
        args.push(sentence.to_string());
        args
    }
}

#[async_trait]
impl SpeechOutput for CommandSpeaker {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let cleaned = clean_for_speech(text);
        for sentence in split_sentences(&cleaned) {
            debug!(engine = %self.program, chars = sentence.len(), "Speaking sentence");
            let status = Command::new(&self.program)
                .args(self.args_for(&sentence))
                .kill_on_drop(true)
                .status()
                .await
                .map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => {
                        SpeechError::EngineUnavailable(format!("{} not found", self.program))
                    }
                    _ => SpeechError::OutputFailed(format!("{}: {e}", self.program)),
                })?;

            if !status.success() {
                return Err(SpeechError::OutputFailed(format!(
                    "{} exited with {status}",
                    self.program
                )));
            }
        }
        Ok(())
    }
}

/// Sends the same text to several outputs in order.
///
/// Every output is tried; the first error is returned.
pub struct Broadcast {
    outputs: Vec<Box<dyn SpeechOutput>>,
}

impl Broadcast {
    pub fn new(outputs: Vec<Box<dyn SpeechOutput>>) -> Self {
        Self { outputs }
    }
}

#[async_trait]
impl SpeechOutput for Broadcast {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let mut first_error = None;
        for output in &self.outputs {
            if let Err(e) = output.speak(text).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
