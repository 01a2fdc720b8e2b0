//! The simulator assistant loop.

use flightdeck_config::AssistantConfig;
use flightdeck_core::error::{Error, Result};
use flightdeck_core::provider::Responder;
use flightdeck_core::speech::{SpeechInput, SpeechOutput};
use flightdeck_core::telemetry::{TelemetrySource, WarningSet};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::context::ContextAssembler;
use crate::event::AssistantEvent;
use crate::history::SnapshotHistory;
use crate::trend::TrendAnalyzer;
use crate::warnings::WarningTracker;

/// Timing and behavior knobs for [`AssistantLoop`].
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub telemetry_interval: Duration,
    pub warning_interval: Duration,
    /// Sleep between iterations
    pub tick: Duration,
    pub history_capacity: usize,
    pub warning_cooldown: Duration,
    pub high_priority_cooldown: Duration,
    /// Matched case-insensitively anywhere in an utterance
    pub exit_keywords: Vec<String>,
    pub farewell: String,
    /// Per-key trend threshold overrides
    pub trend_thresholds: BTreeMap<String, f64>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from(&AssistantConfig::default())
    }
}

impl From<&AssistantConfig> for LoopSettings {
    fn from(config: &AssistantConfig) -> Self {
        Self {
            telemetry_interval: config.telemetry_interval(),
            warning_interval: config.warning_interval(),
            tick: config.tick(),
            history_capacity: config.history_capacity,
            warning_cooldown: config.warning_cooldown(),
            high_priority_cooldown: config.high_priority_cooldown(),
            exit_keywords: config.exit_keywords.clone(),
            farewell: config.farewell.clone(),
            trend_thresholds: config.trend_thresholds.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Why [`AssistantLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The pilot said an exit keyword
    ExitPhrase,
    /// The shutdown future resolved (Ctrl-C)
    Interrupted,
}

impl LoopExit {
    pub fn as_str(self) -> &'static str {
        match self {
            LoopExit::ExitPhrase => "exit phrase",
            LoopExit::Interrupted => "interrupted",
        }
    }
}

enum Turn {
    Continue,
    Exit,
}

/// Stops the source if `run` is dropped before its own cleanup.
struct StopGuard {
    source: Arc<dyn TelemetrySource>,
    abandoned: Arc<AtomicBool>,
    armed: bool,
}

impl StopGuard {
    fn new(source: Arc<dyn TelemetrySource>, abandoned: Arc<AtomicBool>) -> Self {
        Self {
            source,
            abandoned,
            armed: true,
        }
    }

    fn stop(mut self) {
        self.armed = false;
        self.source.stop();
    }
}

impl Drop for StopGuard {
    fn drop(&mut self) {
        if self.armed {
            warn!(source = self.source.name(), "Assistant loop abandoned, stopping telemetry");
            self.source.stop();
            self.abandoned.store(true, Ordering::SeqCst);
        }
    }
}

/// Polls telemetry, announces warnings and answers the pilot.
///
/// Everything runs on one task. Telemetry and warning checks fire on their
/// own cadences; speech input is polled every tick. LLM and TTS calls are
/// awaited inline, so a slow reply delays the next tick but never overlaps it.
pub struct AssistantLoop {
    source: Arc<dyn TelemetrySource>,
    input: Box<dyn SpeechInput>,
    output: Arc<dyn SpeechOutput>,
    responder: Arc<dyn Responder>,
    settings: LoopSettings,

    state: LoopState,
    session_id: String,
    history: SnapshotHistory,
    tracker: WarningTracker,
    assembler: ContextAssembler,

    /// Context rebuilt on each telemetry capture
    context: String,

    events: Option<mpsc::UnboundedSender<AssistantEvent>>,

    /// Set when a running `run` future was dropped
    abandoned: Arc<AtomicBool>,
}

impl AssistantLoop {
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        input: Box<dyn SpeechInput>,
        output: Arc<dyn SpeechOutput>,
        responder: Arc<dyn Responder>,
        settings: LoopSettings,
    ) -> Self {
        let trends = TrendAnalyzer::new(source.trend_fields())
            .with_overrides(&settings.trend_thresholds);
        let assembler = ContextAssembler::new(trends);
        let history = SnapshotHistory::new(settings.history_capacity);
        let context = assembler.build(&history);

        Self {
            tracker: WarningTracker::new(settings.warning_cooldown, settings.high_priority_cooldown),
            source,
            input,
            output,
            responder,
            settings,
            state: LoopState::Idle,
            session_id: uuid::Uuid::new_v4().to_string(),
            history,
            assembler,
            context,
            events: None,
            abandoned: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Report progress on `tx`. A dropped receiver is ignored.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<AssistantEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn state(&self) -> LoopState {
        if self.abandoned.load(Ordering::SeqCst) {
            LoopState::Stopped
        } else {
            self.state
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    /// The telemetry context the next question will be answered with.
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Run until an exit phrase is heard or `shutdown` resolves.
    ///
    /// Fails only when the loop was already run or the telemetry source
    /// cannot start; in the latter case the source is not stopped because it
    /// never started. Once running, every failure is logged and the loop
    /// carries on, and the source is stopped exactly once on the way out,
    /// including when this future is dropped mid-turn.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<LoopExit>
    where
        F: Future<Output = ()>,
    {
        let state = self.state();
        if state != LoopState::Idle {
            return Err(Error::Internal(format!(
                "assistant loop cannot start from {state:?}"
            )));
        }

        if let Err(e) = self.source.start(self.settings.telemetry_interval).await {
            warn!(source = self.source.name(), error = %e, "Telemetry source failed to start");
            self.state = LoopState::Stopped;
            return Err(e.into());
        }

        let guard = StopGuard::new(self.source.clone(), self.abandoned.clone());
        self.state = LoopState::Running;
        info!(
            session_id = %self.session_id,
            source = self.source.name(),
            warnings = self.source.capabilities().warnings,
            "Assistant loop running"
        );
        self.emit(AssistantEvent::Started {
            session_id: self.session_id.clone(),
            source: self.source.name().to_string(),
        });

        tokio::pin!(shutdown);
        let mut last_fetch: Option<Instant> = None;
        let mut last_warning_check: Option<Instant> = None;

        let exit = loop {
            let now = Instant::now();

            if is_due(last_fetch, now, self.settings.telemetry_interval) {
                self.capture();
                last_fetch = Some(now);
            }

            if is_due(last_warning_check, now, self.settings.warning_interval) {
                self.check_warnings(now).await;
                last_warning_check = Some(now);
            }

            if let Turn::Exit = self.listen().await {
                break LoopExit::ExitPhrase;
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!(session_id = %self.session_id, "Shutdown requested");
                    self.state = LoopState::Stopping;
                    break LoopExit::Interrupted;
                }
                _ = tokio::time::sleep(self.settings.tick) => {}
            }
        };

        guard.stop();
        self.state = LoopState::Stopped;
        info!(session_id = %self.session_id, reason = exit.as_str(), "Assistant loop stopped");
        self.emit(AssistantEvent::Stopped {
            reason: exit.as_str().to_string(),
        });
        Ok(exit)
    }

    fn capture(&mut self) {
        let snapshot = self.source.fetch_snapshot();
        let fields = snapshot.len();
        self.history.push(snapshot);
        self.context = self.assembler.build(&self.history);
        debug!(fields, history = self.history.len(), "Telemetry captured");
        self.emit(AssistantEvent::SnapshotCaptured { fields });
    }

    async fn check_warnings(&mut self, now: Instant) {
        if !self.source.capabilities().warnings {
            return;
        }

        let source = &self.source;
        let current: WarningSet = source
            .active_warnings()
            .iter()
            .map(|(key, reported)| (key, source.warning_priority(key).unwrap_or(reported)))
            .collect();
        let Some(announcement) = self
            .tracker
            .evaluate(&current, now, |key| source.warning_message(key))
        else {
            return;
        };

        warn!(
            key = %announcement.key,
            priority = announcement.priority.level(),
            "Announcing warning"
        );
        self.emit(AssistantEvent::Warning {
            key: announcement.key.clone(),
            message: announcement.message.clone(),
            priority: announcement.priority,
        });
        if let Err(e) = self.output.speak(&announcement.message).await {
            self.turn_failed("speak", e.to_string());
        }
    }

    async fn listen(&mut self) -> Turn {
        let utterance = match self.input.poll_utterance() {
            Ok(Some(text)) => text,
            Ok(None) => return Turn::Continue,
            Err(e) => {
                self.turn_failed("listen", e.to_string());
                return Turn::Continue;
            }
        };
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Turn::Continue;
        }

        debug!(chars = utterance.len(), "Utterance heard");
        self.emit(AssistantEvent::Heard {
            utterance: utterance.to_string(),
        });

        if is_exit_phrase(utterance, &self.settings.exit_keywords) {
            info!(session_id = %self.session_id, "Exit phrase heard");
            if let Err(e) = self.output.speak(&self.settings.farewell).await {
                warn!(error = %e, "Failed to speak farewell");
            }
            self.state = LoopState::Stopping;
            return Turn::Exit;
        }

        match self.responder.respond(&self.context, utterance).await {
            Ok(reply) if reply.is_empty() => {
                self.turn_failed("respond", "empty reply".to_string());
            }
            Ok(reply) => {
                self.emit(AssistantEvent::Reply { text: reply.clone() });
                if let Err(e) = self.output.speak(&reply).await {
                    self.turn_failed("speak", e.to_string());
                }
            }
            Err(e) => self.turn_failed("respond", e.to_string()),
        }
        Turn::Continue
    }

    fn turn_failed(&self, stage: &str, error: String) {
        warn!(session_id = %self.session_id, stage, error = %error, "Turn failed");
        self.emit(AssistantEvent::TurnFailed {
            stage: stage.to_string(),
            error,
        });
    }

    fn emit(&self, event: AssistantEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

fn is_due(last: Option<Instant>, now: Instant, interval: Duration) -> bool {
    last.is_none_or(|last| now.saturating_duration_since(last) >= interval)
}

/// Whether `utterance` contains any keyword, ignoring case.
pub fn is_exit_phrase(utterance: &str, keywords: &[String]) -> bool {
    let utterance = utterance.to_lowercase();
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .any(|k| !k.is_empty() && utterance.contains(&k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> Vec<String> {
        vec!["exit".into(), "Finalizar".into(), "  ".into()]
    }

    #[test]
    fn exit_phrase_is_case_insensitive_containment() {
        assert!(is_exit_phrase("Please EXIT now", &keywords()));
        assert!(is_exit_phrase("finalizar", &keywords()));
        assert!(is_exit_phrase("exiting", &keywords()));
        assert!(!is_exit_phrase("what is my altitude", &keywords()));
        assert!(!is_exit_phrase("anything", &[]));
    }

    #[test]
    fn settings_follow_config() {
        let mut config = AssistantConfig::default();
        config.tick_ms = 250;
        config.trend_thresholds.insert("altitude_ft".into(), 100.0);

        let settings = LoopSettings::from(&config);
        assert_eq!(settings.tick, Duration::from_millis(250));
        assert_eq!(settings.telemetry_interval, Duration::from_secs(1));
        assert_eq!(settings.warning_interval, Duration::from_secs(3));
        assert_eq!(settings.warning_cooldown, Duration::from_secs(30));
        assert_eq!(settings.high_priority_cooldown, Duration::from_secs(15));
        assert_eq!(settings.history_capacity, 10);
        assert_eq!(settings.trend_thresholds.get("altitude_ft"), Some(&100.0));
        assert_eq!(settings.exit_keywords, vec!["exit", "finalizar"]);
    }

    #[test]
    fn due_on_first_check_then_by_interval() {
        let now = Instant::now();
        let second = Duration::from_secs(1);
        assert!(is_due(None, now, second));
        assert!(!is_due(Some(now), now + Duration::from_millis(999), second));
        assert!(is_due(Some(now), now + second, second));
    }
}
