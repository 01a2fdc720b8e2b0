//! End-to-end tests for the assistant loop.
//!
//! Every test runs on a paused clock, so simulated seconds pass instantly
//! and tick timing is exact.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use flightdeck_assistant::{AssistantEvent, AssistantLoop, LoopExit, LoopSettings, LoopState};
use flightdeck_core::error::{Error, ProviderError, SpeechError, TelemetryError};
use flightdeck_core::provider::Responder;
use flightdeck_core::snapshot::{Snapshot, Value};
use flightdeck_core::speech::{SpeechInput, SpeechOutput};
use flightdeck_core::telemetry::{Capabilities, Priority, TelemetrySource, TrendField, WarningSet};
use tokio::sync::mpsc;
use tokio::time::Instant;

// ── Mock telemetry ───────────────────────────────────────────────────────

/// Climbs 200 ft per fetch and reports a fixed warning set.
#[derive(Default)]
struct MockSource {
    warnings: Option<WarningSet>,
    fail_start: bool,
    altitude: Mutex<f64>,
    starts: AtomicUsize,
    stops: AtomicUsize,
    fetches: AtomicUsize,
}

impl MockSource {
    fn with_warnings(warnings: &[(&str, Priority)]) -> Self {
        Self {
            warnings: Some(warnings.iter().map(|(k, p)| (*k, *p)).collect()),
            ..Self::default()
        }
    }

    fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TelemetrySource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            warnings: self.warnings.is_some(),
        }
    }

    async fn start(&self, _interval: Duration) -> Result<(), TelemetryError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(TelemetryError::Unavailable("simulator not running".into()));
        }
        Ok(())
    }

    fn fetch_snapshot(&self) -> Snapshot {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut altitude = self.altitude.lock().unwrap();
        *altitude += 200.0;
        Snapshot::new([("altitude_ft", Value::from(*altitude))])
    }

    fn active_warnings(&self) -> WarningSet {
        self.warnings.clone().unwrap_or_default()
    }

    fn warning_message(&self, key: &str) -> Option<String> {
        (key == "stall").then(|| "Stall warning. Lower the nose.".to_string())
    }

    fn warning_priority(&self, key: &str) -> Option<Priority> {
        (key == "stall").then_some(Priority::High)
    }

    fn trend_fields(&self) -> Vec<TrendField> {
        vec![TrendField::new("altitude_ft", "Altitude", "feet", 50.0)]
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Mock speech ──────────────────────────────────────────────────────────

/// Releases each utterance once the paused clock reaches its offset.
struct ScriptedInput {
    start: Instant,
    script: VecDeque<(Duration, &'static str)>,
}

impl ScriptedInput {
    fn new(script: &[(u64, &'static str)]) -> Self {
        Self {
            start: Instant::now(),
            script: script
                .iter()
                .map(|(ms, text)| (Duration::from_millis(*ms), *text))
                .collect(),
        }
    }

    fn silent() -> Self {
        Self::new(&[])
    }
}

impl SpeechInput for ScriptedInput {
    fn poll_utterance(&mut self) -> Result<Option<String>, SpeechError> {
        match self.script.front() {
            Some((at, _)) if self.start.elapsed() >= *at => {
                Ok(self.script.pop_front().map(|(_, text)| text.to_string()))
            }
            _ => Ok(None),
        }
    }
}

#[derive(Default)]
struct RecordingSpeaker {
    fail: bool,
    attempts: AtomicUsize,
    spoken: Mutex<Vec<String>>,
}

impl RecordingSpeaker {
    fn broken() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechOutput for RecordingSpeaker {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SpeechError::OutputFailed("audio device lost".into()));
        }
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

// ── Mock LLM ─────────────────────────────────────────────────────────────

/// Fails the first `failures` calls, then replies "reply N".
#[derive(Default)]
struct MockResponder {
    failures: usize,
    contexts: Mutex<Vec<String>>,
}

impl MockResponder {
    fn calls(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }
}

#[async_trait]
impl Responder for MockResponder {
    async fn respond(&self, context: &str, _utterance: &str) -> Result<String, ProviderError> {
        let mut contexts = self.contexts.lock().unwrap();
        contexts.push(context.to_string());
        if contexts.len() <= self.failures {
            return Err(ProviderError::Network("connection refused".into()));
        }
        Ok(format!("reply {}", contexts.len()))
    }
}

/// Never answers.
struct StuckResponder;

#[async_trait]
impl Responder for StuckResponder {
    async fn respond(&self, _context: &str, _utterance: &str) -> Result<String, ProviderError> {
        std::future::pending().await
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

struct Harness {
    source: Arc<MockSource>,
    speaker: Arc<RecordingSpeaker>,
    responder: Arc<MockResponder>,
    events: mpsc::UnboundedReceiver<AssistantEvent>,
    assistant: AssistantLoop,
}

impl Harness {
    fn new(source: MockSource, input: ScriptedInput, speaker: RecordingSpeaker, responder: MockResponder) -> Self {
        let source = Arc::new(source);
        let speaker = Arc::new(speaker);
        let responder = Arc::new(responder);
        let (tx, events) = mpsc::unbounded_channel();

        let assistant = AssistantLoop::new(
            source.clone(),
            Box::new(input),
            speaker.clone(),
            responder.clone(),
            LoopSettings::default(),
        )
        .with_events(tx);

        Self {
            source,
            speaker,
            responder,
            events,
            assistant,
        }
    }

    fn drain_events(&mut self) -> Vec<AssistantEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

fn after(ms: u64) -> impl Future<Output = ()> {
    tokio::time::sleep(Duration::from_millis(ms))
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn high_priority_warning_spoken_once_in_first_interval() {
    let mut h = Harness::new(
        MockSource::with_warnings(&[("stall", Priority::High)]),
        ScriptedInput::silent(),
        RecordingSpeaker::default(),
        MockResponder::default(),
    );

    let exit = h.assistant.run(after(2_950)).await.unwrap();

    assert_eq!(exit, LoopExit::Interrupted);
    assert_eq!(h.speaker.spoken(), vec!["Stall warning. Lower the nose."]);
    assert_eq!(h.source.stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn high_priority_warning_repeats_after_cooldown() {
    let mut h = Harness::new(
        MockSource::with_warnings(&[("stall", Priority::High), ("vacuum", Priority::Low)]),
        ScriptedInput::silent(),
        RecordingSpeaker::default(),
        MockResponder::default(),
    );

    h.assistant.run(after(16_000)).await.unwrap();

    // t=0 stall, t=3 vacuum (never announced yet), t=15 stall again.
    assert_eq!(
        h.speaker.spoken(),
        vec![
            "Stall warning. Lower the nose.",
            "Active warning: vacuum",
            "Stall warning. Lower the nose.",
        ]
    );

    let warnings: Vec<String> = h
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            AssistantEvent::Warning { key, .. } => Some(key),
            _ => None,
        })
        .collect();
    assert_eq!(warnings, vec!["stall", "vacuum", "stall"]);
}

#[tokio::test(start_paused = true)]
async fn source_priority_table_overrides_reported_level() {
    let mut h = Harness::new(
        MockSource::with_warnings(&[("stall", Priority::Low)]),
        ScriptedInput::silent(),
        RecordingSpeaker::default(),
        MockResponder::default(),
    );

    h.assistant.run(after(16_000)).await.unwrap();

    // Treated as high priority, so it repeats at t=15 instead of t=30.
    assert_eq!(h.speaker.spoken().len(), 2);
    let priorities: Vec<Priority> = h
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            AssistantEvent::Warning { priority, .. } => Some(priority),
            _ => None,
        })
        .collect();
    assert_eq!(priorities, vec![Priority::High, Priority::High]);
}

#[tokio::test(start_paused = true)]
async fn exit_phrase_stops_once_even_when_speech_fails() {
    let mut h = Harness::new(
        MockSource::default(),
        ScriptedInput::new(&[(500, "ok, EXIT please")]),
        RecordingSpeaker::broken(),
        MockResponder::default(),
    );

    let exit = h.assistant.run(after(60_000)).await.unwrap();

    assert_eq!(exit, LoopExit::ExitPhrase);
    assert_eq!(h.assistant.state(), LoopState::Stopped);
    assert_eq!(h.source.stops(), 1);
    assert_eq!(h.speaker.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(h.responder.calls(), 0);

    let events = h.drain_events();
    assert!(matches!(events.last(), Some(AssistantEvent::Stopped { reason }) if reason == "exit phrase"));
}

#[tokio::test(start_paused = true)]
async fn startup_failure_never_runs() {
    let mut h = Harness::new(
        MockSource::failing(),
        ScriptedInput::silent(),
        RecordingSpeaker::default(),
        MockResponder::default(),
    );

    let err = h.assistant.run(after(1_000)).await.unwrap_err();

    assert!(matches!(err, Error::Telemetry(TelemetryError::Unavailable(_))));
    assert_eq!(h.assistant.state(), LoopState::Stopped);
    assert_eq!(h.source.stops(), 0);
    assert_eq!(h.source.fetches.load(Ordering::SeqCst), 0);
    assert!(h.drain_events().is_empty());

    // A stopped loop cannot be restarted.
    let again = h.assistant.run(after(1_000)).await.unwrap_err();
    assert!(matches!(again, Error::Internal(_)));
    assert_eq!(h.source.starts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn llm_failure_is_logged_and_loop_continues() {
    let mut h = Harness::new(
        MockSource::default(),
        ScriptedInput::new(&[(500, "how high are we?"), (1_500, "and now?")]),
        RecordingSpeaker::default(),
        MockResponder {
            failures: 1,
            ..MockResponder::default()
        },
    );

    let exit = h.assistant.run(after(3_000)).await.unwrap();

    assert_eq!(exit, LoopExit::Interrupted);
    assert_eq!(h.responder.calls(), 2);
    assert_eq!(h.speaker.spoken(), vec!["reply 2"]);

    let events = h.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        AssistantEvent::TurnFailed { stage, .. } if stage == "respond"
    )));
    assert!(events.contains(&AssistantEvent::Reply {
        text: "reply 2".into()
    }));
}

#[tokio::test(start_paused = true)]
async fn replies_use_latest_telemetry_and_trends() {
    let mut h = Harness::new(
        MockSource::default(),
        ScriptedInput::new(&[(300, "altitude?"), (1_500, "altitude now?")]),
        RecordingSpeaker::default(),
        MockResponder::default(),
    );

    h.assistant.run(after(2_500)).await.unwrap();

    let contexts = h.responder.contexts.lock().unwrap().clone();
    assert_eq!(contexts.len(), 2);

    // One capture at t=0: data but no trend yet.
    assert!(contexts[0].starts_with("Current game data:"));
    assert!(contexts[0].contains("200.0"));
    assert!(!contexts[0].contains("Recent trends:"));

    // Second capture at t=1s climbs 200 ft.
    assert!(contexts[1].contains("400.0"));
    assert!(contexts[1].contains("Recent trends:\nAltitude is increasing at 200.0 feet per update"));

    // Captures at t=0, 1 and 2 seconds.
    assert_eq!(h.assistant.history().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn sources_without_warning_support_are_never_checked() {
    let mut h = Harness::new(
        MockSource::default(),
        ScriptedInput::silent(),
        RecordingSpeaker::default(),
        MockResponder::default(),
    );

    h.assistant.run(after(10_000)).await.unwrap();

    assert!(h.speaker.spoken().is_empty());
    let events = h.drain_events();
    assert!(matches!(events.first(), Some(AssistantEvent::Started { source, .. }) if source == "mock"));
    assert!(!events.iter().any(|e| matches!(e, AssistantEvent::Warning { .. })));
}

#[tokio::test(start_paused = true)]
async fn dropped_run_still_stops_source_once() {
    let source = Arc::new(MockSource::default());
    let mut assistant = AssistantLoop::new(
        source.clone(),
        Box::new(ScriptedInput::new(&[(500, "are you there?")])),
        Arc::new(RecordingSpeaker::default()),
        Arc::new(StuckResponder),
        LoopSettings::default(),
    );

    let timed_out = tokio::time::timeout(Duration::from_secs(5), assistant.run(std::future::pending()))
        .await
        .is_err();

    assert!(timed_out);
    assert_eq!(source.stops(), 1);
    assert_eq!(assistant.state(), LoopState::Stopped);

    drop(assistant);
    assert_eq!(source.stops(), 1);
}
