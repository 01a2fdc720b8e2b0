//! `flightdeck sim`: the simulator voice assistant.

use flightdeck_assistant::{AssistantEvent, AssistantLoop, LlmResponder, LoopExit, LoopSettings};
use flightdeck_core::speech::SpeechOutput;
use flightdeck_core::telemetry::TelemetrySource;
use flightdeck_speech::{ConsoleInput, ConsoleSpeaker};
use flightdeck_telemetry::{SourceOptions, create_source};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use super::{CommandResult, assistant_voice, daemon, default_provider, load_config};

const REPLY_PREFIX: &str = "  Assistant > ";
const WARNING_PREFIX: &str = "  WARNING: ";

/// Options shared by the foreground assistant and the detached worker.
#[derive(Debug, Clone, Default)]
pub struct SimArgs {
    pub game: Option<String>,
    pub text_only: bool,
    pub faults: Vec<String>,
    pub worker: bool,
}

impl SimArgs {
    /// Arguments that make a child process run the same session as a worker.
    pub fn worker_args(&self) -> Vec<String> {
        let mut args = vec!["sim".to_string(), "--worker".to_string()];
        if let Some(game) = &self.game {
            args.extend(["--game".to_string(), game.clone()]);
        }
        if self.text_only {
            args.push("--text-only".to_string());
        }
        for fault in &self.faults {
            args.extend(["--fault".to_string(), fault.clone()]);
        }
        args
    }
}

pub async fn run(args: SimArgs) -> CommandResult {
    let config = load_config()?;
    let game = args.game.clone().unwrap_or_else(|| config.assistant.game.clone());

    let options = SourceOptions {
        faults: args.faults.clone(),
    };
    let source: Arc<dyn TelemetrySource> = create_source(&game, &options)?.into();

    let provider = default_provider(&config)?;
    let responder = LlmResponder::new(provider, &config.default_model)
        .with_instructions(
            &config.assistant.system_prompt,
            source.assistant_context().as_deref(),
        )
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens);

    let output = assistant_voice(&config.speech, args.text_only);
    let input = ConsoleInput::spawn();

    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(rx));

    let mut assistant = AssistantLoop::new(
        source,
        Box::new(input),
        output,
        Arc::new(responder),
        LoopSettings::from(&config.assistant),
    )
    .with_events(tx);

    if !args.worker {
        println!();
        println!("  FlightDeck Assistant");
        println!("  ====================");
        println!("  Game:      {game}");
        println!("  Provider:  {}", config.default_provider);
        println!("  Model:     {}", config.default_model);
        println!();
        println!("  Type a question and press Enter.");
        println!(
            "  Say '{}' or press Ctrl+C to finish.",
            config.assistant.exit_keywords.join("' or '")
        );
        println!();
    }

    let result = assistant.run(shutdown_signal()).await;
    drop(assistant);
    let _ = printer.await;

    if args.worker {
        daemon::release_pid_file(&config.daemon.pid_path(), std::process::id());
    }

    let exit = result?;
    info!(reason = exit.as_str(), "Session ended");
    match exit {
        LoopExit::ExitPhrase => println!("{REPLY_PREFIX}{}", config.assistant.farewell),
        LoopExit::Interrupted if !args.worker => println!("\n  Interrupted. Goodbye!"),
        LoopExit::Interrupted => {}
    }
    Ok(())
}

async fn print_events(mut rx: mpsc::UnboundedReceiver<AssistantEvent>) {
    while let Some(event) = rx.recv().await {
        match &event {
            AssistantEvent::Started { source, .. } => {
                info!(source = %source, "Listening");
            }
            AssistantEvent::TurnFailed { stage, error } => {
                eprintln!("  [Error] {stage}: {error}");
            }
            _ => {}
        }
        if let Some((prefix, text)) = console_text(&event) {
            let _ = ConsoleSpeaker::new(prefix).speak(text).await;
        }
    }
}

/// Console line for an event: warnings stand apart from replies.
fn console_text(event: &AssistantEvent) -> Option<(&'static str, &str)> {
    match event {
        AssistantEvent::Warning { message, .. } => Some((WARNING_PREFIX, message)),
        AssistantEvent::Reply { text } => Some((REPLY_PREFIX, text)),
        _ => None,
    }
}

/// Resolves on Ctrl+C, or on SIGTERM where available.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
