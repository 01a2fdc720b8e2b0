//! FlightDeck CLI: the main entry point.
//!
//! Commands:
//! - `onboard`  Write the default config
//! - `sim`      Run the simulator voice assistant (foreground or detached)
//! - `stop`     Stop a detached assistant
//! - `prompt`   One-shot prompt, streamed to the terminal
//! - `chat`     Interactive conversation
//! - `explain`  Explain a failed shell command
//! - `status`   Show configuration and worker state
//! - `doctor`   Diagnose config, LLM and speech setup
//! - `config`   Show, locate or validate the config file

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "flightdeck",
    about = "FlightDeck: a voice co-pilot for simulators and a local LLM toolkit",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the configuration directory and file
    Onboard,

    /// Run the simulator assistant
    Sim {
        /// Telemetry source (dummy, flight, msfs, iracing); defaults to config
        #[arg(short, long)]
        game: Option<String>,

        /// Print replies instead of speaking them
        #[arg(long)]
        text_only: bool,

        /// Run in the background and return immediately
        #[arg(short, long)]
        detach: bool,

        /// Force a warning on for the whole session (flight only, repeatable)
        #[arg(long = "fault", value_name = "KEY")]
        faults: Vec<String>,

        /// Internal: this process is the detached worker
        #[arg(long, hide = true)]
        worker: bool,
    },

    /// Stop a detached assistant
    Stop,

    /// Send a single prompt to the LLM
    Prompt {
        /// The prompt text
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,

        /// Also speak the reply
        #[arg(short, long)]
        speak: bool,

        /// Override the configured model
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Chat with the LLM interactively
    Chat {
        /// Override the configured model
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Explain why a shell command failed
    Explain {
        /// The command that failed
        command: String,

        /// The error output
        #[arg(required = true, num_args = 1..)]
        error: Vec<String>,
    },

    /// Show configuration and assistant state
    Status,

    /// Diagnose configuration, LLM and speech setup
    Doctor,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (secrets redacted)
    Show,
    /// Print the config file path
    Path,
    /// Validate the config file
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Sim {
            game,
            text_only,
            detach,
            faults,
            worker,
        } => {
            let args = commands::sim::SimArgs {
                game,
                text_only,
                faults,
                worker,
            };
            if detach {
                commands::daemon::detach(&args)?;
            } else {
                commands::sim::run(args).await?;
            }
        }
        Commands::Stop => commands::daemon::stop()?,
        Commands::Prompt {
            prompt,
            speak,
            model,
        } => commands::prompt::run(&prompt.join(" "), speak, model).await?,
        Commands::Chat { model } => commands::chat::run(model).await?,
        Commands::Explain { command, error } => {
            commands::explain::run(&command, &error.join(" ")).await?
        }
        Commands::Status => commands::status::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
    }

    Ok(())
}
