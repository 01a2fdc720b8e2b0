//! `flightdeck status`: configuration and background assistant state.

use flightdeck_config::AppConfig;

use super::{CommandResult, daemon, load_config, voice};

pub async fn run() -> CommandResult {
    let config = load_config()?;

    println!("✈️  FlightDeck Status");
    println!("====================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Provider:     {}", config.default_provider);
    println!("  Model:        {}", config.default_model);
    println!("  Temperature:  {}", config.default_temperature);
    println!("  Ollama:       {}", config.ollama.base_url());
    println!("  Game:         {}", config.assistant.game);
    println!(
        "  Cadence:      telemetry {} ms, warnings {} ms, tick {} ms",
        config.assistant.telemetry_interval_ms,
        config.assistant.warning_interval_ms,
        config.assistant.tick_ms
    );
    let speech = if !config.speech.enabled {
        "disabled".to_string()
    } else {
        voice(&config.speech)
            .map(|v| v.program().to_string())
            .unwrap_or_else(|| "no engine found".to_string())
    };
    println!("  Speech:       {speech}");

    match daemon::live_pid(&config.daemon.pid_path()) {
        Some(pid) => println!("  Background:   running (PID {pid})"),
        None => println!("  Background:   not running"),
    }

    if AppConfig::config_path().exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file. Run `flightdeck onboard` first");
    }

    Ok(())
}
