//! `flightdeck doctor`: diagnose configuration, LLM and speech setup.

use flightdeck_config::AppConfig;
use flightdeck_telemetry::{GAMES, SourceOptions, create_source};

use super::{CommandResult, default_provider, voice};

pub async fn run() -> CommandResult {
    println!("🩺 FlightDeck Doctor: System Diagnostics");
    println!("========================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_path();
    if !config_path.exists() {
        println!("  ⚠️  No config file, using defaults. Run `flightdeck onboard`");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  1 blocking issue found. Fix the config and re-run.");
            return Ok(());
        }
    };

    // LLM provider
    match default_provider(&config) {
        Ok(provider) => match provider.health_check().await {
            Ok(true) => {
                println!("  ✅ Provider '{}' reachable", provider.name());
                match provider.list_models().await {
                    Ok(models) if models.iter().any(|m| m == &config.default_model) => {
                        println!("  ✅ Model '{}' available", config.default_model);
                    }
                    Ok(models) if !models.is_empty() => {
                        println!(
                            "  ⚠️  Model '{}' not listed by the provider ({} models available)",
                            config.default_model,
                            models.len()
                        );
                        issues += 1;
                    }
                    Ok(_) => println!("  ℹ️  Provider does not list models"),
                    Err(e) => {
                        println!("  ⚠️  Could not list models: {e}");
                        issues += 1;
                    }
                }
            }
            Ok(false) => {
                println!("  ❌ Provider '{}' is not healthy", provider.name());
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Provider '{}' unreachable: {e}", provider.name());
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    // Speech
    if !config.speech.enabled {
        println!("  ℹ️  Speech output disabled");
    } else if let Some(engine) = voice(&config.speech) {
        println!("  ✅ Text-to-speech engine: {}", engine.program());
    } else {
        println!("  ⚠️  No text-to-speech engine found (install espeak-ng or set speech.command)");
        issues += 1;
    }

    // Telemetry
    match create_source(&config.assistant.game, &SourceOptions::default()) {
        Ok(source) => println!("  ✅ Telemetry source '{}' available", source.name()),
        Err(e) => {
            println!("  ❌ Telemetry source '{}': {e}", config.assistant.game);
            let names: Vec<&str> = GAMES.iter().map(|(name, _)| *name).collect();
            println!("     Known games: {}", names.join(", "));
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
