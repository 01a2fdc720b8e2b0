//! `flightdeck config`: configuration management commands.

use flightdeck_config::AppConfig;

use super::{CommandResult, load_config};

const REDACTED: &str = "***";

pub async fn validate() -> CommandResult {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();
            if config.default_provider != "ollama" && !config.has_api_key() {
                warnings.push("No API key set (set FLIGHTDECK_API_KEY or OPENAI_API_KEY)");
            }
            if config.speech.enabled && super::voice(&config.speech).is_none() {
                warnings.push("Speech enabled but no text-to-speech engine was found");
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Provider:  {}", config.default_provider);
            println!("   Model:     {}", config.default_model);
            println!("   Game:      {}", config.assistant.game);
            println!("   History:   {} snapshots", config.assistant.history_capacity);
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> CommandResult {
    let config = redacted(load_config()?);
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> CommandResult {
    println!("{}", AppConfig::config_path().display());
    Ok(())
}

/// Replace every secret with a placeholder.
fn redacted(mut config: AppConfig) -> AppConfig {
    if config.api_key.is_some() {
        config.api_key = Some(REDACTED.into());
    }
    for provider in config.providers.values_mut() {
        if provider.api_key.is_some() {
            provider.api_key = Some(REDACTED.into());
        }
    }
    config
}
