//! Subcommand implementations and the helpers they share.

pub mod chat;
pub mod config_cmd;
pub mod daemon;
pub mod doctor;
pub mod explain;
pub mod onboard;
pub mod prompt;
pub mod sim;
pub mod status;

use flightdeck_config::{AppConfig, SpeechConfig};
use flightdeck_core::error::ProviderError;
use flightdeck_core::provider::{Provider, ProviderRequest};
use flightdeck_core::speech::SpeechOutput;
use flightdeck_speech::{Broadcast, CommandSpeaker};
use std::io::Write;
use std::sync::Arc;
use tracing::warn;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// The configured default LLM provider.
pub fn default_provider(config: &AppConfig) -> Result<Arc<dyn Provider>, Box<dyn std::error::Error>> {
    let router = flightdeck_providers::build_from_config(config);
    Ok(router.default().ok_or_else(|| {
        format!("Provider '{}' is not configured", config.default_provider)
    })?)
}

/// A request using the configured sampling settings.
pub fn request(config: &AppConfig, model: Option<String>, messages: Vec<flightdeck_core::Message>) -> ProviderRequest {
    let mut request = ProviderRequest::new(model.unwrap_or_else(|| config.default_model.clone()), messages);
    request.temperature = config.default_temperature;
    request.max_tokens = Some(config.default_max_tokens);
    request
}

/// Stream a reply to stdout as it arrives and return the full text.
pub async fn stream_reply(provider: &dyn Provider, mut request: ProviderRequest) -> Result<String, ProviderError> {
    request.stream = true;
    let mut rx = provider.stream(request).await?;
    let mut reply = String::new();
    let mut stdout = std::io::stdout();

    while let Some(chunk) = rx.recv().await {
        let chunk = chunk?;
        if let Some(content) = chunk.content {
            print!("{content}");
            let _ = stdout.flush();
            reply.push_str(&content);
        }
        if chunk.done {
            break;
        }
    }
    println!();
    Ok(reply)
}

/// The text-to-speech engine from config, or the first one found on `PATH`.
pub fn voice(speech: &SpeechConfig) -> Option<CommandSpeaker> {
    let speaker = match &speech.command {
        Some(command) => Some(CommandSpeaker::new(command)),
        None => CommandSpeaker::detect(),
    }?;
    Some(speaker.with_voice(speech.voice.clone()).with_rate(speech.rate))
}

/// The voice when speech is enabled and an engine is available, otherwise a
/// silent output. Console text comes from the assistant's events instead.
pub fn assistant_voice(speech: &SpeechConfig, text_only: bool) -> Arc<dyn SpeechOutput> {
    let silent = || -> Arc<dyn SpeechOutput> { Arc::new(Broadcast::new(Vec::new())) };
    if text_only || !speech.enabled {
        return silent();
    }
    match voice(speech) {
        Some(speaker) => Arc::new(speaker),
        None => {
            warn!("No text-to-speech engine found; replies will only be printed");
            silent()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flightdeck_core::Message;

    #[test]
    fn request_uses_config_sampling() {
        let mut config = AppConfig::default();
        config.default_temperature = 0.3;
        config.default_max_tokens = 256;

        let req = request(&config, None, vec![Message::user("hi")]);
        assert_eq!(req.model, "gemma3:27b");
        assert_eq!(req.temperature, 0.3);
        assert_eq!(req.max_tokens, Some(256));

        let req = request(&config, Some("llama3".into()), vec![]);
        assert_eq!(req.model, "llama3");
    }

    #[test]
    fn configured_voice_command_wins() {
        let speech = SpeechConfig {
            command: Some("my-tts".into()),
            ..SpeechConfig::default()
        };
        assert_eq!(voice(&speech).map(|v| v.program().to_string()).as_deref(), Some("my-tts"));
    }

    #[tokio::test]
    async fn text_only_voice_is_silent() {
        let voice = assistant_voice(&SpeechConfig::default(), true);
        assert!(voice.speak("Gear down.").await.is_ok());
    }

    #[test]
    fn default_provider_is_ollama() {
        let provider = default_provider(&AppConfig::default()).unwrap();
        assert_eq!(provider.name(), "ollama");
    }
}
