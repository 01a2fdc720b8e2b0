//! `flightdeck prompt`: one-shot prompt, streamed to the terminal.

use flightdeck_core::Message;
use flightdeck_core::speech::SpeechOutput;

use super::{CommandResult, default_provider, load_config, request, stream_reply, voice};

pub async fn run(prompt: &str, speak: bool, model: Option<String>) -> CommandResult {
    let config = load_config()?;
    let provider = default_provider(&config)?;

    // Resolve the voice before spending time on the LLM.
    let speaker = if speak {
        Some(voice(&config.speech).ok_or(
            "No text-to-speech engine found. Install espeak-ng or set speech.command in config.toml",
        )?)
    } else {
        None
    };

    let req = request(&config, model, vec![Message::user(prompt)]);
    let reply = stream_reply(provider.as_ref(), req).await?;

    if let Some(speaker) = speaker {
        speaker.speak(&reply).await?;
    }
    Ok(())
}
