//! The LLM side of a conversational turn.

use async_trait::async_trait;
use flightdeck_core::error::ProviderError;
use flightdeck_core::message::Message;
use flightdeck_core::provider::{Provider, ProviderRequest, Responder};
use std::sync::Arc;
use tracing::debug;

/// Answers pilot questions through a [`Provider`].
///
/// The system prompt is the base instructions, then the telemetry source's
/// own guidance, then the assembled telemetry context for the turn.
pub struct LlmResponder {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    instructions: String,
}

impl LlmResponder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            instructions: String::new(),
        }
    }

    /// Set the base instructions and append source-specific guidance.
    pub fn with_instructions(mut self, base: &str, source_context: Option<&str>) -> Self {
        let mut instructions = base.trim().to_string();
        if let Some(extra) = source_context.map(str::trim).filter(|s| !s.is_empty()) {
            if !instructions.is_empty() {
                instructions.push_str("\n\n");
            }
            instructions.push_str(extra);
        }
        self.instructions = instructions;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn system_prompt(&self, context: &str) -> String {
        if self.instructions.is_empty() {
            context.to_string()
        } else {
            format!("{}\n\n{}", self.instructions, context)
        }
    }
}

#[async_trait]
impl Responder for LlmResponder {
    async fn respond(&self, context: &str, utterance: &str) -> Result<String, ProviderError> {
        let mut request = ProviderRequest::new(
            self.model.clone(),
            vec![
                Message::system(self.system_prompt(context)),
                Message::user(utterance),
            ],
        );
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;

        let response = self.provider.complete(request).await?;
        if let Some(usage) = &response.usage {
            debug!(
                provider = self.provider.name(),
                model = %response.model,
                tokens = usage.total_tokens,
                "LLM reply received"
            );
        }
        Ok(response.message.content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flightdeck_core::provider::ProviderResponse;
    use std::sync::Mutex;

    /// Records the last request and replies with a fixed text.
    struct MockProvider {
        reply: String,
        seen: Mutex<Option<ProviderRequest>>,
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            *self.seen.lock().unwrap() = Some(request.clone());
            Ok(ProviderResponse {
                message: Message::assistant(&self.reply),
                usage: None,
                model: request.model,
            })
        }
    }

    struct DownProvider;

    #[async_trait]
    impl Provider for DownProvider {
        fn name(&self) -> &str {
            "down"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::Network("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn builds_layered_prompt_and_trims_reply() {
        let provider = Arc::new(MockProvider {
            reply: "  You are at 6500 feet.\n".into(),
            seen: Mutex::new(None),
        });
        let responder = LlmResponder::new(provider.clone(), "gemma3:27b")
            .with_instructions("Be brief.", Some("Altitude is in feet."))
            .with_temperature(0.2)
            .with_max_tokens(128);

        let reply = responder
            .respond("Current game data:\n{}", "how high are we?")
            .await
            .unwrap();
        assert_eq!(reply, "You are at 6500 feet.");

        let request = provider.seen.lock().unwrap().clone().unwrap();
        assert_eq!(request.model, "gemma3:27b");
        assert_eq!(request.temperature, 0.2);
        assert_eq!(request.max_tokens, Some(128));
        assert_eq!(request.messages.len(), 2);
        assert_eq!(
            request.messages[0].content,
            "Be brief.\n\nAltitude is in feet.\n\nCurrent game data:\n{}"
        );
        assert_eq!(request.messages[1].content, "how high are we?");
    }

    #[test]
    fn blank_source_context_is_ignored() {
        let responder = LlmResponder::new(Arc::new(DownProvider), "m")
            .with_instructions("Base.", Some("   "));
        assert_eq!(responder.system_prompt("ctx"), "Base.\n\nctx");

        let bare = LlmResponder::new(Arc::new(DownProvider), "m");
        assert_eq!(bare.system_prompt("ctx"), "ctx");
    }

    #[tokio::test]
    async fn provider_errors_pass_through() {
        let responder = LlmResponder::new(Arc::new(DownProvider), "m");
        let err = responder.respond("ctx", "hello").await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }
}
