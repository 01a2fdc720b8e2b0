//! Native Ollama provider.
//!
//! Talks to `/api/chat` directly instead of the OpenAI shim so that local
//! sampling options and NDJSON streaming work the way Ollama documents them.
//! Models are listed through `/api/tags`.

use async_trait::async_trait;
use futures::StreamExt;
use flightdeck_core::error::ProviderError;
use flightdeck_core::message::Message;
use flightdeck_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::http::{LineBuffer, build_client, check_status};

pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// `base_url` is the server root, e.g. `http://localhost:11434`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_client(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_request<'a>(request: &'a ProviderRequest, stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream,
            options: ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
                stop: &request.stop,
            },
        }
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new("http://localhost:11434")
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        debug!(model = %request.model, "Sending Ollama chat request");

        let response = self
            .client
            .post(&url)
            .json(&Self::chat_request(&request, false))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let response = check_status(response, &request.model).await?;

        let body: ChatResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse Ollama response: {e}"),
        })?;

        let usage = body.usage();
        Ok(ProviderResponse {
            message: Message::assistant(body.message.map(|m| m.content).unwrap_or_default()),
            usage,
            model: body.model,
        })
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        let url = format!("{}/api/chat", self.base_url);
        debug!(model = %request.model, "Sending Ollama streaming request");

        let response = self
            .client
            .post(&url)
            .json(&Self::chat_request(&request, true))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let response = check_status(response, &request.model).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // One JSON object per line; the last one carries `done: true`
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = LineBuffer::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                buffer.push(&bytes);

                while let Some(line) = buffer.next_line() {
                    let Some(chunk) = parse_ndjson_line(line.trim()) else {
                        continue;
                    };
                    let chunk = match chunk {
                        Ok(c) => c,
                        Err(e) => {
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    };
                    let done = chunk.done;
                    if tx.send(Ok(chunk)).await.is_err() || done {
                        return;
                    }
                }
            }

            // Trailing line without newline, then close the stream
            if let Some(Ok(chunk)) = parse_ndjson_line(buffer.finish().trim()) {
                let done = chunk.done;
                let _ = tx.send(Ok(chunk)).await;
                if done {
                    return;
                }
            }
            let _ = tx.send(Ok(StreamChunk::finished(None))).await;
        });

        Ok(rx)
    }

    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Ok(Vec::new());
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

/// Parse one NDJSON line. `None` for blank lines.
fn parse_ndjson_line(line: &str) -> Option<Result<StreamChunk, ProviderError>> {
    if line.is_empty() {
        return None;
    }

    let parsed: ChatResponse = match serde_json::from_str(line) {
        Ok(p) => p,
        Err(e) => {
            trace!(data = %line, error = %e, "Ignoring unparseable Ollama chunk");
            return None;
        }
    };

    if let Some(error) = &parsed.error {
        return Some(Err(ProviderError::StreamInterrupted(error.clone())));
    }

    let usage = parsed.usage();
    Some(Ok(StreamChunk {
        content: parsed.message.map(|m| m.content).filter(|c| !c.is_empty()),
        done: parsed.done,
        usage,
    }))
}

// --- Ollama API types (internal) ---

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions<'a>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions<'a> {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "no_stop_sequences")]
    stop: &'a [String],
}

fn no_stop_sequences(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

impl ChatResponse {
    fn usage(&self) -> Option<Usage> {
        if !self.done {
            return None;
        }
        let prompt = self.prompt_eval_count?;
        let completion = self.eval_count.unwrap_or(0);
        Some(Usage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_shape() {
        let mut request = ProviderRequest::new(
            "gemma3:27b",
            vec![Message::system("be brief"), Message::user("altitude?")],
        );
        request.max_tokens = Some(128);

        let json = serde_json::to_value(OllamaProvider::chat_request(&request, true)).unwrap();
        assert_eq!(json["model"], "gemma3:27b");
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "altitude?");
        assert_eq!(json["options"]["num_predict"], 128);
        assert!(json["options"].get("stop").is_none());
    }

    #[test]
    fn ndjson_content_line() {
        let line = r#"{"model":"gemma3:27b","message":{"role":"assistant","content":"Climbing"},"done":false}"#;
        let chunk = parse_ndjson_line(line).unwrap().unwrap();
        assert_eq!(chunk.content.as_deref(), Some("Climbing"));
        assert!(!chunk.done);
        assert!(chunk.usage.is_none());
    }

    #[test]
    fn ndjson_final_line_carries_usage() {
        let line = r#"{"model":"gemma3:27b","message":{"role":"assistant","content":""},"done":true,"prompt_eval_count":42,"eval_count":8}"#;
        let chunk = parse_ndjson_line(line).unwrap().unwrap();
        assert!(chunk.done);
        assert!(chunk.content.is_none());
        let usage = chunk.usage.unwrap();
        assert_eq!(usage.total_tokens, 50);
    }

    #[test]
    fn ndjson_error_and_blank_lines() {
        assert!(parse_ndjson_line("").is_none());
        assert!(parse_ndjson_line("not json").is_none());
        let err = parse_ndjson_line(r#"{"error":"model 'x' not found"}"#).unwrap();
        assert!(matches!(err, Err(ProviderError::StreamInterrupted(_))));
    }

    #[test]
    fn tags_response_parsing() {
        let body = r#"{"models":[{"name":"gemma3:27b","size":1},{"name":"llama3.2:latest"}]}"#;
        let tags: TagsResponse = serde_json::from_str(body).unwrap();
        let names: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["gemma3:27b", "llama3.2:latest"]);
    }

    #[test]
    fn default_points_at_localhost() {
        let provider = OllamaProvider::default();
        assert_eq!(provider.base_url(), "http://localhost:11434");
        assert_eq!(provider.name(), "ollama");
    }
}
