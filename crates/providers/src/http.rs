//! HTTP plumbing shared by the providers.

use flightdeck_core::error::ProviderError;
use std::time::Duration;
use tracing::warn;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// Map non-success statuses onto [`ProviderError`].
pub(crate) async fn check_status(
    response: reqwest::Response,
    model: &str,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();
    if response.status().is_success() {
        return Ok(response);
    }

    let retry_after_secs = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(5);
    let body = response.text().await.unwrap_or_default();

    Err(status_error(status, model, body, retry_after_secs))
}

fn status_error(status: u16, model: &str, body: String, retry_after_secs: u64) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited { retry_after_secs },
        401 | 403 => ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        404 => ProviderError::ModelNotFound(model.to_string()),
        408 | 504 => ProviderError::Timeout(format!("status {status}")),
        _ => {
            warn!(status, body = %body, "Provider returned error");
            ProviderError::ApiError {
                status_code: status,
                message: body,
            }
        }
    }
}

/// Splits a streamed body into lines, decoding only complete lines so a
/// multi-byte character split across network chunks survives intact.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Next complete line without its `\n` or `\r\n` terminator.
    pub(crate) fn next_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.pending.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Whatever is left once the body has ended.
    pub(crate) fn finish(self) -> String {
        String::from_utf8_lossy(&self.pending).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_split_across_chunks_is_kept() {
        let line = "{\"content\":\"altitud ñ\"}\n".as_bytes();
        let split = line.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut buffer = LineBuffer::default();
        buffer.push(&line[..split]);
        assert_eq!(buffer.next_line(), None);
        buffer.push(&line[split..]);

        assert_eq!(buffer.next_line().as_deref(), Some("{\"content\":\"altitud ñ\"}"));
        assert_eq!(buffer.next_line(), None);
    }

    #[test]
    fn lines_lose_crlf_and_tail_is_kept() {
        let mut buffer = LineBuffer::default();
        buffer.push(b"data: one\r\n\ndata: tw");
        buffer.push(b"o");

        assert_eq!(buffer.next_line().as_deref(), Some("data: one"));
        assert_eq!(buffer.next_line().as_deref(), Some(""));
        assert_eq!(buffer.next_line(), None);
        assert_eq!(buffer.finish(), "data: two");
    }

    #[test]
    fn statuses_map_to_errors() {
        assert!(matches!(
            status_error(429, "m", String::new(), 7),
            ProviderError::RateLimited { retry_after_secs: 7 }
        ));
        assert!(matches!(
            status_error(401, "m", String::new(), 5),
            ProviderError::AuthenticationFailed(_)
        ));
        match status_error(404, "gemma3:27b", String::new(), 5) {
            ProviderError::ModelNotFound(model) => assert_eq!(model, "gemma3:27b"),
            other => panic!("unexpected {other:?}"),
        }
        match status_error(500, "m", "boom".into(), 5) {
            ProviderError::ApiError { status_code, message } => {
                assert_eq!(status_code, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
