//! Error types for the FlightDeck domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all FlightDeck operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Telemetry errors ---
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    // --- Speech errors ---
    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum TelemetryError {
    #[error("Unsupported game type: {0}")]
    UnsupportedGame(String),

    #[error("{0} support is not yet implemented")]
    NotImplemented(String),

    #[error("Telemetry source unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to capture telemetry from {source_name}: {reason}")]
    Fetch { source_name: String, reason: String },

    #[error("Unknown warning '{key}' for {source_name}")]
    UnknownWarning { source_name: String, key: String },
}

#[derive(Debug, Clone, Error)]
pub enum SpeechError {
    #[error("Speech input failed: {0}")]
    InputFailed(String),

    #[error("Speech output failed: {0}")]
    OutputFailed(String),

    #[error("Speech engine unavailable: {0}")]
    EngineUnavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn telemetry_error_displays_game_name() {
        let err = Error::Telemetry(TelemetryError::UnsupportedGame("unknown_game".into()));
        assert_eq!(
            err.to_string(),
            "Telemetry error: Unsupported game type: unknown_game"
        );

        let err = TelemetryError::NotImplemented("iRacing".into());
        assert_eq!(err.to_string(), "iRacing support is not yet implemented");
    }

    #[test]
    fn speech_error_converts_into_domain_error() {
        let err: Error = SpeechError::OutputFailed("say exited with 1".into()).into();
        assert!(matches!(err, Error::Speech(_)));
        assert!(err.to_string().contains("say exited with 1"));
    }
}
