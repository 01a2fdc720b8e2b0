//! Configuration loading, validation, and management for FlightDeck.
//!
//! Loads configuration from `~/.flightdeck/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.flightdeck/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider ("ollama", "openai", or a key in `providers`)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Local Ollama server
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Simulator assistant loop
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Text-to-speech output
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Background worker bookkeeping
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "gemma3:27b".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("ollama", &self.ollama)
            .field("assistant", &self.assistant)
            .field("speech", &self.speech)
            .field("daemon", &self.daemon)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_host")]
    pub host: String,

    #[serde(default = "default_ollama_port")]
    pub port: u16,
}

fn default_ollama_host() -> String {
    "localhost".into()
}
fn default_ollama_port() -> u16 {
    11434
}

impl OllamaConfig {
    /// Base URL of the Ollama HTTP API.
    pub fn base_url(&self) -> String {
        if self.host.starts_with("http://") || self.host.starts_with("https://") {
            format!("{}:{}", self.host.trim_end_matches('/'), self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            port: default_ollama_port(),
        }
    }
}

/// Settings for the real-time simulator assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Telemetry source name ("dummy", "flight", "msfs", "iracing")
    #[serde(default = "default_game")]
    pub game: String,

    #[serde(default = "default_telemetry_interval_ms")]
    pub telemetry_interval_ms: u64,

    #[serde(default = "default_warning_interval_ms")]
    pub warning_interval_ms: u64,

    /// Sleep between loop iterations
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Number of snapshots kept for trend analysis
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default = "default_warning_cooldown_secs")]
    pub warning_cooldown_secs: u64,

    /// Cooldown for priority-3 warnings
    #[serde(default = "default_high_priority_cooldown_secs")]
    pub high_priority_cooldown_secs: u64,

    /// Utterances containing any of these end the session (case-insensitive)
    #[serde(default = "default_exit_keywords")]
    pub exit_keywords: Vec<String>,

    #[serde(default = "default_farewell")]
    pub farewell: String,

    /// Base instructions for the LLM
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Per-key overrides of the telemetry source's trend thresholds
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub trend_thresholds: BTreeMap<String, f64>,
}

fn default_game() -> String {
    "dummy".into()
}
fn default_telemetry_interval_ms() -> u64 {
    1000
}
fn default_warning_interval_ms() -> u64 {
    3000
}
fn default_tick_ms() -> u64 {
    100
}
fn default_history_capacity() -> usize {
    10
}
fn default_warning_cooldown_secs() -> u64 {
    30
}
fn default_high_priority_cooldown_secs() -> u64 {
    15
}
fn default_exit_keywords() -> Vec<String> {
    vec!["exit".into(), "finalizar".into()]
}
fn default_farewell() -> String {
    "Ending the session. Fly safe.".into()
}
fn default_system_prompt() -> String {
    "You are an in-game assistant giving real-time help to the player. \
     Every question comes with the current game data as JSON. Answer directly \
     from that data and pull out specific values when asked for them. Keep \
     replies short enough to be read aloud and never invent values. Point out \
     warnings or critical values that need attention."
        .into()
}

impl AssistantConfig {
    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry_interval_ms)
    }

    pub fn warning_interval(&self) -> Duration {
        Duration::from_millis(self.warning_interval_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn warning_cooldown(&self) -> Duration {
        Duration::from_secs(self.warning_cooldown_secs)
    }

    pub fn high_priority_cooldown(&self) -> Duration {
        Duration::from_secs(self.high_priority_cooldown_secs)
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            game: default_game(),
            telemetry_interval_ms: default_telemetry_interval_ms(),
            warning_interval_ms: default_warning_interval_ms(),
            tick_ms: default_tick_ms(),
            history_capacity: default_history_capacity(),
            warning_cooldown_secs: default_warning_cooldown_secs(),
            high_priority_cooldown_secs: default_high_priority_cooldown_secs(),
            exit_keywords: default_exit_keywords(),
            farewell: default_farewell(),
            system_prompt: default_system_prompt(),
            trend_thresholds: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Speak replies and warnings aloud (otherwise print only)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// TTS command; auto-detected when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// Words per minute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<u32>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: None,
            voice: None,
            rate: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Defaults to `~/.flightdeck/sim.pid`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid_file: Option<PathBuf>,

    /// Where the detached worker writes its output; defaults to `~/.flightdeck/sim.log`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl DaemonConfig {
    pub fn pid_path(&self) -> PathBuf {
        self.pid_file
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("sim.pid"))
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("sim.log"))
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.flightdeck/config.toml).
    ///
    /// Also checks environment variables:
    /// - `FLIGHTDECK_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `FLIGHTDECK_PROVIDER`, `FLIGHTDECK_MODEL`
    /// - `OLLAMA_HOST`, `OLLAMA_PORT`, `OLLAMA_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides, reading variables through `var`.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = var("FLIGHTDECK_API_KEY").or_else(|| var("OPENAI_API_KEY"));
        }

        if let Some(provider) = var("FLIGHTDECK_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = var("FLIGHTDECK_MODEL") {
            self.default_model = model;
        } else if self.default_provider == "ollama" {
            if let Some(model) = var("OLLAMA_MODEL") {
                self.default_model = model;
            }
        }

        if let Some(host) = var("OLLAMA_HOST") {
            self.ollama.host = host;
        }

        if let Some(port) = var("OLLAMA_PORT") {
            match port.parse() {
                Ok(p) => self.ollama.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid OLLAMA_PORT"),
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".flightdeck")
    }

    /// Path of the main config file.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let a = &self.assistant;
        if a.telemetry_interval_ms == 0 || a.warning_interval_ms == 0 || a.tick_ms == 0 {
            return Err(ConfigError::ValidationError(
                "assistant intervals and tick_ms must be > 0".into(),
            ));
        }

        if a.tick_ms > a.warning_interval_ms {
            return Err(ConfigError::ValidationError(
                "assistant.tick_ms must not exceed warning_interval_ms".into(),
            ));
        }

        if a.history_capacity < 2 {
            return Err(ConfigError::ValidationError(
                "assistant.history_capacity must be at least 2 to compute trends".into(),
            ));
        }

        if a.exit_keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "assistant.exit_keywords must contain at least one keyword".into(),
            ));
        }

        if let Some((key, _)) = a.trend_thresholds.iter().find(|(_, t)| !(**t >= 0.0)) {
            return Err(ConfigError::ValidationError(format!(
                "assistant.trend_thresholds.{key} must be >= 0"
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            ollama: OllamaConfig::default(),
            assistant: AssistantConfig::default(),
            speech: SpeechConfig::default(),
            daemon: DaemonConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
