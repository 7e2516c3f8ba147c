//! Application configuration
//!
//! Settings are compiled in from `config.toml`; the API key is read from the
//! environment so it never lands in the binary.

use crate::error::VoiceError;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use zeroize::Zeroize;

/// Environment variable holding the OpenAI API key
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

const CONFIG_TOML: &str = include_str!("../config.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub recording: RecordingConfig,
    pub transcription: TranscriptionConfig,
    pub chat: ChatConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordingConfig {
    /// Auto-stop ceiling in seconds
    pub max_duration_secs: u64,
    /// Elapsed-time tick interval in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Largest payload accepted for upload
    pub max_upload_bytes: u64,
    /// Where finalized recordings are written (None = user cache dir)
    #[serde(default)]
    pub recordings_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Delete the recording once it has been transcribed (or has failed)
    pub auto_cleanup: bool,
    /// Language hint forwarded to the transcription endpoint
    #[serde(default)]
    pub language_hint: Option<String>,
    pub chat_retry_attempts: u32,
    pub chat_retry_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            auto_cleanup: true,
            language_hint: None,
            chat_retry_attempts: 3,
            chat_retry_delay_ms: 1000,
        }
    }
}

fn default_tick_interval_ms() -> u64 {
    1000
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {field} URL: {source}")]
    InvalidEndpoint {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Load configuration from the embedded config.toml
pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_toml_str(CONFIG_TOML)
}

impl AppConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.transcription.endpoint).map_err(|source| {
            ConfigError::InvalidEndpoint {
                field: "transcription.endpoint",
                source,
            }
        })?;
        url::Url::parse(&self.chat.endpoint).map_err(|source| ConfigError::InvalidEndpoint {
            field: "chat.endpoint",
            source,
        })?;

        if self.recording.max_duration_secs == 0 {
            return Err(ConfigError::Invalid(
                "recording.max_duration_secs must be positive".into(),
            ));
        }
        if self.recording.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "recording.tick_interval_ms must be positive".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(ConfigError::Invalid(format!(
                "chat.temperature must be within 0.0..=2.0, got {}",
                self.chat.temperature
            )));
        }
        Ok(())
    }
}

impl RecordingConfig {
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Directory for finalized recordings
    pub fn recordings_dir(&self) -> PathBuf {
        if let Some(ref custom) = self.recordings_dir {
            return custom.clone();
        }
        dirs::cache_dir()
            .map(|d| d.join("Vaani").join("recordings"))
            .unwrap_or_else(|| std::env::temp_dir().join("vaani-recordings"))
    }
}

/// API credentials shared by the transcription and chat clients
pub struct Credentials {
    pub(crate) api_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Read the API key from the environment
    pub fn from_env() -> Result<Self, VoiceError> {
        match std::env::var(API_KEY_VAR) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(VoiceError::ApiKeyMissing {
                variable: API_KEY_VAR,
            }),
        }
    }
}

impl Clone for Credentials {
    fn clone(&self) -> Self {
        Self::new(self.api_key.clone())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        // Clear API key from memory
        self.api_key.zeroize();
    }
}
