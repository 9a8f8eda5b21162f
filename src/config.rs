//! Configuration for Abroadly.
//!
//! Everything is sourced from environment variables (with a `.env` file loaded
//! via dotenvy if present). The CLI may override individual values after
//! loading; see `main.rs`.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Main configuration for the assistant.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            llm: LlmConfig::from_env()?,
            session: SessionConfig::from_env()?,
        })
    }
}

/// LLM endpoint configuration.
///
/// Two model slots because the assistant makes two calls per turn: one for
/// the consultant reply, one for structured extraction. They default to the
/// same model but can be pointed at a cheaper one for extraction.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible endpoint.
    pub base_url: String,
    /// API key. Optional so local endpoints (Ollama, vLLM) work without one.
    pub api_key: Option<SecretString>,
    /// Model used for the conversational reply.
    pub chat_model: String,
    /// Model used for profile extraction.
    pub extract_model: String,
    /// Per-request timeout. A call that exceeds it is treated as absent
    /// (empty reply / no extraction), never blocks the turn.
    pub request_timeout: Duration,
    /// Extra attempts after the first failed extraction call.
    pub max_retries: u32,
}

impl LlmConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url =
            optional_env("LLM_BASE_URL")?.unwrap_or_else(|| "https://api.openai.com".to_string());

        let api_key = optional_env("OPENAI_API_KEY")?.map(|k| SecretString::new(k.into()));

        let chat_model =
            optional_env("ABROADLY_CHAT_MODEL")?.unwrap_or_else(|| "gpt-4o-mini".to_string());
        let extract_model =
            optional_env("ABROADLY_EXTRACT_MODEL")?.unwrap_or_else(|| chat_model.clone());

        let timeout_secs: u64 = parse_optional_env("ABROADLY_REQUEST_TIMEOUT_SECS", 60)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ABROADLY_REQUEST_TIMEOUT_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        let max_retries: u32 = parse_optional_env("ABROADLY_MAX_RETRIES", 2)?;

        Ok(Self {
            base_url,
            api_key,
            chat_model,
            extract_model,
            request_timeout: Duration::from_secs(timeout_secs),
            max_retries,
        })
    }
}

/// Session output configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory the end-of-session history and profile documents go to.
    pub output_dir: PathBuf,
}

impl SessionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let output_dir = match optional_env("ABROADLY_OUTPUT_DIR")? {
            Some(dir) => PathBuf::from(dir),
            None => default_output_dir(),
        };
        Ok(Self { output_dir })
    }
}

/// Default output directory: `~/.abroadly/sessions`.
pub fn default_output_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".abroadly")
        .join("sessions")
}

// Helper functions

pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!(
            "failed to read {key}: {e}"
        ))),
    }
}

pub(crate) fn parse_optional_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|s| {
            s.parse().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            })
        })
        .transpose()
        .map(|opt| opt.unwrap_or(default))
}
