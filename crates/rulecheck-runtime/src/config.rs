//! Runtime configuration.
//!
//! Loaded from YAML or JSON; every field has a default so an empty file
//! is a valid configuration:
//!
//! ```yaml
//! provider: gemini
//! model: gemini-flash-latest
//! timeout: 45s
//! max_concurrency: 4
//! retry:
//!   max_attempts: 3
//!   min_delay: 500ms
//!   max_delay: 10s
//! allow_ocr: true
//! provider_options:
//!   base_url: https://generativelanguage.googleapis.com/v1beta
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::providers::CompletionConfig;

/// Errors loading or validating a [`RuntimeConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML config: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON config: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Configuration for a [`RuleChecker`](crate::RuleChecker).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Provider type registered in the [`ProviderRegistry`](crate::ProviderRegistry)
    pub provider: String,

    /// Model name; the provider's default when unset
    pub model: Option<String>,

    pub max_tokens: u32,

    /// 0.0 keeps answers deterministic
    pub temperature: f32,

    /// Per-call timeout, e.g. "30s"
    #[serde(with = "humantime_duration")]
    pub timeout: Duration,

    /// Rules checked concurrently
    pub max_concurrency: usize,

    pub retry: RetryConfig,

    /// OCR pages without a text layer when tesseract is installed
    pub allow_ocr: bool,

    /// Passed verbatim to the provider factory
    pub provider_options: JsonValue,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: None,
            max_tokens: 1024,
            temperature: 0.0,
            timeout: Duration::from_secs(60),
            max_concurrency: 4,
            retry: RetryConfig::default(),
            allow_ocr: false,
            provider_options: JsonValue::Object(Default::default()),
        }
    }
}

/// Bounded exponential retry for retryable provider errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per rule, including the first
    pub max_attempts: u32,

    #[serde(with = "humantime_duration")]
    pub min_delay: Duration,

    #[serde(with = "humantime_duration")]
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

impl RuntimeConfig {
    /// Parse from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; `.json` is parsed as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.trim().is_empty() {
            return Err(ConfigError::Invalid("provider must not be empty".to_string()));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.min_delay > self.retry.max_delay {
            return Err(ConfigError::Invalid(
                "retry.min_delay must not exceed retry.max_delay".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be positive".to_string()));
        }
        if !self.provider_options.is_object() {
            return Err(ConfigError::Invalid(
                "provider_options must be a mapping".to_string(),
            ));
        }
        Ok(())
    }

    /// Completion settings for each call, falling back to `default_model`.
    pub fn completion_config(&self, default_model: &str) -> CompletionConfig {
        CompletionConfig {
            model: self
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
            prompt_caching: true,
        }
    }
}
