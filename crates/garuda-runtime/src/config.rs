//! Runtime configuration loaded from YAML.
//!
//! Every field has a default, so an empty file (or no file) is valid.
//!
//! ```yaml
//! provider: gemini
//! provider_config:
//!   base_url: https://generativelanguage.googleapis.com/v1beta
//! model: gemini-2.5-flash
//! temperature: 0.2
//! # max_tokens: 8192   # optional output cap
//! timeout: 2m
//! sheet: Main
//! label: Assertion
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use garuda_core::{ASSERTION_LABEL, DEFAULT_MAIN_SHEET};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::providers::CompletionConfig;

/// Errors loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Provider type registered in the [`ProviderRegistry`](crate::ProviderRegistry)
    pub provider: String,

    /// Free-form settings handed to the provider factory
    pub provider_config: JsonValue,

    /// Model override; the provider's default is used when unset
    pub model: Option<String>,

    pub temperature: f32,

    /// Output token cap; unset leaves the limit to the provider
    pub max_tokens: Option<u32>,

    /// Per-request timeout, e.g. `"120s"` or `"2m"`
    #[serde(with = "humantime_duration")]
    pub timeout: Duration,

    /// Reasoning budget; `-1` lets the model decide
    pub thinking_budget: Option<i32>,

    /// Worksheet holding the assertion table
    pub sheet: String,

    /// Header label that anchors the table
    pub label: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            provider_config: JsonValue::Object(Default::default()),
            model: None,
            temperature: 0.2,
            max_tokens: None,
            timeout: Duration::from_secs(120),
            thinking_budget: Some(-1),
            sheet: DEFAULT_MAIN_SHEET.to_string(),
            label: ASSERTION_LABEL.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = if yaml.trim().is_empty() {
            RuntimeConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.trim().is_empty() {
            return Err(ConfigError::Invalid("provider must not be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == Some(0) {
            return Err(ConfigError::Invalid("max_tokens must be positive".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be positive".to_string()));
        }
        if self.sheet.trim().is_empty() || self.label.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "sheet and label must not be empty".to_string(),
            ));
        }
        if !self.provider_config.is_object() {
            return Err(ConfigError::Invalid(
                "provider_config must be a mapping".to_string(),
            ));
        }
        Ok(())
    }

    /// Request settings, using `default_model` when no model is configured.
    pub fn completion_config(&self, default_model: &str) -> CompletionConfig {
        CompletionConfig {
            model: self
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
            thinking_budget: self.thinking_budget,
        }
    }
}

mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
