//! LLM provider abstractions for garuda-runtime.
//!
//! This module defines the trait for LLM providers and includes
//! implementations for Google Gemini and Anthropic.
//!
//! ## Security
//!
//! All providers use the [`secrets`] module for credential handling.
//! See [`ApiCredential`] for the recommended patterns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

mod factory;
pub mod secrets;

#[cfg(feature = "anthropic")]
mod anthropic;

#[cfg(feature = "gemini")]
mod gemini;

pub use factory::{ProviderFactory, ProviderRegistry};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicProvider, AnthropicProviderFactory};

#[cfg(feature = "gemini")]
pub use gemini::{GeminiProvider, GeminiProviderFactory};

/// Errors from LLM providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Incomplete response: {0}")]
    IncompleteResponse(String),
}

/// Configuration for a completion request.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Model to use
    pub model: String,

    /// Output token cap; `None` leaves it to the provider
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout
    pub timeout: Duration,

    /// Reasoning budget in tokens; `-1` lets the model decide (Gemini-specific)
    pub thinking_budget: Option<i32>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            max_tokens: None,
            temperature: 0.2,
            timeout: Duration::from_secs(120),
            thinking_budget: Some(-1),
        }
    }
}

/// A chat message for LLM completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant"
    pub role: String,

    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == "system"
    }
}

/// Response from an LLM completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated content
    pub content: String,

    /// Token usage
    pub usage: TokenUsage,

    /// Model used
    pub model: String,

    /// Stop reason
    pub stop_reason: Option<String>,
}

/// Token usage from a completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,

    /// Tokens spent on model reasoning (Gemini)
    pub thinking_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used.
    pub fn total(&self) -> u32 {
        self.prompt_tokens
            .saturating_add(self.completion_tokens)
            .saturating_add(self.thinking_tokens)
    }
}

/// Provider abstraction allows swapping LLM backends.
///
/// The runner only ever sees this trait; the HTTP client lives inside each
/// provider instance.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute a chat completion.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Check if provider is usable (credentials present).
    async fn health_check(&self) -> bool;

    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Model used when the configuration does not name one.
    fn default_model(&self) -> &str;

    /// Estimate tokens for a prompt.
    fn estimate_tokens(&self, text: &str) -> u32 {
        // Simple estimate: ~4 chars per token
        (text.len() / 4) as u32
    }
}

/// Value of a `retry-after` header in seconds, if present.
#[cfg(any(feature = "gemini", feature = "anthropic"))]
pub(crate) fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Build the HTTP client owned by a provider instance.
#[cfg(any(feature = "gemini", feature = "anthropic"))]
pub(crate) fn build_http_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .build()
        .map_err(|e| ProviderError::HttpError(e.to_string()))
}

/// Map a transport error, keeping timeouts distinct.
#[cfg(any(feature = "gemini", feature = "anthropic"))]
pub(crate) fn map_send_error(e: reqwest::Error, timeout: Duration) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::HttpError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_creation() {
        let system = ChatMessage::system("You are a reviewer.");
        assert_eq!(system.role, "system");
        assert!(system.is_system());

        let user = ChatMessage::user("Evaluate: Cash exists");
        assert_eq!(user.role, "user");
        assert!(!user.is_system());
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 50,
            thinking_tokens: 25,
        };
        assert_eq!(usage.total(), 175);
    }

    #[test]
    fn test_token_usage_total_saturates() {
        let usage = TokenUsage {
            prompt_tokens: u32::MAX,
            completion_tokens: 10,
            thinking_tokens: 10,
        };
        assert_eq!(usage.total(), u32::MAX);
    }

    #[test]
    fn test_completion_config_defaults() {
        let config = CompletionConfig::default();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.thinking_budget, Some(-1));
        assert_eq!(config.max_tokens, None);
    }
}
