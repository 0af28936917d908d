//! Anthropic Claude provider implementation.
//!
//! Uses the Messages API. The system message, if any, is sent in the
//! top-level `system` field.

use super::{
    build_http_client,
    factory::ProviderFactory,
    map_send_error, retry_after,
    secrets::{ApiCredential, CredentialSource},
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Environment variable name for Anthropic API key.
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Model used when configuration does not name one.
pub const ANTHROPIC_DEFAULT_MODEL: &str = "claude-sonnet-4-5";

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

/// The Messages API requires `max_tokens`; used when the config leaves it unset.
pub const ANTHROPIC_DEFAULT_MAX_TOKENS: u32 = 8192;

/// Anthropic Claude provider.
///
/// The API key lives in an [`ApiCredential`], so `Debug` output never
/// contains it.
pub struct AnthropicProvider {
    credential: ApiCredential,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AnthropicProvider {
    /// Create a new Anthropic provider.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Ok(Self {
            credential: ApiCredential::new(
                api_key,
                CredentialSource::Programmatic,
                "Anthropic API key",
            ),
            base_url: ANTHROPIC_BASE_URL.to_string(),
            client: build_http_client()?,
        })
    }

    /// Create from JSON configuration with environment fallback.
    ///
    /// 1. `api_key` in the config
    /// 2. `ANTHROPIC_API_KEY` environment variable
    /// 3. error if neither is set
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_config_or_env(
            config,
            "api_key",
            ANTHROPIC_API_KEY_ENV,
            "Anthropic API key",
        )?;

        let base_url = config["base_url"]
            .as_str()
            .unwrap_or(ANTHROPIC_BASE_URL)
            .to_string();

        Ok(Self {
            credential,
            base_url,
            client: build_http_client()?,
        })
    }

    /// Set custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Anthropic API request format.
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

/// Anthropic API response format.
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlockResponse>,
    model: String,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlockResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

fn build_request(messages: Vec<ChatMessage>, config: &CompletionConfig) -> AnthropicRequest {
    let mut system: Option<String> = None;
    let mut api_messages = Vec::new();

    for msg in messages {
        if msg.is_system() {
            system = Some(match system {
                Some(existing) => format!("{}\n\n{}", existing, msg.content),
                None => msg.content,
            });
        } else {
            api_messages.push(AnthropicMessage {
                role: msg.role,
                content: msg.content,
            });
        }
    }

    AnthropicRequest {
        model: config.model.clone(),
        max_tokens: config.max_tokens.unwrap_or(ANTHROPIC_DEFAULT_MAX_TOKENS),
        system,
        messages: api_messages,
        temperature: config.temperature,
    }
}

/// Join the text blocks of a reply, rejecting truncated or empty ones.
fn response_text(body: &AnthropicResponse) -> Result<String, ProviderError> {
    let stop_reason = body.stop_reason.as_deref().unwrap_or("unknown");
    if stop_reason == "max_tokens" {
        return Err(ProviderError::IncompleteResponse(
            "output token limit reached (stop_reason max_tokens)".to_string(),
        ));
    }

    let text = body
        .content
        .iter()
        .filter_map(|block| block.text.as_deref())
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(ProviderError::IncompleteResponse(format!(
            "no text in response (stop_reason {})",
            stop_reason
        )));
    }

    Ok(text)
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = build_request(messages, config);

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.credential.expose())
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_send_error(e, config.timeout))?;

        let status = response.status();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after: retry_after(response.headers()),
            });
        }

        if status == 401 {
            return Err(ProviderError::AuthError);
        }

        if !status.is_success() {
            let error_body = response
                .json::<AnthropicError>()
                .await
                .map_err(|e| ProviderError::ParseError(e.to_string()))?;

            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: error_body.error.message,
            });
        }

        let body: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let content = response_text(&body)?;

        Ok(CompletionResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: body.usage.input_tokens,
                completion_tokens: body.usage.output_tokens,
                thinking_tokens: 0,
            },
            model: body.model,
            stop_reason: body.stop_reason,
        })
    }

    async fn health_check(&self) -> bool {
        !self.credential.is_empty()
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        ANTHROPIC_DEFAULT_MODEL
    }
}

/// Factory for creating Anthropic providers from configuration.
///
/// ## Configuration Format
/// ```json
/// {
///   "api_key": "sk-ant-...",     // Optional, falls back to ANTHROPIC_API_KEY env
///   "base_url": "https://..."    // Optional, custom API endpoint
/// }
/// ```
pub struct AnthropicProviderFactory;

impl ProviderFactory for AnthropicProviderFactory {
    fn provider_type(&self) -> &'static str {
        "anthropic"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let provider = AnthropicProvider::from_config(config)?;
        Ok(Arc::new(provider))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        if !ApiCredential::is_available(config, "api_key", ANTHROPIC_API_KEY_ENV) {
            return Err(ProviderError::NotConfigured(format!(
                "Anthropic API key required: set 'api_key' in config or {} env",
                ANTHROPIC_API_KEY_ENV
            )));
        }

        if let Some(url) = config["base_url"].as_str() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ProviderError::NotConfigured(
                    "base_url must start with http:// or https://".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn default_config(&self) -> JsonValue {
        serde_json::json!({ "model": ANTHROPIC_DEFAULT_MODEL })
    }

    fn description(&self) -> &'static str {
        "Anthropic Claude provider (Messages API)"
    }
}
