//! Token accounting for an evaluation run.

use serde::{Deserialize, Serialize};

use crate::providers::TokenUsage;

/// Accumulated LLM usage for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmUsage {
    /// Total tokens used
    pub total_tokens: u32,

    /// Prompt/input tokens
    pub prompt_tokens: u32,

    /// Completion/output tokens
    pub completion_tokens: u32,

    /// Reasoning tokens (Gemini)
    pub thinking_tokens: u32,

    /// Successful LLM calls
    pub llm_calls: u32,

    /// Calls that returned a provider error
    pub failed_calls: u32,
}

impl LlmUsage {
    /// Add token usage from a provider response.
    pub fn record(&mut self, usage: &TokenUsage) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(usage.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(usage.completion_tokens);
        self.thinking_tokens = self.thinking_tokens.saturating_add(usage.thinking_tokens);
        self.total_tokens = self.total_tokens.saturating_add(usage.total());
        self.llm_calls = self.llm_calls.saturating_add(1);
    }

    pub fn record_failure(&mut self) {
        self.failed_calls = self.failed_calls.saturating_add(1);
    }
}
