//! # garuda-runtime
//!
//! LLM-backed evaluation for Garuda.
//!
//! `garuda-core` turns a workbook into per-assertion contexts and never
//! talks to a model. This crate owns everything that does: provider
//! clients, the review prompt, configuration and the sequential
//! [`EvaluationRunner`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use garuda_core::{ReportRenderer, SpreadsheetWorkbook};
//! use garuda_runtime::{EvaluationRunner, ProviderRegistry, RuntimeConfig};
//!
//! let registry = ProviderRegistry::with_defaults();
//! let mut runner = EvaluationRunner::from_registry(&registry, RuntimeConfig::default()).await?;
//!
//! let mut workbook = SpreadsheetWorkbook::open("workpaper.xlsx")?;
//! let run = runner
//!     .run(&mut workbook, |done, total| eprintln!("Processing {}/{} ...", done, total))
//!     .await?;
//!
//! ReportRenderer::new().write(&run.records, "report.pdf")?;
//! ```

pub mod config;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod usage;

pub use config::{ConfigError, RuntimeConfig};
pub use orchestrator::{EvaluationRun, EvaluationRunner, RunState, RuntimeError};
pub use prompts::{build_review_prompt, REVIEW_INSTRUCTIONS};
pub use providers::{
    ApiCredential, ChatMessage, CompletionConfig, CompletionResponse, CredentialSource,
    LlmProvider, ProviderError, ProviderFactory, ProviderRegistry, TokenUsage,
};
pub use usage::LlmUsage;

#[cfg(feature = "gemini")]
pub use providers::{GeminiProvider, GeminiProviderFactory};

#[cfg(feature = "anthropic")]
pub use providers::{AnthropicProvider, AnthropicProviderFactory};
