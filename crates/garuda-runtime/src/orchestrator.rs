//! Sequential evaluation of every assertion block in a workbook.
//!
//! The runner walks blocks in table order: assemble context, call the
//! provider, parse the verdict, append a record, report progress. A failed
//! call or an unparseable reply becomes an `ERROR` record and the run
//! moves on; only problems that stop the run from starting are errors.

use std::sync::Arc;

use garuda_core::{
    extract_blocks, locate_table, parse_verdict, AssertionBlock, ContextAssembler,
    EvaluationRecord, TableError, Verdict, Workbook, WorkbookError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, RuntimeConfig};
use crate::prompts::build_review_prompt;
use crate::providers::{
    ChatMessage, CompletionConfig, LlmProvider, ProviderError, ProviderRegistry,
};
use crate::usage::LlmUsage;

/// Errors that prevent a run from starting.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Workbook(#[from] WorkbookError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Provider '{0}' is not usable: check its API key")]
    ProviderNotConfigured(String),
}

/// Where the runner is in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    /// Evaluating block `index` (1-based) of `total`
    InProgress { index: usize, total: usize },
    Done { total: usize },
}

/// Output of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRun {
    /// One record per assertion block, in table order
    pub records: Vec<EvaluationRecord>,

    pub usage: LlmUsage,
}

/// Evaluates assertion blocks one at a time against a single provider.
pub struct EvaluationRunner {
    provider: Arc<dyn LlmProvider>,
    config: RuntimeConfig,
    completion: CompletionConfig,
    state: RunState,
}

impl EvaluationRunner {
    /// Create a runner around an already constructed provider.
    pub fn new(provider: Arc<dyn LlmProvider>, config: RuntimeConfig) -> Self {
        let completion = config.completion_config(provider.default_model());
        Self {
            provider,
            config,
            completion,
            state: RunState::Pending,
        }
    }

    /// Create the configured provider from `registry` and wrap it in a runner.
    ///
    /// The provider settings are validated by their factory before any
    /// client is built.
    pub async fn from_registry(
        registry: &ProviderRegistry,
        config: RuntimeConfig,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        registry.validate(&config.provider, &config.provider_config)?;
        let provider = registry.create(&config.provider, &config.provider_config)?;

        if !provider.health_check().await {
            return Err(RuntimeError::ProviderNotConfigured(
                provider.name().to_string(),
            ));
        }

        Ok(Self::new(provider, config))
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Model the runner sends requests to.
    pub fn model(&self) -> &str {
        &self.completion.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Evaluate every assertion in the configured sheet.
    ///
    /// `progress` receives `(completed, total)` after each block. Fails only
    /// if the sheet cannot be read or the label is missing.
    pub async fn run<W, P>(
        &mut self,
        workbook: &mut W,
        progress: P,
    ) -> Result<EvaluationRun, RuntimeError>
    where
        W: Workbook + ?Sized,
        P: FnMut(usize, usize),
    {
        let main = workbook.read_sheet(&self.config.sheet)?;
        let table = locate_table(&main, &self.config.label)?;
        let blocks = extract_blocks(&table);

        Ok(self.evaluate_blocks(workbook, blocks, progress).await)
    }

    /// Evaluate pre-extracted blocks in order.
    pub async fn evaluate_blocks<W, P>(
        &mut self,
        workbook: &mut W,
        blocks: Vec<AssertionBlock>,
        mut progress: P,
    ) -> EvaluationRun
    where
        W: Workbook + ?Sized,
        P: FnMut(usize, usize),
    {
        let total = blocks.len();
        let mut records = Vec::with_capacity(total);
        let mut usage = LlmUsage::default();

        tracing::info!(
            blocks = total,
            provider = %self.provider.name(),
            model = %self.completion.model,
            "Starting evaluation run"
        );

        for (i, block) in blocks.into_iter().enumerate() {
            self.state = RunState::InProgress {
                index: i + 1,
                total,
            };

            let context = ContextAssembler::new(&mut *workbook).assemble(&block);
            let record = self.evaluate_block(block, &context, &mut usage).await;
            records.push(record);

            progress(i + 1, total);
        }

        self.state = RunState::Done { total };
        tracing::info!(
            records = records.len(),
            llm_calls = usage.llm_calls,
            failed_calls = usage.failed_calls,
            total_tokens = usage.total_tokens,
            "Evaluation run complete"
        );

        EvaluationRun { records, usage }
    }

    /// Evaluate one block given its assembled context.
    ///
    /// Never fails: provider and parse errors become `ERROR` verdicts.
    pub async fn evaluate_block(
        &self,
        block: AssertionBlock,
        context: &str,
        usage: &mut LlmUsage,
    ) -> EvaluationRecord {
        let prompt = build_review_prompt(context);
        tracing::debug!(
            assertion = %block.assertion,
            procedures = block.procedures.len(),
            estimated_tokens = self.provider.estimate_tokens(&prompt),
            "Evaluating assertion"
        );

        let response = match self
            .provider
            .complete(vec![ChatMessage::user(prompt)], &self.completion)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                usage.record_failure();
                tracing::warn!(assertion = %block.assertion, error = %e, "LLM call failed");
                let verdict = Verdict::error(format!("LLM evaluation error: {}", e));
                let raw = serde_json::to_string(&verdict)
                    .unwrap_or_else(|_| verdict.reasoning.clone());
                return EvaluationRecord::new(block, raw, verdict);
            }
        };

        usage.record(&response.usage);
        let raw = response.content.trim().to_string();

        let verdict = match parse_verdict(&raw) {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(assertion = %block.assertion, error = %e, "Unparseable model reply");
                Verdict::error(format!("Parse error: {}", e))
            }
        };

        tracing::debug!(
            assertion = %block.assertion,
            verdict = %verdict.verdict,
            confidence = verdict.confidence,
            model = %response.model,
            stop_reason = response.stop_reason.as_deref().unwrap_or("-"),
            "Assertion evaluated"
        );
        EvaluationRecord::new(block, raw, verdict)
    }
}

impl std::fmt::Debug for EvaluationRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationRunner")
            .field("provider", &self.provider.name())
            .field("model", &self.completion.model)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use garuda_core::{Grid, MemoryWorkbook, ProcedureEntry, VerdictKind};
    use serde_json::Value as JsonValue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::providers::{CompletionResponse, ProviderFactory, TokenUsage};

    /// Returns canned replies in order; `Err` entries simulate failed calls.
    struct ScriptedProvider {
        replies: Mutex<Vec<Result<String, ProviderError>>>,
        models: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
            let mut replies = replies;
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                models: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            self.models.lock().unwrap().push(config.model.clone());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ProviderError::HttpError("no reply".to_string())))?;
            Ok(CompletionResponse {
                content: reply,
                usage: TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    thinking_tokens: 0,
                },
                model: config.model.clone(),
                stop_reason: None,
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn default_model(&self) -> &str {
            "scripted-model"
        }
    }

    fn block(assertion: &str) -> AssertionBlock {
        AssertionBlock {
            assertion: assertion.to_string(),
            procedures: vec![ProcedureEntry::new(Some("Vouch".to_string()), None)],
        }
    }

    const TRUE_REPLY: &str =
        r#"{"verdict": "TRUE", "confidence": 90, "reasoning": "Ties out."}"#;

    #[tokio::test]
    async fn test_successful_reply_is_parsed() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(TRUE_REPLY.to_string())]));
        let runner = EvaluationRunner::new(provider, RuntimeConfig::default());
        let mut usage = LlmUsage::default();

        let record = runner.evaluate_block(block("Cash exists"), "ctx", &mut usage).await;

        assert_eq!(record.assertion, "Cash exists");
        assert_eq!(record.parsed_result.verdict, VerdictKind::True);
        assert_eq!(record.raw_result, TRUE_REPLY);
        assert_eq!(usage.llm_calls, 1);
        assert_eq!(usage.total_tokens, 15);
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_error_record() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::AuthError)]));
        let runner = EvaluationRunner::new(provider, RuntimeConfig::default());
        let mut usage = LlmUsage::default();

        let record = runner.evaluate_block(block("Cash exists"), "ctx", &mut usage).await;

        assert!(record.parsed_result.is_error());
        assert_eq!(record.parsed_result.confidence, 0);
        assert_eq!(
            record.parsed_result.reasoning,
            "LLM evaluation error: Authentication failed"
        );
        let raw: Verdict = serde_json::from_str(&record.raw_result).unwrap();
        assert_eq!(raw, record.parsed_result);
        assert_eq!(usage.failed_calls, 1);
    }

    #[tokio::test]
    async fn test_prose_reply_becomes_parse_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(
            "  I could not decide.  ".to_string()
        )]));
        let runner = EvaluationRunner::new(provider, RuntimeConfig::default());
        let mut usage = LlmUsage::default();

        let record = runner.evaluate_block(block("A"), "ctx", &mut usage).await;

        assert!(record.parsed_result.is_error());
        assert!(record.parsed_result.reasoning.starts_with("Parse error: "));
        assert_eq!(record.raw_result, "I could not decide.");
    }

    #[tokio::test]
    async fn test_model_defaults_to_provider_model() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(TRUE_REPLY.to_string())]));
        let runner = EvaluationRunner::new(provider.clone(), RuntimeConfig::default());
        assert_eq!(runner.model(), "scripted-model");

        let mut usage = LlmUsage::default();
        runner.evaluate_block(block("A"), "ctx", &mut usage).await;
        assert_eq!(*provider.models.lock().unwrap(), vec!["scripted-model".to_string()]);
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(TRUE_REPLY.to_string()),
            Ok(TRUE_REPLY.to_string()),
        ]));
        let mut runner = EvaluationRunner::new(provider, RuntimeConfig::default());
        assert_eq!(runner.state(), RunState::Pending);

        let mut workbook = MemoryWorkbook::new();
        let run = runner
            .evaluate_blocks(&mut workbook, vec![block("A"), block("B")], |_, _| {})
            .await;

        assert_eq!(run.records.len(), 2);
        assert_eq!(runner.state(), RunState::Done { total: 2 });
    }

    #[tokio::test]
    async fn test_missing_sheet_is_fatal() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let mut runner = EvaluationRunner::new(provider, RuntimeConfig::default());
        let mut workbook = MemoryWorkbook::new().with_sheet("Other", Grid::default());

        let result = runner.run(&mut workbook, |_, _| {}).await;
        assert!(matches!(
            result,
            Err(RuntimeError::Workbook(WorkbookError::SheetNotFound(_)))
        ));
        assert_eq!(runner.state(), RunState::Pending);
    }

    #[tokio::test]
    async fn test_from_registry_unknown_provider() {
        let registry = ProviderRegistry::new();
        let result = EvaluationRunner::from_registry(&registry, RuntimeConfig::default()).await;
        assert!(matches!(
            result,
            Err(RuntimeError::Provider(ProviderError::NotConfigured(_)))
        ));
    }

    /// Rejects any config without `api_key` and counts provider creations.
    struct StrictFactory {
        created: AtomicUsize,
    }

    impl ProviderFactory for StrictFactory {
        fn provider_type(&self) -> &'static str {
            "strict"
        }

        fn create(&self, _config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(ScriptedProvider::new(vec![])))
        }

        fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
            if config["api_key"].is_string() {
                Ok(())
            } else {
                Err(ProviderError::NotConfigured("api_key required".to_string()))
            }
        }
    }

    fn strict_registry() -> (ProviderRegistry, Arc<StrictFactory>) {
        let factory = Arc::new(StrictFactory {
            created: AtomicUsize::new(0),
        });
        let mut registry = ProviderRegistry::new();
        registry.register(factory.clone());
        (registry, factory)
    }

    #[tokio::test]
    async fn test_from_registry_rejects_invalid_provider_config() {
        let (registry, factory) = strict_registry();
        let config = RuntimeConfig {
            provider: "strict".to_string(),
            ..Default::default()
        };

        let result = EvaluationRunner::from_registry(&registry, config).await;

        match result {
            Err(RuntimeError::Provider(ProviderError::NotConfigured(msg))) => {
                assert_eq!(msg, "api_key required");
            }
            other => panic!("expected NotConfigured, got {:?}", other),
        }
        assert_eq!(factory.created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_from_registry_creates_after_validation() {
        let (registry, factory) = strict_registry();
        let config = RuntimeConfig {
            provider: "strict".to_string(),
            provider_config: serde_json::json!({ "api_key": "k" }),
            ..Default::default()
        };

        let runner = EvaluationRunner::from_registry(&registry, config).await.unwrap();

        assert_eq!(runner.provider_name(), "scripted");
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    }
}
