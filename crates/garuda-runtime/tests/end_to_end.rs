//! Full pipeline against an in-memory workbook and a scripted provider.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use garuda_core::{Grid, MemoryWorkbook, ReportRenderer, TableError, VerdictKind};
use garuda_runtime::{
    ChatMessage, CompletionConfig, CompletionResponse, EvaluationRunner, LlmProvider,
    ProviderError, RunState, RuntimeConfig, RuntimeError, TokenUsage,
};

/// Replies in order and records every prompt it receives.
struct ScriptedProvider {
    replies: Mutex<Vec<Result<String, ProviderError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(mut replies: Vec<Result<String, ProviderError>>) -> Arc<Self> {
        replies.reverse();
        Arc::new(Self {
            replies: Mutex::new(replies),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        assert_eq!(messages.len(), 1);
        self.prompts.lock().unwrap().push(messages[0].content.clone());

        let content = self
            .replies
            .lock()
            .unwrap()
            .pop()
            .expect("more calls than scripted replies")?;

        Ok(CompletionResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 20,
                thinking_tokens: 30,
            },
            model: config.model.clone(),
            stop_reason: Some("STOP".to_string()),
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

fn reply(verdict: &str, confidence: u8) -> Result<String, ProviderError> {
    Ok(format!(
        r#"{{"verdict": "{}", "confidence": {}, "reasoning": "Reviewed.", "key_findings": ["Totals agree"]}}"#,
        verdict, confidence
    ))
}

fn workpaper() -> MemoryWorkbook {
    MemoryWorkbook::new()
        .with_sheet(
            "Main",
            Grid::from_text_rows([
                vec!["Client: Acme", "", "", ""],
                vec!["", "", "", ""],
                vec!["", "Assertion", "Testing procedures performed", "Link"],
                vec!["", "Cash exists", "Obtained bank confirmation", "Bank'!A1"],
                vec!["", "", "Reconciled to ledger", "Ledger!A1"],
                vec!["", "Revenue is complete", "Cut-off testing", "Cutoff!A1"],
                vec!["", "Inventory is valued correctly", "Price testing", ""],
            ]),
        )
        .with_sheet(
            "Bank",
            Grid::from_text_rows([["Account", "Balance"], ["Operating", "1500"]]),
        )
        .with_sheet("Ledger", Grid::from_text_rows([["Cash", "1500"]]))
}

#[tokio::test]
async fn test_three_assertions_with_missing_link() {
    let provider = ScriptedProvider::new(vec![
        reply("TRUE", 92),
        reply("INSUFFICIENT_DATA", 40),
        reply("PARTIALLY_TRUE", 65),
    ]);
    let mut runner = EvaluationRunner::new(provider.clone(), RuntimeConfig::default());
    let mut workbook = workpaper();

    let run = runner.run(&mut workbook, |_, _| {}).await.unwrap();

    let assertions: Vec<_> = run.records.iter().map(|r| r.assertion.as_str()).collect();
    assert_eq!(
        assertions,
        vec!["Cash exists", "Revenue is complete", "Inventory is valued correctly"]
    );
    assert_eq!(run.records[0].procedures.len(), 2);
    assert_eq!(run.records[1].parsed_result.verdict, VerdictKind::InsufficientData);
    assert_eq!(runner.state(), RunState::Done { total: 3 });

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].starts_with("Evaluate: Cash exists\n\nTesting Procedures and Related Data:"));
    assert!(prompts[0].contains("Linked Sheet: Bank\nDimensions: 2 rows x 2 columns"));
    assert!(prompts[0].contains("Linked Sheet: Ledger"));
    assert!(prompts[1].contains("Error: Error reading sheet: Worksheet 'Cutoff' not found"));
    assert!(!prompts[2].contains("Linked Sheet"));
    assert!(prompts.iter().all(|p| p.contains("Materiality")));

    assert_eq!(run.usage.llm_calls, 3);
    assert_eq!(run.usage.total_tokens, 450);
}

#[tokio::test]
async fn test_failed_call_does_not_stop_run() {
    let provider = ScriptedProvider::new(vec![
        Err(ProviderError::ApiError {
            status: 500,
            message: "internal".to_string(),
        }),
        reply("TRUE", 80),
        reply("FALSE", 70),
    ]);
    let mut runner = EvaluationRunner::new(provider, RuntimeConfig::default());
    let mut workbook = workpaper();

    let run = runner.run(&mut workbook, |_, _| {}).await.unwrap();

    assert_eq!(run.records.len(), 3);
    let first = &run.records[0].parsed_result;
    assert_eq!(first.verdict, VerdictKind::Error);
    assert_eq!(first.confidence, 0);
    assert!(first.reasoning.starts_with("LLM evaluation error: API error: 500"));
    assert!(run.records[0].raw_result.contains("\"ERROR\""));

    assert_eq!(run.records[1].parsed_result.verdict, VerdictKind::True);
    assert_eq!(run.records[2].parsed_result.verdict, VerdictKind::False);
    assert_eq!(run.usage.failed_calls, 1);
    assert_eq!(run.usage.llm_calls, 2);
}

#[tokio::test]
async fn test_progress_reported_after_each_block() {
    let provider = ScriptedProvider::new(vec![
        reply("TRUE", 90),
        reply("TRUE", 90),
        reply("TRUE", 90),
    ]);
    let mut runner = EvaluationRunner::new(provider, RuntimeConfig::default());
    let mut workbook = workpaper();
    let mut calls = Vec::new();

    runner
        .run(&mut workbook, |done, total| calls.push((done, total)))
        .await
        .unwrap();

    assert_eq!(calls, vec![(1, 3), (2, 3), (3, 3)]);
}

#[tokio::test]
async fn test_fenced_and_prose_replies() {
    let provider = ScriptedProvider::new(vec![
        Ok("Here is my review:\n```json\n{\"verdict\": \"FALSE\", \"confidence\": 55.6, \"reasoning\": \"Footing error.\", \"discrepancies\": [\"Total off by 10\"]}\n```".to_string()),
        Ok("```\n{\"verdict\": \"partially true\", \"confidence\": 60, \"reasoning\": \"Some support.\"}\n```".to_string()),
        Ok("I am unable to review this workpaper.".to_string()),
    ]);
    let mut runner = EvaluationRunner::new(provider, RuntimeConfig::default());
    let mut workbook = workpaper();

    let run = runner.run(&mut workbook, |_, _| {}).await.unwrap();

    let first = &run.records[0].parsed_result;
    assert_eq!(first.verdict, VerdictKind::False);
    assert_eq!(first.confidence, 56);
    assert_eq!(first.discrepancies, vec!["Total off by 10".to_string()]);
    assert!(run.records[0].raw_result.starts_with("Here is my review:"));

    assert_eq!(run.records[1].parsed_result.verdict, VerdictKind::PartiallyTrue);

    let third = &run.records[2];
    assert!(third.parsed_result.is_error());
    assert!(third.parsed_result.reasoning.starts_with("Parse error:"));
    assert_eq!(third.raw_result, "I am unable to review this workpaper.");
}

#[tokio::test]
async fn test_missing_label_is_fatal() {
    let provider = ScriptedProvider::new(vec![]);
    let config = RuntimeConfig {
        label: "Assertions".to_string(),
        ..Default::default()
    };
    let mut runner = EvaluationRunner::new(provider.clone(), config);
    let mut workbook = workpaper();

    let result = runner.run(&mut workbook, |_, _| {}).await;

    assert!(matches!(
        result,
        Err(RuntimeError::Table(TableError::LabelNotFound { .. }))
    ));
    assert!(provider.prompts().is_empty());
}

#[tokio::test]
async fn test_run_renders_report() {
    let provider = ScriptedProvider::new(vec![
        reply("TRUE", 90),
        Err(ProviderError::Timeout(std::time::Duration::from_secs(120))),
        reply("FALSE", 30),
    ]);
    let mut runner = EvaluationRunner::new(provider, RuntimeConfig::default());
    let mut workbook = workpaper();
    let run = runner.run(&mut workbook, |_, _| {}).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    ReportRenderer::new().write(&run.records, &path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}
