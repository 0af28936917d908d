//! Review prompt sent with each assertion's context.
//!
//! The prompt is a single user message: the assembled context first, then
//! the fixed review rubric and the JSON reply format.

/// Reviewer instructions appended after the context.
pub const REVIEW_INSTRUCTIONS: &str = r#"You are performing a first-level technical review of an audit workpaper. Your task is to critically evaluate the workpaper for technical accuracy, logical consistency, and documentation quality, applying professional audit judgment.

Objectives:
1. Mathematical Accuracy: Verify calculations and footings
2. Cross-Sheet Tie-Outs: Check figures agree across sheets
3. Logical Consistency: Assess if procedures support the conclusion
4. Documentation Quality: Check for clarity and completeness
5. Materiality: Assume 1% of net income threshold if not defined

Respond in JSON format:
{
  "verdict": "TRUE" | "FALSE" | "PARTIALLY_TRUE" | "INSUFFICIENT_DATA",
  "confidence": 0-100,
  "reasoning": "Detailed explanation of your evaluation and rationale.",
  "key_findings": ["Main findings that influenced your conclusion."],
  "discrepancies": ["List of issues or inconsistencies found, leave empty if none."],
  "recommendations": ["Actionable suggestions to correct or improve the workpaper."]
}
"#;

/// Build the full review prompt for one assertion context.
pub fn build_review_prompt(context: &str) -> String {
    format!("{}\n\n{}", context, REVIEW_INSTRUCTIONS)
}
