//! Report layout and rendering.
//!
//! [`ReportRenderer::layout`] turns evaluation records into a flat list of
//! [`ReportElement`]s; [`render_pdf`] paginates that list into a PDF.

mod pdf;

use std::path::Path;

use chrono::{Local, NaiveDateTime};
use thiserror::Error;

use crate::types::EvaluationRecord;

pub use pdf::render_pdf;

/// Errors from building or writing a report.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("No evaluation results to report")]
    NoResults,

    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// One block-level element of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportElement {
    Title(String),
    /// Small print under the title
    Subtitle(String),
    /// Assertion text opening a section
    Heading(String),
    /// Verdict line
    Subheading(String),
    Paragraph(String),
    /// Label of a bullet group
    GroupLabel(String),
    Bullet(String),
    PageBreak,
}

impl ReportElement {
    /// Text content; empty for a page break.
    pub fn text(&self) -> &str {
        match self {
            ReportElement::Title(t)
            | ReportElement::Subtitle(t)
            | ReportElement::Heading(t)
            | ReportElement::Subheading(t)
            | ReportElement::Paragraph(t)
            | ReportElement::GroupLabel(t)
            | ReportElement::Bullet(t) => t,
            ReportElement::PageBreak => "",
        }
    }
}

/// An ordered, paginate-ready report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLayout {
    title: String,
    elements: Vec<ReportElement>,
}

impl ReportLayout {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn elements(&self) -> &[ReportElement] {
        &self.elements
    }

    pub fn page_breaks(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| matches!(e, ReportElement::PageBreak))
            .count()
    }
}

/// Lays out and renders evaluation reports.
#[derive(Debug, Clone)]
pub struct ReportRenderer {
    title: String,
    generated_at: NaiveDateTime,
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportRenderer {
    /// A renderer stamped with the current local time.
    pub fn new() -> Self {
        Self {
            title: "Evaluation Report".to_string(),
            generated_at: Local::now().naive_local(),
        }
    }

    /// Override the generation timestamp.
    pub fn generated_at(mut self, at: NaiveDateTime) -> Self {
        self.generated_at = at;
        self
    }

    /// Default file name, e.g. `report_20250114_093005.pdf`.
    pub fn default_filename(&self) -> String {
        format!("report_{}.pdf", self.generated_at.format("%Y%m%d_%H%M%S"))
    }

    /// Lay out one section per record, in record order.
    pub fn layout(&self, records: &[EvaluationRecord]) -> Result<ReportLayout, ReportError> {
        if records.is_empty() {
            return Err(ReportError::NoResults);
        }

        let mut elements = vec![
            ReportElement::Title(self.title.clone()),
            ReportElement::Subtitle(format!(
                "Generated: {}",
                self.generated_at.format("%Y-%m-%d %H:%M")
            )),
        ];

        for (idx, record) in records.iter().enumerate() {
            let verdict = &record.parsed_result;

            elements.push(ReportElement::Heading(record.assertion.clone()));
            elements.push(ReportElement::Subheading(format!(
                "Verdict: {}",
                verdict.summary_line()
            )));
            elements.push(ReportElement::Paragraph(format!(
                "Reasoning: {}",
                verdict.reasoning
            )));

            let groups = [
                ("Key Findings:", &verdict.key_findings),
                ("Discrepancies:", &verdict.discrepancies),
                ("Recommendations:", &verdict.recommendations),
            ];
            for (label, items) in groups {
                if items.is_empty() {
                    continue;
                }
                elements.push(ReportElement::GroupLabel(label.to_string()));
                elements.extend(items.iter().cloned().map(ReportElement::Bullet));
            }

            if idx + 1 < records.len() {
                elements.push(ReportElement::PageBreak);
            }
        }

        Ok(ReportLayout {
            title: self.title.clone(),
            elements,
        })
    }

    /// Lay out and render to PDF bytes.
    pub fn render(&self, records: &[EvaluationRecord]) -> Result<Vec<u8>, ReportError> {
        let layout = self.layout(records)?;
        render_pdf(&layout)
    }

    /// Render and write the PDF to `path`.
    pub fn write(&self, records: &[EvaluationRecord], path: impl AsRef<Path>) -> Result<(), ReportError> {
        let bytes = self.render(records)?;
        std::fs::write(path.as_ref(), bytes)?;
        tracing::info!(path = %path.as_ref().display(), records = records.len(), "Wrote report");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssertionBlock;
    use crate::verdict::{Verdict, VerdictKind};
    use chrono::NaiveDate;

    fn record(assertion: &str, verdict: Verdict) -> EvaluationRecord {
        EvaluationRecord::new(
            AssertionBlock {
                assertion: assertion.to_string(),
                procedures: Vec::new(),
            },
            String::new(),
            verdict,
        )
    }

    fn verdict_with_findings() -> Verdict {
        Verdict {
            verdict: VerdictKind::True,
            confidence: 95,
            reasoning: "Balances agree to the bank confirmation.".to_string(),
            key_findings: vec!["Confirmed 1,500".to_string(), "No reconciling items".to_string()],
            discrepancies: Vec::new(),
            recommendations: vec!["None".to_string()],
        }
    }

    fn renderer() -> ReportRenderer {
        let at = NaiveDate::from_ymd_opt(2025, 1, 14)
            .unwrap()
            .and_hms_opt(9, 30, 5)
            .unwrap();
        ReportRenderer::new().generated_at(at)
    }

    #[test]
    fn test_layout_section_contents() {
        let layout = renderer()
            .layout(&[record("Cash exists", verdict_with_findings())])
            .unwrap();

        assert_eq!(
            layout.elements(),
            &[
                ReportElement::Title("Evaluation Report".to_string()),
                ReportElement::Subtitle("Generated: 2025-01-14 09:30".to_string()),
                ReportElement::Heading("Cash exists".to_string()),
                ReportElement::Subheading("Verdict: TRUE (Confidence: 95%)".to_string()),
                ReportElement::Paragraph(
                    "Reasoning: Balances agree to the bank confirmation.".to_string()
                ),
                ReportElement::GroupLabel("Key Findings:".to_string()),
                ReportElement::Bullet("Confirmed 1,500".to_string()),
                ReportElement::Bullet("No reconciling items".to_string()),
                ReportElement::GroupLabel("Recommendations:".to_string()),
                ReportElement::Bullet("None".to_string()),
            ]
        );
    }

    #[test]
    fn test_page_breaks_between_sections_only() {
        let records = vec![
            record("A1", verdict_with_findings()),
            record("A2", Verdict::error("Parse error: bad json")),
            record("A3", verdict_with_findings()),
        ];
        let layout = renderer().layout(&records).unwrap();

        assert_eq!(layout.page_breaks(), 2);
        assert_ne!(layout.elements().last(), Some(&ReportElement::PageBreak));

        let headings: Vec<&str> = layout
            .elements()
            .iter()
            .filter(|e| matches!(e, ReportElement::Heading(_)))
            .map(ReportElement::text)
            .collect();
        assert_eq!(headings, vec!["A1", "A2", "A3"]);
    }

    #[test]
    fn test_error_verdict_has_no_groups() {
        let layout = renderer()
            .layout(&[record("A1", Verdict::error("LLM evaluation error: timeout"))])
            .unwrap();
        assert!(!layout
            .elements()
            .iter()
            .any(|e| matches!(e, ReportElement::GroupLabel(_) | ReportElement::Bullet(_))));
        assert!(layout
            .elements()
            .contains(&ReportElement::Subheading("Verdict: ERROR (Confidence: 0%)".to_string())));
    }

    #[test]
    fn test_no_results() {
        assert!(matches!(renderer().layout(&[]), Err(ReportError::NoResults)));
    }

    #[test]
    fn test_default_filename() {
        assert_eq!(renderer().default_filename(), "report_20250114_093005.pdf");
    }

    #[test]
    fn test_write_pdf_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        renderer()
            .write(&[record("Cash exists", verdict_with_findings())], &path)
            .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
