//! Core types shared across the review pipeline.

use serde::{Deserialize, Serialize};

use crate::verdict::Verdict;

/// One testing procedure performed for an assertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureEntry {
    /// Description of the procedure, if the cell was filled
    pub procedure: Option<String>,

    /// Cross-sheet reference (e.g. `Invoices!A1`), if any
    pub link: Option<String>,
}

impl ProcedureEntry {
    pub fn new(procedure: Option<String>, link: Option<String>) -> Self {
        Self { procedure, link }
    }

    /// Whether the entry carries a non-blank link.
    pub fn has_link(&self) -> bool {
        self.link.as_deref().is_some_and(|l| !l.trim().is_empty())
    }
}

/// An audit assertion with the procedures performed to substantiate it.
///
/// `procedures` is never empty: the labeled row seeds the first entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionBlock {
    /// The assertion under review
    pub assertion: String,

    /// Procedures in table order
    pub procedures: Vec<ProcedureEntry>,
}

/// The outcome of evaluating one assertion block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// The assertion under review
    pub assertion: String,

    /// Procedures the assertion was evaluated with
    pub procedures: Vec<ProcedureEntry>,

    /// Raw model output (or the serialized error verdict on call failure)
    pub raw_result: String,

    /// Parsed verdict; `ERROR` when the call or the parse failed
    pub parsed_result: Verdict,
}

impl EvaluationRecord {
    pub fn new(block: AssertionBlock, raw_result: String, parsed_result: Verdict) -> Self {
        Self {
            assertion: block.assertion,
            procedures: block.procedures,
            raw_result,
            parsed_result,
        }
    }
}
