//! # garuda-core
//!
//! Deterministic pipeline for reviewing audit workpapers.
//!
//! This crate turns a workbook into evaluation contexts and turns evaluation
//! records into a report. It never calls a language model; see
//! `garuda-runtime` for that.
//!
//! ## Pipeline
//!
//! 1. [`locate_table`]: find the `Assertion` header in the main sheet
//! 2. [`extract_blocks`]: group rows into assertion blocks
//! 3. [`resolve_link`]: load the sheet a procedure links to
//! 4. [`ContextAssembler`]: render a block and its linked data as text
//! 5. [`parse_verdict`]: recover a verdict from model output
//! 6. [`ReportRenderer`]: lay out and render the PDF report
//!
//! ## Example
//!
//! ```rust,ignore
//! use garuda_core::{extract_blocks, locate_table, ContextAssembler, SpreadsheetWorkbook, Workbook};
//!
//! let mut workbook = SpreadsheetWorkbook::open("workpaper.xlsx")?;
//! let main = workbook.read_sheet("Main")?;
//! let table = locate_table(&main, "Assertion")?;
//!
//! for block in extract_blocks(&table) {
//!     let context = ContextAssembler::new(&mut workbook).assemble(&block);
//!     println!("{}", context);
//! }
//! ```

pub mod blocks;
pub mod context;
pub mod grid;
pub mod linked;
pub mod report;
pub mod table;
pub mod types;
pub mod verdict;
pub mod workbook;

// Re-export main types at crate root
pub use blocks::{extract_blocks, group_rows};
pub use context::ContextAssembler;
pub use grid::{CellValue, Grid};
pub use linked::{normalize_link, resolve_link, LinkError, LinkedSheetData};
pub use report::{ReportElement, ReportError, ReportLayout, ReportRenderer};
pub use table::{
    locate_table, AssertionRow, LocatedTable, TableError, ASSERTION_LABEL, LINK_COLUMN,
    PROCEDURE_COLUMN,
};
pub use types::{AssertionBlock, EvaluationRecord, ProcedureEntry};
pub use verdict::{parse_verdict, ExtractionStrategy, ParseError, Verdict, VerdictKind};
pub use workbook::{MemoryWorkbook, SpreadsheetWorkbook, Workbook, WorkbookError};

/// Default name of the worksheet holding the assertion table.
pub const DEFAULT_MAIN_SHEET: &str = "Main";
