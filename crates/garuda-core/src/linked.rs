//! Resolving procedure links to the worksheets they reference.
//!
//! Links are sheet names, optionally carrying an `!A1` or `'!A1` anchor
//! suffix. Resolution failures never abort the pipeline; they are reported
//! back as a [`LinkError`] for the context to mention inline.

use serde::Serialize;
use thiserror::Error;

use crate::grid::Grid;
use crate::workbook::Workbook;

/// Anchor suffixes stripped from link references, quoted form first.
const QUOTED_ANCHOR: &str = "'!A1";
const ANCHOR: &str = "!A1";

/// Errors from resolving a linked sheet.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinkError {
    #[error("Link '{0}' does not name a sheet")]
    EmptyReference(String),

    #[error("Error reading sheet: {0}")]
    Read(String),
}

/// A successfully resolved linked sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkedSheetData {
    pub sheet_name: String,
    pub raw_data: Grid,
    pub row_count: usize,
    pub column_count: usize,
}

impl LinkedSheetData {
    pub fn new(sheet_name: impl Into<String>, raw_data: Grid) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            row_count: raw_data.row_count(),
            column_count: raw_data.column_count(),
            raw_data,
        }
    }

    /// Human-readable dimensions, e.g. `12 rows x 4 columns`.
    pub fn dimensions(&self) -> String {
        format!("{} rows x {} columns", self.row_count, self.column_count)
    }
}

/// Reduce a link reference to the sheet name it points at.
///
/// Strips surrounding whitespace and trailing `'!A1` / `!A1` anchors. When a
/// quoted anchor was removed, the opening quote of the sheet name goes too.
/// Applying it twice gives the same result as applying it once.
pub fn normalize_link(link: &str) -> String {
    let mut name = normalize_once(link);
    loop {
        let next = normalize_once(&name);
        if next == name {
            return name;
        }
        name = next;
    }
}

fn normalize_once(link: &str) -> String {
    let trimmed = link.trim();

    if let Some(rest) = trimmed.strip_suffix(QUOTED_ANCHOR) {
        let rest = rest.trim();
        return rest.strip_prefix('\'').unwrap_or(rest).trim().to_string();
    }

    trimmed
        .strip_suffix(ANCHOR)
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

/// Resolve a procedure link against the workbook.
///
/// Returns `None` for an absent or blank link.
pub fn resolve_link<W>(
    workbook: &mut W,
    link: Option<&str>,
) -> Option<Result<LinkedSheetData, LinkError>>
where
    W: Workbook + ?Sized,
{
    let link = link.filter(|l| !l.trim().is_empty())?;
    let sheet_name = normalize_link(link);

    if sheet_name.is_empty() {
        tracing::warn!(link, "Link does not name a sheet");
        return Some(Err(LinkError::EmptyReference(link.to_string())));
    }

    let resolved = workbook
        .read_sheet(&sheet_name)
        .map(|grid| LinkedSheetData::new(sheet_name.clone(), grid))
        .map_err(|e| LinkError::Read(e.to_string()));

    match &resolved {
        Ok(data) => tracing::debug!(
            sheet = %sheet_name,
            rows = data.row_count,
            columns = data.column_count,
            "Resolved linked sheet"
        ),
        Err(e) => tracing::warn!(sheet = %sheet_name, error = %e, "Failed to resolve linked sheet"),
    }

    Some(resolved)
}
