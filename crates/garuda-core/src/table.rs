//! Locating the labeled assertion table inside a raw worksheet grid.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::{CellValue, Grid};

/// Header label of the assertion column.
pub const ASSERTION_LABEL: &str = "Assertion";

/// Header of the testing procedure column.
pub const PROCEDURE_COLUMN: &str = "Testing procedures performed";

/// Header of the linked sheet column.
pub const LINK_COLUMN: &str = "Link";

/// Errors from locating the assertion table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Table label '{label}' not found in worksheet")]
    LabelNotFound { label: String },
}

/// A grid re-sliced so the label cell sits at the top-left, with the label
/// row promoted to column names.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedTable {
    label: String,
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

/// One data row of the assertion table with its named fields extracted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssertionRow {
    pub assertion: Option<String>,
    pub procedure: Option<String>,
    pub link: Option<String>,
}

impl AssertionRow {
    pub fn new(
        assertion: Option<&str>,
        procedure: Option<&str>,
        link: Option<&str>,
    ) -> Self {
        let text = |v: Option<&str>| v.map(CellValue::from).and_then(|c| c.as_text());
        Self {
            assertion: text(assertion),
            procedure: text(procedure),
            link: text(link),
        }
    }
}

/// Find the first row containing `label` and slice the grid from there.
///
/// Rows are scanned in order, then columns within the row. Rows above and
/// columns left of the label are discarded.
pub fn locate_table(grid: &Grid, label: &str) -> Result<LocatedTable, TableError> {
    let (row_idx, col_idx) = grid
        .rows()
        .iter()
        .enumerate()
        .find_map(|(r, row)| {
            row.iter()
                .position(|cell| cell.is_text(label))
                .map(|c| (r, c))
        })
        .ok_or_else(|| TableError::LabelNotFound {
            label: label.to_string(),
        })?;

    tracing::debug!(label, row = row_idx, column = col_idx, "Located table header");

    let width = grid.column_count();
    let columns = (col_idx..width)
        .map(|c| grid.cell(row_idx, c).to_string())
        .collect();

    let rows = grid.rows()[row_idx + 1..]
        .iter()
        .map(|row| row.iter().skip(col_idx).cloned().collect())
        .collect();

    Ok(LocatedTable {
        label: label.to_string(),
        columns,
        rows,
    })
}

impl LocatedTable {
    /// The label the table was located by (its first column name).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Column names, taken from the label row.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Data rows below the header.
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Index of the first column with this exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of a named column in a data row.
    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col)
    }

    /// Convert the data rows into typed assertion rows.
    ///
    /// A missing procedure or link column yields empty fields.
    pub fn assertion_rows(&self) -> Vec<AssertionRow> {
        let assertion_col = self.column_index(&self.label);
        let procedure_col = self.column_index(PROCEDURE_COLUMN);
        let link_col = self.column_index(LINK_COLUMN);

        if procedure_col.is_none() {
            tracing::warn!(column = PROCEDURE_COLUMN, "Column missing from assertion table");
        }
        if link_col.is_none() {
            tracing::warn!(column = LINK_COLUMN, "Column missing from assertion table");
        }

        let field = |row: &[CellValue], col: Option<usize>| {
            col.and_then(|c| row.get(c)).and_then(CellValue::as_text)
        };

        self.rows
            .iter()
            .map(|row| AssertionRow {
                assertion: field(row.as_slice(), assertion_col),
                procedure: field(row.as_slice(), procedure_col),
                link: field(row.as_slice(), link_col),
            })
            .collect()
    }
}
