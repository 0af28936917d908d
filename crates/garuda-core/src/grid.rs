//! Raw, headerless cell grids as read from a worksheet.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single worksheet cell.
///
/// Serializes untagged so a grid renders as plain JSON arrays
/// (`null`, `true`, `12.5`, `"text"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    /// Absent or blank cell
    #[default]
    Empty,

    /// Boolean cell
    Bool(bool),

    /// Numeric cell (integers are widened)
    Number(f64),

    /// Text cell, including dates and spreadsheet error values rendered as text
    Text(String),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// Whether the cell carries no usable value.
    ///
    /// Whitespace-only text counts as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Bool(_) | CellValue::Number(_) => false,
        }
    }

    /// The cell rendered as text, or `None` when empty.
    pub fn as_text(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_string())
        }
    }

    /// Whether this is a text cell exactly equal to `value`.
    pub fn is_text(&self, value: &str) -> bool {
        matches!(self, CellValue::Text(s) if s == value)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Number(n) => {
                // Integral values print without a trailing ".0"
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

/// An ordered sequence of rows of cells.
///
/// Rows may be ragged; [`Grid::column_count`] reports the widest row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<CellValue>>,
}

impl Grid {
    /// Create a grid from rows of cells.
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// Build a grid from rows of text, treating `""` as an empty cell.
    pub fn from_text_rows<R, S>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|cell| CellValue::from(cell.as_ref()))
                        .collect()
                })
                .collect(),
        }
    }

    /// All rows in order.
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at `(row, col)`; missing cells read as [`CellValue::Empty`].
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Serialize the full grid as pretty-printed JSON rows.
    ///
    /// Ragged rows are padded with `null` to the grid width.
    pub fn to_json_pretty(&self) -> String {
        let width = self.column_count();
        let padded: Vec<Vec<&CellValue>> = self
            .rows
            .iter()
            .map(|row| (0..width).map(|col| row.get(col).unwrap_or(&EMPTY_CELL)).collect())
            .collect();

        serde_json::to_string_pretty(&padded).unwrap_or_else(|_| "[]".to_string())
    }
}
