//! Workbook access.
//!
//! The pipeline only ever asks a workbook for a sheet's full grid by name.
//! [`SpreadsheetWorkbook`] reads xlsx/xlsm/xls/ods files; [`MemoryWorkbook`]
//! holds grids built in code.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use thiserror::Error;

use crate::grid::{CellValue, Grid};

/// Errors from reading a workbook.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkbookError {
    #[error("Failed to open workbook {path}: {message}")]
    Open { path: String, message: String },

    #[error("Worksheet '{0}' not found")]
    SheetNotFound(String),

    #[error("Failed to read worksheet '{sheet}': {message}")]
    Read { sheet: String, message: String },
}

/// A source of worksheets addressed by name.
pub trait Workbook {
    /// Sheet names in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Read a sheet's full grid, anchored at its first cell.
    fn read_sheet(&mut self, name: &str) -> Result<Grid, WorkbookError>;

    /// Whether a sheet with this exact name exists.
    fn has_sheet(&self, name: &str) -> bool {
        self.sheet_names().iter().any(|s| s == name)
    }
}

/// A workbook file on disk.
pub struct SpreadsheetWorkbook {
    path: PathBuf,
    sheets: Sheets<BufReader<File>>,
}

impl SpreadsheetWorkbook {
    /// Open a workbook, detecting the format from its extension.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WorkbookError> {
        let path = path.as_ref().to_path_buf();
        let sheets = open_workbook_auto(&path).map_err(|e| WorkbookError::Open {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!(path = %path.display(), "Opened workbook");
        Ok(Self { path, sheets })
    }

    /// Path the workbook was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for SpreadsheetWorkbook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpreadsheetWorkbook")
            .field("path", &self.path)
            .field("sheets", &self.sheets.sheet_names())
            .finish()
    }
}

impl Workbook for SpreadsheetWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Grid, WorkbookError> {
        if !self.has_sheet(name) {
            return Err(WorkbookError::SheetNotFound(name.to_string()));
        }

        let range = self
            .sheets
            .worksheet_range(name)
            .map_err(|e| WorkbookError::Read {
                sheet: name.to_string(),
                message: e.to_string(),
            })?;

        Ok(grid_from_range(&range))
    }
}

/// Convert a calamine range into a grid anchored at A1.
///
/// calamine ranges start at the first used cell, so leading blank rows and
/// columns are restored from the range origin.
fn grid_from_range(range: &Range<Data>) -> Grid {
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; col_offset];
        cells.extend(row.iter().map(convert_cell));
        rows.push(cells);
    }

    Grid::new(rows)
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => CellValue::Text(datetime.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::from(s.as_str()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

/// An in-memory workbook, sheets kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: Vec<(String, Grid)>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a sheet.
    pub fn with_sheet(mut self, name: impl Into<String>, grid: Grid) -> Self {
        self.insert(name, grid);
        self
    }

    /// Add (or replace) a sheet.
    pub fn insert(&mut self, name: impl Into<String>, grid: Grid) {
        let name = name.into();
        match self.sheets.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = grid,
            None => self.sheets.push((name, grid)),
        }
    }
}

impl Workbook for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_sheet(&mut self, name: &str) -> Result<Grid, WorkbookError> {
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, grid)| grid.clone())
            .ok_or_else(|| WorkbookError::SheetNotFound(name.to_string()))
    }
}
