//! Spreadsheet access: the store seam, the table snapshot and A1 addressing.
//!
//! A pass reads the whole worksheet as a [`SheetTable`] (row 1 is the
//! header, data starts at row 2), updates one column in memory and flushes
//! it with a single [`SheetStore::write_column`] covering the full data
//! range. Nothing is cached between passes.

pub mod google;
pub mod memory;

use crate::error::EnrichError;
use futures::future::BoxFuture;
use std::fmt;

pub use google::GoogleSheetsStore;
pub use memory::MemorySheet;

/// Sheet rows above the first data row.
pub const HEADER_ROWS: usize = 1;

/// The collaborator that owns the worksheet.
pub trait SheetStore: Send + Sync {
    /// Read every row, the first one being the header.
    fn read_table(&self) -> BoxFuture<'_, Result<SheetTable, EnrichError>>;

    /// Overwrite a contiguous single-column range, one value per row in order.
    fn write_column(
        &self,
        range: ColumnRange,
        values: Vec<String>,
    ) -> BoxFuture<'_, Result<(), EnrichError>>;
}

/// A snapshot of the worksheet with header-derived column names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SheetTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Split a raw grid (header first) into a table. Trailing blank rows are dropped.
    pub fn from_grid(mut grid: Vec<Vec<String>>) -> Self {
        if grid.is_empty() {
            return Self::default();
        }
        let headers = grid.remove(0).into_iter().map(|h| h.trim().to_string()).collect();
        while grid
            .last()
            .is_some_and(|row| row.iter().all(|c| c.trim().is_empty()))
        {
            grid.pop();
        }
        Self { headers, rows: grid }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Columns in use: the header row or the widest row, whichever is wider.
    /// Trailing blank cells do not count.
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.iter().rposition(|c| !c.trim().is_empty()).map_or(0, |i| i + 1))
            .fold(self.headers.len(), usize::max)
    }

    /// 0-based index of the column whose header is `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// The raw cell at (`row`, `col`), both 0-based over the data rows.
    /// Ragged rows read as empty past their end.
    pub fn get(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// The raw cell under header `name`; empty when the column does not exist.
    pub fn get_named(&self, row: usize, name: &str) -> &str {
        match self.column_index(name) {
            Some(col) => self.get(row, col),
            None => "",
        }
    }

    /// Every data cell of one column, in row order.
    pub fn column_values(&self, col: usize) -> Vec<String> {
        (0..self.rows.len()).map(|r| self.get(r, col).to_string()).collect()
    }
}

/// A single-column block of cells, rows 1-indexed and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRange {
    pub column: usize,
    pub first_row: usize,
    pub last_row: usize,
}

impl ColumnRange {
    /// The data range of `column` for a table of `rows` data rows.
    pub fn data(column: usize, rows: usize) -> Self {
        Self {
            column,
            first_row: HEADER_ROWS + 1,
            last_row: HEADER_ROWS + rows,
        }
    }

    /// The header cell plus the data range, used when a column is created.
    pub fn with_header(column: usize, rows: usize) -> Self {
        Self {
            column,
            first_row: 1,
            last_row: HEADER_ROWS + rows,
        }
    }

    pub fn len(&self) -> usize {
        self.last_row + 1 - self.first_row
    }

    pub fn is_empty(&self) -> bool {
        self.last_row < self.first_row
    }
}

impl fmt::Display for ColumnRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letters = column_letters(self.column);
        write!(f, "{letters}{}:{letters}{}", self.first_row, self.last_row)
    }
}

/// 0-based column index → A1 letters (`0 → A`, `25 → Z`, `26 → AA`).
///
/// Bijective base 26: there is no zero digit, so after `Z` comes `AA`.
pub fn column_letters(index: usize) -> String {
    let mut n = index as u64 + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1 letters → 0-based column index. `None` for empty or non-letter input.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut n: usize = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }
    Some(n - 1)
}

/// Quote a worksheet title for use in an A1 range, doubling inner quotes.
pub fn quote_sheet_name(name: &str) -> String {
    let escaped = name.replace('\'', "''");
    format!("'{escaped}'")
}
