//! An in-memory worksheet.
//!
//! Behaves like the remote store (header in row 1, 1-indexed ranges, ragged
//! rows) and records every bulk write, so a whole run can be exercised
//! offline and its writes inspected afterwards.

use super::{ColumnRange, SheetStore, SheetTable};
use crate::error::EnrichError;
use futures::future::BoxFuture;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    /// Row 0 is the header row.
    grid: Vec<Vec<String>>,
    writes: Vec<String>,
}

/// A worksheet held in memory.
#[derive(Debug, Default)]
pub struct MemorySheet {
    state: Mutex<State>,
}

impl MemorySheet {
    /// Build from a header row and data rows.
    pub fn new<S: AsRef<str>>(headers: &[S], rows: &[Vec<&str>]) -> Self {
        let mut grid = vec![headers.iter().map(|h| h.as_ref().to_string()).collect()];
        grid.extend(
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect::<Vec<_>>()),
        );
        Self {
            state: Mutex::new(State {
                grid,
                writes: Vec::new(),
            }),
        }
    }

    /// The current contents as a table.
    pub fn snapshot(&self) -> SheetTable {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        SheetTable::from_grid(state.grid.clone())
    }

    /// The data cell under header `name` at 0-based data row `row`.
    pub fn value(&self, row: usize, name: &str) -> String {
        self.snapshot().get_named(row, name).to_string()
    }

    /// A1 ranges of every bulk write so far, in order.
    pub fn writes(&self) -> Vec<String> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.writes.clone()
    }

    fn apply(&self, range: ColumnRange, values: Vec<String>) -> Result<(), EnrichError> {
        if values.len() != range.len() {
            return Err(EnrichError::SheetWrite {
                range: range.to_string(),
                reason: format!("{} values for a {}-cell range", values.len(), range.len()),
            });
        }
        let mut state = self
            .state
            .lock()
            .map_err(|e| EnrichError::Internal(format!("sheet lock poisoned: {e}")))?;

        for (offset, value) in values.into_iter().enumerate() {
            let row = range.first_row - 1 + offset;
            if state.grid.len() <= row {
                state.grid.resize_with(row + 1, Vec::new);
            }
            let cells = &mut state.grid[row];
            if cells.len() <= range.column {
                cells.resize(range.column + 1, String::new());
            }
            cells[range.column] = value;
        }
        state.writes.push(range.to_string());
        Ok(())
    }
}

impl SheetStore for MemorySheet {
    fn read_table(&self) -> BoxFuture<'_, Result<SheetTable, EnrichError>> {
        Box::pin(async move { Ok(self.snapshot()) })
    }

    fn write_column(
        &self,
        range: ColumnRange,
        values: Vec<String>,
    ) -> BoxFuture<'_, Result<(), EnrichError>> {
        Box::pin(async move { self.apply(range, values) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_column_updates_cells_and_log() {
        let sheet = MemorySheet::new(&["URL", "組織名"], &[vec!["https://a"], vec!["https://b"]]);
        sheet
            .write_column(ColumnRange::data(1, 2), vec!["Acme".into(), "取得失敗".into()])
            .await
            .unwrap();

        assert_eq!(sheet.value(0, "組織名"), "Acme");
        assert_eq!(sheet.value(1, "組織名"), "取得失敗");
        assert_eq!(sheet.writes(), vec!["B2:B3".to_string()]);
    }

    #[tokio::test]
    async fn header_write_creates_column() {
        let sheet = MemorySheet::new(&["URL"], &[vec!["https://a"]]);
        sheet
            .write_column(ColumnRange::with_header(1, 1), vec!["証券番号".into(), "7203".into()])
            .await
            .unwrap();
        let table = sheet.read_table().await.unwrap();
        assert_eq!(table.column_index("証券番号"), Some(1));
        assert_eq!(table.get(0, 1), "7203");
    }

    #[tokio::test]
    async fn length_mismatch_is_rejected() {
        let sheet = MemorySheet::new(&["URL"], &[vec!["https://a"]]);
        let err = sheet
            .write_column(ColumnRange::data(0, 1), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, EnrichError::SheetWrite { .. }));
    }
}
