//! Bookkeeping shared by every pass: the in-memory copy of the target
//! column, the per-row tally, and the single bulk write at the end.

use crate::cell::Cell;
use crate::error::EnrichError;
use crate::output::{PassReport, RowOutcome};
use crate::passes::{PassContext, PassKind};
use crate::sheet::{ColumnRange, SheetTable, HEADER_ROWS};
use std::time::Instant;
use tracing::info;

/// The target column of one pass, mutated in memory and flushed once.
pub struct ColumnUpdate {
    column: usize,
    header: String,
    appended: bool,
    values: Vec<String>,
    report: PassReport,
    started: Instant,
}

impl ColumnUpdate {
    /// Bind to the column headed `header`, appending it after every column
    /// in use (labeled or not) when the sheet does not have it yet.
    pub fn open(pass: PassKind, table: &SheetTable, header: &str) -> Self {
        let (column, appended) = match table.column_index(header) {
            Some(idx) => (idx, false),
            None => (table.width(), true),
        };
        Self {
            column,
            header: header.to_string(),
            appended,
            values: table.column_values(column),
            report: PassReport::new(pass, table.len()),
            started: Instant::now(),
        }
    }

    /// 0-based index of the target column.
    pub fn column(&self) -> usize {
        self.column
    }

    /// The current state of the target cell.
    pub fn current(&self, row: usize) -> Cell {
        self.values.get(row).map(|v| Cell::parse(v)).unwrap_or_default()
    }

    /// Store `cell` for `row` and tally the outcome.
    pub fn set(&mut self, ctx: &PassContext<'_>, row: usize, cell: &Cell) {
        if let Some(slot) = self.values.get_mut(row) {
            *slot = cell.as_sheet_value().to_string();
        }
        self.record(ctx, row, RowOutcome::of(cell));
    }

    /// Tally a row that was not written (skipped or unresolved).
    pub fn record(&mut self, ctx: &PassContext<'_>, row: usize, outcome: RowOutcome) {
        self.report.record(outcome);
        if let Some(ref cb) = ctx.config.progress_callback {
            cb.on_row_complete(self.report.pass, row + HEADER_ROWS + 1, outcome);
        }
    }

    /// Issue the bulk write when at least one cell changed.
    pub async fn flush(mut self, ctx: &PassContext<'_>) -> Result<PassReport, EnrichError> {
        let pass = self.report.pass;
        if self.report.updated == 0 {
            info!("{}: no updates", pass);
        } else {
            let rows = self.values.len();
            let (range, values) = if self.appended {
                let mut values = Vec::with_capacity(rows + 1);
                values.push(self.header.clone());
                values.append(&mut self.values);
                (ColumnRange::with_header(self.column, rows), values)
            } else {
                (ColumnRange::data(self.column, rows), std::mem::take(&mut self.values))
            };
            ctx.sheet.write_column(range, values).await?;
            self.report.written = true;
            info!("{}: updated {} cells in {}", pass, self.report.updated, range);
        }

        self.report.duration_ms = self.started.elapsed().as_millis() as u64;
        if let Some(ref cb) = ctx.config.progress_callback {
            cb.on_pass_complete(&self.report);
        }
        Ok(self.report)
    }
}
