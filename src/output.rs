//! Run and pass statistics returned by the orchestrator.

use crate::cell::Cell;
use crate::passes::PassKind;
use serde::Serialize;

/// What a pass did with one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOutcome {
    /// Nothing to do: no URL, target already filled, or inputs not ready.
    Skipped,
    /// Wrote a real value.
    Filled,
    /// Wrote the "extraction failed" sentinel.
    Failed,
    /// Wrote the "out of scope" sentinel.
    Excluded,
    /// Arbitration was inconclusive; the cell is left empty for a later run.
    Unresolved,
}

impl RowOutcome {
    /// Outcome of writing `cell`.
    pub fn of(cell: &Cell) -> Self {
        match cell {
            Cell::Empty => RowOutcome::Unresolved,
            Cell::Failed => RowOutcome::Failed,
            Cell::Excluded => RowOutcome::Excluded,
            Cell::Value(_) => RowOutcome::Filled,
        }
    }
}

/// Statistics for a single pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub pass: PassKind,
    /// Data rows in the sheet when the pass read it.
    pub rows: usize,
    /// Cells updated in memory (filled + failed + excluded).
    pub updated: usize,
    pub skipped: usize,
    pub filled: usize,
    pub failed: usize,
    pub excluded: usize,
    pub unresolved: usize,
    /// Whether the bulk column write was issued.
    pub written: bool,
    pub duration_ms: u64,
}

impl PassReport {
    pub fn new(pass: PassKind, rows: usize) -> Self {
        Self {
            pass,
            rows,
            updated: 0,
            skipped: 0,
            filled: 0,
            failed: 0,
            excluded: 0,
            unresolved: 0,
            written: false,
            duration_ms: 0,
        }
    }

    /// Tally one row.
    pub fn record(&mut self, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Skipped => self.skipped += 1,
            RowOutcome::Unresolved => self.unresolved += 1,
            RowOutcome::Filled => {
                self.filled += 1;
                self.updated += 1;
            }
            RowOutcome::Failed => {
                self.failed += 1;
                self.updated += 1;
            }
            RowOutcome::Excluded => {
                self.excluded += 1;
                self.updated += 1;
            }
        }
    }
}

/// Statistics for a full orchestrated run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub passes: Vec<PassReport>,
    pub total_duration_ms: u64,
}

impl RunReport {
    /// Cells updated across every pass.
    pub fn total_updated(&self) -> usize {
        self.passes.iter().map(|p| p.updated).sum()
    }

    /// Bulk writes issued across every pass.
    pub fn writes(&self) -> usize {
        self.passes.iter().filter(|p| p.written).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_tallies_updates() {
        let mut r = PassReport::new(PassKind::NameText, 5);
        r.record(RowOutcome::Skipped);
        r.record(RowOutcome::Filled);
        r.record(RowOutcome::Failed);
        r.record(RowOutcome::Excluded);
        r.record(RowOutcome::Unresolved);
        assert_eq!(r.updated, 3);
        assert_eq!(r.skipped, 1);
        assert_eq!(r.unresolved, 1);
    }

    #[test]
    fn outcome_of_cell() {
        assert_eq!(RowOutcome::of(&Cell::Value("x".into())), RowOutcome::Filled);
        assert_eq!(RowOutcome::of(&Cell::Excluded), RowOutcome::Excluded);
        assert_eq!(RowOutcome::of(&Cell::Failed), RowOutcome::Failed);
    }

    #[test]
    fn report_serialises_pass_name() {
        let r = PassReport::new(PassKind::ValueMerge, 0);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"value-merge\""), "got: {json}");
    }
}
