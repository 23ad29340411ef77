//! Progress-callback trait for per-pass and per-row enrichment events.
//!
//! Inject an [`Arc<dyn EnrichProgressCallback>`] via
//! [`crate::config::EnrichConfigBuilder::progress_callback`] to receive
//! events as the orchestrator sweeps the sheet.
//!
//! # Example
//!
//! ```rust
//! use report_enrich::{EnrichProgressCallback, EnrichConfig, PassKind, RowOutcome};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FilledCounter {
//!     filled: AtomicUsize,
//! }
//!
//! impl EnrichProgressCallback for FilledCounter {
//!     fn on_row_complete(&self, _pass: PassKind, _row: usize, outcome: RowOutcome) {
//!         if outcome == RowOutcome::Filled {
//!             self.filled.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let counter = Arc::new(FilledCounter { filled: AtomicUsize::new(0) });
//!
//! let config = EnrichConfig::builder()
//!     .progress_callback(counter as Arc<dyn EnrichProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{PassReport, RowOutcome};
use crate::passes::PassKind;
use std::sync::Arc;

/// Called by the orchestrator as it processes each pass.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait EnrichProgressCallback: Send + Sync {
    /// Called once the pass has read the sheet.
    ///
    /// # Arguments
    /// * `pass`: the pass about to run
    /// * `rows`: data rows in the sheet
    fn on_pass_start(&self, pass: PassKind, rows: usize) {
        let _ = (pass, rows);
    }

    /// Called after each row, including skipped ones.
    ///
    /// # Arguments
    /// * `pass`: the running pass
    /// * `row`: 1-indexed sheet row number (the header is row 1)
    /// * `outcome`: what the pass did with the row
    fn on_row_complete(&self, pass: PassKind, row: usize, outcome: RowOutcome) {
        let _ = (pass, row, outcome);
    }

    /// Called after the pass flushed (or decided not to flush) its column.
    fn on_pass_complete(&self, report: &PassReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl EnrichProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::EnrichConfig`].
pub type ProgressCallback = Arc<dyn EnrichProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        passes: AtomicUsize,
        rows: AtomicUsize,
        completed: AtomicUsize,
    }

    impl EnrichProgressCallback for TrackingCallback {
        fn on_pass_start(&self, _pass: PassKind, _rows: usize) {
            self.passes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_row_complete(&self, _pass: PassKind, _row: usize, _outcome: RowOutcome) {
            self.rows.fetch_add(1, Ordering::SeqCst);
        }

        fn on_pass_complete(&self, report: &PassReport) {
            self.completed.fetch_add(report.updated, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_pass_start(PassKind::NameText, 3);
        cb.on_row_complete(PassKind::NameText, 2, RowOutcome::Skipped);
        cb.on_pass_complete(&PassReport::new(PassKind::NameText, 3));
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            passes: AtomicUsize::new(0),
            rows: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        };

        tracker.on_pass_start(PassKind::ValueText, 2);
        tracker.on_row_complete(PassKind::ValueText, 2, RowOutcome::Filled);
        tracker.on_row_complete(PassKind::ValueText, 3, RowOutcome::Failed);
        let mut report = PassReport::new(PassKind::ValueText, 2);
        report.record(RowOutcome::Filled);
        report.record(RowOutcome::Failed);
        tracker.on_pass_complete(&report);

        assert_eq!(tracker.passes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.rows.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completed.load(Ordering::SeqCst), 2);
    }
}
