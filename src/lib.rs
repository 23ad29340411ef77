//! # report-enrich
//!
//! Fill a spreadsheet of corporate report PDFs with fields extracted by a
//! generative model: the organization name, a short value statement, and
//! the 4-digit securities code.
//!
//! ## Passes
//!
//! Each row of the sheet references one PDF by URL. A run executes seven
//! passes in order; every pass fills exactly one column and writes it back
//! in a single bulk update.
//!
//! ```text
//! sheet
//!  │
//!  ├─ name-text        first 3 pages as text   ──▶ 組織名T
//!  ├─ name-image       first 3 pages as images ──▶ 組織名G
//!  ├─ name-merge       decision table / pick   ──▶ 組織名
//!  ├─ value-text       first 10 pages as text  ──▶ バリューT
//!  ├─ value-image      first 10 pages as images──▶ バリューG
//!  ├─ value-merge      decision table / fuse   ──▶ バリュー
//!  └─ securities-code  name ──▶ 4 digits       ──▶ 証券番号
//! ```
//!
//! Cells already holding a value or a sentinel (`取得失敗` failed,
//! `対象外` excluded) are never recomputed, so a second run on an unchanged
//! sheet makes no model calls and no writes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use report_enrich::{enrich_sheet, EnrichConfig, GoogleSheetsStore, PassKind};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider key read from GEMINI_API_KEY (or OPENAI_API_KEY, ...)
//!     let config = EnrichConfig::default();
//!     let sheet = Arc::new(GoogleSheetsStore::new(
//!         "1AbC...",
//!         "Sheet1",
//!         std::env::var("GOOGLE_SHEETS_ACCESS_TOKEN")?,
//!     ));
//!     let report = enrich_sheet(sheet, config, &PassKind::ALL).await?;
//!     eprintln!("{} cells updated", report.total_updated());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `report-enrich` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cell;
pub mod config;
pub mod enrich;
pub mod error;
pub mod output;
pub mod passes;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod sheet;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cell::{Cell, EXCLUDED, FAILED};
pub use config::{ColumnNames, EnrichConfig, EnrichConfigBuilder, FieldSettings};
pub use enrich::{enrich_sheet, ensure_pdf_engine, Enricher, ACKNOWLEDGEMENT};
pub use error::{EnrichError, RowError};
pub use output::{PassReport, RowOutcome, RunReport};
pub use passes::{FieldPipeline, MergePolicy, PassKind};
pub use pipeline::extract::{PdfContentExtractor, PdfiumExtractor};
pub use pipeline::fetch::{HttpPdfFetcher, PdfFetcher};
pub use pipeline::llm::{Attachment, CompletionRequest, CompletionService, ProviderCompletion};
pub use progress::{EnrichProgressCallback, NoopProgressCallback, ProgressCallback};
pub use sheet::{GoogleSheetsStore, MemorySheet, SheetStore, SheetTable};
