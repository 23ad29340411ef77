//! Per-row stages shared by the extraction passes.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ extract ──┬──▶ (text) ─────────────┬──▶ llm ──▶ normalize
//! (HTTP)   (pdfium)   └──▶ (images) ──▶ encode ┘   (model)   (cleanup)
//! ```
//!
//! 1. [`fetch`]   download the source PDF into memory, with a per-field timeout
//! 2. [`extract`] pdfium text or page images of the first N pages; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`]  PNG-encode and base64-wrap each rendered page
//! 4. [`llm`]     the completion seam and the summarization adapter
//! 5. [`normalize`] strip fences, quotes and invisible characters from answers
//!
//! Every stage returns [`crate::error::RowError`]; the pass that owns the row
//! turns it into a sentinel.

pub mod encode;
pub mod extract;
pub mod fetch;
pub mod llm;
pub mod normalize;
