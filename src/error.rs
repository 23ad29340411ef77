//! Error types for the report-enrich library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`EnrichError`]: **Fatal**: the run cannot proceed at all (no LLM
//!   credential, the sheet cannot be read or written, pdfium is missing).
//!   Returned as `Err(EnrichError)` from [`crate::enrich`] entry points.
//!
//! * [`RowError`]: **Row-scoped**: one row's download, extraction or model
//!   call failed. It never leaves the pass that produced it; the pass maps
//!   it to a sentinel cell (see [`crate::cell::Cell`]) and moves on to the
//!   next row.

use thiserror::Error;

/// All fatal errors returned by the report-enrich library.
#[derive(Debug, Error)]
pub enum EnrichError {
    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Sheet errors ──────────────────────────────────────────────────────
    /// The worksheet could not be read.
    #[error("Failed to read sheet '{sheet}': {reason}")]
    SheetRead { sheet: String, reason: String },

    /// A bulk column write was rejected.
    #[error("Failed to write range '{range}': {reason}")]
    SheetWrite { range: String, reason: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single row.
///
/// Logged and turned into a sentinel by the owning pass; the remaining rows
/// are processed regardless.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RowError {
    /// Transport-level download failure.
    #[error("download of '{url}' failed: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the per-request timeout.
    #[error("download of '{url}' timed out after {secs}s")]
    DownloadTimeout { url: String, secs: u64 },

    /// The server answered with a non-success status.
    #[error("download of '{url}' returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The body does not start with the `%PDF` magic bytes.
    #[error("'{url}' is not a PDF (first bytes: {magic:?})")]
    NotAPdf { url: String, magic: [u8; 4] },

    /// pdfium could not open the document.
    #[error("PDF is corrupt: {0}")]
    CorruptPdf(String),

    /// Text extraction produced nothing but whitespace.
    #[error("no text in the first {pages} pages")]
    NoText { pages: usize },

    /// pdfium failed to rasterise a page.
    #[error("rendering page {page} failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// A rendered page could not be PNG-encoded.
    #[error("encoding page {page} failed: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// The completion service returned an error.
    #[error("LLM call failed: {0}")]
    LlmFailed(String),

    /// The completion service did not answer in time.
    #[error("LLM call timed out after {secs}s")]
    LlmTimeout { secs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_not_configured_display() {
        let e = EnrichError::ProviderNotConfigured {
            provider: "gemini".into(),
            hint: "Set GEMINI_API_KEY".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("gemini"), "got: {msg}");
        assert!(msg.contains("GEMINI_API_KEY"), "got: {msg}");
    }

    #[test]
    fn http_status_display() {
        let e = RowError::HttpStatus {
            url: "https://example.com/ir.pdf".into(),
            status: 404,
        };
        assert!(e.to_string().contains("HTTP 404"));
    }

    #[test]
    fn download_timeout_display() {
        let e = RowError::DownloadTimeout {
            url: "https://example.com/ir.pdf".into(),
            secs: 15,
        };
        assert!(e.to_string().contains("15s"));
    }

    #[test]
    fn sheet_write_display() {
        let e = EnrichError::SheetWrite {
            range: "'Sheet1'!C2:C10".into(),
            reason: "403".into(),
        };
        assert!(e.to_string().contains("C2:C10"));
    }
}
