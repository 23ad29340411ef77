//! PDF content extraction via pdfium: page text and rasterised pages.
//!
//! Both operations are CPU-bound and pdfium is not async-safe, so the
//! [`PdfiumExtractor`] runs them inside `spawn_blocking`. The PDF bytes are
//! moved into the blocking task and dropped there once the document is
//! closed.

use crate::config::EnrichConfig;
use crate::error::RowError;
use futures::future::BoxFuture;
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// The collaborator that reads PDF bytes.
pub trait PdfContentExtractor: Send + Sync {
    /// Concatenated text of the first `max_pages` pages, one page per line
    /// block. Empty pages contribute nothing.
    fn extract_text(&self, pdf: Vec<u8>, max_pages: usize) -> BoxFuture<'_, Result<String, RowError>>;

    /// The first `max_pages` pages rendered as images, in page order.
    fn render_pages(
        &self,
        pdf: Vec<u8>,
        max_pages: usize,
    ) -> BoxFuture<'_, Result<Vec<DynamicImage>, RowError>>;
}

/// pdfium-backed extractor.
#[derive(Debug, Clone, Copy)]
pub struct PdfiumExtractor {
    dpi: u32,
    max_pixels: u32,
}

impl PdfiumExtractor {
    pub fn new(dpi: u32, max_pixels: u32) -> Self {
        Self { dpi, max_pixels }
    }

    pub fn from_config(config: &EnrichConfig) -> Self {
        Self::new(config.dpi, config.max_rendered_pixels)
    }
}

impl PdfContentExtractor for PdfiumExtractor {
    fn extract_text(&self, pdf: Vec<u8>, max_pages: usize) -> BoxFuture<'_, Result<String, RowError>> {
        Box::pin(async move {
            tokio::task::spawn_blocking(move || extract_text_blocking(pdf, max_pages))
                .await
                .map_err(|e| RowError::CorruptPdf(format!("text task panicked: {e}")))?
        })
    }

    fn render_pages(
        &self,
        pdf: Vec<u8>,
        max_pages: usize,
    ) -> BoxFuture<'_, Result<Vec<DynamicImage>, RowError>> {
        let (dpi, max_pixels) = (self.dpi, self.max_pixels);
        Box::pin(async move {
            tokio::task::spawn_blocking(move || render_pages_blocking(pdf, max_pages, dpi, max_pixels))
                .await
                .map_err(|e| RowError::RenderFailed {
                    page: 0,
                    detail: format!("render task panicked: {e}"),
                })?
        })
    }
}

fn bind() -> Result<Pdfium, RowError> {
    pdfium_auto::bind_pdfium_silent().map_err(|e| RowError::CorruptPdf(format!("pdfium unavailable: {e}")))
}

/// Blocking implementation of text extraction.
fn extract_text_blocking(pdf: Vec<u8>, max_pages: usize) -> Result<String, RowError> {
    let pdfium = bind()?;
    let document = pdfium
        .load_pdf_from_byte_vec(pdf, None)
        .map_err(|e| RowError::CorruptPdf(format!("{e:?}")))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    let limit = total_pages.min(max_pages);

    let mut text = String::new();
    for idx in 0..limit {
        let Ok(page) = pages.get(idx as u16) else {
            continue;
        };
        let Ok(page_text) = page.text() else {
            continue;
        };
        let chunk = page_text.all();
        if !chunk.is_empty() {
            text.push_str(&chunk);
            text.push('\n');
        }
    }

    debug!(
        "Extracted {} chars from {}/{} pages",
        text.chars().count(),
        limit,
        total_pages
    );
    Ok(text)
}

/// Blocking implementation of page rendering.
fn render_pages_blocking(
    pdf: Vec<u8>,
    max_pages: usize,
    dpi: u32,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, RowError> {
    let pdfium = bind().map_err(|e| RowError::RenderFailed {
        page: 0,
        detail: e.to_string(),
    })?;
    let document = pdfium
        .load_pdf_from_byte_vec(pdf, None)
        .map_err(|e| RowError::CorruptPdf(format!("{e:?}")))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    let limit = total_pages.min(max_pages);
    info!("PDF loaded: {} pages, rendering {}", total_pages, limit);

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(dpi as f32 / 72.0)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut images = Vec::with_capacity(limit);
    for idx in 0..limit {
        let page = pages.get(idx as u16).map_err(|e| RowError::RenderFailed {
            page: idx + 1,
            detail: format!("{e:?}"),
        })?;

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| RowError::RenderFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        images.push(image);
    }

    if images.is_empty() {
        return Err(RowError::RenderFailed {
            page: 1,
            detail: "document has no pages".into(),
        });
    }
    Ok(images)
}
