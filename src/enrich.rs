//! Run orchestration: wire the collaborators once and execute the passes
//! in order.
//!
//! Passes run strictly one after another and each re-reads the sheet, so a
//! later pass sees what an earlier one wrote (value extraction reads the
//! merged organization name, the securities code reads it too). A failing
//! pass aborts the run; rows that failed inside a pass do not.

use crate::config::EnrichConfig;
use crate::error::EnrichError;
use crate::output::{PassReport, RunReport};
use crate::passes::{self, ExtractionMode, FieldPipeline, PassContext, PassKind};
use crate::pipeline::extract::{PdfContentExtractor, PdfiumExtractor};
use crate::pipeline::fetch::{HttpPdfFetcher, PdfFetcher};
use crate::pipeline::llm::{resolve_provider, CompletionService, ProviderCompletion, Summarizer};
use crate::sheet::SheetStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Line printed by the trigger once a run finishes.
pub const ACKNOWLEDGEMENT: &str = "enrichment run completed";

/// Owns the collaborators of a run.
///
/// Everything is injected, which is how the integration tests drive the
/// passes against an in-memory sheet and scripted model answers. Use
/// [`enrich_sheet`] for the production wiring.
pub struct Enricher {
    sheet: Arc<dyn SheetStore>,
    fetcher: Arc<dyn PdfFetcher>,
    extractor: Arc<dyn PdfContentExtractor>,
    summarizer: Summarizer,
    config: EnrichConfig,
    name: FieldPipeline,
    value: FieldPipeline,
}

impl Enricher {
    pub fn new(
        config: EnrichConfig,
        sheet: Arc<dyn SheetStore>,
        fetcher: Arc<dyn PdfFetcher>,
        extractor: Arc<dyn PdfContentExtractor>,
        completion: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            name: FieldPipeline::organization_name(&config),
            value: FieldPipeline::value_statement(&config),
            sheet,
            fetcher,
            extractor,
            summarizer: Summarizer::new(completion),
            config,
        }
    }

    pub fn config(&self) -> &EnrichConfig {
        &self.config
    }

    /// Run every pass in order.
    pub async fn run(&self) -> Result<RunReport, EnrichError> {
        self.run_passes(&PassKind::ALL).await
    }

    /// Run a subset of the passes. Order always follows [`PassKind::ALL`],
    /// whatever the order of `selected`.
    pub async fn run_passes(&self, selected: &[PassKind]) -> Result<RunReport, EnrichError> {
        let start = Instant::now();
        let mut report = RunReport::default();

        for pass in PassKind::ALL.into_iter().filter(|p| selected.contains(p)) {
            match self.run_pass(pass).await {
                Ok(pass_report) => report.passes.push(pass_report),
                Err(e) => {
                    error!("{} aborted: {}", pass, e);
                    return Err(e);
                }
            }
        }

        report.total_duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Run finished: {} passes, {} cells updated, {} writes in {}ms",
            report.passes.len(),
            report.total_updated(),
            report.writes(),
            report.total_duration_ms
        );
        Ok(report)
    }

    /// Run a single pass.
    pub async fn run_pass(&self, pass: PassKind) -> Result<PassReport, EnrichError> {
        let ctx = PassContext {
            sheet: self.sheet.as_ref(),
            fetcher: self.fetcher.as_ref(),
            extractor: self.extractor.as_ref(),
            summarizer: &self.summarizer,
            config: &self.config,
        };

        match pass {
            PassKind::NameText => passes::extract::run(&ctx, &self.name, ExtractionMode::Text).await,
            PassKind::NameImage => passes::extract::run(&ctx, &self.name, ExtractionMode::Image).await,
            PassKind::NameMerge => passes::merge::run(&ctx, &self.name).await,
            PassKind::ValueText => passes::extract::run(&ctx, &self.value, ExtractionMode::Text).await,
            PassKind::ValueImage => {
                passes::extract::run(&ctx, &self.value, ExtractionMode::Image).await
            }
            PassKind::ValueMerge => passes::merge::run(&ctx, &self.value).await,
            PassKind::SecuritiesCode => passes::securities::run(&ctx).await,
        }
    }
}

/// Enrich `sheet` with the production collaborators.
///
/// Resolves the model provider first, so a missing API key fails before the
/// sheet is touched. The PDF engine is only made available when a selected
/// pass reads PDFs.
pub async fn enrich_sheet(
    sheet: Arc<dyn SheetStore>,
    config: EnrichConfig,
    selected: &[PassKind],
) -> Result<RunReport, EnrichError> {
    let provider = resolve_provider(&config)?;
    if config.provider.is_none() {
        info!(
            "Using provider {} / model {}",
            config.provider_name(),
            config.model()
        );
    }

    if selected.iter().any(PassKind::reads_pdfs) {
        ensure_pdf_engine().await?;
    }

    let completion = Arc::new(ProviderCompletion::new(provider, &config));
    let fetcher = Arc::new(HttpPdfFetcher::new(&config.user_agent)?);
    let extractor = Arc::new(PdfiumExtractor::from_config(&config));

    Enricher::new(config, sheet, fetcher, extractor, completion)
        .run_passes(selected)
        .await
}

/// Make sure the pdfium shared library is present, downloading it on the
/// first run.
pub async fn ensure_pdf_engine() -> Result<(), EnrichError> {
    tokio::task::spawn_blocking(|| pdfium_auto::ensure_pdfium_library(None))
        .await
        .map_err(|e| EnrichError::Internal(format!("pdfium setup task panicked: {e}")))?
        .map(|path| info!("PDF engine at {}", path.display()))
        .map_err(|e| EnrichError::PdfiumBindingFailed(e.to_string()))
}
