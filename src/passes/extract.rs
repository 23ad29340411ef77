//! Extraction passes: one model call per row over the PDF's text or its
//! rendered first pages.

use crate::cell::Cell;
use crate::error::{EnrichError, RowError};
use crate::output::{PassReport, RowOutcome};
use crate::passes::column::ColumnUpdate;
use crate::passes::{ExtractionMode, FieldPipeline, Gate, PassContext};
use crate::pipeline::encode::encode_pages;
use crate::pipeline::llm::Attachment;
use crate::sheet::SheetTable;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What to do with one row before any I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowPlan {
    Skip,
    /// Write this cell without downloading anything.
    Write(Cell),
    /// Download and extract from this URL.
    Extract(String),
}

/// Decide a row from the sheet alone.
pub fn plan_row(
    table: &SheetTable,
    row: usize,
    url_column: &str,
    target: &Cell,
    gate: &Gate,
) -> RowPlan {
    let url = table.get_named(row, url_column).trim();
    if url.is_empty() || target.is_filled() {
        return RowPlan::Skip;
    }
    if gate.excludes(table, row) {
        return RowPlan::Write(Cell::Excluded);
    }
    RowPlan::Extract(url.to_string())
}

/// Run the text or image variant of `pipeline` over every row.
pub async fn run(
    ctx: &PassContext<'_>,
    pipeline: &FieldPipeline,
    mode: ExtractionMode,
) -> Result<PassReport, EnrichError> {
    let pass = pipeline.extraction_pass(mode);
    let table = ctx.sheet.read_table().await?;
    let mut update = ColumnUpdate::open(pass, &table, pipeline.target_column(mode));
    info!("{}: {} rows", pass, table.len());
    if let Some(ref cb) = ctx.config.progress_callback {
        cb.on_pass_start(pass, table.len());
    }

    for row in 0..table.len() {
        let plan = plan_row(
            &table,
            row,
            &ctx.config.columns.source_url,
            &update.current(row),
            &pipeline.gate,
        );
        match plan {
            RowPlan::Skip => update.record(ctx, row, RowOutcome::Skipped),
            RowPlan::Write(cell) => update.set(ctx, row, &cell),
            RowPlan::Extract(url) => {
                let cell = extract_row(ctx, pipeline, mode, &url).await;
                debug!("{} row {}: {:?}", pass, row + 2, cell);
                update.set(ctx, row, &cell);
            }
        }
    }

    update.flush(ctx).await
}

/// Fetch, extract and summarize one row. Every failure becomes
/// [`Cell::Failed`].
async fn extract_row(
    ctx: &PassContext<'_>,
    pipeline: &FieldPipeline,
    mode: ExtractionMode,
    url: &str,
) -> Cell {
    match prepare(ctx, pipeline, mode, url).await {
        Ok(attachment) => {
            ctx.summarizer
                .summarize(pipeline.instruction(mode), attachment)
                .await
        }
        Err(e) => {
            warn!("{}: {}", url, e);
            Cell::Failed
        }
    }
}

/// Everything up to the model call. The PDF bytes move into the extractor
/// and rendered pages are consumed by the encoder.
async fn prepare(
    ctx: &PassContext<'_>,
    pipeline: &FieldPipeline,
    mode: ExtractionMode,
    url: &str,
) -> Result<Attachment, RowError> {
    let timeout = Duration::from_secs(pipeline.settings.fetch_timeout_secs);
    let pdf = ctx.fetcher.fetch(url, timeout).await?;
    let pages = pipeline.page_limit(mode);

    match mode {
        ExtractionMode::Text => {
            let text = ctx.extractor.extract_text(pdf, pages).await?;
            if text.trim().is_empty() {
                return Err(RowError::NoText { pages });
            }
            Ok(Attachment::Text(text))
        }
        ExtractionMode::Image => {
            let images = ctx.extractor.render_pages(pdf, pages).await?;
            Ok(Attachment::Images(encode_pages(images)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[[&str; 3]]) -> SheetTable {
        SheetTable::new(
            vec!["URL".into(), "ページ数".into(), "組織名".into()],
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    fn page_gate() -> Gate {
        Gate::MaxExcludedPageCount {
            column: "ページ数".into(),
            pages: 15.0,
        }
    }

    fn name_gate() -> Gate {
        Gate::RequireValue {
            column: "組織名".into(),
        }
    }

    #[test]
    fn rows_without_url_are_skipped() {
        let t = table(&[["", "40", ""], ["   ", "40", ""]]);
        assert_eq!(plan_row(&t, 0, "URL", &Cell::Empty, &page_gate()), RowPlan::Skip);
        assert_eq!(plan_row(&t, 1, "URL", &Cell::Empty, &page_gate()), RowPlan::Skip);
    }

    #[test]
    fn filled_targets_are_skipped() {
        let t = table(&[["https://x/a.pdf", "40", ""]]);
        for target in [
            Cell::Failed,
            Cell::Excluded,
            Cell::Value("Acme".into()),
        ] {
            assert_eq!(plan_row(&t, 0, "URL", &target, &page_gate()), RowPlan::Skip);
        }
    }

    #[test]
    fn short_reports_are_excluded_without_download() {
        let t = table(&[
            ["https://x/a.pdf", "10", ""],
            ["https://x/b.pdf", "15", ""],
            ["https://x/c.pdf", "16", ""],
            ["https://x/d.pdf", "", ""],
        ]);
        let plan = |row| plan_row(&t, row, "URL", &Cell::Empty, &page_gate());
        assert_eq!(plan(0), RowPlan::Write(Cell::Excluded));
        assert_eq!(plan(1), RowPlan::Write(Cell::Excluded));
        assert_eq!(plan(2), RowPlan::Extract("https://x/c.pdf".into()));
        assert_eq!(plan(3), RowPlan::Extract("https://x/d.pdf".into()));
    }

    #[test]
    fn value_extraction_requires_a_usable_name() {
        let t = table(&[
            ["https://x/a.pdf", "40", ""],
            ["https://x/b.pdf", "40", "取得失敗"],
            ["https://x/c.pdf", "40", "対象外"],
            ["https://x/d.pdf", "40", "Acme"],
        ]);
        let plan = |row| plan_row(&t, row, "URL", &Cell::Empty, &name_gate());
        assert_eq!(plan(0), RowPlan::Write(Cell::Excluded));
        assert_eq!(plan(1), RowPlan::Write(Cell::Excluded));
        assert_eq!(plan(2), RowPlan::Write(Cell::Excluded));
        assert_eq!(plan(3), RowPlan::Extract("https://x/d.pdf".into()));
    }
}
