//! Securities-code lookup from the resolved organization name.
//!
//! Unlike the extraction passes, every unsuccessful outcome here (no
//! usable name, a call error, an answer that is not four digits) is written
//! as [`Cell::Excluded`]: a row without a code is treated as not listed.

use crate::cell::{parse_securities_code, Cell};
use crate::error::EnrichError;
use crate::output::{PassReport, RowOutcome};
use crate::passes::column::ColumnUpdate;
use crate::passes::{PassContext, PassKind};
use crate::pipeline::llm::{CompletionRequest, Summarizer};
use crate::prompts;
use tracing::{info, warn};

/// Look up the code for one organization name.
pub async fn lookup(summarizer: &Summarizer, name: &Cell) -> Cell {
    let Some(name) = name.valid_value() else {
        return Cell::Excluded;
    };
    match summarizer
        .ask(CompletionRequest::prompt(prompts::securities_code(name)))
        .await
    {
        Ok(answer) => match parse_securities_code(&answer) {
            Some(code) => Cell::Value(code),
            None => {
                info!("No securities code for {}: {:?}", name, answer);
                Cell::Excluded
            }
        },
        Err(e) => {
            warn!("Securities code lookup for {} failed: {}", name, e);
            Cell::Excluded
        }
    }
}

/// Run the securities-code pass over every row.
pub async fn run(ctx: &PassContext<'_>) -> Result<PassReport, EnrichError> {
    let pass = PassKind::SecuritiesCode;
    let columns = &ctx.config.columns;
    let table = ctx.sheet.read_table().await?;
    let mut update = ColumnUpdate::open(pass, &table, &columns.securities_code);
    info!("{}: {} rows", pass, table.len());
    if let Some(ref cb) = ctx.config.progress_callback {
        cb.on_pass_start(pass, table.len());
    }

    for row in 0..table.len() {
        let url = table.get_named(row, &columns.source_url).trim();
        if url.is_empty() || update.current(row).is_filled() {
            update.record(ctx, row, RowOutcome::Skipped);
            continue;
        }
        let name = Cell::parse(table.get_named(row, &columns.org_name));
        let cell = lookup(ctx.summarizer, &name).await;
        update.set(ctx, row, &cell);
    }

    update.flush(ctx).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RowError;
    use crate::pipeline::llm::CompletionService;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fixed {
        answer: Result<String, RowError>,
        calls: AtomicUsize,
    }

    impl CompletionService for Fixed {
        fn complete(&self, _: CompletionRequest) -> BoxFuture<'_, Result<String, RowError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let answer = self.answer.clone();
            Box::pin(async move { answer })
        }
    }

    fn fixed(answer: Result<&str, RowError>) -> (Summarizer, Arc<Fixed>) {
        let svc = Arc::new(Fixed {
            answer: answer.map(str::to_string),
            calls: AtomicUsize::new(0),
        });
        (Summarizer::new(svc.clone()), svc)
    }

    fn toyota() -> Cell {
        Cell::Value("トヨタ自動車".into())
    }

    #[tokio::test]
    async fn four_digit_answer_is_written() {
        let (s, _) = fixed(Ok(" 7203\n"));
        assert_eq!(lookup(&s, &toyota()).await, Cell::Value("7203".into()));
    }

    #[tokio::test]
    async fn malformed_answers_are_excluded() {
        for answer in ["12a4", "123", "12345", "取得失敗", "コードは7203です"] {
            let (s, _) = fixed(Ok(answer));
            assert_eq!(lookup(&s, &toyota()).await, Cell::Excluded, "answer {answer:?}");
        }
    }

    #[tokio::test]
    async fn call_errors_are_excluded() {
        let (s, _) = fixed(Err(RowError::LlmFailed("quota".into())));
        assert_eq!(lookup(&s, &toyota()).await, Cell::Excluded);
    }

    #[tokio::test]
    async fn unusable_names_skip_the_model() {
        let (s, svc) = fixed(Ok("7203"));
        for name in [Cell::Empty, Cell::Failed, Cell::Excluded] {
            assert_eq!(lookup(&s, &name).await, Cell::Excluded);
        }
        assert_eq!(svc.calls.load(Ordering::SeqCst), 0);
    }
}
