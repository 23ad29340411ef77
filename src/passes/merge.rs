//! Merge passes: combine the text and image candidates of a field into the
//! final column.
//!
//! | text      | image     | result                    |
//! |-----------|-----------|---------------------------|
//! | empty     | any       | wait (skip)               |
//! | any       | empty     | wait (skip)               |
//! | value     | value     | model arbitration         |
//! | value     | sentinel  | text value                |
//! | sentinel  | value     | image value               |
//! | excluded  | sentinel  | excluded                  |
//! | sentinel  | excluded  | excluded                  |
//! | failed    | failed    | failed                    |
//!
//! Rows the field's gate already classified as excluded are written as
//! excluded without consulting the table.

use crate::cell::Cell;
use crate::error::EnrichError;
use crate::output::{PassReport, RowOutcome};
use crate::passes::column::ColumnUpdate;
use crate::passes::{FieldPipeline, MergePolicy, PassContext};
use crate::pipeline::llm::{CompletionRequest, Summarizer};
use crate::prompts;
use tracing::{debug, info, warn};

/// Outcome of the decision table for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeDecision {
    /// A candidate column is still empty.
    NotReady,
    /// Write this cell as-is.
    Resolved(Cell),
    /// Both candidates are valid; ask the model.
    Arbitrate { text: String, image: String },
}

/// Apply the decision table.
pub fn decide(text: &Cell, image: &Cell) -> MergeDecision {
    match (text, image) {
        (Cell::Empty, _) | (_, Cell::Empty) => MergeDecision::NotReady,
        (Cell::Value(t), Cell::Value(i)) => MergeDecision::Arbitrate {
            text: t.clone(),
            image: i.clone(),
        },
        (Cell::Value(v), _) | (_, Cell::Value(v)) => MergeDecision::Resolved(Cell::Value(v.clone())),
        (Cell::Excluded, _) | (_, Cell::Excluded) => MergeDecision::Resolved(Cell::Excluded),
        (Cell::Failed, Cell::Failed) => MergeDecision::Resolved(Cell::Failed),
    }
}

/// Resolve two valid candidates. `None` leaves the cell empty.
pub async fn arbitrate(
    summarizer: &Summarizer,
    policy: MergePolicy,
    text: &str,
    image: &str,
) -> Option<Cell> {
    match policy {
        MergePolicy::ChooseCandidate => {
            if text == image {
                return Some(Cell::Value(text.to_string()));
            }
            let request = CompletionRequest::prompt(prompts::choose_org_name(text, image));
            match summarizer.ask(request).await {
                Ok(answer) if answer == text || answer == image => Some(Cell::Value(answer)),
                Ok(answer) => {
                    warn!("Arbitration answer {:?} matches neither candidate", answer);
                    None
                }
                Err(e) => {
                    warn!("Arbitration call failed: {}", e);
                    Some(Cell::Failed)
                }
            }
        }
        MergePolicy::Synthesize {
            min_chars,
            max_chars,
        } => {
            let request = CompletionRequest::prompt(prompts::merge_values(text, image, max_chars));
            match summarizer.ask(request).await {
                Ok(answer) => match Cell::from_response(&answer) {
                    Cell::Value(v) if v.chars().count() >= min_chars => Some(Cell::Value(v)),
                    Cell::Value(v) => {
                        debug!("Merged statement too short ({} chars)", v.chars().count());
                        Some(Cell::Failed)
                    }
                    _ => Some(Cell::Failed),
                },
                Err(e) => {
                    warn!("Merge call failed: {}", e);
                    Some(Cell::Failed)
                }
            }
        }
    }
}

/// Run the merge pass of `pipeline` over every row.
pub async fn run(ctx: &PassContext<'_>, pipeline: &FieldPipeline) -> Result<PassReport, EnrichError> {
    let pass = pipeline.merge_pass();
    let table = ctx.sheet.read_table().await?;
    let mut update = ColumnUpdate::open(pass, &table, &pipeline.merged_column);
    info!("{}: {} rows", pass, table.len());
    if let Some(ref cb) = ctx.config.progress_callback {
        cb.on_pass_start(pass, table.len());
    }

    for row in 0..table.len() {
        if update.current(row).is_filled() {
            update.record(ctx, row, RowOutcome::Skipped);
            continue;
        }
        if pipeline.gate.excluded_upstream(&table, row) {
            update.set(ctx, row, &Cell::Excluded);
            continue;
        }
        let text = Cell::parse(table.get_named(row, &pipeline.text_column));
        let image = Cell::parse(table.get_named(row, &pipeline.image_column));

        match decide(&text, &image) {
            MergeDecision::NotReady => update.record(ctx, row, RowOutcome::Skipped),
            MergeDecision::Resolved(cell) => update.set(ctx, row, &cell),
            MergeDecision::Arbitrate { text, image } => {
                match arbitrate(ctx.summarizer, pipeline.merge, &text, &image).await {
                    Some(cell) => update.set(ctx, row, &cell),
                    None => update.record(ctx, row, RowOutcome::Unresolved),
                }
            }
        }
    }

    update.flush(ctx).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RowError;
    use crate::pipeline::llm::CompletionService;
    use futures::future::BoxFuture;
    use std::sync::Arc;

    fn v(s: &str) -> Cell {
        Cell::Value(s.into())
    }

    struct Fixed(Result<String, RowError>);

    impl CompletionService for Fixed {
        fn complete(&self, _: CompletionRequest) -> BoxFuture<'_, Result<String, RowError>> {
            let answer = self.0.clone();
            Box::pin(async move { answer })
        }
    }

    fn summarizer(answer: Result<&str, RowError>) -> Summarizer {
        Summarizer::new(Arc::new(Fixed(answer.map(str::to_string))))
    }

    const VALUES: MergePolicy = MergePolicy::Synthesize {
        min_chars: 70,
        max_chars: 150,
    };

    #[test]
    fn decision_table() {
        use MergeDecision::*;
        assert_eq!(decide(&Cell::Empty, &v("a")), NotReady);
        assert_eq!(decide(&Cell::Failed, &Cell::Empty), NotReady);
        assert_eq!(decide(&v("Acme Corp"), &Cell::Failed), Resolved(v("Acme Corp")));
        assert_eq!(decide(&v("Acme Corp"), &Cell::Excluded), Resolved(v("Acme Corp")));
        assert_eq!(decide(&Cell::Failed, &v("ACME")), Resolved(v("ACME")));
        assert_eq!(decide(&Cell::Excluded, &Cell::Excluded), Resolved(Cell::Excluded));
        assert_eq!(decide(&Cell::Excluded, &Cell::Failed), Resolved(Cell::Excluded));
        assert_eq!(decide(&Cell::Failed, &Cell::Excluded), Resolved(Cell::Excluded));
        assert_eq!(decide(&Cell::Failed, &Cell::Failed), Resolved(Cell::Failed));
        assert_eq!(
            decide(&v("a"), &v("b")),
            Arbitrate {
                text: "a".into(),
                image: "b".into()
            }
        );
    }

    #[tokio::test]
    async fn name_arbitration_accepts_only_a_candidate() {
        let s = summarizer(Ok("「トヨタ自動車」"));
        let cell = arbitrate(&s, MergePolicy::ChooseCandidate, "トヨタ自動車", "TOYOTA").await;
        assert_eq!(cell, Some(v("トヨタ自動車")));

        let s = summarizer(Ok("トヨタ"));
        let cell = arbitrate(&s, MergePolicy::ChooseCandidate, "トヨタ自動車", "TOYOTA").await;
        assert_eq!(cell, None);

        let s = summarizer(Err(RowError::LlmTimeout { secs: 60 }));
        let cell = arbitrate(&s, MergePolicy::ChooseCandidate, "トヨタ自動車", "TOYOTA").await;
        assert_eq!(cell, Some(Cell::Failed));
    }

    #[tokio::test]
    async fn identical_names_need_no_call() {
        let s = summarizer(Err(RowError::LlmFailed("unreachable".into())));
        let cell = arbitrate(&s, MergePolicy::ChooseCandidate, "Acme", "Acme").await;
        assert_eq!(cell, Some(v("Acme")));
    }

    #[tokio::test]
    async fn short_merged_statement_is_failed() {
        let forty = "誠".repeat(40);
        let s = summarizer(Ok(forty.as_str()));
        assert_eq!(arbitrate(&s, VALUES, "a", "b").await, Some(Cell::Failed));

        let seventy = "誠".repeat(70);
        let s = summarizer(Ok(seventy.as_str()));
        assert_eq!(arbitrate(&s, VALUES, "a", "b").await, Some(v(&seventy)));
    }

    #[tokio::test]
    async fn failure_literal_and_errors_are_failed() {
        let s = summarizer(Ok("取得失敗"));
        assert_eq!(arbitrate(&s, VALUES, "a", "b").await, Some(Cell::Failed));

        let s = summarizer(Ok(""));
        assert_eq!(arbitrate(&s, VALUES, "a", "b").await, Some(Cell::Failed));

        let s = summarizer(Err(RowError::LlmFailed("500".into())));
        assert_eq!(arbitrate(&s, VALUES, "a", "b").await, Some(Cell::Failed));
    }
}
