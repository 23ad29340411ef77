//! The row enrichment passes.
//!
//! A pass is one sweep over every sheet row that fills exactly one column.
//! All passes share the same skeleton (see [`column::ColumnUpdate`]):
//!
//! ```text
//! read sheet ──▶ per row: skip? pre-filter? work ──▶ one bulk column write
//! ```
//!
//! and the same rules:
//!
//! - a filled cell (value or sentinel) is never touched again, so re-running
//!   a pass on an unchanged sheet writes nothing;
//! - every failure is row-scoped and ends up as a sentinel;
//! - `Excluded` is terminal and propagates downstream.
//!
//! Organization names and value statements go through the same generic
//! [`FieldPipeline`] (text variant, image variant, merge); only the page
//! limits, pre-filter, prompts and [`MergePolicy`] differ.

pub mod column;
pub mod extract;
pub mod merge;
pub mod securities;

use crate::cell::Cell;
use crate::config::{EnrichConfig, FieldSettings};
use crate::pipeline::extract::PdfContentExtractor;
use crate::pipeline::fetch::PdfFetcher;
use crate::pipeline::llm::Summarizer;
use crate::prompts;
use crate::sheet::{SheetStore, SheetTable};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Every pass, in the order the orchestrator runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassKind {
    NameText,
    NameImage,
    NameMerge,
    ValueText,
    ValueImage,
    ValueMerge,
    SecuritiesCode,
}

impl PassKind {
    /// Orchestrator order. Value passes read the merged organization name,
    /// and the securities code needs it too.
    pub const ALL: [PassKind; 7] = [
        PassKind::NameText,
        PassKind::NameImage,
        PassKind::NameMerge,
        PassKind::ValueText,
        PassKind::ValueImage,
        PassKind::ValueMerge,
        PassKind::SecuritiesCode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PassKind::NameText => "name-text",
            PassKind::NameImage => "name-image",
            PassKind::NameMerge => "name-merge",
            PassKind::ValueText => "value-text",
            PassKind::ValueImage => "value-image",
            PassKind::ValueMerge => "value-merge",
            PassKind::SecuritiesCode => "securities-code",
        }
    }

    /// Whether the pass downloads and opens PDFs.
    pub fn reads_pdfs(&self) -> bool {
        matches!(
            self,
            PassKind::NameText | PassKind::NameImage | PassKind::ValueText | PassKind::ValueImage
        )
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PassKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PassKind::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown pass '{s}'"))
    }
}

/// Where a pass gets its content from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// pdfium text of the first pages.
    Text,
    /// Rendered images of the first pages.
    Image,
}

/// Which derived field a pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    OrganizationName,
    ValueStatement,
}

/// Cheap pre-filter applied before any download.
#[derive(Debug, Clone, PartialEq)]
pub enum Gate {
    /// Exclude rows whose page count is known and at or below the bound.
    MaxExcludedPageCount { column: String, pages: f64 },
    /// Exclude rows whose `column` holds no usable value.
    RequireValue { column: String },
}

impl Gate {
    /// Whether the row is excluded before any download.
    pub(crate) fn excludes(&self, table: &SheetTable, row: usize) -> bool {
        match self {
            Gate::MaxExcludedPageCount { column, pages } => {
                matches!(parse_page_count(table.get_named(row, column)), Some(n) if n <= *pages)
            }
            Gate::RequireValue { column } => Cell::parse(table.get_named(row, column)).is_unusable(),
        }
    }

    /// Whether the row was already classified as excluded upstream. Unlike
    /// [`Gate::excludes`], a failed or missing prerequisite does not count.
    pub(crate) fn excluded_upstream(&self, table: &SheetTable, row: usize) -> bool {
        match self {
            Gate::MaxExcludedPageCount { .. } => self.excludes(table, row),
            Gate::RequireValue { column } => {
                matches!(Cell::parse(table.get_named(row, column)), Cell::Excluded)
            }
        }
    }
}

/// How the merge pass resolves two valid candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// The model picks one candidate; anything else leaves the cell empty.
    ChooseCandidate,
    /// The model writes a combined statement; short results count as failed.
    Synthesize { min_chars: usize, max_chars: usize },
}

/// One derived field: its three columns and how to fill them.
#[derive(Debug, Clone)]
pub struct FieldPipeline {
    pub field: Field,
    pub text_column: String,
    pub image_column: String,
    pub merged_column: String,
    pub settings: FieldSettings,
    pub gate: Gate,
    pub text_instruction: String,
    pub image_instruction: String,
    pub merge: MergePolicy,
}

impl FieldPipeline {
    /// Organization name: first three pages, short reports excluded.
    pub fn organization_name(config: &EnrichConfig) -> Self {
        let c = &config.columns;
        Self {
            field: Field::OrganizationName,
            text_column: c.org_name_text.clone(),
            image_column: c.org_name_image.clone(),
            merged_column: c.org_name.clone(),
            settings: config.name,
            gate: Gate::MaxExcludedPageCount {
                column: c.page_count.clone(),
                pages: config.min_page_count,
            },
            text_instruction: prompts::ORG_NAME_FROM_TEXT.to_string(),
            image_instruction: prompts::ORG_NAME_FROM_IMAGES.to_string(),
            merge: MergePolicy::ChooseCandidate,
        }
    }

    /// Value statement: first ten pages, only for rows with a resolved name.
    pub fn value_statement(config: &EnrichConfig) -> Self {
        let c = &config.columns;
        Self {
            field: Field::ValueStatement,
            text_column: c.value_text.clone(),
            image_column: c.value_image.clone(),
            merged_column: c.value_final.clone(),
            settings: config.value,
            gate: Gate::RequireValue {
                column: c.org_name.clone(),
            },
            text_instruction: prompts::value_from_text(config.value_max_chars),
            image_instruction: prompts::value_from_images(config.value_max_chars),
            merge: MergePolicy::Synthesize {
                min_chars: config.value_min_chars,
                max_chars: config.value_max_chars,
            },
        }
    }

    /// The extraction pass of this field for `mode`.
    pub fn extraction_pass(&self, mode: ExtractionMode) -> PassKind {
        match (self.field, mode) {
            (Field::OrganizationName, ExtractionMode::Text) => PassKind::NameText,
            (Field::OrganizationName, ExtractionMode::Image) => PassKind::NameImage,
            (Field::ValueStatement, ExtractionMode::Text) => PassKind::ValueText,
            (Field::ValueStatement, ExtractionMode::Image) => PassKind::ValueImage,
        }
    }

    /// The merge pass of this field.
    pub fn merge_pass(&self) -> PassKind {
        match self.field {
            Field::OrganizationName => PassKind::NameMerge,
            Field::ValueStatement => PassKind::ValueMerge,
        }
    }

    pub(crate) fn target_column(&self, mode: ExtractionMode) -> &str {
        match mode {
            ExtractionMode::Text => &self.text_column,
            ExtractionMode::Image => &self.image_column,
        }
    }

    pub(crate) fn instruction(&self, mode: ExtractionMode) -> &str {
        match mode {
            ExtractionMode::Text => &self.text_instruction,
            ExtractionMode::Image => &self.image_instruction,
        }
    }

    pub(crate) fn page_limit(&self, mode: ExtractionMode) -> usize {
        match mode {
            ExtractionMode::Text => self.settings.text_pages,
            ExtractionMode::Image => self.settings.image_pages,
        }
    }
}

/// Borrowed collaborators shared by every pass of a run.
pub struct PassContext<'a> {
    pub sheet: &'a dyn SheetStore,
    pub fetcher: &'a dyn PdfFetcher,
    pub extractor: &'a dyn PdfContentExtractor,
    pub summarizer: &'a Summarizer,
    pub config: &'a EnrichConfig,
}

/// Parse a page-count cell. Thousands separators are tolerated; anything
/// non-numeric is "unknown".
pub fn parse_page_count(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_names_round_trip() {
        for pass in PassKind::ALL {
            assert_eq!(pass.as_str().parse::<PassKind>().unwrap(), pass);
        }
        assert!("name".parse::<PassKind>().is_err());
    }

    #[test]
    fn value_passes_follow_name_merge() {
        let pos = |p| PassKind::ALL.iter().position(|x| *x == p).unwrap();
        assert!(pos(PassKind::NameMerge) < pos(PassKind::ValueText));
        assert!(pos(PassKind::NameMerge) < pos(PassKind::SecuritiesCode));
    }

    #[test]
    fn page_count_parsing() {
        assert_eq!(parse_page_count("10"), Some(10.0));
        assert_eq!(parse_page_count(" 15.0 "), Some(15.0));
        assert_eq!(parse_page_count("1,204"), Some(1204.0));
        assert_eq!(parse_page_count(""), None);
        assert_eq!(parse_page_count("不明"), None);
        assert_eq!(parse_page_count("NaN"), None);
    }

    #[test]
    fn upstream_exclusion_ignores_failed_prerequisites() {
        let gate = Gate::RequireValue {
            column: "組織名".into(),
        };
        let t = SheetTable::new(
            vec!["組織名".into()],
            vec![
                vec!["対象外".into()],
                vec!["取得失敗".into()],
                vec!["".into()],
                vec!["Acme".into()],
            ],
        );
        let excludes: Vec<bool> = (0..4).map(|r| gate.excludes(&t, r)).collect();
        let upstream: Vec<bool> = (0..4).map(|r| gate.excluded_upstream(&t, r)).collect();
        assert_eq!(excludes, [true, true, true, false]);
        assert_eq!(upstream, [true, false, false, false]);

        let gate = Gate::MaxExcludedPageCount {
            column: "ページ数".into(),
            pages: 20.0,
        };
        let t = SheetTable::new(
            vec!["ページ数".into()],
            vec![vec!["12".into()], vec!["不明".into()], vec!["48".into()]],
        );
        let upstream: Vec<bool> = (0..3).map(|r| gate.excluded_upstream(&t, r)).collect();
        assert_eq!(upstream, [true, false, false]);
    }

    #[test]
    fn pipelines_take_limits_from_config() {
        let config = EnrichConfig::default();
        let name = FieldPipeline::organization_name(&config);
        let value = FieldPipeline::value_statement(&config);
        assert_eq!(name.page_limit(ExtractionMode::Text), 3);
        assert_eq!(value.page_limit(ExtractionMode::Image), 10);
        assert_eq!(name.extraction_pass(ExtractionMode::Image), PassKind::NameImage);
        assert_eq!(value.merge_pass(), PassKind::ValueMerge);
        assert_eq!(
            value.merge,
            MergePolicy::Synthesize {
                min_chars: 70,
                max_chars: 150
            }
        );
    }
}
