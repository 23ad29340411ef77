//! The value domain of an enrichment cell.
//!
//! Every derived column holds one of four shapes: nothing yet, the
//! "extraction failed" sentinel, the "out of scope" sentinel, or a real
//! extracted value. Modelling them as [`Cell`] keeps the pass rules (skip,
//! propagate, merge) as exhaustive `match`es instead of string comparisons.
//! The sentinel literals only appear at the sheet boundary.

use once_cell::sync::Lazy;
use regex::Regex;

/// Sheet literal for [`Cell::Excluded`].
pub const EXCLUDED: &str = "対象外";

/// Sheet literal for [`Cell::Failed`].
pub const FAILED: &str = "取得失敗";

/// A single derived cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Cell {
    /// Not computed yet.
    #[default]
    Empty,
    /// Extraction was attempted and did not succeed.
    Failed,
    /// The row is permanently out of scope for this column.
    Excluded,
    /// A non-empty extracted value.
    Value(String),
}

impl Cell {
    /// Interpret a raw sheet cell. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" => Cell::Empty,
            FAILED => Cell::Failed,
            EXCLUDED => Cell::Excluded,
            other => Cell::Value(other.to_string()),
        }
    }

    /// Interpret a model answer: blank means the extraction failed.
    pub fn from_response(text: &str) -> Self {
        match Cell::parse(text) {
            Cell::Empty => Cell::Failed,
            cell => cell,
        }
    }

    /// Render back to the literal stored in the sheet.
    pub fn as_sheet_value(&self) -> &str {
        match self {
            Cell::Empty => "",
            Cell::Failed => FAILED,
            Cell::Excluded => EXCLUDED,
            Cell::Value(v) => v,
        }
    }

    /// Anything but [`Cell::Empty`] counts as filled and is never overwritten.
    pub fn is_filled(&self) -> bool {
        !matches!(self, Cell::Empty)
    }

    /// The extracted value, if this cell holds one.
    pub fn valid_value(&self) -> Option<&str> {
        match self {
            Cell::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Empty, Failed or Excluded: nothing downstream can build on it.
    pub fn is_unusable(&self) -> bool {
        self.valid_value().is_none()
    }
}

static RE_SECURITIES_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{4}$").unwrap());

/// Accept a securities-code answer only when it is exactly four ASCII digits.
pub fn parse_securities_code(answer: &str) -> Option<String> {
    let answer = answer.trim();
    RE_SECURITIES_CODE
        .is_match(answer)
        .then(|| answer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recognises_sentinels() {
        assert_eq!(Cell::parse(""), Cell::Empty);
        assert_eq!(Cell::parse("   "), Cell::Empty);
        assert_eq!(Cell::parse("取得失敗"), Cell::Failed);
        assert_eq!(Cell::parse(" 対象外 "), Cell::Excluded);
        assert_eq!(Cell::parse("トヨタ自動車"), Cell::Value("トヨタ自動車".into()));
    }

    #[test]
    fn blank_response_is_failed() {
        assert_eq!(Cell::from_response("\n  \n"), Cell::Failed);
        assert_eq!(Cell::from_response(" Acme Corp \n"), Cell::Value("Acme Corp".into()));
    }

    #[test]
    fn sheet_value_round_trips() {
        for cell in [
            Cell::Empty,
            Cell::Failed,
            Cell::Excluded,
            Cell::Value("誠実".into()),
        ] {
            assert_eq!(Cell::parse(cell.as_sheet_value()), cell);
        }
    }

    #[test]
    fn sentinels_are_filled_but_unusable() {
        assert!(Cell::Failed.is_filled());
        assert!(Cell::Excluded.is_filled());
        assert!(!Cell::Empty.is_filled());
        assert!(Cell::Failed.is_unusable());
        assert!(!Cell::Value("x".into()).is_unusable());
    }

    #[test]
    fn securities_code_requires_exactly_four_digits() {
        assert_eq!(parse_securities_code("7203"), Some("7203".into()));
        assert_eq!(parse_securities_code(" 6758\n"), Some("6758".into()));
        assert_eq!(parse_securities_code("12a4"), None);
        assert_eq!(parse_securities_code("123"), None);
        assert_eq!(parse_securities_code("12345"), None);
        assert_eq!(parse_securities_code("１２３４"), None);
        assert_eq!(parse_securities_code(""), None);
    }
}
