//! Deterministic cleanup of model answers before they reach the sheet.
//!
//! Models occasionally wrap a one-line answer in a code fence, quote it, or
//! prefix it with a label even when told not to. These rules remove that
//! wrapping without touching the content.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw answer.
///
/// 1. Strip an outer code fence
/// 2. Normalise line endings (CRLF → LF)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Trim whitespace, then strip one pair of matching surrounding quotes
pub fn clean_response(input: &str) -> String {
    let s = strip_fences(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    strip_quotes(s.trim()).trim().to_string()
}

// ── Rule 1: Strip outer fences ───────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\r?\n(.*?)\r?\n?```\s*$").unwrap());

fn strip_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Strip surrounding quotes ─────────────────────────────────────────

const QUOTE_PAIRS: [(char, char); 4] = [('"', '"'), ('\'', '\''), ('「', '」'), ('『', '』')];

fn strip_quotes(input: &str) -> &str {
    for (open, close) in QUOTE_PAIRS {
        if let Some(inner) = input
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            if !inner.contains(open) && !inner.contains(close) {
                return inner;
            }
        }
    }
    input
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fence() {
        assert_eq!(clean_response("```\nトヨタ自動車\n```"), "トヨタ自動車");
        assert_eq!(clean_response("```text\n7203\n```\n"), "7203");
    }

    #[test]
    fn strips_quotes_and_whitespace() {
        assert_eq!(clean_response("  「ソニーグループ」 \n"), "ソニーグループ");
        assert_eq!(clean_response("\"Acme Corp\""), "Acme Corp");
    }

    #[test]
    fn keeps_inner_quotes() {
        assert_eq!(clean_response("「誠実」と「挑戦」"), "「誠実」と「挑戦」");
    }

    #[test]
    fn removes_invisible_chars() {
        assert_eq!(clean_response("\u{FEFF}6758\u{200B}"), "6758");
    }

    #[test]
    fn blank_stays_blank() {
        assert_eq!(clean_response(" \r\n "), "");
    }
}
