//! Post-extraction cleanup passes for raw document text.
//!
//! Each pass is a function `&str -> String` applied in sequence. The passes
//! only repair transport artifacts (line endings, page breaks, control bytes);
//! they never rewrite the words themselves.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on extracted text.
pub(crate) fn run_pipeline(text: &str) -> String {
    let mut result = normalize_line_endings(text);

    result = page_breaks_to_newlines(&result);
    result = strip_control_chars(&result);
    result = trim_trailing_whitespace(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Line endings
// ---------------------------------------------------------------------------

/// `\r\n` and bare `\r` become `\n`.
fn normalize_line_endings(text: &str) -> String {
    static CR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r\n?").expect("valid regex"));

    CR_RE.replace_all(text, "\n").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 2: Page breaks
// ---------------------------------------------------------------------------

/// PDF text carries form feeds between pages.
fn page_breaks_to_newlines(text: &str) -> String {
    text.replace('\u{000C}', "\n")
}

// ---------------------------------------------------------------------------
// Pass 3: Control characters
// ---------------------------------------------------------------------------

/// Drop NUL and other C0/DEL control bytes, keeping `\n` and `\t`.
fn strip_control_chars(text: &str) -> String {
    static CTRL_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"[\x00-\x08\x0B\x0E-\x1F\x7F]").expect("valid regex")
    });

    CTRL_RE.replace_all(text, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 4: Trailing whitespace
// ---------------------------------------------------------------------------

fn trim_trailing_whitespace(text: &str) -> String {
    text.split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_and_bare_cr_become_lf() {
        assert_eq!(normalize_line_endings("a\r\nb\rc\n"), "a\nb\nc\n");
    }

    #[test]
    fn form_feed_splits_pages() {
        assert_eq!(page_breaks_to_newlines("page one\u{000C}page two"), "page one\npage two");
    }

    #[test]
    fn control_chars_removed_but_tabs_kept() {
        assert_eq!(strip_control_chars("Jane\u{0}\tDoe\u{7F}\n"), "Jane\tDoe\n");
    }

    #[test]
    fn pipeline_preserves_words() {
        let raw = "Jane Doe   \r\njane@example.com\u{000C}Skills: Java, SQL\u{0}";
        let cleaned = run_pipeline(raw);
        assert_eq!(cleaned, "Jane Doe\njane@example.com\nSkills: Java, SQL");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(run_pipeline(""), "");
    }
}
