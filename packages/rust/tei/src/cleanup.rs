//! Text normalization for extracted TEI content.
//!
//! Markup indentation and line breaks leak into text nodes; every extracted
//! value goes through [`clean_text`] before it leaves the crate.

use std::sync::LazyLock;

use regex::Regex;

/// Collapse every whitespace run (including newlines) into one space and trim.
pub fn clean_text(text: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    WS_RE.replace_all(text.trim(), " ").into_owned()
}

/// Clean a value, returning `None` when nothing but whitespace remains.
pub(crate) fn clean_non_empty(text: &str) -> Option<String> {
    let cleaned = clean_text(text);
    (!cleaned.is_empty()).then_some(cleaned)
}
