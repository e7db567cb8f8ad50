//! Whitespace normalization and sentence segmentation.

use std::sync::LazyLock;

use regex::Regex;

/// Collapse every whitespace run to a single space and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    WS_RE.replace_all(text, " ").trim().to_string()
}

/// Split text into sentences.
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace; the punctuation
/// stays with the sentence on its left. Fragments without a single letter or
/// digit (stray punctuation) are not sentences and are dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    static BOUNDARY_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("valid regex"));

    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in BOUNDARY_RE.find_iter(text) {
        // Terminators are ASCII, so the sentence ends one byte into the match.
        push_sentence(&mut sentences, &text[start..boundary.start() + 1]);
        start = boundary.end();
    }
    push_sentence(&mut sentences, &text[start..]);

    sentences
}

fn push_sentence<'a>(sentences: &mut Vec<&'a str>, candidate: &'a str) {
    let candidate = candidate.trim();
    if candidate.chars().any(char::is_alphanumeric) {
        sentences.push(candidate);
    }
}

/// Length in characters, the unit `chunk_size` is expressed in.
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}
