//! Cleanup of the previously displayed utterance before it is replayed to
//! the model.

use std::sync::LazyLock;

use regex::Regex;

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("markup tag regex is hardcoded and valid"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is hardcoded and valid"));

/// Remove every `<...>` tag and collapse the whitespace left behind.
pub fn strip_markup(text: &str) -> String {
    let stripped = MARKUP_TAG.replace_all(text, " ");
    WHITESPACE_RUN.replace_all(&stripped, " ").trim().to_string()
}

/// Split on `.`, `?` or `!` when the next non-space character is an
/// uppercase letter. Terminators stay with their sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if !matches!(c, '.' | '?' | '!') {
            continue;
        }

        let mut gap = String::new();
        while let Some(&next) = chars.peek() {
            if !next.is_whitespace() {
                break;
            }
            gap.push(next);
            chars.next();
        }

        match chars.peek() {
            Some(next) if next.is_uppercase() => {
                sentences.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push_str(&gap),
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Prepare prior speech for reuse: strip markup, then drop a trailing
/// question (the model should not be fed its own "want to play again?").
pub fn clean_prior_speech(speech: &str) -> String {
    let plain = strip_markup(speech);
    let mut sentences = split_sentences(&plain);
    if sentences.last().is_some_and(|s| s.ends_with('?')) {
        sentences.pop();
    }
    sentences.join(" ")
}
