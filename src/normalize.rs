use std::sync::LazyLock;

use regex::Regex;

static ANNOTATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[^\]]*\]").expect("hardcoded annotation regex is valid")
});
static QUOTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["'“”‘’]"#).expect("hardcoded quote regex is valid"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("hardcoded whitespace regex is valid"));

/// Strips `[n]` annotations and quote characters, collapses whitespace.
#[must_use]
pub fn clean_text(raw: &str) -> String {
    let stripped = ANNOTATION_RE.replace_all(raw, "");
    let stripped = QUOTE_RE.replace_all(&stripped, "");
    WHITESPACE_RE
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}

/// Turns header text into a camel-case field name: `Date of birth[1]` -> `dateOfBirth`.
#[must_use]
pub fn normalize_label(raw: &str) -> String {
    let cleaned = clean_text(raw);
    let mut label = String::with_capacity(cleaned.len());
    for (index, word) in split_words(&cleaned).into_iter().enumerate() {
        if index == 0 {
            label.push_str(&word.to_lowercase());
            continue;
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            label.extend(first.to_uppercase());
            label.push_str(&chars.as_str().to_lowercase());
        }
    }
    label
}

// Words break on anything non-alphanumeric and on lower-to-upper transitions.
fn split_words(text: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut start: Option<usize> = None;
    let mut prev: Option<char> = None;

    for (index, ch) in text.char_indices() {
        if !ch.is_alphanumeric() {
            if let Some(word_start) = start.take() {
                words.push(&text[word_start..index]);
            }
            prev = None;
            continue;
        }

        match start {
            None => start = Some(index),
            Some(word_start) => {
                let boundary = ch.is_uppercase()
                    && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit());
                if boundary {
                    words.push(&text[word_start..index]);
                    start = Some(index);
                }
            }
        }
        prev = Some(ch);
    }

    if let Some(word_start) = start {
        words.push(&text[word_start..]);
    }
    words
}
