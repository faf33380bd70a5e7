use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON write error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid CSS selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("no table found matching '{selector}'")]
    NoTableFound { selector: String },

    #[error("element matching '{selector}' is <{tag}>, not <table>")]
    NotATable { selector: String, tag: String },

    #[error("table matching '{selector}' has no body section")]
    NoBody { selector: String },

    #[error("body row {row} expands to {found} values but the header defines {expected} columns")]
    SpanMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid option: {0}")]
    InvalidOption(String),
}
