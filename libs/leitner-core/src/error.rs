//! Error types for leitner-core.

use thiserror::Error;

use crate::card::Side;

/// Result type alias using the engine [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by card and category operations.
///
/// Every operation validates before it mutates, so an `Err` always means the
/// tree was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{side} side has no text")]
    InvalidContent { side: Side },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("required date `{field}` is missing")]
    NullDate { field: &'static str },

    #[error("modification date can't be before creation date")]
    ModifiedBeforeCreated,
}

impl Error {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }
}

/// Errors that can occur while parsing markdown card files.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing question at line {line}")]
    MissingQuestion { line: usize },

    #[error("missing answer at line {line}")]
    MissingAnswer { line: usize },

    #[error("unexpected answer at line {line}")]
    UnexpectedAnswer { line: usize },

    #[error("empty category path at line {line}")]
    EmptyCategoryPath { line: usize },

    #[error("invalid card at line {line}: {source}")]
    InvalidCard {
        line: usize,
        #[source]
        source: Error,
    },
}
