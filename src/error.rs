//! Errors raised by models, distributions, and the dynamic programming routines.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HmmError {
    /// Malformed input: empty sequences, zero states, inconsistent component
    /// lengths, ragged expectation matrices, invalid probability vectors, and so on.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Every state path has zero probability at `time`.
    /// The sequence is impossible under the current parameters.
    #[error("the sequence is impossible under the model: no probability mass at t={time}")]
    Degenerate { time: usize },
    /// A dimension does not agree with the declared state or observation count.
    #[error("dimension mismatch on {what}: expected {expected}, found {found}")]
    Mismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
}

impl HmmError {
    pub(crate) fn invalid<T: Into<String>>(why: T) -> Self {
        HmmError::InvalidArgument(why.into())
    }
}

pub type Result<T> = std::result::Result<T, HmmError>;
