//! Error handling utilities shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Convenient result type used throughout the crate.
pub type Result<T, E = BpeError> = std::result::Result<T, E>;

/// Domain-specific error describing failures during configuration, training, IO, or persistence.
#[derive(Debug, Error)]
pub enum BpeError {
    /// Input text was rejected, e.g. empty or whitespace-only training text.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Encoding was requested before a vocabulary was trained or imported.
    #[error("tokenizer has not been trained")]
    NotTrained,
    /// Training configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The base alphabet alone does not fit the configured vocabulary size.
    #[error("base alphabet needs {required} entries but vocab_size is {limit}")]
    AlphabetOverflow {
        /// Entries needed for special tokens, characters and the end-of-word marker.
        required: usize,
        /// Configured vocabulary size.
        limit: usize,
    },
    /// An imported vocabulary snapshot is inconsistent.
    #[error("invalid vocabulary snapshot: {0}")]
    InvalidSnapshot(String),
    /// Filesystem IO error with optional context path.
    #[error("io error while processing {path:?}: {source}")]
    Io {
        /// Underlying IO error returned by the standard library.
        source: std::io::Error,
        /// Target path associated with the IO failure if available.
        path: Option<PathBuf>,
    },
    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Catch-all variant for invariants that should not occur.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for BpeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl BpeError {
    /// Helper constructor that attaches an optional path when wrapping IO errors.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }
}
