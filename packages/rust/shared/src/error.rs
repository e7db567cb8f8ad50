//! Error types for DocQA.
//!
//! Library crates use [`DocQaError`] via `thiserror`. Completion failures are
//! the one kind that never reaches callers as an error: the answer assembler
//! folds them into a degraded [`crate::QueryOutcome`].

use std::path::PathBuf;

/// Top-level error type for all DocQA operations.
#[derive(Debug, thiserror::Error)]
pub enum DocQaError {
    /// The document could not be read or split into pages.
    #[error("extraction error: {message}")]
    Extraction { message: String },

    /// The embedding backend failed or returned malformed vectors.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// A vector's length does not match the index dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A search was issued against an index holding no vectors.
    #[error("index is empty")]
    EmptyIndex,

    /// The answer-generation backend failed.
    #[error("completion error: {0}")]
    Completion(String),

    /// The operation was cancelled through its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (inconsistent chunk ids, invalid options, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocQaError>;

impl DocQaError {
    /// Create an extraction error from any displayable message.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
