//! Error types for parity runs.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for parity operations.
pub type ParityResult<T> = Result<T, ParityError>;

/// Errors raised while loading a matrix or comparing results.
#[derive(Debug, Error)]
pub enum ParityError {
    /// I/O error reading a matrix file.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Two cases share a name.
    #[error("duplicate test case name: {name}")]
    DuplicateCase {
        /// Repeated name.
        name: String,
    },

    /// Case fails static validation.
    #[error("invalid test case '{name}': {reason}")]
    InvalidCase {
        /// Case name.
        name: String,
        /// What's wrong.
        reason: String,
    },

    /// Expected and actual sequences differ in length.
    #[error("result length mismatch: expected {expected} pixels, got {actual}")]
    LengthMismatch {
        /// Expected count.
        expected: usize,
        /// Actual count.
        actual: usize,
    },
}
