//! Error types for shader generation.
//!
//! This module provides error handling for:
//! - Schema version selection
//! - Operator / version legality
//! - Shader descriptor validation

use thiserror::Error;
use vfx_ops::OpsError;

/// Result type for OCIO operations.
pub type OcioResult<T> = Result<T, OcioError>;

/// Errors that can occur during OCIO operations.
#[derive(Debug, Error)]
pub enum OcioError {
    /// Schema major version that does not exist.
    #[error("unsupported config version: {version} (supported: 1, 2+)")]
    InvalidVersion {
        /// Requested major version.
        version: u32,
    },

    /// Operator cannot be expressed at the config's schema version.
    #[error("not supported by config version {version}: {reason}")]
    VersionMismatch {
        /// Config major version.
        version: u32,
        /// What the operator needs.
        reason: String,
    },

    /// Operator cannot be generated in the requested shader mode.
    #[error("unsupported shader mode: {reason}")]
    UnsupportedMode {
        /// Description of what's wrong.
        reason: String,
    },

    /// Lattice edge length out of range.
    #[error("invalid LUT edge size {size} (expected {min}..={max})")]
    InvalidLutSize {
        /// Requested edge.
        size: usize,
        /// Smallest edge accepted.
        min: usize,
        /// Largest edge accepted.
        max: usize,
    },

    /// Operator construction error.
    #[error("operator error: {0}")]
    Ops(#[from] OpsError),

    /// Failed writing shader text.
    #[error("shader emit error: {0}")]
    Format(#[from] std::fmt::Error),
}
