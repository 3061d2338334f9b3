//! Error types for operator construction.

use thiserror::Error;

use crate::exponent::NegativeStyle;

/// Error type for operator construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OpsError {
    /// Exponent outside the accepted range (or not finite).
    #[error("invalid gamma {value} on channel {channel}: expected a finite value in [{min}, {max}]")]
    InvalidGamma {
        /// Channel index (0..4).
        channel: usize,
        /// Offending value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// Linear offset outside the accepted range (or not finite).
    #[error("invalid offset {value} on channel {channel}: expected a finite value in [{min}, {max}]")]
    InvalidOffset {
        /// Channel index (0..4).
        channel: usize,
        /// Offending value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// Gamma/offset pair that yields no usable linear segment.
    #[error("degenerate curve on channel {channel}: {reason}")]
    DegenerateCurve {
        /// Channel index (0..4).
        channel: usize,
        /// What makes it degenerate.
        reason: String,
    },

    /// Negative style not supported by this operator kind.
    #[error("negative style {style:?} is not supported by {op}")]
    UnsupportedStyle {
        /// Rejected style.
        style: NegativeStyle,
        /// Operator kind name.
        op: &'static str,
    },
}

/// Result type for operator construction.
pub type OpsResult<T> = Result<T, OpsError>;
