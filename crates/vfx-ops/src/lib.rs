//! # vfx-ops
//!
//! Exponent/gamma colour operators and their CPU reference evaluation.
//!
//! This crate holds the trusted side of the GPU parity checks: the
//! [`ExponentOp`] operator model (basic power curve and the
//! exponent-with-linear "moncurve") and a double-precision evaluator that
//! applies it to a domain of RGBA pixels.
//!
//! # Modules
//!
//! - [`exponent`] - Operator model, negative handling, directions
//! - [`cpu`] - Reference evaluation over a pixel domain
//!
//! # Example
//!
//! ```rust
//! use vfx_ops::{ExponentOp, NegativeStyle, TransformDirection};
//!
//! let op = ExponentOp::new(
//!     [2.6, 1.0, 1.8, 1.1],
//!     NegativeStyle::Clamp,
//!     TransformDirection::Forward,
//! ).unwrap();
//!
//! let out = vfx_ops::cpu::evaluate(&[[0.5; 4]], &op);
//! assert!((out[0][0] - 0.5f32.powf(2.6)).abs() < 1e-6);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod exponent;
pub mod cpu;

pub use error::{OpsError, OpsResult};
pub use exponent::{ExponentOp, NegativeStyle, TransformDirection};
