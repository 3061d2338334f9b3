//! GPU-vs-CPU parity checks for exponent transforms.
//!
//! Each test case builds an exponent operator, generates a shader for it,
//! runs the shader over a fixed pixel domain and compares every channel
//! against the CPU reference evaluated over the same domain.
//!
//! # Quick Start
//!
//! ```
//! use vfx_gpu::{Backend, NumericBackend};
//! use vfx_tests::{builtin_matrix, run_matrix, RunOptions};
//!
//! let report = run_matrix(&builtin_matrix(), Backend::Software, NumericBackend::Ieee, &RunOptions::default());
//! assert!(report.all_passed(), "{report}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;

pub mod checker;
pub mod domain;
pub mod matrix;
pub mod report;
pub mod runner;

pub use checker::{
    check_channel, compare, divergences, ChannelCheck, CompareFlags, Divergence, DivergenceKind,
    ErrorMetric, Thresholds, Tolerance, Verdict,
};
pub use domain::TestDomain;
pub use error::{ParityError, ParityResult};
pub use matrix::{builtin_matrix, load_matrix, matrix_to_yaml, parse_matrix, OpSpec, TestCase};
pub use report::{Report, Summary};
pub use runner::{run_case, run_matrix, CaseReport, Outcome, RunOptions, Stage};
