//! Declarative test case matrix.
//!
//! Each [`TestCase`] is a fixed record: operator, schema version, shader
//! descriptor, thresholds and special-value flags. Cases share nothing and
//! can run in any order. The built-in matrix covers direction, negative
//! style, schema version and descriptor mode for both curve families; more
//! cases can be loaded from YAML:
//!
//! ```yaml
//! cases:
//!   - name: exponent/forward_mirror
//!     op: { kind: exponent, gamma: [2.6, 1.0, 1.8, 1.1], style: mirror }
//!     threshold: { default: 1.0e-5, fast_pow: 5.0e-4 }
//!   - name: exponent/legacy
//!     op: { kind: exponent, gamma: [2.2, 2.2, 2.2, 1.0] }
//!     schema_version: 1
//!     shader: { mode: legacy, edge_size: 32 }
//!     threshold: { default: 2.0e-3 }
//!     test_nan: false
//!     test_infinity: false
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use vfx_ocio::{baker, ShaderDescMode};
use vfx_ops::{ExponentOp, NegativeStyle, OpsResult, TransformDirection};

use crate::checker::{CompareFlags, ErrorMetric, Thresholds, Tolerance};
use crate::error::{ParityError, ParityResult};

/// Exponents used by the built-in basic exponent cases.
pub const EXPONENT_GAMMA: [f64; 4] = [2.6, 1.0, 1.8, 1.1];
/// Exponents used by the built-in exponent-with-linear cases.
pub const LINEAR_GAMMA: [f64; 4] = [2.1, 1.0, 2.3, 1.5];
/// Offsets used by the built-in exponent-with-linear cases.
pub const LINEAR_OFFSET: [f64; 4] = [0.01, 0.0, 0.03, 0.05];
/// Lattice edge of the built-in legacy cases.
pub const LEGACY_EDGE: usize = 32;
/// Headroom over the analytic lattice error for legacy thresholds.
const LEGACY_MARGIN: f64 = 1.1;

fn default_version() -> u32 {
    2
}

fn yes() -> bool {
    true
}

fn linear_style() -> NegativeStyle {
    NegativeStyle::Linear
}

/// Operator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OpSpec {
    /// Basic exponent.
    Exponent {
        /// Per-channel exponents.
        gamma: [f64; 4],
        /// Negative handling.
        #[serde(default)]
        style: NegativeStyle,
        /// Direction.
        #[serde(default)]
        direction: TransformDirection,
    },
    /// Exponent with linear segment.
    ExponentWithLinear {
        /// Per-channel exponents.
        gamma: [f64; 4],
        /// Per-channel offsets.
        offset: [f64; 4],
        /// Negative handling.
        #[serde(default = "linear_style")]
        style: NegativeStyle,
        /// Direction.
        #[serde(default)]
        direction: TransformDirection,
    },
}

impl OpSpec {
    /// Builds the operator, validating its parameters.
    pub fn build(&self) -> OpsResult<ExponentOp> {
        match self {
            OpSpec::Exponent { gamma, style, direction } => ExponentOp::new(*gamma, *style, *direction),
            OpSpec::ExponentWithLinear { gamma, offset, style, direction } => {
                ExponentOp::with_linear(*gamma, *offset, *style, *direction)
            }
        }
    }
}

/// One parity test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Unique name.
    pub name: String,
    /// Operator.
    pub op: OpSpec,
    /// Config schema major version.
    #[serde(default = "default_version")]
    pub schema_version: u32,
    /// Shader descriptor mode.
    #[serde(default)]
    pub shader: ShaderDescMode,
    /// Thresholds per numeric backend.
    pub threshold: Thresholds,
    /// Error measure.
    #[serde(default)]
    pub metric: ErrorMetric,
    /// Compare NaN channels.
    #[serde(default = "yes")]
    pub test_nan: bool,
    /// Compare infinite channels.
    #[serde(default = "yes")]
    pub test_infinity: bool,
}

impl TestCase {
    /// New modern, schema v2 case with a uniform threshold of `1e-5`.
    pub fn new(name: impl Into<String>, op: OpSpec) -> Self {
        Self {
            name: name.into(),
            op,
            schema_version: default_version(),
            shader: ShaderDescMode::Modern,
            threshold: Thresholds::uniform(1e-5),
            metric: ErrorMetric::Absolute,
            test_nan: true,
            test_infinity: true,
        }
    }

    /// Sets the thresholds.
    pub fn threshold(mut self, threshold: Thresholds) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the error measure.
    pub fn metric(mut self, metric: ErrorMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Sets the schema major version.
    pub fn schema_version(mut self, version: u32) -> Self {
        self.schema_version = version;
        self
    }

    /// Uses a legacy lattice descriptor.
    pub fn legacy(mut self, edge_size: usize) -> Self {
        self.shader = ShaderDescMode::Legacy { edge_size };
        self
    }

    /// Excludes NaN channels.
    pub fn skip_nan(mut self) -> Self {
        self.test_nan = false;
        self
    }

    /// Excludes infinite channels.
    pub fn skip_infinity(mut self) -> Self {
        self.test_infinity = false;
        self
    }

    /// Special-value flags.
    pub fn flags(&self) -> CompareFlags {
        CompareFlags { test_nan: self.test_nan, test_infinity: self.test_infinity }
    }

    /// Comparison settings for a resolved threshold.
    pub fn tolerance(&self, threshold: f32) -> Tolerance {
        Tolerance { threshold, flags: self.flags(), metric: self.metric }
    }

    /// Static checks that don't need the operator.
    pub fn validate(&self) -> ParityResult<()> {
        let invalid = |reason: &str| ParityError::InvalidCase {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("empty name"));
        }
        if !self.threshold.is_valid() {
            return Err(invalid("thresholds must be finite and non-negative"));
        }
        if let ErrorMetric::Relative { min_expected } = self.metric {
            if !(min_expected.is_finite() && min_expected > 0.0) {
                return Err(invalid("relative metric needs a positive min_expected"));
            }
        }
        Ok(())
    }
}

/// YAML file layout.
#[derive(Debug, Serialize, Deserialize)]
struct MatrixFile {
    cases: Vec<TestCase>,
}

fn exponent(style: NegativeStyle, direction: TransformDirection) -> OpSpec {
    OpSpec::Exponent { gamma: EXPONENT_GAMMA, style, direction }
}

fn with_linear(style: NegativeStyle, direction: TransformDirection) -> OpSpec {
    OpSpec::ExponentWithLinear { gamma: LINEAR_GAMMA, offset: LINEAR_OFFSET, style, direction }
}

/// Legacy threshold for the built-in exponents: the worst per-channel
/// lattice interpolation error plus [`LEGACY_MARGIN`].
///
/// Inverse curves are steep at zero, so their first lattice cell sets the
/// bound (about 0.09 for `x^(1/2.6)` at edge 32).
pub fn legacy_threshold(direction: TransformDirection) -> Thresholds {
    let worst = EXPONENT_GAMMA
        .iter()
        .map(|g| match direction {
            TransformDirection::Forward => *g,
            TransformDirection::Inverse => 1.0 / g,
        })
        .map(|p| baker::power_lattice_error(p, LEGACY_EDGE))
        .fold(0.0, f64::max);
    Thresholds::uniform((worst * LEGACY_MARGIN) as f32)
}

/// The built-in exponent / exponent-with-linear matrix.
pub fn builtin_matrix() -> Vec<TestCase> {
    use NegativeStyle::{Clamp, Linear, Mirror, PassThru};
    use TransformDirection::{Forward, Inverse};

    let legacy_fwd = legacy_threshold(Forward);
    let legacy_inv = legacy_threshold(Inverse);
    let exp_fwd = Thresholds::uniform(1e-5).native_gpu(5e-5).fast_pow(5e-4);
    let exp_inv = Thresholds::uniform(1e-6).native_gpu(1e-5).fast_pow(5e-4);
    let lin_fwd = Thresholds::uniform(5e-6).native_gpu(5e-5).fast_pow(1e-4);
    // Inverse moncurve reaches about -38 on the linear segment; measured
    // relative to the output there, absolute below 1.
    let lin_inv = Thresholds::uniform(5e-7).native_gpu(5e-5).fast_pow(5e-5);
    let lin_inv_metric = ErrorMetric::Relative { min_expected: 1.0 };

    vec![
        TestCase::new("exponent/legacy_shader_v1", exponent(Clamp, Forward))
            .schema_version(1)
            .legacy(LEGACY_EDGE)
            .threshold(legacy_fwd)
            .skip_nan()
            .skip_infinity(),
        TestCase::new("exponent/forward_v1", exponent(Clamp, Forward))
            .schema_version(1)
            .threshold(exp_fwd)
            .skip_nan(),
        TestCase::new("exponent/forward", exponent(Clamp, Forward)).threshold(exp_fwd),
        TestCase::new("exponent/forward_mirror", exponent(Mirror, Forward)).threshold(exp_fwd),
        TestCase::new("exponent/forward_pass_thru", exponent(PassThru, Forward)).threshold(exp_fwd),
        TestCase::new("exponent/inverse_legacy_shader_v1", exponent(Clamp, Inverse))
            .schema_version(1)
            .legacy(LEGACY_EDGE)
            .threshold(legacy_inv)
            .skip_nan()
            .skip_infinity(),
        TestCase::new("exponent/inverse_v1", exponent(Clamp, Inverse))
            .schema_version(1)
            .threshold(exp_inv)
            .skip_nan(),
        TestCase::new("exponent/inverse", exponent(Clamp, Inverse))
            .threshold(exp_inv)
            .skip_infinity(),
        TestCase::new("exponent/inverse_mirror", exponent(Mirror, Inverse))
            .threshold(exp_inv)
            .skip_infinity(),
        TestCase::new("exponent/inverse_pass_thru", exponent(PassThru, Inverse))
            .threshold(exp_inv)
            .skip_infinity(),
        TestCase::new("exponent_with_linear/forward", with_linear(Linear, Forward))
            .threshold(lin_fwd)
            .skip_infinity(),
        TestCase::new("exponent_with_linear/mirror_forward", with_linear(Mirror, Forward))
            .threshold(lin_fwd)
            .skip_infinity(),
        TestCase::new("exponent_with_linear/inverse", with_linear(Linear, Inverse))
            .threshold(lin_inv)
            .metric(lin_inv_metric)
            .skip_infinity(),
        TestCase::new("exponent_with_linear/mirror_inverse", with_linear(Mirror, Inverse))
            .threshold(lin_inv)
            .metric(lin_inv_metric)
            .skip_infinity(),
    ]
}

fn check_cases(cases: &[TestCase]) -> ParityResult<()> {
    let mut seen = HashSet::new();
    for case in cases {
        case.validate()?;
        if !seen.insert(case.name.as_str()) {
            return Err(ParityError::DuplicateCase { name: case.name.clone() });
        }
    }
    Ok(())
}

/// Parses a YAML matrix.
pub fn parse_matrix(yaml: &str) -> ParityResult<Vec<TestCase>> {
    let file: MatrixFile = serde_yaml::from_str(yaml)?;
    check_cases(&file.cases)?;
    debug!(cases = file.cases.len(), "parsed matrix");
    Ok(file.cases)
}

/// Loads a YAML matrix file.
pub fn load_matrix(path: impl AsRef<Path>) -> ParityResult<Vec<TestCase>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ParityError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_matrix(&text)
}

/// Serializes cases in the YAML matrix layout.
pub fn matrix_to_yaml(cases: &[TestCase]) -> ParityResult<String> {
    Ok(serde_yaml::to_string(&MatrixFile { cases: cases.to_vec() })?)
}
