//! Equivalence checking between CPU reference and shader output.
//!
//! Per channel:
//! - NaN on either side: skipped when NaN checks are off, otherwise both
//!   must be NaN.
//! - Infinity on either side: skipped when infinity checks are off,
//!   otherwise both must be the same infinity.
//! - Finite pairs: `error(expected, actual) <= threshold`. A value equal to
//!   the threshold passes.
//!
//! [`divergences`] is lazy; [`compare`] always walks the full domain and
//! only truncates the diagnostics it keeps.

use serde::{Deserialize, Serialize};
use vfx_gpu::NumericBackend;

use crate::error::{ParityError, ParityResult};

/// Which special values take part in the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareFlags {
    /// Compare NaN channels.
    pub test_nan: bool,
    /// Compare infinite channels.
    pub test_infinity: bool,
}

impl Default for CompareFlags {
    fn default() -> Self {
        Self { test_nan: true, test_infinity: true }
    }
}

/// Error measure for finite pairs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorMetric {
    /// `|expected - actual|`
    #[default]
    Absolute,
    /// `|expected - actual| / max(|expected|, min_expected)`
    Relative {
        /// Denominator floor near zero.
        min_expected: f32,
    },
}

impl ErrorMetric {
    /// Error between two finite values.
    #[inline]
    pub fn error(&self, expected: f32, actual: f32) -> f32 {
        let diff = (expected - actual).abs();
        match self {
            ErrorMetric::Absolute => diff,
            ErrorMetric::Relative { min_expected } => diff / expected.abs().max(*min_expected),
        }
    }
}

/// Threshold table keyed by numeric backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Used when no backend-specific entry exists.
    pub default: f32,
    /// Hardware shader `pow`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_gpu: Option<f32>,
    /// Polynomial `pow` approximation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fast_pow: Option<f32>,
}

impl Thresholds {
    /// Same threshold for every backend.
    pub fn uniform(value: f32) -> Self {
        Self { default: value, native_gpu: None, fast_pow: None }
    }

    /// Sets the native GPU entry.
    pub fn native_gpu(mut self, value: f32) -> Self {
        self.native_gpu = Some(value);
        self
    }

    /// Sets the fast-pow entry.
    pub fn fast_pow(mut self, value: f32) -> Self {
        self.fast_pow = Some(value);
        self
    }

    /// Threshold for `backend`.
    pub fn for_backend(&self, backend: NumericBackend) -> f32 {
        let specific = match backend {
            NumericBackend::Ieee => None,
            NumericBackend::NativeGpu => self.native_gpu,
            NumericBackend::FastPow => self.fast_pow,
        };
        specific.unwrap_or(self.default)
    }

    /// All entries are finite and non-negative.
    pub fn is_valid(&self) -> bool {
        [Some(self.default), self.native_gpu, self.fast_pow]
            .into_iter()
            .flatten()
            .all(|t| t.is_finite() && t >= 0.0)
    }
}

/// Threshold, flags and metric for one comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Largest accepted error.
    pub threshold: f32,
    /// Special-value handling.
    pub flags: CompareFlags,
    /// Error measure.
    pub metric: ErrorMetric,
}

impl Tolerance {
    /// Absolute tolerance with all special values checked.
    pub fn absolute(threshold: f32) -> Self {
        Self { threshold, flags: CompareFlags::default(), metric: ErrorMetric::Absolute }
    }

    /// Replaces the flags.
    pub fn with_flags(mut self, flags: CompareFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Why a channel diverged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceKind {
    /// Exactly one side is NaN.
    Nan,
    /// Infinities differ or only one side is infinite.
    Infinity,
    /// Finite error above the threshold.
    Tolerance,
}

/// One divergent channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Divergence {
    /// Pixel index in the domain.
    pub index: usize,
    /// Channel (0..4).
    pub channel: usize,
    /// Input value.
    pub input: f32,
    /// CPU reference value.
    pub expected: f32,
    /// Shader value.
    pub actual: f32,
    /// Measured error (infinite for special-value mismatches).
    pub error: f32,
    /// Failure class.
    pub kind: DivergenceKind,
}

/// Outcome of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelCheck {
    /// Excluded by flags.
    Skipped,
    /// Within tolerance, with the measured error.
    Passed(f32),
    /// Out of tolerance.
    Failed(DivergenceKind, f32),
}

/// Checks one channel pair.
pub fn check_channel(expected: f32, actual: f32, tolerance: &Tolerance) -> ChannelCheck {
    if expected.is_nan() || actual.is_nan() {
        return if !tolerance.flags.test_nan {
            ChannelCheck::Skipped
        } else if expected.is_nan() && actual.is_nan() {
            ChannelCheck::Passed(0.0)
        } else {
            ChannelCheck::Failed(DivergenceKind::Nan, f32::INFINITY)
        };
    }
    if expected.is_infinite() || actual.is_infinite() {
        return if !tolerance.flags.test_infinity {
            ChannelCheck::Skipped
        } else if expected == actual {
            ChannelCheck::Passed(0.0)
        } else {
            ChannelCheck::Failed(DivergenceKind::Infinity, f32::INFINITY)
        };
    }

    let error = tolerance.metric.error(expected, actual);
    if error <= tolerance.threshold {
        ChannelCheck::Passed(error)
    } else {
        ChannelCheck::Failed(DivergenceKind::Tolerance, error)
    }
}

/// Every channel, in domain order, with its check.
fn checks<'a>(
    expected: &'a [[f32; 4]],
    actual: &'a [[f32; 4]],
    tolerance: &'a Tolerance,
) -> impl Iterator<Item = (usize, usize, ChannelCheck)> + 'a {
    expected.iter().zip(actual).enumerate().flat_map(move |(index, (e, a))| {
        (0..4).map(move |c| (index, c, check_channel(e[c], a[c], tolerance)))
    })
}

/// Lazy sequence of divergent channels.
///
/// Sequences are compared up to the shortest; [`compare`] rejects length
/// mismatches up front.
pub fn divergences<'a>(
    inputs: &'a [[f32; 4]],
    expected: &'a [[f32; 4]],
    actual: &'a [[f32; 4]],
    tolerance: &'a Tolerance,
) -> impl Iterator<Item = Divergence> + 'a {
    checks(expected, actual, tolerance).filter_map(move |(index, channel, check)| match check {
        ChannelCheck::Failed(kind, error) => Some(Divergence {
            index,
            channel,
            input: inputs.get(index).map_or(f32::NAN, |p| p[channel]),
            expected: expected[index][channel],
            actual: actual[index][channel],
            error,
            kind,
        }),
        _ => None,
    })
}

/// Comparison summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    /// No divergent channel.
    pub passed: bool,
    /// Channels compared.
    pub checked: usize,
    /// Channels excluded by flags.
    pub skipped: usize,
    /// Divergent channels (all of them, not just the reported ones).
    pub failures: usize,
    /// Largest finite error among compared channels.
    pub max_error: f32,
    /// First divergences, up to the diagnostic budget.
    pub divergences: Vec<Divergence>,
}

/// Compares the full domain, keeping at most `budget` divergences.
pub fn compare(
    inputs: &[[f32; 4]],
    expected: &[[f32; 4]],
    actual: &[[f32; 4]],
    tolerance: &Tolerance,
    budget: usize,
) -> ParityResult<Verdict> {
    if expected.len() != actual.len() {
        return Err(ParityError::LengthMismatch { expected: expected.len(), actual: actual.len() });
    }
    if inputs.len() != expected.len() {
        return Err(ParityError::LengthMismatch { expected: inputs.len(), actual: expected.len() });
    }

    let mut verdict = Verdict {
        passed: true,
        checked: 0,
        skipped: 0,
        failures: 0,
        max_error: 0.0,
        divergences: Vec::new(),
    };

    for (index, channel, check) in checks(expected, actual, tolerance) {
        match check {
            ChannelCheck::Skipped => verdict.skipped += 1,
            ChannelCheck::Passed(error) => {
                verdict.checked += 1;
                verdict.max_error = verdict.max_error.max(error);
            }
            ChannelCheck::Failed(kind, error) => {
                verdict.checked += 1;
                verdict.failures += 1;
                if error.is_finite() {
                    verdict.max_error = verdict.max_error.max(error);
                }
                if verdict.divergences.len() < budget {
                    verdict.divergences.push(Divergence {
                        index,
                        channel,
                        input: inputs[index][channel],
                        expected: expected[index][channel],
                        actual: actual[index][channel],
                        error,
                        kind,
                    });
                }
            }
        }
    }
    verdict.passed = verdict.failures == 0;
    Ok(verdict)
}
