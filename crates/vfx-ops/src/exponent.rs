//! ExponentOp - per-channel power function, with or without a linear segment.
//!
//! Two curve families share one operator type:
//!
//! - **Basic exponent**: `out = pow(in, gamma)` forward, `pow(in, 1 / gamma)` inverse.
//! - **Exponent with linear** ("moncurve"): forward maps encoded values to
//!   linear with `((x + offset) / (1 + offset))^gamma` above a breakpoint and
//!   a straight line below it, so the curve stays finite and invertible
//!   through zero. The inverse is the exact algebraic inverse.
//!
//! Reference: OCIO ExponentOp.cpp, GammaOpData.cpp and GammaOpCPU.cpp

use serde::{Deserialize, Serialize};

use crate::{OpsError, OpsResult};

/// Smallest exponent accepted by the basic curve.
pub const GAMMA_MIN: f64 = 0.01;
/// Largest exponent accepted by the basic curve.
pub const GAMMA_MAX: f64 = 100.0;
/// Smallest exponent accepted by the moncurve.
pub const LINEAR_GAMMA_MIN: f64 = 1.0;
/// Largest exponent accepted by the moncurve.
pub const LINEAR_GAMMA_MAX: f64 = 10.0;
/// Largest offset accepted by the moncurve.
pub const OFFSET_MAX: f64 = 0.9;

/// How to handle negative input values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeStyle {
    /// Clamp negative values to 0 before applying power (OCIO default).
    #[default]
    Clamp,
    /// Mirror: sign(x) * pow(|x|, exp) - preserves sign.
    Mirror,
    /// Pass through: negative values unchanged, only apply power to positive.
    PassThru,
    /// Extend the linear segment of the moncurve through zero.
    Linear,
}

impl NegativeStyle {
    /// Returns true if schema version 1 configs and baked lattices can
    /// express this style.
    pub fn is_legacy(&self) -> bool {
        matches!(self, NegativeStyle::Clamp)
    }
}

/// Direction a transform is applied in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformDirection {
    /// Apply as defined.
    #[default]
    Forward,
    /// Apply the algebraic inverse.
    Inverse,
}

impl TransformDirection {
    /// Returns the opposite direction.
    pub fn inverse(self) -> Self {
        match self {
            TransformDirection::Forward => TransformDirection::Inverse,
            TransformDirection::Inverse => TransformDirection::Forward,
        }
    }
}

/// One channel of the moncurve with its derived breakpoint and slope.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MonCurve {
    gamma: f64,
    offset: f64,
    /// Input value where the power segment takes over.
    break_point: f64,
    /// Slope of the linear segment below the breakpoint.
    slope: f64,
}

impl MonCurve {
    fn new(gamma: f64, offset: f64) -> Self {
        if gamma == 1.0 {
            // offset is 0 here (validated), the curve is the identity line
            return Self { gamma, offset, break_point: 0.0, slope: 1.0 };
        }
        let break_point = offset / (gamma - 1.0);
        let slope = (offset * gamma / ((gamma - 1.0) * (1.0 + offset))).powf(gamma)
            * (gamma - 1.0)
            / offset;
        Self { gamma, offset, break_point, slope }
    }

    #[inline]
    fn forward(&self, x: f64) -> f64 {
        if x >= self.break_point {
            ((x + self.offset) / (1.0 + self.offset)).powf(self.gamma)
        } else {
            x * self.slope
        }
    }

    #[inline]
    fn inverse(&self, y: f64) -> f64 {
        if y >= self.break_point * self.slope {
            (1.0 + self.offset) * y.powf(1.0 / self.gamma) - self.offset
        } else {
            y / self.slope
        }
    }

    #[inline]
    fn apply(&self, x: f64, direction: TransformDirection) -> f64 {
        match direction {
            TransformDirection::Forward => self.forward(x),
            TransformDirection::Inverse => self.inverse(x),
        }
    }
}

/// Exponent operation with per-channel exponents.
///
/// Built once per use through [`ExponentOp::new`] or
/// [`ExponentOp::with_linear`], which reject degenerate parameters up front.
/// The operator is immutable afterwards; [`ExponentOp::inverse`] returns a
/// new operator with the direction flipped.
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentOp {
    gamma: [f64; 4],
    offset: Option<[f64; 4]>,
    negative_style: NegativeStyle,
    direction: TransformDirection,
    curves: Option<[MonCurve; 4]>,
}

impl ExponentOp {
    /// Create a basic exponent with per-channel (RGBA) exponents.
    pub fn new(
        gamma: [f64; 4],
        negative_style: NegativeStyle,
        direction: TransformDirection,
    ) -> OpsResult<Self> {
        if negative_style == NegativeStyle::Linear {
            return Err(OpsError::UnsupportedStyle { style: negative_style, op: "exponent" });
        }
        for (channel, &value) in gamma.iter().enumerate() {
            if !value.is_finite() || !(GAMMA_MIN..=GAMMA_MAX).contains(&value) {
                return Err(OpsError::InvalidGamma {
                    channel,
                    value,
                    min: GAMMA_MIN,
                    max: GAMMA_MAX,
                });
            }
        }
        Ok(Self { gamma, offset: None, negative_style, direction, curves: None })
    }

    /// Create an exponent-with-linear (moncurve) operator.
    ///
    /// A channel with `gamma == 1` must have a zero offset (identity channel);
    /// a channel with `gamma > 1` needs a positive offset, otherwise its linear
    /// segment has zero slope and cannot be inverted.
    pub fn with_linear(
        gamma: [f64; 4],
        offset: [f64; 4],
        negative_style: NegativeStyle,
        direction: TransformDirection,
    ) -> OpsResult<Self> {
        if !matches!(negative_style, NegativeStyle::Linear | NegativeStyle::Mirror) {
            return Err(OpsError::UnsupportedStyle {
                style: negative_style,
                op: "exponent_with_linear",
            });
        }
        for channel in 0..4 {
            let (g, off) = (gamma[channel], offset[channel]);
            if !g.is_finite() || !(LINEAR_GAMMA_MIN..=LINEAR_GAMMA_MAX).contains(&g) {
                return Err(OpsError::InvalidGamma {
                    channel,
                    value: g,
                    min: LINEAR_GAMMA_MIN,
                    max: LINEAR_GAMMA_MAX,
                });
            }
            if !off.is_finite() || !(0.0..=OFFSET_MAX).contains(&off) {
                return Err(OpsError::InvalidOffset {
                    channel,
                    value: off,
                    min: 0.0,
                    max: OFFSET_MAX,
                });
            }
            if g == 1.0 && off != 0.0 {
                return Err(OpsError::DegenerateCurve {
                    channel,
                    reason: format!("gamma 1 with offset {off} does not pass through zero"),
                });
            }
            if g > 1.0 && off == 0.0 {
                return Err(OpsError::DegenerateCurve {
                    channel,
                    reason: format!("gamma {g} with zero offset has a flat linear segment"),
                });
            }
        }
        let curves = std::array::from_fn(|i| MonCurve::new(gamma[i], offset[i]));
        Ok(Self {
            gamma,
            offset: Some(offset),
            negative_style,
            direction,
            curves: Some(curves),
        })
    }

    /// Per-channel exponents (RGBA).
    pub fn gamma(&self) -> [f64; 4] {
        self.gamma
    }

    /// Per-channel linear offsets, if this is an exponent-with-linear op.
    pub fn offset(&self) -> Option<[f64; 4]> {
        self.offset
    }

    /// Negative value handling.
    pub fn negative_style(&self) -> NegativeStyle {
        self.negative_style
    }

    /// Direction the op applies in.
    pub fn direction(&self) -> TransformDirection {
        self.direction
    }

    /// True for the moncurve family.
    pub fn has_linear_segment(&self) -> bool {
        self.offset.is_some()
    }

    /// Short name of the operator kind.
    pub fn kind_name(&self) -> &'static str {
        if self.has_linear_segment() { "exponent_with_linear" } else { "exponent" }
    }

    /// Check if this is identity (all exponents == 1.0, no offsets).
    pub fn is_identity(&self) -> bool {
        let unit_gamma = self.gamma.iter().all(|g| (g - 1.0).abs() < 1e-9);
        let zero_offset = self.offset.is_none_or(|o| o.iter().all(|v| v.abs() < 1e-9));
        unit_gamma && zero_offset
    }

    /// Get inverse operation (same parameters, opposite direction).
    pub fn inverse(&self) -> Self {
        self.with_direction(self.direction.inverse())
    }

    /// Same operator applied in `direction`.
    pub fn with_direction(&self, direction: TransformDirection) -> Self {
        Self { direction, ..self.clone() }
    }

    /// Evaluate one RGBA pixel in the op's own direction.
    pub fn evaluate(&self, pixel: [f64; 4]) -> [f64; 4] {
        self.evaluate_in(pixel, self.direction)
    }

    /// Evaluate one RGBA pixel in an explicit direction.
    pub fn evaluate_in(&self, pixel: [f64; 4], direction: TransformDirection) -> [f64; 4] {
        match &self.curves {
            Some(curves) => std::array::from_fn(|i| {
                apply_moncurve(&curves[i], pixel[i], self.negative_style, direction)
            }),
            None => std::array::from_fn(|i| {
                let exp = match direction {
                    TransformDirection::Forward => self.gamma[i],
                    TransformDirection::Inverse => 1.0 / self.gamma[i],
                };
                apply_power(pixel[i], exp, self.negative_style)
            }),
        }
    }
}

// ============================================================================
// Apply functions
// ============================================================================

/// Basic power with the given negative handling. NaN falls through to `powf`.
#[inline]
fn apply_power(x: f64, exp: f64, style: NegativeStyle) -> f64 {
    match style {
        NegativeStyle::Clamp => {
            let base = if x < 0.0 { 0.0 } else { x };
            base.powf(exp)
        }
        // Linear is rejected at construction for the basic exponent.
        NegativeStyle::Mirror | NegativeStyle::Linear => {
            if x < 0.0 { -(-x).powf(exp) } else { x.powf(exp) }
        }
        NegativeStyle::PassThru => {
            if x < 0.0 { x } else { x.powf(exp) }
        }
    }
}

#[inline]
fn apply_moncurve(
    curve: &MonCurve,
    x: f64,
    style: NegativeStyle,
    direction: TransformDirection,
) -> f64 {
    match style {
        NegativeStyle::Mirror if x < 0.0 => -curve.apply(-x, direction),
        _ => curve.apply(x, direction),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const EPSILON: f64 = 1e-12;

    const GAMMA: [f64; 4] = [2.6, 1.0, 1.8, 1.1];
    const LIN_GAMMA: [f64; 4] = [2.1, 1.0, 2.3, 1.5];
    const LIN_OFFSET: [f64; 4] = [0.01, 0.0, 0.03, 0.05];

    fn exp_op(style: NegativeStyle) -> ExponentOp {
        ExponentOp::new(GAMMA, style, TransformDirection::Forward).unwrap()
    }

    fn lin_op(style: NegativeStyle) -> ExponentOp {
        ExponentOp::with_linear(LIN_GAMMA, LIN_OFFSET, style, TransformDirection::Forward)
            .unwrap()
    }

    #[test]
    fn test_legacy_styles() {
        assert!(NegativeStyle::Clamp.is_legacy());
        for style in [NegativeStyle::Mirror, NegativeStyle::PassThru, NegativeStyle::Linear] {
            assert!(!style.is_legacy(), "{style:?}");
        }
    }

    // ========================================================================
    // Basic exponent
    // ========================================================================

    #[test]
    fn test_identity() {
        let op = ExponentOp::new([1.0; 4], NegativeStyle::Clamp, TransformDirection::Forward)
            .unwrap();
        assert!(op.is_identity());

        let out = op.evaluate([0.5, 0.25, 0.75, 1.0]);
        assert_eq!(out, [0.5, 0.25, 0.75, 1.0]);
    }

    #[test]
    fn test_square() {
        let op = ExponentOp::new([2.0, 2.0, 2.0, 1.0], NegativeStyle::Clamp, TransformDirection::Forward).unwrap();
        let out = op.evaluate([0.5, 0.25, 0.75, 0.3]);

        assert_abs_diff_eq!(out[0], 0.25, epsilon = EPSILON);
        assert_abs_diff_eq!(out[1], 0.0625, epsilon = EPSILON);
        assert_abs_diff_eq!(out[2], 0.5625, epsilon = EPSILON);
        // alpha exponent is 1.0
        assert_abs_diff_eq!(out[3], 0.3, epsilon = EPSILON);
    }

    #[test]
    fn test_forward_convention_is_power() {
        // FORWARD applies pow(x, gamma), INVERSE pow(x, 1/gamma).
        let op = exp_op(NegativeStyle::Clamp);
        let fwd = op.evaluate([0.5; 4]);
        assert_abs_diff_eq!(fwd[0], 0.5f64.powf(2.6), epsilon = EPSILON);
        assert_abs_diff_eq!(fwd[1], 0.5, epsilon = EPSILON);
        assert_abs_diff_eq!(fwd[2], 0.5f64.powf(1.8), epsilon = EPSILON);
        assert_abs_diff_eq!(fwd[3], 0.5f64.powf(1.1), epsilon = EPSILON);

        let inv = op.inverse().evaluate([0.5; 4]);
        assert_abs_diff_eq!(inv[0], 0.5f64.powf(1.0 / 2.6), epsilon = EPSILON);
    }

    #[test]
    fn test_clamp_negative_matches_zero() {
        let op = exp_op(NegativeStyle::Clamp);
        let zero = op.evaluate([0.0; 4]);
        for x in [-1e-6, -0.001, -0.5, -1.0, f64::NEG_INFINITY] {
            assert_eq!(op.evaluate([x; 4]), zero, "input {x}");
            assert_eq!(op.inverse().evaluate([x; 4]), op.inverse().evaluate([0.0; 4]));
        }
    }

    #[test]
    fn test_mirror_is_odd() {
        let op = exp_op(NegativeStyle::Mirror);
        for x in [1e-4, 0.18, 0.5, 1.0, 1.25] {
            let pos = op.evaluate([x; 4]);
            let neg = op.evaluate([-x; 4]);
            for c in 0..4 {
                assert_eq!(neg[c], -pos[c]);
            }
        }
    }

    #[test]
    fn test_passthru_negative_is_exact() {
        let op = exp_op(NegativeStyle::PassThru);
        for x in [-1e-6, -0.25, -1.0, f64::NEG_INFINITY] {
            assert_eq!(op.evaluate([x; 4]), [x; 4]);
            assert_eq!(op.inverse().evaluate([x; 4]), [x; 4]);
        }
        let out = op.evaluate([0.5; 4]);
        assert_abs_diff_eq!(out[0], 0.5f64.powf(2.6), epsilon = EPSILON);
    }

    #[test]
    fn test_roundtrip_all_basic_styles() {
        for style in [NegativeStyle::Clamp, NegativeStyle::Mirror, NegativeStyle::PassThru] {
            let op = exp_op(style);
            for x in [0.0, 1e-4, 0.18, 0.5, 0.9, 1.0, 1.25] {
                let back = op.inverse().evaluate(op.evaluate([x; 4]));
                for v in back {
                    assert_abs_diff_eq!(v, x, epsilon = 1e-12);
                }
            }
        }
        // Mirror and PassThru also invert on negatives; Clamp does not.
        for style in [NegativeStyle::Mirror, NegativeStyle::PassThru] {
            let op = exp_op(style);
            let back = op.inverse().evaluate(op.evaluate([-0.3; 4]));
            for v in back {
                assert_abs_diff_eq!(v, -0.3, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_monotonic_for_gamma_above_one() {
        let op = ExponentOp::new([2.6, 1.8, 1.1, 3.0], NegativeStyle::Clamp, TransformDirection::Forward)
            .unwrap();
        let mut prev = op.evaluate([0.0; 4]);
        for i in 1..=200 {
            let x = i as f64 / 160.0;
            let out = op.evaluate([x; 4]);
            for c in 0..4 {
                assert!(out[c] >= prev[c], "channel {c} decreased at {x}");
            }
            prev = out;
        }
    }

    #[test]
    fn test_special_values() {
        let op = exp_op(NegativeStyle::Clamp);
        assert!(op.evaluate([f64::NAN; 4]).iter().all(|v| v.is_nan()));
        assert!(op.evaluate([f64::INFINITY; 4]).iter().all(|v| *v == f64::INFINITY));

        let mirror = exp_op(NegativeStyle::Mirror);
        assert!(mirror.evaluate([f64::NAN; 4]).iter().all(|v| v.is_nan()));
        assert!(mirror.evaluate([f64::NEG_INFINITY; 4]).iter().all(|v| *v == f64::NEG_INFINITY));
    }

    #[test]
    fn test_zero_gamma_fails() {
        let err = ExponentOp::new([0.0, 2.0, 2.0, 1.0], NegativeStyle::Clamp, TransformDirection::Forward);
        assert!(matches!(err, Err(OpsError::InvalidGamma { channel: 0, .. })));

        let err = ExponentOp::new([2.0, f64::NAN, 2.0, 1.0], NegativeStyle::Clamp, TransformDirection::Forward);
        assert!(matches!(err, Err(OpsError::InvalidGamma { channel: 1, .. })));
    }

    #[test]
    fn test_linear_style_needs_offsets() {
        let err = ExponentOp::new(GAMMA, NegativeStyle::Linear, TransformDirection::Forward);
        assert!(matches!(err, Err(OpsError::UnsupportedStyle { .. })));
    }

    // ========================================================================
    // Exponent with linear segment
    // ========================================================================

    #[test]
    fn test_moncurve_continuous_at_break() {
        let op = lin_op(NegativeStyle::Linear);
        let curves = op.curves.unwrap();
        for (c, curve) in curves.iter().enumerate() {
            if LIN_GAMMA[c] == 1.0 {
                continue;
            }
            let brk = curve.break_point;
            let below = curve.slope * brk;
            let above = ((brk + curve.offset) / (1.0 + curve.offset)).powf(curve.gamma);
            assert_abs_diff_eq!(below, above, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_moncurve_endpoints() {
        let op = lin_op(NegativeStyle::Linear);
        let zero = op.evaluate([0.0; 4]);
        let one = op.evaluate([1.0; 4]);
        for c in 0..4 {
            assert_abs_diff_eq!(zero[c], 0.0, epsilon = EPSILON);
            assert_abs_diff_eq!(one[c], 1.0, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_moncurve_linear_roundtrip_through_zero() {
        let op = lin_op(NegativeStyle::Linear);
        let input = [-0.001, 0.2, -0.0005, 0.9];
        let back = op.inverse().evaluate(op.evaluate(input));
        for c in 0..4 {
            assert_abs_diff_eq!(back[c], input[c], epsilon = 5e-6);
        }
    }

    #[test]
    fn test_moncurve_roundtrip_sweep() {
        for style in [NegativeStyle::Linear, NegativeStyle::Mirror] {
            let op = lin_op(style);
            for i in -40..=50 {
                let x = i as f64 / 40.0;
                let back = op.inverse().evaluate(op.evaluate([x; 4]));
                for v in back {
                    assert_abs_diff_eq!(v, x, epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_moncurve_mirror_is_odd() {
        let op = lin_op(NegativeStyle::Mirror);
        for x in [1e-4, 0.005, 0.3, 1.0] {
            let pos = op.evaluate([x; 4]);
            let neg = op.evaluate([-x; 4]);
            for c in 0..4 {
                assert_eq!(neg[c], -pos[c]);
            }
        }
    }

    #[test]
    fn test_moncurve_identity_channel() {
        let op = lin_op(NegativeStyle::Linear);
        for x in [-0.5, 0.0, 0.2, 1.25] {
            assert_eq!(op.evaluate([x; 4])[1], x);
            assert_eq!(op.inverse().evaluate([x; 4])[1], x);
        }
    }

    #[test]
    fn test_moncurve_rejects_degenerate() {
        let dir = TransformDirection::Forward;
        let style = NegativeStyle::Linear;

        let err = ExponentOp::with_linear([1.0, 2.0, 2.0, 2.0], [0.1; 4], style, dir);
        assert!(matches!(err, Err(OpsError::DegenerateCurve { channel: 0, .. })));

        let err = ExponentOp::with_linear([2.0; 4], [0.1, 0.0, 0.1, 0.1], style, dir);
        assert!(matches!(err, Err(OpsError::DegenerateCurve { channel: 1, .. })));

        let err = ExponentOp::with_linear([0.5; 4], [0.1; 4], style, dir);
        assert!(matches!(err, Err(OpsError::InvalidGamma { .. })));

        let err = ExponentOp::with_linear([2.0; 4], [1.5; 4], style, dir);
        assert!(matches!(err, Err(OpsError::InvalidOffset { .. })));

        let err = ExponentOp::with_linear(LIN_GAMMA, LIN_OFFSET, NegativeStyle::Clamp, dir);
        assert!(matches!(err, Err(OpsError::UnsupportedStyle { .. })));
    }

    #[test]
    fn test_inverse_flips_direction_only() {
        let op = lin_op(NegativeStyle::Mirror);
        let inv = op.inverse();
        assert_eq!(inv.direction(), TransformDirection::Inverse);
        assert_eq!(inv.gamma(), op.gamma());
        assert_eq!(inv.offset(), op.offset());
        assert_eq!(inv.inverse(), op);
    }
}
