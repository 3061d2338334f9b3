//! Test pixel domains.
//!
//! A domain is an ordered list of RGBA pixels fed unchanged to both the CPU
//! reference and the shader executor. Rows are chosen to drive every branch
//! of the exponent curves: a staggered ramp, values hugging zero from both
//! sides, the breakpoint region of typical linear segments, and special
//! values.

use std::ops::Deref;

use vfx_ocio::ShaderDescMode;

/// Steps in the staggered ramp.
const RAMP_STEPS: usize = 64;
/// Ramp lower bound.
const RAMP_MIN: f32 = -0.25;
/// Ramp upper bound for analytic shaders.
const RAMP_MAX: f32 = 1.25;

/// Negatives close to zero (Clamp/Mirror/PassThru/Linear branches).
const NEAR_ZERO_NEGATIVES: [f32; 8] = [-1e-6, -1e-4, -0.0005, -0.001, -0.01, -0.1, -0.5, -1.0];
/// Small positives below most breakpoints.
const TINY_POSITIVES: [f32; 6] = [1e-6, 1e-4, 0.005, 0.02, 0.03, 0.1];
/// Log-spaced values over the usual breakpoint range.
const BREAKPOINT_SPAN: (f32, f32, usize) = (1e-3, 0.25, 16);

/// Ordered pixel domain.
#[derive(Debug, Clone, PartialEq)]
pub struct TestDomain {
    pixels: Vec<[f32; 4]>,
}

impl TestDomain {
    /// Domain for analytic shaders: ramp over `[-0.25, 1.25]` plus branch
    /// drivers and special values.
    pub fn standard() -> Self {
        Self::build(RAMP_MAX)
    }

    /// Domain for baked lattices: finite values stay `<= 1`.
    pub fn unit_range() -> Self {
        Self::build(1.0)
    }

    /// Domain matching a shader descriptor mode.
    pub fn for_mode(mode: ShaderDescMode) -> Self {
        match mode {
            ShaderDescMode::Modern => Self::standard(),
            ShaderDescMode::Legacy { .. } => Self::unit_range(),
        }
    }

    /// Pixels in order.
    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }

    fn build(upper: f32) -> Self {
        let mut pixels = Vec::with_capacity(RAMP_STEPS + 48);

        // Each channel walks the ramp from a different starting point so
        // the four channels never share a value in the same row.
        let step = (upper - RAMP_MIN) / (RAMP_STEPS - 1) as f32;
        let stagger = RAMP_STEPS / 4;
        for i in 0..RAMP_STEPS {
            pixels.push(std::array::from_fn(|c| {
                let k = (i + c * stagger) % RAMP_STEPS;
                RAMP_MIN + step * k as f32
            }));
        }

        for v in NEAR_ZERO_NEGATIVES.into_iter().chain(TINY_POSITIVES) {
            pixels.push([v; 4]);
        }

        let (lo, hi, n) = BREAKPOINT_SPAN;
        let ratio = (hi / lo).powf(1.0 / (n - 1) as f32);
        for i in 0..n {
            let v = lo * ratio.powi(i as i32);
            if v <= upper {
                pixels.push([v, -v, v * 0.5, v * 2.0]);
            }
        }

        pixels.push([0.0; 4]);
        pixels.push([-0.0; 4]);
        pixels.push([0.5; 4]);
        pixels.push([upper; 4]);
        pixels.push([0.18, 0.5, 0.9, 1.0]);

        let (nan, inf) = (f32::NAN, f32::INFINITY);
        pixels.push([nan; 4]);
        pixels.push([inf; 4]);
        pixels.push([-inf; 4]);
        pixels.push([nan, inf, -inf, 0.5]);
        pixels.push([0.25, nan, 0.75, inf]);

        Self { pixels }
    }
}

impl Deref for TestDomain {
    type Target = [[f32; 4]];

    fn deref(&self) -> &Self::Target {
        &self.pixels
    }
}
