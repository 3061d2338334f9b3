//! Software shader executor.
//!
//! Interprets a generated shader's body in f32 with WGSL semantics:
//! `select` is branch-free, `mix(a, b, t) = a * (1 - t) + b * t`, and
//! `clamp` bounds lattice coordinates. The `pow` flavour follows the
//! executor's [`NumericBackend`].

use rayon::prelude::*;
use tracing::trace;
use vfx_ocio::{BakedLattice, ChannelProgram, Expr, GpuShader, ShaderBody, ShaderProgram};

use super::{NumericBackend, ShaderExecutor};
use crate::fast_math::fast_pow;
use crate::{GpuError, GpuResult};

/// Domains smaller than this run on the calling thread.
const PARALLEL_THRESHOLD: usize = 4096;

/// f32 interpreter for generated shaders.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareExecutor {
    numeric: NumericBackend,
}

impl SoftwareExecutor {
    /// Creates an executor with the given `pow` flavour.
    pub fn new(numeric: NumericBackend) -> Self {
        Self { numeric }
    }

    #[inline]
    fn pow(&self, base: f32, exp: f32) -> f32 {
        match self.numeric {
            NumericBackend::Ieee => base.powf(exp),
            NumericBackend::NativeGpu => (exp * base.log2()).exp2(),
            NumericBackend::FastPow => fast_pow(base, exp),
        }
    }

    fn eval(&self, expr: &Expr, x: f32, lets: &[f32]) -> f32 {
        match expr {
            Expr::Input => x,
            Expr::Const(v) => *v,
            Expr::Local(i) => lets[*i],
            Expr::Abs(e) => self.eval(e, x, lets).abs(),
            Expr::Neg(e) => -self.eval(e, x, lets),
            Expr::Add(a, b) => self.eval(a, x, lets) + self.eval(b, x, lets),
            Expr::Sub(a, b) => self.eval(a, x, lets) - self.eval(b, x, lets),
            Expr::Mul(a, b) => self.eval(a, x, lets) * self.eval(b, x, lets),
            Expr::Div(a, b) => self.eval(a, x, lets) / self.eval(b, x, lets),
            Expr::Pow(a, b) => self.pow(self.eval(a, x, lets), self.eval(b, x, lets)),
            Expr::Select { cmp, lhs, rhs, if_true, if_false } => {
                // both arms are evaluated, as on the GPU
                let t = self.eval(if_true, x, lets);
                let f = self.eval(if_false, x, lets);
                if cmp.test(self.eval(lhs, x, lets), self.eval(rhs, x, lets)) { t } else { f }
            }
        }
    }

    fn eval_channel(&self, program: &ChannelProgram, x: f32, scratch: &mut Vec<f32>) -> f32 {
        scratch.clear();
        for expr in program.lets() {
            let v = self.eval(expr, x, scratch);
            scratch.push(v);
        }
        self.eval(program.result(), x, scratch)
    }

    fn run_analytic(&self, program: &ShaderProgram, domain: &[[f32; 4]]) -> Vec<[f32; 4]> {
        let channels = program.channels();
        let pixel = |scratch: &mut Vec<f32>, px: &[f32; 4]| -> [f32; 4] {
            std::array::from_fn(|c| self.eval_channel(&channels[c], px[c], scratch))
        };

        if domain.len() >= PARALLEL_THRESHOLD {
            domain.par_iter().map_init(Vec::new, pixel).collect()
        } else {
            let mut scratch = Vec::new();
            domain.iter().map(|px| pixel(&mut scratch, px)).collect()
        }
    }

    fn run_lattice(&self, lut: &BakedLattice, domain: &[[f32; 4]]) -> Vec<[f32; 4]> {
        if domain.len() >= PARALLEL_THRESHOLD {
            domain.par_iter().map(|px| sample_lattice(lut, px)).collect()
        } else {
            domain.iter().map(|px| sample_lattice(lut, px)).collect()
        }
    }
}

impl ShaderExecutor for SoftwareExecutor {
    fn name(&self) -> &'static str {
        "software"
    }

    fn numeric_backend(&self) -> NumericBackend {
        self.numeric
    }

    fn run(&self, shader: &GpuShader, domain: &[[f32; 4]]) -> GpuResult<Vec<[f32; 4]>> {
        trace!(pixels = domain.len(), mode = shader.mode().name(), numeric = %self.numeric, "software run");
        match shader.body() {
            ShaderBody::Analytic(program) => {
                validate_program(program)?;
                Ok(self.run_analytic(program, domain))
            }
            ShaderBody::Lut(lut) => {
                validate_lattice(lut)?;
                Ok(self.run_lattice(lut, domain))
            }
        }
    }
}

/// Rejects bodies a shader compiler would reject: bindings read before
/// they are defined.
fn validate_program(program: &ShaderProgram) -> GpuResult<()> {
    for (c, channel) in program.channels().iter().enumerate() {
        for (i, expr) in channel.lets().iter().enumerate() {
            check_locals(expr, i).map_err(|bad| {
                GpuError::ShaderCompilation(format!("channel {c}: t{bad} used before definition"))
            })?;
        }
        check_locals(channel.result(), channel.lets().len()).map_err(|bad| {
            GpuError::ShaderCompilation(format!("channel {c}: t{bad} used before definition"))
        })?;
    }
    Ok(())
}

fn check_locals(expr: &Expr, defined: usize) -> Result<(), usize> {
    match expr {
        Expr::Input | Expr::Const(_) => Ok(()),
        Expr::Local(i) => if *i < defined { Ok(()) } else { Err(*i) },
        Expr::Abs(e) | Expr::Neg(e) => check_locals(e, defined),
        Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
            check_locals(a, defined)?;
            check_locals(b, defined)
        }
        Expr::Select { lhs, rhs, if_true, if_false, .. } => {
            check_locals(lhs, defined)?;
            check_locals(rhs, defined)?;
            check_locals(if_true, defined)?;
            check_locals(if_false, defined)
        }
    }
}

fn validate_lattice(lut: &BakedLattice) -> GpuResult<()> {
    let edge = lut.edge_size;
    if edge < 2 {
        return Err(GpuError::ShaderCompilation(format!("lattice edge {edge} < 2")));
    }
    if lut.lattice.len() != edge * edge * edge {
        return Err(GpuError::BufferSizeMismatch { expected: edge * edge * edge, actual: lut.lattice.len() });
    }
    if lut.alpha.len() != edge {
        return Err(GpuError::BufferSizeMismatch { expected: edge, actual: lut.alpha.len() });
    }
    Ok(())
}

#[inline]
fn mix(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Lattice cell and fraction for one coordinate.
#[inline]
fn lattice_coord(v: f32, edge: usize) -> (usize, f32) {
    let p = v.clamp(0.0, 1.0) * (edge - 1) as f32;
    // NaN saturates to 0
    let i0 = (p.floor() as usize).min(edge - 2);
    (i0, p - i0 as f32)
}

/// Trilinear RGB lookup plus linear alpha ramp.
fn sample_lattice(lut: &BakedLattice, px: &[f32; 4]) -> [f32; 4] {
    let edge = lut.edge_size;
    let (r0, fr) = lattice_coord(px[0], edge);
    let (g0, fg) = lattice_coord(px[1], edge);
    let (b0, fb) = lattice_coord(px[2], edge);
    let (r1, g1, b1) = (r0 + 1, g0 + 1, b0 + 1);

    let mut rgb = [0.0f32; 3];
    for (c, out) in rgb.iter_mut().enumerate() {
        let at = |r, g, b| lut.get(r, g, b)[c];
        let c00 = mix(at(r0, g0, b0), at(r1, g0, b0), fr);
        let c10 = mix(at(r0, g1, b0), at(r1, g1, b0), fr);
        let c01 = mix(at(r0, g0, b1), at(r1, g0, b1), fr);
        let c11 = mix(at(r0, g1, b1), at(r1, g1, b1), fr);
        let c0 = mix(c00, c10, fg);
        let c1 = mix(c01, c11, fg);
        *out = mix(c0, c1, fb);
    }

    let (a0, fa) = lattice_coord(px[3], edge);
    let alpha = mix(lut.alpha[a0], lut.alpha[a0 + 1], fa);

    [rgb[0], rgb[1], rgb[2], alpha]
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfx_ocio::{Cmp, Config, GpuProcessor, GpuShaderDesc};
    use vfx_ops::{ExponentOp, NegativeStyle, TransformDirection};

    const GAMMA: [f64; 4] = [2.6, 1.0, 1.8, 1.1];

    fn shader(style: NegativeStyle, desc: GpuShaderDesc) -> GpuShader {
        let op = ExponentOp::new(GAMMA, style, TransformDirection::Forward).unwrap();
        GpuProcessor::new(&op, &Config::new()).unwrap().generate(&desc).unwrap()
    }

    #[test]
    fn test_single_pixel() {
        let exec = SoftwareExecutor::new(NumericBackend::Ieee);
        let out = exec.run(&shader(NegativeStyle::Clamp, GpuShaderDesc::new()), &[[0.5; 4]]).unwrap();
        assert_eq!(out.len(), 1);
        assert!((out[0][0] - 0.5f32.powf(2.6)).abs() <= 1e-6);
        assert_eq!(out[0][1], 0.5);
    }

    #[test]
    fn test_order_and_length() {
        let exec = SoftwareExecutor::new(NumericBackend::Ieee);
        let domain: Vec<[f32; 4]> = (0..5000).map(|i| [i as f32 / 5000.0; 4]).collect();
        let s = shader(NegativeStyle::PassThru, GpuShaderDesc::new());
        let out = exec.run(&s, &domain).unwrap();
        assert_eq!(out.len(), domain.len());
        let single = exec.run(&s, &domain[1234..1235]).unwrap();
        assert_eq!(out[1234], single[0]);
    }

    #[test]
    fn test_specials() {
        let exec = SoftwareExecutor::new(NumericBackend::FastPow);
        let s = shader(NegativeStyle::Mirror, GpuShaderDesc::new());
        let out = exec.run(&s, &[[f32::NAN, f32::INFINITY, f32::NEG_INFINITY, -0.5]]).unwrap();
        assert!(out[0][0].is_nan());
        assert_eq!(out[0][1], f32::INFINITY);
        assert_eq!(out[0][2], f32::NEG_INFINITY);
        assert!(out[0][3] < 0.0);
    }

    #[test]
    fn test_native_pow_close_to_ieee() {
        let s = shader(NegativeStyle::Clamp, GpuShaderDesc::new());
        let domain: Vec<[f32; 4]> = (0..=100).map(|i| [i as f32 / 80.0; 4]).collect();
        let ieee = SoftwareExecutor::new(NumericBackend::Ieee).run(&s, &domain).unwrap();
        let native = SoftwareExecutor::new(NumericBackend::NativeGpu).run(&s, &domain).unwrap();
        for (a, b) in ieee.iter().zip(&native) {
            for c in 0..4 {
                assert!((a[c] - b[c]).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_lattice_hits_grid_points() {
        let s = shader(NegativeStyle::Clamp, GpuShaderDesc::legacy(5));
        let exec = SoftwareExecutor::default();
        let out = exec.run(&s, &[[0.25, 0.5, 0.75, 1.0], [-1.0, 2.0, 0.0, -0.5]]).unwrap();

        assert!((out[0][0] - 0.25f32.powf(2.6)).abs() < 1e-6);
        assert!((out[0][1] - 0.5).abs() < 1e-6);
        assert!((out[0][2] - 0.75f32.powf(1.8)).abs() < 1e-6);
        assert!((out[0][3] - 1.0).abs() < 1e-6);

        // out of range clamps to the lattice edge
        assert_eq!(out[1][0], 0.0);
        assert!((out[1][1] - 1.0).abs() < 1e-6);
        assert_eq!(out[1][3], 0.0);
    }

    #[test]
    fn test_bad_binding_rejected() {
        let broken = ChannelProgram::new().finish(Expr::Local(3));
        let ok = || ChannelProgram::new().finish(Expr::select(
            Cmp::Lt,
            Expr::Input,
            Expr::Const(0.0),
            Expr::Const(0.0),
            Expr::Input,
        ));
        let program = ShaderProgram::new([ok(), broken, ok(), ok()]);
        let err = validate_program(&program).unwrap_err();
        assert!(matches!(err, GpuError::ShaderCompilation(msg) if msg.contains("channel 1")));
    }
}
