//! GPU shader generation for exponent transforms.
//!
//! Generates WGSL compute shaders that apply an [`ExponentOp`] to a buffer
//! of RGBA pixels.
//!
//! # Example
//!
//! ```
//! use vfx_ocio::{Config, GpuProcessor, GpuShaderDesc};
//! use vfx_ops::{ExponentOp, NegativeStyle, TransformDirection};
//!
//! let op = ExponentOp::new([2.2, 2.2, 2.2, 1.0], NegativeStyle::Mirror, TransformDirection::Forward)?;
//! let gpu = GpuProcessor::new(&op, &Config::new())?;
//! let shader = gpu.generate(&GpuShaderDesc::new())?;
//!
//! assert!(shader.source().contains("fn ocio_transform"));
//! # Ok::<(), vfx_ocio::OcioError>(())
//! ```
//!
//! # Shader descriptor modes
//!
//! - `Modern` - analytic per-channel functions mirroring the CPU branches
//! - `Legacy` - the same functions baked into a 3D lattice (plus an alpha
//!   ramp) sampled with trilinear interpolation

use std::fmt::Write;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use vfx_ops::{ExponentOp, NegativeStyle, TransformDirection};

use crate::baker::{self, BakedLattice};
use crate::config::{Config, ConfigVersion};
use crate::error::{OcioError, OcioResult};
use crate::program::{ChannelProgram, Cmp, Expr, ShaderProgram};

/// Threads per workgroup in generated compute shaders.
pub const WORKGROUP_SIZE: u32 = 64;

/// Compute entry point name.
pub const ENTRY_POINT: &str = "main";

/// Default transform function name.
pub const DEFAULT_FUNCTION_NAME: &str = "ocio_transform";

/// How the transform is materialised in the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ShaderDescMode {
    /// Direct analytic expression.
    #[default]
    Modern,
    /// Baked lattice of `edge_size³` entries.
    Legacy {
        /// Samples per axis.
        edge_size: usize,
    },
}

impl ShaderDescMode {
    /// Short name for logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            ShaderDescMode::Modern => "modern",
            ShaderDescMode::Legacy { .. } => "legacy",
        }
    }
}

/// Precision the generator works at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// Unbounded: analytic expression.
    Analytic,
    /// Fixed lattice edge.
    Lattice(usize),
}

/// Shader descriptor: what to generate and under which names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuShaderDesc {
    mode: ShaderDescMode,
    function_name: String,
}

impl Default for GpuShaderDesc {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuShaderDesc {
    /// Modern (analytic) descriptor.
    pub fn new() -> Self {
        Self::with_mode(ShaderDescMode::Modern)
    }

    /// Legacy descriptor with a baked lattice of `edge_size` samples per axis.
    pub fn legacy(edge_size: usize) -> Self {
        Self::with_mode(ShaderDescMode::Legacy { edge_size })
    }

    /// Descriptor for `mode`.
    pub fn with_mode(mode: ShaderDescMode) -> Self {
        Self { mode, function_name: DEFAULT_FUNCTION_NAME.to_string() }
    }

    /// Overrides the transform function name.
    pub fn function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = name.into();
        self
    }

    /// Descriptor mode.
    pub fn mode(&self) -> ShaderDescMode {
        self.mode
    }

    /// Transform function name.
    pub fn name(&self) -> &str {
        &self.function_name
    }

    /// Generator resolution for this descriptor.
    pub fn resolution(&self) -> Resolution {
        match self.mode {
            ShaderDescMode::Modern => Resolution::Analytic,
            ShaderDescMode::Legacy { edge_size } => Resolution::Lattice(edge_size),
        }
    }
}

/// What the shader computes, in a form an executor can interpret.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderBody {
    /// Per-channel analytic programs.
    Analytic(ShaderProgram),
    /// Baked lattice, sampled trilinearly.
    Lut(BakedLattice),
}

/// Generated shader code object.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuShader {
    source: String,
    mode: ShaderDescMode,
    function_name: String,
    body: ShaderBody,
}

impl GpuShader {
    /// WGSL source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Descriptor mode it was generated for.
    pub fn mode(&self) -> ShaderDescMode {
        self.mode
    }

    /// Transform function name.
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Compute entry point.
    pub fn entry_point(&self) -> &'static str {
        ENTRY_POINT
    }

    /// Threads per workgroup.
    pub fn workgroup_size(&self) -> u32 {
        WORKGROUP_SIZE
    }

    /// Interpretable body.
    pub fn body(&self) -> &ShaderBody {
        &self.body
    }

    /// Baked lattice, for legacy shaders.
    pub fn lut(&self) -> Option<&BakedLattice> {
        match &self.body {
            ShaderBody::Lut(lut) => Some(lut),
            ShaderBody::Analytic(_) => None,
        }
    }
}

/// GPU processor for generating shader code from one operator.
#[derive(Debug, Clone)]
pub struct GpuProcessor {
    op: ExponentOp,
    major_version: u32,
}

impl GpuProcessor {
    /// Creates a processor, checking the operator against the schema version.
    ///
    /// Version 1 only knows the basic exponent with clamping; every other
    /// negative style and the exponent-with-linear curve need version 2+.
    pub fn new(op: &ExponentOp, config: &Config) -> OcioResult<Self> {
        if config.version() == ConfigVersion::V1 {
            let reason = if op.has_linear_segment() {
                Some("exponent with linear segment requires version 2 or later".to_string())
            } else if !op.negative_style().is_legacy() {
                Some(format!(
                    "negative style {:?} requires version 2 or later",
                    op.negative_style()
                ))
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(OcioError::VersionMismatch { version: config.major_version(), reason });
            }
        }
        Ok(Self { op: op.clone(), major_version: config.major_version() })
    }

    /// Operator this processor generates code for.
    pub fn op(&self) -> &ExponentOp {
        &self.op
    }

    /// Config major version it was created under.
    pub fn major_version(&self) -> u32 {
        self.major_version
    }

    /// Analytic per-channel programs for the operator.
    pub fn program(&self) -> ShaderProgram {
        build_program(&self.op)
    }

    /// Generates a shader for `desc`. Pure: same inputs, same output.
    pub fn generate(&self, desc: &GpuShaderDesc) -> OcioResult<GpuShader> {
        let program = self.program();
        let name = desc.name();

        let (body, source) = match desc.resolution() {
            Resolution::Analytic => {
                let source = emit_analytic(&program, name)?;
                (ShaderBody::Analytic(program), source)
            }
            Resolution::Lattice(edge_size) => {
                // The lattice covers [0, 1]; negatives sample f(0), which is
                // only the operator's answer under clamping.
                if self.op.has_linear_segment() || !self.op.negative_style().is_legacy() {
                    return Err(OcioError::UnsupportedMode {
                        reason: format!(
                            "legacy lattice cannot represent {} with {:?} negatives",
                            self.op.kind_name(),
                            self.op.negative_style()
                        ),
                    });
                }
                let lut = baker::bake(&program, edge_size)?;
                let source = emit_lattice(edge_size, name)?;
                (ShaderBody::Lut(lut), source)
            }
        };

        debug!(
            kind = self.op.kind_name(),
            mode = desc.mode().name(),
            bytes = source.len(),
            "generated shader"
        );
        trace!("{source}");

        Ok(GpuShader {
            source,
            mode: desc.mode(),
            function_name: name.to_string(),
            body,
        })
    }
}

// ============================================================================
// Channel programs
// ============================================================================

fn build_program(op: &ExponentOp) -> ShaderProgram {
    let gamma = op.gamma();
    let style = op.negative_style();
    let inverse = op.direction() == TransformDirection::Inverse;

    let channels = match op.offset() {
        Some(offset) => {
            std::array::from_fn(|c| moncurve_channel(gamma[c], offset[c], style, inverse))
        }
        None => std::array::from_fn(|c| {
            let exp = if inverse { 1.0 / gamma[c] } else { gamma[c] };
            power_channel(exp, style)
        }),
    };
    ShaderProgram::new(channels)
}

fn is_negative(if_true: Expr, if_false: Expr) -> Expr {
    Expr::select(Cmp::Lt, Expr::Input, Expr::constant(0.0), if_true, if_false)
}

fn power_channel(exp: f64, style: NegativeStyle) -> ChannelProgram {
    let mut p = ChannelProgram::new();
    let x = Expr::Input;

    if exp == 1.0 {
        return match style {
            NegativeStyle::Clamp => p.finish(is_negative(Expr::constant(0.0), x)),
            _ => p.finish(x),
        };
    }

    match style {
        NegativeStyle::Clamp => {
            p.finish(is_negative(Expr::constant(0.0), x).pow(Expr::constant(exp)))
        }
        NegativeStyle::Mirror | NegativeStyle::Linear => {
            let t = p.bind(x.abs().pow(Expr::constant(exp)));
            p.finish(is_negative(-t.clone(), t))
        }
        NegativeStyle::PassThru => {
            let t = p.bind(x.clone().abs().pow(Expr::constant(exp)));
            p.finish(is_negative(x, t))
        }
    }
}

fn moncurve_channel(gamma: f64, offset: f64, style: NegativeStyle, inverse: bool) -> ChannelProgram {
    let mut p = ChannelProgram::new();
    if gamma == 1.0 {
        return p;
    }

    let brk = offset / (gamma - 1.0);
    let slope = (offset * gamma / ((gamma - 1.0) * (1.0 + offset))).powf(gamma)
        * (gamma - 1.0)
        / offset;

    let x = match style {
        NegativeStyle::Mirror => p.bind(Expr::Input.abs()),
        _ => Expr::Input,
    };

    let curve = if inverse {
        let power = p.bind(
            x.clone().pow(Expr::constant(1.0 / gamma)) * Expr::constant(1.0 + offset)
                - Expr::constant(offset),
        );
        let linear = p.bind(x.clone() / Expr::constant(slope));
        Expr::select(Cmp::Ge, x, Expr::constant(brk * slope), power, linear)
    } else {
        let power = p.bind(
            ((x.clone() + Expr::constant(offset)) * Expr::constant(1.0 / (1.0 + offset)))
                .pow(Expr::constant(gamma)),
        );
        let linear = p.bind(x.clone() * Expr::constant(slope));
        Expr::select(Cmp::Ge, x, Expr::constant(brk), power, linear)
    };

    match style {
        NegativeStyle::Mirror => {
            let v = p.bind(curve);
            p.finish(is_negative(-v.clone(), v))
        }
        _ => p.finish(curve),
    }
}

// ============================================================================
// WGSL emission
// ============================================================================

fn emit_bindings(code: &mut String) -> std::fmt::Result {
    writeln!(code, "@group(0) @binding(0) var<storage, read> src: array<vec4<f32>>;")?;
    writeln!(code, "@group(0) @binding(1) var<storage, read_write> dst: array<vec4<f32>>;")?;
    writeln!(code, "@group(0) @binding(2) var<uniform> dims: vec4<u32>;")?;
    Ok(())
}

fn emit_main(code: &mut String, name: &str) -> std::fmt::Result {
    writeln!(code)?;
    writeln!(code, "@compute @workgroup_size({WORKGROUP_SIZE})")?;
    writeln!(code, "fn {ENTRY_POINT}(@builtin(global_invocation_id) gid: vec3<u32>) {{")?;
    writeln!(code, "    let idx = gid.x;")?;
    writeln!(code, "    if (idx >= dims.x) {{ return; }}")?;
    writeln!(code, "    dst[idx] = {name}(src[idx]);")?;
    writeln!(code, "}}")
}

fn emit_analytic(program: &ShaderProgram, name: &str) -> OcioResult<String> {
    let mut code = String::new();
    writeln!(code, "// Exponent transform (analytic)")?;
    emit_bindings(&mut code)?;
    writeln!(code)?;

    for (c, channel) in program.channels().iter().enumerate() {
        channel.write_wgsl_fn(&mut code, &format!("{name}_channel_{c}"))?;
        writeln!(code)?;
    }

    writeln!(code, "fn {name}(color: vec4<f32>) -> vec4<f32> {{")?;
    writeln!(
        code,
        "    return vec4<f32>({name}_channel_0(color.x), {name}_channel_1(color.y), \
         {name}_channel_2(color.z), {name}_channel_3(color.w));"
    )?;
    writeln!(code, "}}")?;

    emit_main(&mut code, name)?;
    Ok(code)
}

fn emit_lattice(edge_size: usize, name: &str) -> OcioResult<String> {
    let mut code = String::new();
    writeln!(code, "// Exponent transform (baked {edge_size}^3 lattice)")?;
    emit_bindings(&mut code)?;
    writeln!(code, "@group(0) @binding(3) var<storage, read> lut: array<vec4<f32>>;")?;
    writeln!(code, "@group(0) @binding(4) var<storage, read> alpha_lut: array<f32>;")?;
    writeln!(code)?;
    writeln!(code, "const LUT_EDGE: u32 = {edge_size}u;")?;
    writeln!(code)?;

    writeln!(code, "fn {name}_lut(r: u32, g: u32, b: u32) -> vec3<f32> {{")?;
    writeln!(code, "    return lut[(b * LUT_EDGE + g) * LUT_EDGE + r].xyz;")?;
    writeln!(code, "}}")?;
    writeln!(code)?;

    writeln!(code, "fn {name}(color: vec4<f32>) -> vec4<f32> {{")?;
    writeln!(code, "    let max_index = f32(LUT_EDGE - 1u);")?;
    writeln!(code, "    let p = clamp(color.xyz, vec3<f32>(0.0), vec3<f32>(1.0)) * max_index;")?;
    writeln!(code, "    let i0 = min(vec3<u32>(floor(p)), vec3<u32>(LUT_EDGE - 2u));")?;
    writeln!(code, "    let i1 = i0 + vec3<u32>(1u);")?;
    writeln!(code, "    let f = p - vec3<f32>(i0);")?;
    for (corner, (r, g, b)) in [
        ("c000", ("i0.x", "i0.y", "i0.z")),
        ("c100", ("i1.x", "i0.y", "i0.z")),
        ("c010", ("i0.x", "i1.y", "i0.z")),
        ("c110", ("i1.x", "i1.y", "i0.z")),
        ("c001", ("i0.x", "i0.y", "i1.z")),
        ("c101", ("i1.x", "i0.y", "i1.z")),
        ("c011", ("i0.x", "i1.y", "i1.z")),
        ("c111", ("i1.x", "i1.y", "i1.z")),
    ] {
        writeln!(code, "    let {corner} = {name}_lut({r}, {g}, {b});")?;
    }
    writeln!(code, "    let c00 = mix(c000, c100, f.x);")?;
    writeln!(code, "    let c10 = mix(c010, c110, f.x);")?;
    writeln!(code, "    let c01 = mix(c001, c101, f.x);")?;
    writeln!(code, "    let c11 = mix(c011, c111, f.x);")?;
    writeln!(code, "    let c0 = mix(c00, c10, f.y);")?;
    writeln!(code, "    let c1 = mix(c01, c11, f.y);")?;
    writeln!(code, "    let rgb = mix(c0, c1, f.z);")?;
    writeln!(code)?;
    writeln!(code, "    let pa = clamp(color.w, 0.0, 1.0) * max_index;")?;
    writeln!(code, "    let ia = min(u32(floor(pa)), LUT_EDGE - 2u);")?;
    writeln!(code, "    let a = mix(alpha_lut[ia], alpha_lut[ia + 1u], pa - f32(ia));")?;
    writeln!(code, "    return vec4<f32>(rgb, a);")?;
    writeln!(code, "}}")?;

    emit_main(&mut code, name)?;
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAMMA: [f64; 4] = [2.6, 1.0, 1.8, 1.1];

    fn processor(style: NegativeStyle, direction: TransformDirection) -> GpuProcessor {
        let op = ExponentOp::new(GAMMA, style, direction).unwrap();
        GpuProcessor::new(&op, &Config::new()).unwrap()
    }

    fn moncurve(style: NegativeStyle, direction: TransformDirection) -> ExponentOp {
        ExponentOp::with_linear([2.1, 1.0, 2.3, 1.5], [0.01, 0.0, 0.03, 0.05], style, direction)
            .unwrap()
    }

    #[test]
    fn test_modern_source_layout() {
        let gpu = processor(NegativeStyle::Clamp, TransformDirection::Forward);
        let shader = gpu.generate(&GpuShaderDesc::new()).unwrap();
        let src = shader.source();

        assert!(src.contains("@compute @workgroup_size(64)"));
        assert!(src.contains("fn ocio_transform(color: vec4<f32>) -> vec4<f32>"));
        assert!(src.contains("fn ocio_transform_channel_3(x: f32) -> f32"));
        assert!(src.contains("2.6f"));
        assert!(!src.contains("lut"));
        assert!(matches!(shader.body(), ShaderBody::Analytic(_)));
        assert_eq!(shader.entry_point(), "main");
    }

    #[test]
    fn test_custom_function_name() {
        let gpu = processor(NegativeStyle::Mirror, TransformDirection::Forward);
        let shader = gpu.generate(&GpuShaderDesc::new().function_name("gamma_fwd")).unwrap();
        assert!(shader.source().contains("dst[idx] = gamma_fwd(src[idx]);"));
        assert_eq!(shader.function_name(), "gamma_fwd");
    }

    #[test]
    fn test_generation_is_pure() {
        for style in [NegativeStyle::Clamp, NegativeStyle::Mirror, NegativeStyle::PassThru] {
            let gpu = processor(style, TransformDirection::Inverse);
            let a = gpu.generate(&GpuShaderDesc::new()).unwrap();
            let b = gpu.generate(&GpuShaderDesc::new()).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_program_tracks_operator() {
        for style in [NegativeStyle::Clamp, NegativeStyle::Mirror, NegativeStyle::PassThru] {
            for dir in [TransformDirection::Forward, TransformDirection::Inverse] {
                let gpu = processor(style, dir);
                let program = gpu.program();
                for x in [-0.7, -1e-4, 0.0, 0.02, 0.5, 1.0, 1.25] {
                    let expected = gpu.op().evaluate([x; 4]);
                    let actual = program.eval_f64([x; 4]);
                    for c in 0..4 {
                        assert!(
                            (expected[c] - actual[c]).abs() < 1e-6,
                            "{style:?} {dir:?} x={x} c={c}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_moncurve_program_tracks_operator() {
        for style in [NegativeStyle::Linear, NegativeStyle::Mirror] {
            for dir in [TransformDirection::Forward, TransformDirection::Inverse] {
                let op = moncurve(style, dir);
                let program = GpuProcessor::new(&op, &Config::new()).unwrap().program();
                for x in [-1.0, -0.001, 0.0, 0.004, 0.01, 0.2, 0.9, 1.25] {
                    let expected = op.evaluate([x; 4]);
                    let actual = program.eval_f64([x; 4]);
                    for c in 0..4 {
                        let tol = 1e-6 * expected[c].abs().max(1.0);
                        assert!((expected[c] - actual[c]).abs() < tol, "{style:?} {dir:?} x={x} c={c}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_v1_rejects_modern_only_semantics() {
        let v1 = Config::with_major_version(1).unwrap();

        let clamp = ExponentOp::new(GAMMA, NegativeStyle::Clamp, TransformDirection::Forward).unwrap();
        assert!(GpuProcessor::new(&clamp, &v1).is_ok());

        for style in [NegativeStyle::Mirror, NegativeStyle::PassThru] {
            let op = ExponentOp::new(GAMMA, style, TransformDirection::Forward).unwrap();
            assert!(matches!(
                GpuProcessor::new(&op, &v1),
                Err(OcioError::VersionMismatch { version: 1, .. })
            ));
        }

        let op = moncurve(NegativeStyle::Linear, TransformDirection::Forward);
        assert!(matches!(GpuProcessor::new(&op, &v1), Err(OcioError::VersionMismatch { .. })));
    }

    #[test]
    fn test_legacy_lattice() {
        let gpu = processor(NegativeStyle::Clamp, TransformDirection::Forward);
        let shader = gpu.generate(&GpuShaderDesc::legacy(32)).unwrap();

        assert!(shader.source().contains("const LUT_EDGE: u32 = 32u;"));
        assert!(shader.source().contains("alpha_lut"));
        let lut = shader.lut().unwrap();
        assert_eq!(lut.edge_size, 32);
        assert_eq!(lut.lattice.len(), 32 * 32 * 32);
        assert_eq!(lut.alpha.len(), 32);
    }

    #[test]
    fn test_legacy_rejects_non_clamp() {
        let gpu = processor(NegativeStyle::Mirror, TransformDirection::Forward);
        assert!(matches!(
            gpu.generate(&GpuShaderDesc::legacy(32)),
            Err(OcioError::UnsupportedMode { .. })
        ));

        let op = moncurve(NegativeStyle::Linear, TransformDirection::Forward);
        let gpu = GpuProcessor::new(&op, &Config::new()).unwrap();
        assert!(gpu.generate(&GpuShaderDesc::legacy(32)).is_err());
    }

    #[test]
    fn test_legacy_edge_validated() {
        let gpu = processor(NegativeStyle::Clamp, TransformDirection::Forward);
        assert!(matches!(
            gpu.generate(&GpuShaderDesc::legacy(1)),
            Err(OcioError::InvalidLutSize { size: 1, .. })
        ));
    }

    #[test]
    fn test_desc_resolution() {
        assert_eq!(GpuShaderDesc::new().resolution(), Resolution::Analytic);
        assert_eq!(GpuShaderDesc::legacy(17).resolution(), Resolution::Lattice(17));
    }
}
