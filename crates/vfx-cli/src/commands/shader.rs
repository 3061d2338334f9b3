//! Shader command: prints generated WGSL.

use crate::ShaderArgs;
use anyhow::{Context, Result};
use vfx_ocio::{Config, GpuProcessor, GpuShaderDesc};
use vfx_ops::{ExponentOp, NegativeStyle, TransformDirection};

pub fn run(args: ShaderArgs, verbose: u8) -> Result<()> {
    let gamma = super::expand_channels(&args.gamma, 1.0, "--gamma")?;
    let direction = if args.inverse { TransformDirection::Inverse } else { TransformDirection::Forward };

    let op = match &args.offset {
        Some(offset) => {
            let offset = super::expand_channels(offset, 0.0, "--offset")?;
            let style = args.style.map_or(NegativeStyle::Linear, Into::into);
            ExponentOp::with_linear(gamma, offset, style, direction)
        }
        None => {
            let style = args.style.map_or(NegativeStyle::Clamp, Into::into);
            ExponentOp::new(gamma, style, direction)
        }
    }
    .context("Invalid exponent parameters")?;

    let config = Config::with_major_version(args.schema_version)?;
    let processor = GpuProcessor::new(&op, &config)
        .with_context(|| format!("Cannot build {} for schema v{}", op.kind_name(), args.schema_version))?;

    let mut desc = match args.legacy {
        Some(edge) => GpuShaderDesc::legacy(edge),
        None => GpuShaderDesc::new(),
    };
    if let Some(name) = args.function_name {
        desc = desc.function_name(name);
    }

    let shader = processor.generate(&desc).context("Shader generation failed")?;

    if verbose > 0 {
        eprintln!(
            "{} {:?} style={:?} mode={} entry={} workgroup={}",
            op.kind_name(),
            op.direction(),
            op.negative_style(),
            shader.mode().name(),
            shader.entry_point(),
            shader.workgroup_size()
        );
    }
    print!("{}", shader.source());
    Ok(())
}
