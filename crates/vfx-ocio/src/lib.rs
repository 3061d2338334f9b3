//! OpenColorIO-style shader generation for exponent transforms.
//!
//! This crate turns an [`ExponentOp`](vfx_ops::ExponentOp) into GPU code:
//! - A minimal [`Config`] carrying the schema major version
//! - Per-channel analytic [`ShaderProgram`]s mirroring the CPU branches
//! - WGSL compute shaders in modern (analytic) or legacy (baked lattice) mode
//!
//! # Quick Start
//!
//! ```
//! use vfx_ocio::{Config, GpuProcessor, GpuShaderDesc};
//! use vfx_ops::{ExponentOp, NegativeStyle, TransformDirection};
//!
//! let mut config = Config::new();
//! config.set_major_version(1).unwrap();
//!
//! let op = ExponentOp::new([2.6, 1.0, 1.8, 1.1], NegativeStyle::Clamp, TransformDirection::Forward).unwrap();
//! let gpu = GpuProcessor::new(&op, &config).unwrap();
//!
//! // Legacy descriptor: 32³ lattice plus trilinear sampling
//! let shader = gpu.generate(&GpuShaderDesc::legacy(32)).unwrap();
//! assert_eq!(shader.lut().unwrap().edge_size, 32);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod config;

pub mod baker;
pub mod gpu;
pub mod program;

// Re-exports
pub use error::{OcioError, OcioResult};
pub use config::{Config, ConfigVersion};
pub use baker::BakedLattice;
pub use gpu::{GpuProcessor, GpuShader, GpuShaderDesc, Resolution, ShaderBody, ShaderDescMode};
pub use program::{ChannelProgram, Cmp, Expr, ShaderProgram};
