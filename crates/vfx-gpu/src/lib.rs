//! Shader executors for GPU-vs-CPU parity runs.
//!
//! Runs shaders produced by `vfx-ocio` over a domain of RGBA pixels, either
//! on a wgpu device or through a software interpreter that follows WGSL
//! semantics.
//!
//! # Architecture
//!
//! ```text
//! create_executor(Backend, NumericBackend)
//!     └── ShaderExecutor trait
//!             ├── SoftwareExecutor (f32 interpreter, rayon)
//!             └── WgpuExecutor (compute shaders, feature "wgpu")
//! ```
//!
//! # Example
//!
//! ```
//! use vfx_gpu::{create_executor, Backend, NumericBackend};
//! use vfx_ocio::{Config, GpuProcessor, GpuShaderDesc};
//! use vfx_ops::{ExponentOp, NegativeStyle, TransformDirection};
//!
//! let op = ExponentOp::new([2.2, 2.2, 2.2, 1.0], NegativeStyle::Clamp, TransformDirection::Forward).unwrap();
//! let shader = GpuProcessor::new(&op, &Config::new()).unwrap()
//!     .generate(&GpuShaderDesc::new()).unwrap();
//!
//! let exec = create_executor(Backend::Software, NumericBackend::Ieee).unwrap();
//! let out = exec.run(&shader, &[[0.5; 4]]).unwrap();
//! assert_eq!(out.len(), 1);
//! ```

pub mod backend;
pub mod fast_math;

#[cfg(feature = "wgpu")]
pub mod context;

pub use backend::{
    create_executor, Backend, NumericBackend, ShaderExecutor, SoftwareExecutor, BACKEND_ENV,
};

#[cfg(feature = "wgpu")]
pub use backend::WgpuExecutor;

#[cfg(feature = "wgpu")]
pub use context::GpuContext;

use thiserror::Error;

/// GPU operation errors
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("Failed to create device: {0}")]
    DeviceCreation(String),

    #[error("Failed to create buffer: {0}")]
    BufferCreation(String),

    #[error("Failed to compile shader: {0}")]
    ShaderCompilation(String),

    #[error("Buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("GPU operation failed: {0}")]
    OperationFailed(String),
}

pub type GpuResult<T> = Result<T, GpuError>;
