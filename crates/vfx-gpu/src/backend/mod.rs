//! Shader executors.
//!
//! Provides a software interpreter and a wgpu backend with automatic
//! selection. An executor owns whatever device state it needs; create one per
//! worker thread.

mod software;

#[cfg(feature = "wgpu")]
mod wgpu_backend;

pub use software::SoftwareExecutor;

#[cfg(feature = "wgpu")]
pub use wgpu_backend::WgpuExecutor;

use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};
use vfx_ocio::GpuShader;

use crate::{GpuError, GpuResult};

/// Environment variable overriding `Backend::Auto`.
pub const BACKEND_ENV: &str = "VFX_GPU_BACKEND";

/// Available execution backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Backend {
    /// Auto-select best available (wgpu > software).
    #[default]
    Auto,
    /// f32 interpreter of the shader body.
    Software,
    /// wgpu backend (Vulkan/Metal/DX12).
    Wgpu,
}

impl Backend {
    /// Check if this backend is available on current system.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Auto => true,
            Self::Software => true,
            #[cfg(feature = "wgpu")]
            Self::Wgpu => crate::context::GpuContext::is_available(),
            #[cfg(not(feature = "wgpu"))]
            Self::Wgpu => false,
        }
    }

    /// Backend name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Software => "software",
            Self::Wgpu => "wgpu",
        }
    }

    /// Applies the `VFX_GPU_BACKEND` override to `Auto`.
    pub fn resolve_env(self) -> Self {
        if self != Self::Auto {
            return self;
        }
        match std::env::var(BACKEND_ENV) {
            Ok(value) => value.parse().unwrap_or_else(|_| {
                warn!(%value, "ignoring unknown {BACKEND_ENV}");
                Self::Auto
            }),
            Err(_) => Self::Auto,
        }
    }

    /// Concrete backend `create_executor` uses for this request.
    ///
    /// Applies the env override, then resolves `Auto`: wgpu when available,
    /// software otherwise or when `numeric` is [`NumericBackend::FastPow`].
    pub fn select(self, numeric: NumericBackend) -> Self {
        match self.resolve_env() {
            Self::Auto => {
                // fast-pow only exists in software
                if numeric != NumericBackend::FastPow && Self::Wgpu.is_available() {
                    Self::Wgpu
                } else {
                    Self::Software
                }
            }
            concrete => concrete,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = GpuError;

    fn from_str(s: &str) -> GpuResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "software" | "cpu" => Ok(Self::Software),
            "wgpu" | "gpu" => Ok(Self::Wgpu),
            other => Err(GpuError::BackendNotAvailable(format!("unknown backend '{other}'"))),
        }
    }
}

/// Numeric behaviour of an executor's `pow`.
///
/// Tolerances are keyed on this tag, not on the executor type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NumericBackend {
    /// IEEE f32 `powf`.
    #[default]
    Ieee,
    /// Hardware shader math: `exp2(y * log2(x))`.
    NativeGpu,
    /// Polynomial exp2/log2 approximation.
    FastPow,
}

impl NumericBackend {
    /// Tag name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ieee => "ieee",
            Self::NativeGpu => "native-gpu",
            Self::FastPow => "fast-pow",
        }
    }
}

impl fmt::Display for NumericBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NumericBackend {
    type Err = GpuError;

    fn from_str(s: &str) -> GpuResult<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "ieee" => Ok(Self::Ieee),
            "native-gpu" | "native" => Ok(Self::NativeGpu),
            "fast-pow" | "fast" | "sse" => Ok(Self::FastPow),
            other => Err(GpuError::OperationFailed(format!("unknown numeric backend '{other}'"))),
        }
    }
}

/// Runs generated shaders over a pixel domain.
pub trait ShaderExecutor {
    /// Executor name.
    fn name(&self) -> &'static str;

    /// Numeric behaviour, used to pick tolerances.
    fn numeric_backend(&self) -> NumericBackend;

    /// Executes `shader` once per domain pixel. Output has the same length and
    /// order as `domain`.
    fn run(&self, shader: &GpuShader, domain: &[[f32; 4]]) -> GpuResult<Vec<[f32; 4]>>;
}

/// Create an executor.
///
/// `numeric` selects the software `pow`; the wgpu backend always reports
/// [`NumericBackend::NativeGpu`].
pub fn create_executor(backend: Backend, numeric: NumericBackend) -> GpuResult<Box<dyn ShaderExecutor>> {
    let selected = backend.select(numeric);
    if selected != backend {
        debug!(%backend, %selected, %numeric, "auto-selected executor");
    }
    match selected {
        Backend::Auto | Backend::Software => Ok(Box::new(SoftwareExecutor::new(numeric))),
        Backend::Wgpu => {
            #[cfg(feature = "wgpu")]
            {
                if numeric != NumericBackend::NativeGpu {
                    debug!(%numeric, "wgpu uses native shader math");
                }
                Ok(Box::new(WgpuExecutor::new()?))
            }
            #[cfg(not(feature = "wgpu"))]
            {
                Err(GpuError::BackendNotAvailable(
                    "wgpu feature not enabled".to_string()
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend() {
        assert_eq!("software".parse::<Backend>().unwrap(), Backend::Software);
        assert_eq!("WGPU".parse::<Backend>().unwrap(), Backend::Wgpu);
        assert!("opengl".parse::<Backend>().is_err());
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!("fast_pow".parse::<NumericBackend>().unwrap(), NumericBackend::FastPow);
        assert_eq!("native-gpu".parse::<NumericBackend>().unwrap(), NumericBackend::NativeGpu);
        assert_eq!(NumericBackend::FastPow.to_string(), "fast-pow");
    }

    #[test]
    fn test_software_always_available() {
        assert!(Backend::Software.is_available());
        let exec = create_executor(Backend::Software, NumericBackend::FastPow).unwrap();
        assert_eq!(exec.name(), "software");
        assert_eq!(exec.numeric_backend(), NumericBackend::FastPow);
    }

    #[test]
    fn test_select_is_concrete() {
        assert_eq!(Backend::Software.select(NumericBackend::Ieee), Backend::Software);
        assert_eq!(Backend::Wgpu.select(NumericBackend::FastPow), Backend::Wgpu);
        assert_ne!(Backend::Auto.select(NumericBackend::Ieee), Backend::Auto);
    }

    #[cfg(not(feature = "wgpu"))]
    #[test]
    fn test_auto_selects_software_without_wgpu() {
        if std::env::var(BACKEND_ENV).is_err() {
            assert_eq!(Backend::Auto.select(NumericBackend::Ieee), Backend::Software);
            assert_eq!(Backend::Auto.select(NumericBackend::FastPow), Backend::Software);
        }
    }

    #[cfg(not(feature = "wgpu"))]
    #[test]
    fn test_wgpu_needs_feature() {
        assert!(!Backend::Wgpu.is_available());
        assert!(matches!(
            create_executor(Backend::Wgpu, NumericBackend::NativeGpu),
            Err(GpuError::BackendNotAvailable(_))
        ));
    }
}
