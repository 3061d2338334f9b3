//! GPU context and device management

use std::sync::Arc;
use wgpu::{Device, Queue, Instance, DeviceDescriptor, Features, Limits};

use crate::{GpuError, GpuResult};

/// GPU context holding device and queue
pub struct GpuContext {
    pub(crate) device: Arc<Device>,
    pub(crate) queue: Arc<Queue>,
    adapter_info: wgpu::AdapterInfo,
    max_workgroups: u32,
}

fn instance() -> Instance {
    Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

fn adapter_options(power: wgpu::PowerPreference) -> wgpu::RequestAdapterOptions<'static, 'static> {
    wgpu::RequestAdapterOptions {
        power_preference: power,
        compatible_surface: None,
        force_fallback_adapter: false,
    }
}

impl GpuContext {
    /// Create new GPU context with default settings
    pub fn new() -> GpuResult<Self> {
        Self::with_power_preference(wgpu::PowerPreference::HighPerformance)
    }

    /// Create context with power preference
    pub fn with_power_preference(power: wgpu::PowerPreference) -> GpuResult<Self> {
        pollster::block_on(Self::new_async(power))
    }

    /// Check if any adapter can be opened.
    pub fn is_available() -> bool {
        pollster::block_on(async {
            instance()
                .request_adapter(&adapter_options(wgpu::PowerPreference::HighPerformance))
                .await
                .is_some()
        })
    }

    /// Async context creation
    async fn new_async(power: wgpu::PowerPreference) -> GpuResult<Self> {
        let adapter = instance()
            .request_adapter(&adapter_options(power))
            .await
            .ok_or(GpuError::NoAdapter)?;

        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("vfx-gpu"),
                    required_features: Features::empty(),
                    required_limits: Limits::downlevel_defaults(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| GpuError::DeviceCreation(e.to_string()))?;

        let max_workgroups = device.limits().max_compute_workgroups_per_dimension;

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info,
            max_workgroups,
        })
    }

    /// Get adapter info (GPU name, vendor, etc.)
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    /// Get device name
    pub fn device_name(&self) -> &str {
        &self.adapter_info.name
    }

    /// Get backend type (Vulkan, DX12, Metal, etc.)
    pub fn backend(&self) -> wgpu::Backend {
        self.adapter_info.backend
    }

    /// Largest 1D dispatch, in workgroups.
    pub fn max_workgroups(&self) -> u32 {
        self.max_workgroups
    }

    /// Compile a compute pipeline, turning validation errors into
    /// [`GpuError::ShaderCompilation`].
    pub(crate) fn create_pipeline(&self, source: &str, entry_point: &str) -> GpuResult<wgpu::ComputePipeline> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("parity_shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let pipeline = self.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("parity_pipeline"),
            layout: None, // Auto layout
            module: &module,
            entry_point: Some(entry_point),
            compilation_options: Default::default(),
            cache: None,
        });

        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(GpuError::ShaderCompilation(err.to_string())),
            None => Ok(pipeline),
        }
    }

    /// Submit work and wait for completion
    pub(crate) fn submit_and_wait(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
        self.device.poll(wgpu::Maintain::Wait);
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("device", &self.adapter_info.name)
            .field("backend", &self.adapter_info.backend)
            .finish()
    }
}
