//! wgpu backend implementation.
//!
//! Compiles generated WGSL, uploads the domain as a storage buffer, dispatches
//! one invocation per pixel and reads the result back through a staging buffer.

use bytemuck::{Pod, Zeroable};
use tracing::{debug, trace};
use vfx_ocio::{GpuShader, ShaderBody};
use wgpu::util::DeviceExt;

use super::{NumericBackend, ShaderExecutor};
use crate::context::GpuContext;
use crate::{GpuError, GpuResult};

/// Dimensions uniform: [count, 0, 0, 0]
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct DimsUniform {
    dims: [u32; 4],
}

/// Executor on a wgpu device. One per thread.
#[derive(Debug)]
pub struct WgpuExecutor {
    ctx: GpuContext,
}

impl WgpuExecutor {
    /// Opens the default adapter.
    pub fn new() -> GpuResult<Self> {
        let ctx = GpuContext::new()?;
        debug!(device = ctx.device_name(), backend = ?ctx.backend(), "wgpu executor");
        Ok(Self { ctx })
    }

    /// Underlying context.
    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    fn storage_buffer(&self, label: &str, contents: &[u8]) -> wgpu::Buffer {
        self.ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: wgpu::BufferUsages::STORAGE,
        })
    }

    /// Copy `buffer` to a staging buffer and map it.
    fn download(&self, buffer: &wgpu::Buffer, size: u64) -> GpuResult<Vec<[f32; 4]>> {
        let staging = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging_buffer"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.ctx.device.create_command_encoder(&Default::default());
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        self.ctx.submit_and_wait(encoder);

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| { let _ = tx.send(r); });
        self.ctx.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| GpuError::OperationFailed("Map channel closed".into()))?
            .map_err(|e| GpuError::OperationFailed(format!("Map failed: {e}")))?;

        let data = slice.get_mapped_range();
        let result: Vec<[f32; 4]> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();

        Ok(result)
    }
}

impl ShaderExecutor for WgpuExecutor {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn numeric_backend(&self) -> NumericBackend {
        NumericBackend::NativeGpu
    }

    fn run(&self, shader: &GpuShader, domain: &[[f32; 4]]) -> GpuResult<Vec<[f32; 4]>> {
        if domain.is_empty() {
            return Ok(Vec::new());
        }

        let count = u32::try_from(domain.len())
            .map_err(|_| GpuError::BufferCreation(format!("{} pixels exceed u32", domain.len())))?;
        let workgroups = count.div_ceil(shader.workgroup_size());
        if workgroups > self.ctx.max_workgroups() {
            return Err(GpuError::BufferCreation(format!(
                "{count} pixels need {workgroups} workgroups (limit {})",
                self.ctx.max_workgroups()
            )));
        }

        let pipeline = self.ctx.create_pipeline(shader.source(), shader.entry_point())?;
        trace!(count, workgroups, "wgpu dispatch");

        let device = &self.ctx.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let size = std::mem::size_of_val(domain) as u64;
        let src = self.storage_buffer("src_buffer", bytemuck::cast_slice(domain));
        let dst = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("dst_buffer"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let dims = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("dims_uniform"),
            contents: bytemuck::bytes_of(&DimsUniform { dims: [count, 0, 0, 0] }),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let lut_buffers = match shader.body() {
            ShaderBody::Lut(lut) => Some((
                self.storage_buffer("lut_buffer", bytemuck::cast_slice(&lut.lattice)),
                self.storage_buffer("alpha_lut_buffer", bytemuck::cast_slice(&lut.alpha)),
            )),
            ShaderBody::Analytic(_) => None,
        };

        let mut entries = vec![
            wgpu::BindGroupEntry { binding: 0, resource: src.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: dst.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 2, resource: dims.as_entire_binding() },
        ];
        if let Some((lut, alpha)) = &lut_buffers {
            entries.push(wgpu::BindGroupEntry { binding: 3, resource: lut.as_entire_binding() });
            entries.push(wgpu::BindGroupEntry { binding: 4, resource: alpha.as_entire_binding() });
        }

        let layout = pipeline.get_bind_group_layout(0);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("parity_bind_group"),
            layout: &layout,
            entries: &entries,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("compute_encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("compute_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(workgroups, 1, 1);
        }
        self.ctx.submit_and_wait(encoder);

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(GpuError::OperationFailed(err.to_string()));
        }

        let out = self.download(&dst, size)?;
        if out.len() != domain.len() {
            return Err(GpuError::BufferSizeMismatch { expected: domain.len(), actual: out.len() });
        }
        Ok(out)
    }
}
