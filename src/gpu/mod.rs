//! GPU device and per-system resources.
//!
//! [`GpuResources`] is the complete set created for one structural
//! configuration: particle, tint, instance and uniform buffers, the curve
//! texture, the update kernel and the render object. A set is built whole
//! inside error scopes and destroyed whole; it is never patched
//! structurally.

use std::sync::Arc;

use bytemuck::Pod;

use crate::buffer::{InstanceGpu, ParticleGpu, SlotRange, TintGpu};
use crate::curve::{CurveTexture, DEFAULT_CURVE_RESOLUTION};
use crate::emission::SpawnBatch;
use crate::error::GpuError;
use crate::features::{FeatureFlags, KernelVariant};
use crate::kernel::{binding, generate_kernel, workgroup_count};
use crate::render::{MaterialParams, RenderObject, RenderTarget};
use crate::uniforms::SimUniforms;

/// Shared device and queue.
#[derive(Debug, Clone)]
pub struct GpuContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl GpuContext {
    /// Wrap a device and queue owned by the host.
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self { device, queue }
    }

    /// Create a device without a surface.
    pub fn headless() -> Result<Self, GpuError> {
        pollster::block_on(Self::headless_async())
    }

    async fn headless_async() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::default();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("sparkfield device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        Ok(Self::new(Arc::new(device), Arc::new(queue)))
    }

    /// The device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

/// Everything one structural configuration needs on the GPU.
pub struct GpuResources {
    capacity: u32,
    particle_buffer: wgpu::Buffer,
    tint_buffer: Option<wgpu::Buffer>,
    uniform_buffer: wgpu::Buffer,
    curve_texture: wgpu::Texture,
    compute_pipeline: wgpu::ComputePipeline,
    compute_bind_group: wgpu::BindGroup,
    render: RenderObject,
}

impl GpuResources {
    /// Build a complete set, or report why the device refused it.
    pub fn new(
        ctx: &GpuContext,
        target: &RenderTarget,
        variant: KernelVariant,
        material: MaterialParams,
        capacity: u32,
        uniforms: &SimUniforms,
        curves: &CurveTexture,
    ) -> Result<Self, GpuError> {
        let device = ctx.device();
        let what = format!("particle resources [{}] x{}", variant.flags.label(), capacity);

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let resources = Self::create(ctx, target, variant, material, capacity, uniforms, curves);

        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());

        // A rejected set may hold invalid handles; dropping it lets wgpu
        // release whatever was created once staged writes retire.
        if let Some(err) = out_of_memory {
            drop(resources);
            log::warn!("{what}: {err}");
            return Err(GpuError::OutOfMemory(what));
        }
        if let Some(err) = validation {
            drop(resources);
            return Err(GpuError::Validation {
                what,
                message: err.to_string(),
            });
        }

        log::info!("created {what}");
        Ok(resources)
    }

    fn create(
        ctx: &GpuContext,
        target: &RenderTarget,
        variant: KernelVariant,
        material: MaterialParams,
        capacity: u32,
        uniforms: &SimUniforms,
        curves: &CurveTexture,
    ) -> Self {
        let device = ctx.device();
        let capacity = capacity.max(1);
        let per_particle_color = variant.flags.contains(FeatureFlags::PER_PARTICLE_COLOR);

        let particle_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Buffer"),
            size: (capacity as usize * std::mem::size_of::<ParticleGpu>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let tint_buffer = per_particle_color.then(|| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Particle Tint Buffer"),
                size: (capacity as usize * std::mem::size_of::<TintGpu>()) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Simulation Uniforms"),
            size: std::mem::size_of::<SimUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let curve_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Curve Texture"),
            size: wgpu::Extent3d {
                width: DEFAULT_CURVE_RESOLUTION,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let curve_view = curve_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let render = RenderObject::new(device, target, variant, material, capacity);

        let storage_entry = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let mut layout_entries = vec![
            storage_entry(binding::PARTICLES, false),
            wgpu::BindGroupLayoutEntry {
                binding: binding::UNIFORMS,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            storage_entry(binding::INSTANCES, false),
            wgpu::BindGroupLayoutEntry {
                binding: binding::CURVES,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
        ];
        if per_particle_color {
            layout_entries.push(storage_entry(binding::TINTS, true));
        }

        let compute_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Particle Kernel Bind Group Layout"),
                entries: &layout_entries,
            });

        let mut group_entries = vec![
            wgpu::BindGroupEntry {
                binding: binding::PARTICLES,
                resource: particle_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: binding::UNIFORMS,
                resource: uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: binding::INSTANCES,
                resource: render.instance_buffer().as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: binding::CURVES,
                resource: wgpu::BindingResource::TextureView(&curve_view),
            },
        ];
        if let Some(tints) = &tint_buffer {
            group_entries.push(wgpu::BindGroupEntry {
                binding: binding::TINTS,
                resource: tints.as_entire_binding(),
            });
        }

        let compute_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Kernel Bind Group"),
            layout: &compute_bind_group_layout,
            entries: &group_entries,
        });

        let kernel_src = generate_kernel(variant.flags);
        let kernel = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Update Kernel"),
            source: wgpu::ShaderSource::Wgsl(kernel_src.into()),
        });

        let compute_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Particle Kernel Pipeline Layout"),
                bind_group_layouts: &[&compute_bind_group_layout],
                push_constant_ranges: &[],
            });

        let compute_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Particle Kernel Pipeline"),
            layout: Some(&compute_pipeline_layout),
            module: &kernel,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        let resources = Self {
            capacity,
            particle_buffer,
            tint_buffer,
            uniform_buffer,
            curve_texture,
            compute_pipeline,
            compute_bind_group,
            render,
        };
        resources.write_uniforms(ctx.queue(), uniforms);
        resources.write_curves(ctx.queue(), curves);
        resources
    }

    /// Upload freshly spawned particles into their claimed slots.
    ///
    /// `batch` is in slot order of `range`; a wrapped range is written as
    /// two segments.
    pub fn write_spawn(&self, queue: &wgpu::Queue, range: &SlotRange, batch: &SpawnBatch) {
        let mut consumed = 0usize;
        for (start, len) in range.segments() {
            let len = len as usize;
            let Some(particles) = batch.particles.get(consumed..consumed + len) else {
                log::warn!("spawn batch shorter than its slot range");
                return;
            };
            let offset = start as usize * std::mem::size_of::<ParticleGpu>();
            queue.write_buffer(
                &self.particle_buffer,
                offset as wgpu::BufferAddress,
                bytemuck::cast_slice(particles),
            );

            if let (Some(buffer), Some(tints)) =
                (&self.tint_buffer, batch.tints.get(consumed..consumed + len))
            {
                let offset = start as usize * std::mem::size_of::<TintGpu>();
                queue.write_buffer(buffer, offset as wgpu::BufferAddress, bytemuck::cast_slice(tints));
            }
            consumed += len;
        }
    }

    /// Upload simulation uniforms.
    pub fn write_uniforms(&self, queue: &wgpu::Queue, uniforms: &SimUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Upload baked curves, resampling to the texture width if needed.
    pub fn write_curves(&self, queue: &wgpu::Queue, curves: &CurveTexture) {
        let resampled;
        let curves = if curves.resolution() == DEFAULT_CURVE_RESOLUTION {
            curves
        } else {
            resampled = curves.resampled(DEFAULT_CURVE_RESOLUTION);
            &resampled
        };

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.curve_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            curves.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(DEFAULT_CURVE_RESOLUTION * 16),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width: DEFAULT_CURVE_RESOLUTION,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Zero every slot, killing all particles.
    pub fn clear(&self, ctx: &GpuContext) {
        let mut encoder = ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Particle Clear Encoder"),
            });
        encoder.clear_buffer(&self.particle_buffer, 0, None);
        encoder.clear_buffer(self.render.instance_buffer(), 0, None);
        if let Some(tints) = &self.tint_buffer {
            encoder.clear_buffer(tints, 0, None);
        }
        ctx.queue().submit(std::iter::once(encoder.finish()));
    }

    /// Run the update kernel over every slot.
    pub fn dispatch(&self, ctx: &GpuContext) {
        let mut encoder = ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Particle Update Encoder"),
            });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Particle Update Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.compute_pipeline);
            compute_pass.set_bind_group(0, &self.compute_bind_group, &[]);
            compute_pass.dispatch_workgroups(workgroup_count(self.capacity), 1, 1);
        }
        ctx.queue().submit(std::iter::once(encoder.finish()));
    }

    /// Copy the particle records back to the CPU. Blocks until the GPU is
    /// idle.
    pub fn read_particles(&self, ctx: &GpuContext) -> Result<Vec<ParticleGpu>, GpuError> {
        read_buffer(ctx, &self.particle_buffer, self.capacity as usize)
    }

    /// Copy the render instances back to the CPU. Blocks until the GPU is
    /// idle.
    pub fn read_instances(&self, ctx: &GpuContext) -> Result<Vec<InstanceGpu>, GpuError> {
        read_buffer(ctx, self.render.instance_buffer(), self.capacity as usize)
    }

    /// The render object drawing this set.
    pub fn render(&self) -> &RenderObject {
        &self.render
    }

    /// Mutable render object, for material refreshes.
    pub fn render_mut(&mut self) -> &mut RenderObject {
        &mut self.render
    }

    /// Release all GPU memory held by this set.
    ///
    /// Writes still staged on the queue for these resources are submitted
    /// first; a destroyed target would fail the next submit.
    pub fn destroy(&self, ctx: &GpuContext) {
        ctx.queue().submit(std::iter::empty());
        ctx.device().poll(wgpu::Maintain::Wait);

        self.particle_buffer.destroy();
        if let Some(tints) = &self.tint_buffer {
            tints.destroy();
        }
        self.uniform_buffer.destroy();
        self.curve_texture.destroy();
        self.render.destroy();
    }
}

fn read_buffer<T: Pod>(
    ctx: &GpuContext,
    source: &wgpu::Buffer,
    count: usize,
) -> Result<Vec<T>, GpuError> {
    let device = ctx.device();
    let size = (count * std::mem::size_of::<T>()) as wgpu::BufferAddress;

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Particle Readback Buffer"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Particle Readback Encoder"),
    });
    encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
    ctx.queue().submit(std::iter::once(encoder.finish()));

    let (tx, rx) = crossbeam_channel::bounded(1);
    let slice = staging.slice(..);
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);

    match rx.recv() {
        Ok(Ok(())) => {}
        Ok(Err(err)) => return Err(GpuError::BufferMapping(err.to_string())),
        Err(_) => return Err(GpuError::BufferMapping("map callback never ran".into())),
    }

    let data = {
        let mapped = slice.get_mapped_range();
        bytemuck::pod_collect_to_vec::<u8, T>(&mapped)
    };
    staging.unmap();
    staging.destroy();
    Ok(data)
}
