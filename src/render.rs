//! Render object handed to the host.
//!
//! The update kernel writes one [`InstanceGpu`](crate::buffer::InstanceGpu)
//! per slot; [`RenderObject`] draws them as instanced quads. The host owns
//! the render pass and calls [`RenderObject::draw`] inside it.
//!
//! ```ignore
//! let mut pass = encoder.begin_render_pass(&desc);
//! if let Some(object) = system.render_object() {
//!     object.draw(&mut pass);
//! }
//! ```
//!
//! The pipeline is generated per [`KernelVariant`]: appearance, lighting,
//! orientation and blending are compiled in, not branched on at runtime.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::buffer::InstanceGpu;
use crate::config::{Appearance, BlendMode, Lighting, Orientation};
use crate::features::KernelVariant;
use crate::normalize::NormalizedParams;

/// Depth format used when the host does not specify one.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Vertices per particle quad (two triangles).
pub const VERTICES_PER_QUAD: u32 = 6;

/// Formats of the pass the host will draw into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    /// Color attachment format.
    pub color_format: wgpu::TextureFormat,
    /// Depth attachment format, if the pass has one.
    pub depth_format: Option<wgpu::TextureFormat>,
}

impl Default for RenderTarget {
    fn default() -> Self {
        Self {
            color_format: wgpu::TextureFormat::Rgba8UnormSrgb,
            depth_format: Some(DEPTH_FORMAT),
        }
    }
}

/// Material settings of the render object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialParams {
    /// Blend mode.
    pub blending: BlendMode,
    /// Depth test against the scene.
    pub depth_test: bool,
    /// Draw order hint for the host.
    pub render_order: i32,
    /// Shadow pass hint for the host.
    pub cast_shadow: bool,
    /// Lighting model.
    pub lighting: Lighting,
    /// Sprite shape.
    pub appearance: Appearance,
    /// Quad orientation.
    pub orientation: Orientation,
    /// Soft particle fade distance.
    pub soft_distance: f32,
}

impl MaterialParams {
    /// Material for a parameter set.
    pub fn from_params(params: &NormalizedParams) -> Self {
        Self {
            blending: params.blending,
            depth_test: params.depth_test,
            render_order: params.render_order,
            cast_shadow: params.cast_shadow,
            lighting: params.lighting,
            appearance: params.appearance,
            orientation: params.orientation,
            soft_distance: params.soft_distance,
        }
    }

    /// Whether both materials compile to the same pipeline. `render_order`
    /// and `soft_distance` are hints and may differ.
    pub fn same_pipeline(&self, other: &Self) -> bool {
        self.blending == other.blending
            && self.depth_test == other.depth_test
            && self.cast_shadow == other.cast_shadow
            && self.lighting == other.lighting
            && self.appearance == other.appearance
            && self.orientation == other.orientation
    }
}

/// Camera and light data for the render shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct RenderUniforms {
    /// Projection * view.
    pub view_proj: [[f32; 4]; 4],
    /// xyz = camera right in world space.
    pub camera_right: [f32; 4],
    /// xyz = camera up in world space.
    pub camera_up: [f32; 4],
    /// xyz = camera forward, w = soft distance.
    pub camera_forward: [f32; 4],
    /// xyz = direction toward the light.
    pub light_dir: [f32; 4],
}

impl Default for RenderUniforms {
    fn default() -> Self {
        Self::from_camera(Mat4::IDENTITY, Mat4::IDENTITY, 0.0)
    }
}

impl RenderUniforms {
    /// Derive the billboard basis from a view matrix.
    pub fn from_camera(view: Mat4, proj: Mat4, soft_distance: f32) -> Self {
        let world = view.inverse();
        let right = world.x_axis.truncate().normalize_or_zero();
        let up = world.y_axis.truncate().normalize_or_zero();
        let forward = (-world.z_axis.truncate()).normalize_or_zero();
        let light = Vec3::new(0.3, 1.0, 0.5).normalize();
        Self {
            view_proj: (proj * view).to_cols_array_2d(),
            camera_right: right.extend(0.0).to_array(),
            camera_up: up.extend(0.0).to_array(),
            camera_forward: forward.extend(soft_distance).to_array(),
            light_dir: light.extend(0.0).to_array(),
        }
    }
}

/// Blend state for a blend mode.
pub fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    match mode {
        BlendMode::Alpha => wgpu::BlendState::ALPHA_BLENDING,
        BlendMode::Additive => wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        },
        BlendMode::Multiply => wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::Dst,
                dst_factor: wgpu::BlendFactor::Zero,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::DstAlpha,
                dst_factor: wgpu::BlendFactor::Zero,
                operation: wgpu::BlendOperation::Add,
            },
        },
    }
}

fn orientation_wgsl(orientation: Orientation) -> &'static str {
    match orientation {
        Orientation::Billboard => {
            r#"    let offset = (render.camera_right.xyz * rotated.x + render.camera_up.xyz * rotated.y) * size;"#
        }
        Orientation::VelocityAligned => {
            r#"    var offset = (render.camera_right.xyz * rotated.x + render.camera_up.xyz * rotated.y) * size;
    let speed = length(inst.velocity.xyz);
    if speed > 0.0001 {
        let dir = inst.velocity.xyz / speed;
        let side = cross(dir, render.camera_forward.xyz);
        let side_len = length(side);
        if side_len > 0.0001 {
            let stretch = 1.0 + min(speed * 0.1, 4.0);
            offset = (side / side_len * corner.x + dir * corner.y * stretch) * size;
        }
    }"#
        }
        Orientation::Horizontal => {
            r#"    let offset = vec3<f32>(rotated.x, 0.0, rotated.y) * size;"#
        }
    }
}

fn appearance_wgsl(appearance: Appearance) -> &'static str {
    match appearance {
        Appearance::Default => "    var alpha = in.color.a;",
        Appearance::Gradient => {
            r#"    let dist = length(in.uv);
    if dist > 1.0 {
        discard;
    }
    var alpha = in.color.a * (1.0 - smoothstep(0.0, 1.0, dist));"#
        }
        Appearance::Circular => {
            r#"    let dist = length(in.uv);
    if dist > 1.0 {
        discard;
    }
    var alpha = in.color.a;"#
        }
    }
}

fn lighting_wgsl(lighting: Lighting) -> &'static str {
    match lighting {
        Lighting::Basic => "    var rgb = in.color.rgb;",
        Lighting::Standard => {
            r#"    let r2 = min(dot(in.uv, in.uv), 1.0);
    let normal = normalize(
        render.camera_right.xyz * in.uv.x
        + render.camera_up.xyz * in.uv.y
        - render.camera_forward.xyz * sqrt(1.0 - r2)
    );
    let diffuse = max(dot(normal, render.light_dir.xyz), 0.0);
    var rgb = in.color.rgb * (0.3 + 0.7 * diffuse);"#
        }
    }
}

/// Generate the render shader for a variant.
pub fn generate_render_shader(variant: &KernelVariant) -> String {
    let output = match variant.blending {
        // Multiply blends toward white where the sprite is transparent.
        BlendMode::Multiply => "    return vec4<f32>(mix(vec3<f32>(1.0), rgb, alpha), 1.0);",
        BlendMode::Alpha | BlendMode::Additive => "    return vec4<f32>(rgb, alpha);",
    };

    format!(
        r#"// sparkfield render shader
struct RenderUniforms {{
    view_proj: mat4x4<f32>,
    camera_right: vec4<f32>,
    camera_up: vec4<f32>,
    camera_forward: vec4<f32>,
    light_dir: vec4<f32>,
}};

@group(0) @binding(0) var<uniform> render: RenderUniforms;

struct InstanceInput {{
    @location(0) position_size: vec4<f32>,
    @location(1) color: vec4<f32>,
    @location(2) rotation_alive: vec4<f32>,
    @location(3) velocity: vec4<f32>,
}};

struct VertexOutput {{
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
}};

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32, inst: InstanceInput) -> VertexOutput {{
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0)
    );
    let corner = corners[vertex_index % 6u];

    var out: VertexOutput;
    out.uv = corner;
    out.color = inst.color;

    if inst.rotation_alive.w < 0.5 {{
        out.clip_position = vec4<f32>(2.0, 2.0, 2.0, 1.0);
        return out;
    }}

    let size = inst.position_size.w * 0.5;
    let angle = inst.rotation_alive.z;
    let c = cos(angle);
    let s = sin(angle);
    let rotated = vec2<f32>(corner.x * c - corner.y * s, corner.x * s + corner.y * c);
{orientation}

    let world = inst.position_size.xyz + offset;
    out.clip_position = render.view_proj * vec4<f32>(world, 1.0);
    return out;
}}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
{appearance}
{lighting}
    if alpha <= 0.001 {{
        discard;
    }}
{output}
}}
"#,
        orientation = orientation_wgsl(variant.orientation),
        appearance = appearance_wgsl(variant.appearance),
        lighting = lighting_wgsl(variant.lighting),
        output = output,
    )
}

/// Instanced quad renderer for one particle system.
pub struct RenderObject {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    instance_count: u32,
    material: MaterialParams,
    variant: KernelVariant,
}

impl RenderObject {
    /// Create the instance buffer and pipeline for `capacity` particles.
    pub fn new(
        device: &wgpu::Device,
        target: &RenderTarget,
        variant: KernelVariant,
        material: MaterialParams,
        capacity: u32,
    ) -> Self {
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Instance Buffer"),
            size: (capacity.max(1) as usize * std::mem::size_of::<InstanceGpu>())
                as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Render Uniforms"),
            size: std::mem::size_of::<RenderUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Render Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Render Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader_src = generate_render_shader(&variant);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Render Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_src.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Render Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let attributes = [
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x4, // position + size
            },
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x4, // color
            },
            wgpu::VertexAttribute {
                offset: 32,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4, // rotation + alive
            },
            wgpu::VertexAttribute {
                offset: 48,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x4, // velocity
            },
        ];

        let depth_stencil = target.depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: false,
            depth_compare: if material.depth_test {
                wgpu::CompareFunction::Less
            } else {
                wgpu::CompareFunction::Always
            },
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<InstanceGpu>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &attributes,
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target.color_format,
                    blend: Some(blend_state(material.blending)),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            bind_group,
            uniform_buffer,
            instance_buffer,
            instance_count: capacity.max(1),
            material,
            variant,
        }
    }

    /// Record the draw into a host render pass.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.instance_buffer.slice(..));
        pass.draw(0..VERTICES_PER_QUAD, 0..self.instance_count);
    }

    /// Upload camera data.
    pub fn write_uniforms(&self, queue: &wgpu::Queue, uniforms: &RenderUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Per-slot render data written by the update kernel.
    pub fn instance_buffer(&self) -> &wgpu::Buffer {
        &self.instance_buffer
    }

    /// Instances drawn (pool capacity).
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Material settings.
    pub fn material(&self) -> &MaterialParams {
        &self.material
    }

    /// Refresh the host hints of the material. Pipeline settings only
    /// change through a rebuild and are kept.
    pub fn set_material(&mut self, material: MaterialParams) {
        if !self.material.same_pipeline(&material) {
            log::warn!("render material change ignored; pipeline settings need a rebuild");
        }
        self.material.render_order = material.render_order;
        self.material.soft_distance = material.soft_distance;
    }

    /// Variant the pipeline was generated for.
    pub fn variant(&self) -> &KernelVariant {
        &self.variant
    }

    /// Release GPU memory.
    pub fn destroy(&self) {
        self.instance_buffer.destroy();
        self.uniform_buffer.destroy();
    }
}
