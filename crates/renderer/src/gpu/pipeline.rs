use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::compile::{
    compile_shader, FADE_FRAGMENT, LINE_FRAGMENT, LINE_VERTEX, QUAD_VERTEX, TEXTURE_FRAGMENT,
};
use crate::error::CompositorError;
use crate::lines::{LineSet, LineVertex};

use super::scope;
use super::targets::OFFSCREEN_FORMAT;
use super::uniforms::{FadeUniforms, LineUniforms, QuadUniforms};

/// `SrcAlpha, One` on both colour and alpha.
pub(crate) const ADDITIVE_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

/// `src + dst * constant`: fades the loaded buffer towards the background.
pub(crate) const FADE_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::Constant,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent::REPLACE,
};

const SEGMENT_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

/// Layouts and the sampler shared by every pipeline.
pub(crate) struct PipelineLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
    pub sampler: wgpu::Sampler,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("feedback texture layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("feedback sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            uniform_layout,
            texture_layout,
            sampler,
        }
    }
}

/// A uniform buffer of `T` bound at group 0.
pub(crate) struct UniformSlot {
    buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl UniformSlot {
    fn new<T: Pod>(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        initial: &T,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(initial),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }

    pub fn write<T: Pod>(&self, queue: &wgpu::Queue, value: &T) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
    }
}

/// Draws a texture over the full target with a uniform tint.
pub(crate) struct TexturedQuad {
    pub pipeline: wgpu::RenderPipeline,
    pub uniforms: UniformSlot,
}

/// Paints the background over a loaded target using a blend constant.
pub(crate) struct FadeQuad {
    pub pipeline: wgpu::RenderPipeline,
    pub uniforms: UniformSlot,
}

/// Instanced quads, one per segment of the line set.
pub(crate) struct LineBatch {
    pub pipeline: wgpu::RenderPipeline,
    pub uniforms: UniformSlot,
    pub vertices: wgpu::Buffer,
    pub segments: u32,
}

/// Every pipeline the compositor needs, built once at startup.
pub(crate) struct CompositorPipelines {
    pub layouts: PipelineLayouts,
    /// Previous frame into the current feedback buffer.
    pub blur: TexturedQuad,
    /// Current feedback buffer onto the surface.
    pub present: TexturedQuad,
    /// Single-framebuffer substitute for `blur`.
    pub fade: FadeQuad,
    pub lines: LineBatch,
}

impl CompositorPipelines {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        line_set: &LineSet,
    ) -> Result<Self, CompositorError> {
        let quad_vertex = compile_shader(device, &QUAD_VERTEX)?;
        let texture_fragment = compile_shader(device, &TEXTURE_FRAGMENT)?;
        let fade_fragment = compile_shader(device, &FADE_FRAGMENT)?;
        let line_vertex = compile_shader(device, &LINE_VERTEX)?;
        let line_fragment = compile_shader(device, &LINE_FRAGMENT)?;

        scope::checked(device, "pipeline creation", || {
            let layouts = PipelineLayouts::new(device);

            let textured_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("textured quad pipeline layout"),
                bind_group_layouts: &[&layouts.uniform_layout, &layouts.texture_layout],
                push_constant_ranges: &[],
            });
            let uniform_only_layout =
                device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some("uniform-only pipeline layout"),
                    bind_group_layouts: &[&layouts.uniform_layout],
                    push_constant_ranges: &[],
                });

            let blur = TexturedQuad {
                pipeline: quad_pipeline(
                    device,
                    "blur pipeline",
                    &textured_layout,
                    &quad_vertex,
                    &texture_fragment,
                    OFFSCREEN_FORMAT,
                    Some(ADDITIVE_BLEND),
                ),
                uniforms: UniformSlot::new(
                    device,
                    &layouts.uniform_layout,
                    "blur uniforms",
                    &QuadUniforms::with_alpha(1.0),
                ),
            };

            let present = TexturedQuad {
                pipeline: quad_pipeline(
                    device,
                    "present pipeline",
                    &textured_layout,
                    &quad_vertex,
                    &texture_fragment,
                    surface_format,
                    None,
                ),
                uniforms: UniformSlot::new(
                    device,
                    &layouts.uniform_layout,
                    "present uniforms",
                    &QuadUniforms::with_alpha(1.0),
                ),
            };

            let fade = FadeQuad {
                pipeline: quad_pipeline(
                    device,
                    "fade pipeline",
                    &uniform_only_layout,
                    &quad_vertex,
                    &fade_fragment,
                    OFFSCREEN_FORMAT,
                    Some(FADE_BLEND),
                ),
                uniforms: UniformSlot::new(
                    device,
                    &layouts.uniform_layout,
                    "fade uniforms",
                    &FadeUniforms::new([0.0; 3]),
                ),
            };

            let lines = LineBatch {
                pipeline: line_pipeline(device, &uniform_only_layout, &line_vertex, &line_fragment),
                uniforms: UniformSlot::new(
                    device,
                    &layouts.uniform_layout,
                    "line uniforms",
                    &LineUniforms::zeroed(),
                ),
                vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("line vertices"),
                    contents: line_set.as_bytes(),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
                segments: line_set.segment_count(),
            };

            Self {
                layouts,
                blur,
                present,
                fade,
                lines,
            }
        })
    }
}

fn quad_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some("main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: triangle_list(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

fn line_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("line pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some("main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: (size_of::<LineVertex>() * 2) as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &SEGMENT_ATTRIBUTES,
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: triangle_list(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: OFFSCREEN_FORMAT,
                blend: Some(ADDITIVE_BLEND),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

fn triangle_list() -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode: None,
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}
