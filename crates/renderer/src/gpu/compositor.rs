use std::sync::Arc;

use glam::Mat4;

use crate::error::CompositorError;
use crate::lines::LineSet;
use crate::params::{CompatibilityFlags, ParameterSnapshot, RenderParameters};
use crate::projection::{line_transform, surface_projection};
use crate::timing::FrameTiming;

use super::lifecycle::{FramePlan, Lifecycle};
use super::pipeline::CompositorPipelines;
use super::scope;
use super::targets::{framebuffer_size, FramebufferPair, PendingClear};
use super::uniforms::{FadeUniforms, LineUniforms, QuadUniforms};

/// Two-pass feedback compositor.
///
/// Each frame blends the previous output into the current feedback buffer,
/// draws the line set on top and copies the result to the caller's surface
/// view. The compositor owns its framebuffers and reallocates them whenever
/// the surface size or the compatibility flags change.
pub struct Compositor {
    device: wgpu::Device,
    queue: wgpu::Queue,
    params: Arc<RenderParameters>,
    pipelines: CompositorPipelines,
    max_texture_dimension: u32,
    surface_size: (u32, u32),
    projection: Mat4,
    lifecycle: Lifecycle<FramebufferPair>,
}

impl Compositor {
    /// Compiles every shader and pipeline. Framebuffers are not allocated
    /// until [`Compositor::initialize`].
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        params: Arc<RenderParameters>,
        line_set: &LineSet,
    ) -> Result<Self, CompositorError> {
        let pipelines = CompositorPipelines::new(&device, surface_format, line_set)?;
        let max_texture_dimension = device.limits().max_texture_dimension_2d;
        tracing::debug!(
            ?surface_format,
            segments = line_set.segment_count(),
            max_texture_dimension,
            "compositor pipelines ready"
        );
        Ok(Self {
            device,
            queue,
            params,
            pipelines,
            max_texture_dimension,
            surface_size: (0, 0),
            projection: Mat4::IDENTITY,
            lifecycle: Lifecycle::Uninitialized,
        })
    }

    pub fn initialize(&mut self, width: u32, height: u32) -> Result<(), CompositorError> {
        tracing::info!(width, height, "initialising compositor");
        self.rebuild(width, height)
    }

    pub fn on_resize(&mut self, width: u32, height: u32) -> Result<(), CompositorError> {
        tracing::debug!(width, height, "compositor resize");
        self.rebuild(width, height)
    }

    /// Composites one frame at `now_millis` into `target`.
    ///
    /// On error nothing has been submitted for the frame and the caller must
    /// not present it.
    pub fn render_frame(
        &mut self,
        now_millis: u64,
        target: &wgpu::TextureView,
    ) -> Result<(), CompositorError> {
        let snapshot = self.params.snapshot();
        if self.lifecycle.needs_realloc(snapshot.compatibility)? {
            tracing::info!(flags = ?snapshot.compatibility, "compatibility flags changed");
            let (width, height) = self.surface_size;
            self.allocate(width, height, snapshot.compatibility)?;
        }

        let timing = FrameTiming::at(
            now_millis,
            snapshot.speed_factor,
            snapshot.rotation_speed_factor,
        );
        let (plan, pair) = self.lifecycle.begin_frame()?;
        scope::checked(&self.device, "render frame", || {
            encode_frame(
                &self.device,
                &self.queue,
                &self.pipelines,
                self.projection,
                pair,
                &plan,
                &snapshot,
                timing,
                target,
            )
        })?;

        self.lifecycle.finish_frame();
        Ok(())
    }

    /// Frees the framebuffers. The compositor cannot render afterwards.
    pub fn release(&mut self) {
        if !matches!(self.lifecycle, Lifecycle::Released) {
            tracing::info!("releasing compositor framebuffers");
        }
        self.lifecycle.release();
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle.is_ready()
    }

    pub fn framebuffer_size(&self) -> Option<(u32, u32)> {
        self.lifecycle.buffers().map(FramebufferPair::size)
    }

    #[cfg(test)]
    fn current_target(&self) -> Option<usize> {
        self.lifecycle.current()
    }

    fn rebuild(&mut self, width: u32, height: u32) -> Result<(), CompositorError> {
        self.lifecycle.ensure_not_released()?;
        let max_dimension = self.max_texture_dimension;
        if width > max_dimension || height > max_dimension {
            return Err(CompositorError::SurfaceTooLarge {
                width,
                height,
                max_dimension,
            });
        }
        self.surface_size = (width.max(1), height.max(1));
        self.projection = surface_projection(width, height);
        self.allocate(width, height, self.params.compatibility())
    }

    fn allocate(
        &mut self,
        width: u32,
        height: u32,
        flags: CompatibilityFlags,
    ) -> Result<(), CompositorError> {
        let size = framebuffer_size(width, height, flags, self.max_texture_dimension);
        let device = &self.device;
        let layouts = &self.pipelines.layouts;
        self.lifecycle.reallocate(flags, |slots| {
            FramebufferPair::new(
                device,
                &layouts.texture_layout,
                &layouts.sampler,
                size,
                slots,
            )
        })?;
        tracing::debug!(
            surface_width = width,
            surface_height = height,
            framebuffer_width = size.0,
            framebuffer_height = size.1,
            single = flags.single_framebuffer,
            "feedback buffers ready"
        );
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn encode_frame(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pipelines: &CompositorPipelines,
    projection: Mat4,
    pair: &FramebufferPair,
    plan: &FramePlan,
    snapshot: &ParameterSnapshot,
    timing: FrameTiming,
    target: &wgpu::TextureView,
) {
    let background = snapshot.background_color();
    let blur_alpha = snapshot.blur_alpha();

    pipelines
        .blur
        .uniforms
        .write(queue, &QuadUniforms::with_alpha(blur_alpha));
    pipelines
        .fade
        .uniforms
        .write(queue, &FadeUniforms::new(snapshot.background));
    pipelines.lines.uniforms.write(
        queue,
        &LineUniforms::new(
            line_transform(projection, timing.theta_degrees),
            snapshot,
            pair.size(),
            timing.delta,
        ),
    );

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("lines frame encoder"),
    });

    if let Some(PendingClear::Slot(index)) = plan.clear {
        clear_pass(&mut encoder, &pair.slot(index).view, background);
    }

    {
        let current = pair.slot(plan.current);
        let load = if plan.loads_previous() {
            wgpu::LoadOp::Load
        } else {
            wgpu::LoadOp::Clear(background)
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("feedback pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &current.view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        if plan.single {
            // A freshly cleared buffer has nothing to fade.
            if plan.loads_previous() {
                let alpha = blur_alpha as f64;
                pass.set_pipeline(&pipelines.fade.pipeline);
                pass.set_blend_constant(wgpu::Color {
                    r: alpha,
                    g: alpha,
                    b: alpha,
                    a: 1.0,
                });
                pass.set_bind_group(0, &pipelines.fade.uniforms.bind_group, &[]);
                pass.draw(0..3, 0..1);
            }
        } else {
            pass.set_pipeline(&pipelines.blur.pipeline);
            pass.set_bind_group(0, &pipelines.blur.uniforms.bind_group, &[]);
            pass.set_bind_group(1, &pair.slot(plan.source).bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        pass.set_pipeline(&pipelines.lines.pipeline);
        pass.set_bind_group(0, &pipelines.lines.uniforms.bind_group, &[]);
        pass.set_vertex_buffer(0, pipelines.lines.vertices.slice(..));
        pass.draw(0..6, 0..pipelines.lines.segments);
    }

    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("present pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(background),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&pipelines.present.pipeline);
        pass.set_bind_group(0, &pipelines.present.uniforms.bind_group, &[]);
        pass.set_bind_group(1, &pair.slot(plan.current).bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    queue.submit(Some(encoder.finish()));
}

fn clear_pass(encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView, color: wgpu::Color) {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("one-time clear"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(color),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Any adapter will do; machines without one skip the device tests.
    fn headless_device() -> Option<(wgpu::Device, wgpu::Queue)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok()?;
        pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("compositor test device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .ok()
    }

    fn offscreen_target(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("compositor test target"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TARGET_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    #[test]
    fn compositor_lifecycle_on_a_real_device() {
        let Some((device, queue)) = headless_device() else {
            eprintln!("no GPU adapter available; skipping");
            return;
        };
        let target = offscreen_target(&device, 64, 48);
        let params = Arc::new(RenderParameters::new());
        let mut compositor = Compositor::new(
            device,
            queue,
            TARGET_FORMAT,
            Arc::clone(&params),
            &LineSet::from_seed(7),
        )
        .unwrap();

        assert!(!compositor.is_ready());
        assert!(matches!(
            compositor.render_frame(0, &target),
            Err(CompositorError::NotReady("uninitialized"))
        ));

        compositor.initialize(64, 48).unwrap();
        assert!(compositor.is_ready());
        assert_eq!(compositor.framebuffer_size(), Some((32, 32)));

        let mut targets = Vec::new();
        for now in [0, 6_250, 12_500, 25_000] {
            targets.push(compositor.current_target().unwrap());
            compositor.render_frame(now, &target).unwrap();
        }
        assert_eq!(targets, vec![0, 1, 0, 1]);

        params.set_compatibility(CompatibilityFlags {
            smaller_textures: true,
            single_framebuffer: true,
            ..CompatibilityFlags::default()
        });
        compositor.render_frame(30_000, &target).unwrap();
        assert_eq!(compositor.framebuffer_size(), Some((16, 16)));
        for now in [31_000, 32_000] {
            assert_eq!(compositor.current_target(), Some(0));
            compositor.render_frame(now, &target).unwrap();
        }

        compositor.on_resize(200, 100).unwrap();
        assert_eq!(compositor.framebuffer_size(), Some((32, 32)));
        compositor.render_frame(40_000, &target).unwrap();

        compositor.release();
        assert!(!compositor.is_ready());
        assert_eq!(compositor.framebuffer_size(), None);
        assert!(matches!(
            compositor.render_frame(41_000, &target),
            Err(CompositorError::NotReady("released"))
        ));
        assert!(compositor.initialize(64, 48).is_err());
    }
}
