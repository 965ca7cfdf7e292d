use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::lines::LineSet;
use crate::params::RenderParameters;
use crate::types::AdapterProfile;

use super::compositor::Compositor;
use super::context::GpuContext;

const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Outcome of one redraw request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameStatus {
    Presented,
    /// The surface was lost, outdated or timed out; nothing was drawn.
    Skipped,
}

/// Surface plus compositor for the preview window.
pub(crate) struct GpuState {
    compositor: Compositor,
    context: GpuContext,
    // Dropped after the surface.
    _window: Arc<Window>,
    frames_since_stats: u32,
    stats_started: Instant,
}

impl GpuState {
    pub(crate) fn new(
        window: Arc<Window>,
        params: Arc<RenderParameters>,
        line_set: &LineSet,
        low_power: bool,
    ) -> Result<Self> {
        let size = window.inner_size();
        let context = GpuContext::new(window.as_ref(), size, low_power)?;
        let mut compositor = Compositor::new(
            context.device.clone(),
            context.queue.clone(),
            context.surface_format,
            params,
            line_set,
        )
        .context("failed to build compositor pipelines")?;
        compositor
            .initialize(context.size.width, context.size.height)
            .context("failed to allocate feedback framebuffers")?;

        Ok(Self {
            compositor,
            context,
            _window: window,
            frames_since_stats: 0,
            stats_started: Instant::now(),
        })
    }

    pub(crate) fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) -> Result<()> {
        if new_size.width == 0 || new_size.height == 0 {
            debug!("ignoring zero-sized resize");
            return Ok(());
        }
        self.context.resize(new_size);
        self.compositor
            .on_resize(new_size.width, new_size.height)
            .context("failed to reallocate feedback framebuffers")
    }

    pub(crate) fn render(&mut self, now_millis: u64) -> Result<FrameStatus> {
        let frame = match self.context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("surface lost or outdated; reconfiguring");
                self.context.reconfigure();
                return Ok(FrameStatus::Skipped);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timeout; retrying next frame");
                return Ok(FrameStatus::Skipped);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(anyhow!("surface out of memory"));
            }
            Err(other) => {
                warn!(error = %other, "surface error; retrying next frame");
                return Ok(FrameStatus::Skipped);
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.compositor
            .render_frame(now_millis, &view)
            .context("failed to composite frame")?;
        frame.present();
        self.record_frame();
        Ok(FrameStatus::Presented)
    }

    pub(crate) fn release(&mut self) {
        self.compositor.release();
    }

    fn record_frame(&mut self) {
        self.frames_since_stats += 1;
        let elapsed = self.stats_started.elapsed();
        if elapsed >= STATS_INTERVAL {
            let fps = self.frames_since_stats as f32 / elapsed.as_secs_f32();
            debug!(
                fps,
                framebuffer = ?self.compositor.framebuffer_size(),
                "render stats"
            );
            self.frames_since_stats = 0;
            self.stats_started = Instant::now();
        }
    }
}
