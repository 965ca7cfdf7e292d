//! Renderer crate for the lines wallpaper.
//!
//! A cloud of random segments scrolls through depth and slowly rotates; every
//! frame is blended into the previous one so the lines leave trails. The flow
//! is:
//!
//! ```text
//!   settings watcher ──▶ RenderParameters (atomics)
//!                                 │ snapshot per frame
//!   Renderer::run ──▶ winit loop ──▶ Compositor::render_frame(now_millis)
//!                                     ├─ feedback pass: previous frame × blur alpha
//!                                     │                 + line set (additive)
//!                                     └─ present pass:  current buffer → surface
//! ```
//!
//! Everything that does not need a device (parameter mapping, frame timing,
//! projection, framebuffer sizing, ping-pong bookkeeping) lives in plain
//! modules so it can be tested without a GPU.

mod compile;
mod error;
mod gpu;
mod lines;
mod params;
mod projection;
mod runtime;
mod timing;
mod types;
mod window;

use std::sync::Arc;

use anyhow::Result;

pub use error::CompositorError;
pub use gpu::{framebuffer_size, Compositor, PendingClear, PingPong};
pub use lines::{LineSet, LineVertex, LINE_VERTEX_COUNT};
pub use params::{
    scaled_factor, CompatibilityFlags, ParameterSnapshot, RenderParameters, BACKGROUND_SCALE,
    BLUR_BASE, BLUR_MULTIPLIER, BRIGHTNESS_BASE, DEFAULT_MULTIPLIER, LINE_WIDTH_BASE,
    MIN_LINE_WIDTH_FACTOR,
};
pub use projection::{line_transform, surface_projection, view_matrix};
pub use runtime::{
    time_source_for_policy, BoxedTimeSource, FixedTimeSource, FrameScheduler, RenderPolicy,
    SystemTimeSource, TimeSource,
};
pub use timing::{sawtooth, FrameTiming, ROTATION_PERIOD_MS, SCROLL_PERIOD_MS};
pub use types::{AdapterProfile, RendererConfig};

/// Entry point used by the binary: owns the configuration and the shared
/// parameter block.
pub struct Renderer {
    config: RendererConfig,
    params: Arc<RenderParameters>,
}

impl Renderer {
    pub fn new(config: RendererConfig, params: Arc<RenderParameters>) -> Self {
        Self { config, params }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn parameters(&self) -> &Arc<RenderParameters> {
        &self.params
    }

    /// Blocks until the preview window closes.
    pub fn run(&mut self) -> Result<()> {
        window::run_window(&self.config, Arc::clone(&self.params))
    }
}
