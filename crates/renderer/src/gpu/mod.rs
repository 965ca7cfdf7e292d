//! GPU side of the wallpaper.
//!
//! - `context` owns the wgpu instance, surface and device for the window and
//!   reconfigures the swapchain on resize.
//! - `scope` wraps GPU calls in error scopes so validation and allocation
//!   failures come back as `Result`s.
//! - `targets` holds the feedback framebuffers, their size policy and the
//!   ping-pong bookkeeping.
//! - `pipeline` and `uniforms` build the blur, fade, line and present
//!   pipelines together with their uniform blocks.
//! - `lifecycle` tracks which buffers exist and what each frame draws into.
//! - `compositor` runs the per-frame passes.
//! - `state` glues the surface to the compositor for `window`.

mod compositor;
mod context;
mod lifecycle;
mod pipeline;
pub(crate) mod scope;
mod state;
mod targets;
mod uniforms;

pub use compositor::Compositor;
pub(crate) use state::{FrameStatus, GpuState};
pub use targets::{framebuffer_size, PendingClear, PingPong};
