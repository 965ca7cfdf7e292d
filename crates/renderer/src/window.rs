use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use tracing::{error, info};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::gpu::{FrameStatus, GpuState};
use crate::lines::LineSet;
use crate::params::RenderParameters;
use crate::runtime::{time_source_for_policy, BoxedTimeSource, FrameScheduler, RenderPolicy};
use crate::types::RendererConfig;

/// Frame pacing plus the clock frames are evaluated at.
pub(crate) struct RenderPolicyDriver {
    scheduler: FrameScheduler,
    time_source: BoxedTimeSource,
}

impl RenderPolicyDriver {
    pub(crate) fn new(policy: &RenderPolicy) -> Self {
        Self {
            scheduler: FrameScheduler::new(policy),
            time_source: time_source_for_policy(policy),
        }
    }

    pub(crate) fn now_millis(&mut self) -> u64 {
        self.time_source.now_millis()
    }

    pub(crate) fn mark_rendered(&mut self) {
        self.scheduler.mark_rendered();
    }

    pub(crate) fn ready_for_frame(&self, now: Instant) -> bool {
        self.scheduler.ready_for_frame(now)
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }
}

/// Opens the preview window and drives the compositor until the window is
/// closed or a fatal GPU error occurs.
pub(crate) fn run_window(config: &RendererConfig, params: Arc<RenderParameters>) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);

    let line_set = match config.line_seed {
        Some(seed) => LineSet::from_seed(seed),
        None => LineSet::from_entropy(),
    };
    let mut state = GpuState::new(window.clone(), params, &line_set, config.low_power)
        .map_err(|err| anyhow!("failed to initialise window renderer: {err:#}"))?;
    info!(
        adapter = %state.adapter_profile().name,
        width = state.size().width,
        height = state.size().height,
        "lines preview running"
    );

    let mut driver = RenderPolicyDriver::new(&config.policy);
    let mut failure: Option<anyhow::Error> = None;

    let run_result = event_loop.run(|event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                elwt.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Err(err) = state.resize(new_size) {
                    error!("fatal resize error: {err:#}");
                    failure = Some(err);
                    elwt.exit();
                }
            }
            WindowEvent::RedrawRequested => {
                let now_millis = driver.now_millis();
                match state.render(now_millis) {
                    Ok(FrameStatus::Presented) => driver.mark_rendered(),
                    Ok(FrameStatus::Skipped) => {}
                    Err(err) => {
                        error!("fatal render error: {err:#}");
                        failure = Some(err);
                        elwt.exit();
                    }
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            if driver.ready_for_frame(now) {
                window.request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            } else if let Some(deadline) = driver.next_deadline() {
                elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
            } else {
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }
        Event::LoopExiting => {
            state.release();
        }
        _ => {}
    });

    if let Some(err) = failure {
        return Err(err);
    }
    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
