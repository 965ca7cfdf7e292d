use std::time::{Duration, Instant};

/// High-level behaviour requested by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderPolicy {
    /// Run the render loop continuously, optionally clamping the frame rate.
    Animate {
        /// Optional requested frames-per-second cap.
        target_fps: Option<f32>,
    },
    /// Keep redrawing with the clock frozen at `time_millis`.
    ///
    /// The feedback trail still converges, which makes this useful for
    /// inspecting a single pose of the animation.
    Still { time_millis: u64 },
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self::Animate { target_fps: None }
    }
}

/// Abstraction over where frame timestamps originate from.
pub trait TimeSource: Send {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Milliseconds to evaluate the next frame at.
    fn now_millis(&mut self) -> u64;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
    }

    fn now_millis(&mut self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Time source that always reports a fixed timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    millis: u64,
}

impl FixedTimeSource {
    pub fn new(millis: u64) -> Self {
        Self { millis }
    }
}

impl TimeSource for FixedTimeSource {
    fn reset(&mut self) {}

    fn now_millis(&mut self) -> u64 {
        self.millis
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Builds a time source suited to the requested render policy.
pub fn time_source_for_policy(policy: &RenderPolicy) -> BoxedTimeSource {
    match policy {
        RenderPolicy::Animate { .. } => Box::new(SystemTimeSource::new()),
        RenderPolicy::Still { time_millis } => Box::new(FixedTimeSource::new(*time_millis)),
    }
}

/// Frame pacing for the redraw loop.
///
/// Without a frame cap every `AboutToWait` produces a redraw and presentation
/// is throttled by vsync alone.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    interval: Option<Duration>,
    last_frame: Option<Instant>,
}

/// Frame period rounded to whole nanoseconds.
fn frame_interval(fps: f32) -> Duration {
    Duration::from_nanos((1e9 / f64::from(fps)).round() as u64)
}

impl FrameScheduler {
    pub fn new(policy: &RenderPolicy) -> Self {
        let interval = match policy {
            RenderPolicy::Animate {
                target_fps: Some(fps),
            } if fps.is_finite() && *fps > 0.0 => Some(frame_interval(*fps)),
            _ => None,
        };
        Self {
            interval,
            last_frame: None,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match (self.interval, self.last_frame) {
            (Some(interval), Some(last)) => now.saturating_duration_since(last) >= interval,
            _ => true,
        }
    }

    pub fn mark_rendered_at(&mut self, now: Instant) {
        self.last_frame = Some(now);
    }

    pub fn mark_rendered(&mut self) {
        self.mark_rendered_at(Instant::now());
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.interval, self.last_frame) {
            (Some(interval), Some(last)) => Some(last + interval),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.last_frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncapped_scheduler_is_always_ready() {
        let mut scheduler = FrameScheduler::new(&RenderPolicy::default());
        let now = Instant::now();
        assert!(scheduler.ready_for_frame(now));
        scheduler.mark_rendered_at(now);
        assert!(scheduler.ready_for_frame(now));
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn capped_scheduler_waits_for_interval() {
        let mut scheduler = FrameScheduler::new(&RenderPolicy::Animate {
            target_fps: Some(10.0),
        });
        let start = Instant::now();
        assert!(scheduler.ready_for_frame(start));
        scheduler.mark_rendered_at(start);
        assert!(!scheduler.ready_for_frame(start + Duration::from_millis(50)));
        assert!(scheduler.ready_for_frame(start + Duration::from_millis(100)));
        assert_eq!(
            scheduler.next_deadline(),
            Some(start + Duration::from_millis(100))
        );
        scheduler.reset();
        assert!(scheduler.ready_for_frame(start));
    }

    #[test]
    fn frame_interval_is_rounded_to_whole_nanoseconds() {
        assert_eq!(frame_interval(10.0), Duration::from_millis(100));
        assert_eq!(frame_interval(60.0), Duration::from_nanos(16_666_667));
        assert_eq!(frame_interval(30.0), Duration::from_nanos(33_333_333));

        let mut scheduler = FrameScheduler::new(&RenderPolicy::Animate {
            target_fps: Some(30.0),
        });
        let start = Instant::now();
        scheduler.mark_rendered_at(start);
        assert!(scheduler.ready_for_frame(start + Duration::from_nanos(33_333_333)));
    }

    #[test]
    fn invalid_fps_is_ignored() {
        let scheduler = FrameScheduler::new(&RenderPolicy::Animate {
            target_fps: Some(0.0),
        });
        assert_eq!(scheduler.interval(), None);
    }

    #[test]
    fn still_policy_reports_fixed_time() {
        let mut source = time_source_for_policy(&RenderPolicy::Still { time_millis: 12_500 });
        assert_eq!(source.now_millis(), 12_500);
        source.reset();
        assert_eq!(source.now_millis(), 12_500);
    }
}
