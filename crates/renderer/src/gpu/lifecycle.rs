use crate::error::CompositorError;
use crate::params::CompatibilityFlags;

use super::targets::{PendingClear, PingPong};

/// Buffers allocated for one surface size and flag set.
pub(crate) struct Allocation<B> {
    pub buffers: B,
    pub ping_pong: PingPong,
    pub flags: CompatibilityFlags,
}

/// Compositor state: Uninitialized → Ready ⇄ Ready (resize, flag change) →
/// Released. Generic over the buffer storage so the transitions can be
/// exercised without a device.
pub(crate) enum Lifecycle<B> {
    Uninitialized,
    Ready(Allocation<B>),
    Released,
}

/// Per-frame decisions taken from the ping-pong state before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FramePlan {
    pub clear: Option<PendingClear>,
    pub current: usize,
    pub source: usize,
    pub single: bool,
}

impl FramePlan {
    /// Single-buffer frames keep the previous contents unless the buffer is
    /// fresh and has to be cleared instead.
    pub fn loads_previous(&self) -> bool {
        self.single && self.clear != Some(PendingClear::Current)
    }
}

impl<B> Lifecycle<B> {
    pub fn name(&self) -> &'static str {
        match self {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::Ready(_) => "ready",
            Lifecycle::Released => "released",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Lifecycle::Ready(_))
    }

    pub fn buffers(&self) -> Option<&B> {
        match self {
            Lifecycle::Ready(allocation) => Some(&allocation.buffers),
            _ => None,
        }
    }

    pub fn ensure_not_released(&self) -> Result<(), CompositorError> {
        match self {
            Lifecycle::Released => Err(CompositorError::NotReady(self.name())),
            _ => Ok(()),
        }
    }

    /// Whether the buffers were allocated for different flags.
    pub fn needs_realloc(&self, flags: CompatibilityFlags) -> Result<bool, CompositorError> {
        match self {
            Lifecycle::Ready(allocation) => Ok(allocation.flags != flags),
            other => Err(CompositorError::NotReady(other.name())),
        }
    }

    /// Drops the current buffers, then calls `allocate` with the slot count
    /// for `flags`. On failure the state stays `Uninitialized`.
    pub fn reallocate<F>(
        &mut self,
        flags: CompatibilityFlags,
        allocate: F,
    ) -> Result<(), CompositorError>
    where
        F: FnOnce(usize) -> Result<B, CompositorError>,
    {
        self.ensure_not_released()?;
        *self = Lifecycle::Uninitialized;

        let ping_pong = PingPong::new(flags.single_framebuffer);
        let buffers = allocate(ping_pong.slot_count())?;
        *self = Lifecycle::Ready(Allocation {
            buffers,
            ping_pong,
            flags,
        });
        Ok(())
    }

    /// Consumes any pending clear and returns the frame's plan with the
    /// buffers to draw into.
    pub fn begin_frame(&mut self) -> Result<(FramePlan, &B), CompositorError> {
        match self {
            Lifecycle::Ready(allocation) => {
                let ping_pong = &mut allocation.ping_pong;
                let plan = FramePlan {
                    clear: ping_pong.take_clear(),
                    current: ping_pong.current(),
                    source: ping_pong.source(),
                    single: ping_pong.is_single(),
                };
                Ok((plan, &allocation.buffers))
            }
            other => Err(CompositorError::NotReady(other.name())),
        }
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<usize> {
        match self {
            Lifecycle::Ready(allocation) => Some(allocation.ping_pong.current()),
            _ => None,
        }
    }

    pub fn finish_frame(&mut self) {
        if let Lifecycle::Ready(allocation) = self {
            allocation.ping_pong.advance();
        }
    }

    pub fn release(&mut self) {
        *self = Lifecycle::Released;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    /// Records allocation and drop order.
    struct Tracked {
        id: usize,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.log.borrow_mut().push(format!("drop {}", self.id));
        }
    }

    fn allocator(
        log: &Rc<RefCell<Vec<String>>>,
        id: usize,
    ) -> impl FnOnce(usize) -> Result<Tracked, CompositorError> {
        let log = Rc::clone(log);
        move |slots| {
            log.borrow_mut().push(format!("alloc {id} x{slots}"));
            Ok(Tracked { id, log })
        }
    }

    #[test]
    fn frames_are_rejected_before_initialize_and_after_release() {
        let mut lifecycle: Lifecycle<()> = Lifecycle::Uninitialized;
        assert!(matches!(
            lifecycle.begin_frame(),
            Err(CompositorError::NotReady("uninitialized"))
        ));
        assert!(lifecycle.needs_realloc(CompatibilityFlags::default()).is_err());

        lifecycle
            .reallocate(CompatibilityFlags::default(), |_| Ok(()))
            .unwrap();
        assert!(lifecycle.is_ready());
        assert!(lifecycle.begin_frame().is_ok());

        lifecycle.release();
        assert!(!lifecycle.is_ready());
        assert!(lifecycle.buffers().is_none());
        assert!(matches!(
            lifecycle.begin_frame(),
            Err(CompositorError::NotReady("released"))
        ));
        assert!(matches!(
            lifecycle.reallocate(CompatibilityFlags::default(), |_| Ok(())),
            Err(CompositorError::NotReady("released"))
        ));
    }

    #[test]
    fn old_buffers_are_dropped_before_new_ones_are_allocated() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut lifecycle = Lifecycle::Uninitialized;
        lifecycle
            .reallocate(CompatibilityFlags::default(), allocator(&log, 0))
            .unwrap();
        let single = CompatibilityFlags {
            single_framebuffer: true,
            ..CompatibilityFlags::default()
        };
        lifecycle.reallocate(single, allocator(&log, 1)).unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["alloc 0 x2", "drop 0", "alloc 1 x1"]
        );
        assert_eq!(lifecycle.buffers().map(|b| b.id), Some(1));
    }

    #[test]
    fn failed_allocation_leaves_nothing_ready() {
        let mut lifecycle: Lifecycle<()> = Lifecycle::Uninitialized;
        lifecycle
            .reallocate(CompatibilityFlags::default(), |_| Ok(()))
            .unwrap();
        let err = lifecycle
            .reallocate(CompatibilityFlags::default(), |_| {
                Err(CompositorError::FramebufferRejected {
                    width: 1,
                    height: 1,
                    message: "out of memory".into(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, CompositorError::FramebufferRejected { .. }));
        assert!(!lifecycle.is_ready());
        assert!(lifecycle.begin_frame().is_err());
    }

    #[test]
    fn current_buffer_alternates_across_frames() {
        let mut lifecycle: Lifecycle<()> = Lifecycle::Uninitialized;
        lifecycle
            .reallocate(CompatibilityFlags::default(), |_| Ok(()))
            .unwrap();

        let mut seen = Vec::new();
        for frame in 0..4 {
            let (plan, _) = lifecycle.begin_frame().unwrap();
            assert_eq!(plan.source, 1 - plan.current);
            if frame == 0 {
                assert_eq!(plan.clear, Some(PendingClear::Slot(1)));
            } else {
                assert_eq!(plan.clear, None);
            }
            seen.push(plan.current);
            lifecycle.finish_frame();
        }
        assert_eq!(seen, vec![0, 1, 0, 1]);
    }

    #[test]
    fn flag_change_reallocates_with_fresh_ping_pong() {
        let mut lifecycle: Lifecycle<()> = Lifecycle::Uninitialized;
        let double = CompatibilityFlags::default();
        lifecycle.reallocate(double, |_| Ok(())).unwrap();
        lifecycle.begin_frame().unwrap();
        lifecycle.finish_frame();
        assert!(!lifecycle.needs_realloc(double).unwrap());

        let single = CompatibilityFlags {
            single_framebuffer: true,
            ..double
        };
        assert!(lifecycle.needs_realloc(single).unwrap());
        lifecycle.reallocate(single, |slots| {
            assert_eq!(slots, 1);
            Ok(())
        })
        .unwrap();

        let (plan, _) = lifecycle.begin_frame().unwrap();
        assert_eq!(plan.clear, Some(PendingClear::Current));
        assert!(!plan.loads_previous());
        lifecycle.finish_frame();
        for _ in 0..3 {
            let (plan, _) = lifecycle.begin_frame().unwrap();
            assert_eq!((plan.current, plan.source), (0, 0));
            assert!(plan.loads_previous());
            lifecycle.finish_frame();
        }
    }
}
