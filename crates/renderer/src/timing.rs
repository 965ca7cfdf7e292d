//! Wall-clock derived animation values.
//!
//! Both the depth scroll and the rotation are sawtooth functions of the
//! current time in milliseconds, so the animation is stateless and survives
//! surface recreation without drifting.

/// Milliseconds for one full depth scroll at speed factor 1.
pub const SCROLL_PERIOD_MS: f32 = 25_000.0;
/// Milliseconds for one full turn at speed and rotation factors 1.
pub const ROTATION_PERIOD_MS: f32 = 50_000.0;

/// `(now mod period) / period`, in `[0, 1)`; `0` when `period < 1`.
pub fn sawtooth(now_millis: u64, period_millis: u64) -> f32 {
    if period_millis < 1 {
        return 0.0;
    }
    (now_millis % period_millis) as f32 / period_millis as f32
}

/// Truncates a period expressed as a float to whole milliseconds.
///
/// Non-finite or negative periods collapse to `0`, which [`sawtooth`] treats
/// as "no animation".
pub fn period_millis(base: f32, divisor: f32) -> u64 {
    let period = base / divisor;
    if period.is_finite() {
        period as u64
    } else if period.is_sign_positive() && !period.is_nan() {
        u64::MAX
    } else {
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    /// Depth offset added to every vertex before wrapping.
    pub delta: f32,
    /// Rotation about the view axis, degrees.
    pub theta_degrees: f32,
}

impl FrameTiming {
    pub fn at(now_millis: u64, speed_factor: f32, rotation_speed_factor: f32) -> Self {
        let scroll_period = period_millis(SCROLL_PERIOD_MS, speed_factor);
        let rotation_period =
            period_millis(ROTATION_PERIOD_MS, speed_factor * rotation_speed_factor);
        Self {
            delta: sawtooth(now_millis, scroll_period),
            theta_degrees: 360.0 * sawtooth(now_millis, rotation_period),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sawtooth_wraps_at_period() {
        assert_eq!(sawtooth(12_500, 25_000), 0.5);
        assert_eq!(sawtooth(25_000, 25_000), 0.0);
        assert_eq!(sawtooth(30_000, 25_000), 0.2);
    }

    #[test]
    fn sub_millisecond_period_disables_animation() {
        assert_eq!(sawtooth(123_456, 0), 0.0);
        assert_eq!(period_millis(25_000.0, 50_000.0), 0);
        assert_eq!(period_millis(25_000.0, f32::NAN), 0);
        assert_eq!(period_millis(25_000.0, 0.0), u64::MAX);
    }

    #[test]
    fn frame_timing_at_default_speed() {
        let timing = FrameTiming::at(12_500, 1.0, 1.0);
        assert_eq!(timing.delta, 0.5);
        assert_eq!(timing.theta_degrees, 90.0);

        let timing = FrameTiming::at(25_000, 1.0, 1.0);
        assert_eq!(timing.delta, 0.0);
        assert_eq!(timing.theta_degrees, 180.0);
    }

    #[test]
    fn faster_speed_shortens_both_periods() {
        let timing = FrameTiming::at(12_500, 2.0, 1.0);
        assert_eq!(timing.delta, 0.0);
        assert_eq!(timing.theta_degrees, 180.0);
    }

    #[test]
    fn values_stay_in_range() {
        for now in (0..200_000).step_by(997) {
            let timing = FrameTiming::at(now, 1.3, 0.7);
            assert!((0.0..1.0).contains(&timing.delta));
            assert!((0.0..360.0).contains(&timing.theta_degrees));
        }
    }
}
