use std::f32::consts::TAU;

use crate::color::Argb;

/// Hue wheel stops, clockwise from the positive x axis. The last stop repeats
/// the first so the wheel is seamless.
pub const HUE_WHEEL: [Argb; 9] = [
    Argb::new(0xFF00_0000),
    Argb::new(0xFF00_00FF),
    Argb::new(0xFF00_FF00),
    Argb::new(0xFF00_FFFF),
    Argb::new(0xFFFF_FFFF),
    Argb::new(0xFFFF_FF00),
    Argb::new(0xFFFF_00FF),
    Argb::new(0xFFFF_0000),
    Argb::new(0xFF00_0000),
];

/// Maps a touch offset from the wheel center to a unit value in `[0, 1]`.
///
/// `atan2` yields `[-π, π]`; negative angles are wrapped by adding one turn.
pub fn unit_for_offset(dx: f32, dy: f32) -> f32 {
    let angle = dy.atan2(dx);
    let unit = angle / TAU;
    if unit < 0.0 {
        unit + 1.0
    } else {
        unit
    }
}

/// Same mapping for an arbitrary angle in radians, any number of turns.
pub fn unit_for_angle(radians: f32) -> f32 {
    radians.rem_euclid(TAU) / TAU
}

/// Fixed, ordered color stops sampled by linear interpolation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorGradient {
    stops: [Argb; 9],
}

impl Default for ColorGradient {
    fn default() -> Self {
        Self::hue_wheel()
    }
}

impl ColorGradient {
    pub fn hue_wheel() -> Self {
        Self { stops: HUE_WHEEL }
    }

    pub fn stops(&self) -> &[Argb; 9] {
        &self.stops
    }

    /// Samples the gradient at `unit`.
    ///
    /// Values at or below zero return the first stop and values at or above
    /// one return the last stop, both exactly.
    pub fn interpolate(&self, unit: f32) -> Argb {
        let last = self.stops.len() - 1;
        if unit <= 0.0 || unit.is_nan() {
            return self.stops[0];
        }
        if unit >= 1.0 {
            return self.stops[last];
        }

        let scaled = unit * last as f32;
        let index = (scaled as usize).min(last - 1);
        let fraction = scaled - index as f32;

        let from = self.stops[index].channels();
        let to = self.stops[index + 1].channels();
        let [alpha, red, green, blue] =
            std::array::from_fn(|channel| mix_channel(from[channel], to[channel], fraction));
        Argb::from_channels(alpha, red, green, blue)
    }
}

/// `start + round(fraction * (end - start))`, rounding halves up.
fn mix_channel(start: u8, end: u8, fraction: f32) -> u8 {
    let span = i32::from(end) - i32::from(start);
    let step = (fraction * span as f32 + 0.5).floor() as i32;
    (i32::from(start) + step).clamp(0, 255) as u8
}
