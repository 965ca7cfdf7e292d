//! Hue-wheel color picking, independent of any windowing toolkit.
//!
//! A touch point around the wheel's center is turned into an azimuth, the
//! azimuth into a unit value in `[0, 1)`, and the unit value into a color by
//! linear interpolation over a fixed nine-stop [`ColorGradient`]:
//!
//! ```text
//!   (dx, dy) ──atan2──▶ angle ──/2π, wrap──▶ unit ──ColorGradient──▶ Argb ──▶ callback
//! ```

mod color;
mod gradient;
mod picker;

pub use color::Argb;
pub use gradient::{unit_for_angle, unit_for_offset, ColorGradient, HUE_WHEEL};
pub use picker::{ColorWheelPicker, DialogOutcome, TouchEvent, TouchPhase, WheelGeometry};
