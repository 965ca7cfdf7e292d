//! Process-wide render parameters shared between the settings watcher and the
//! render thread.
//!
//! Every field is an independent relaxed atomic. Writers store values as they
//! arrive and the compositor reads a [`ParameterSnapshot`] once per frame, so a
//! frame may observe a mix of old and new values for different parameters.
//! That skew lasts at most one frame and is accepted.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use linesettings::{PackedRgb, Settings};

/// Base alpha of the feedback pass before the blur factor is applied.
pub const BLUR_BASE: f32 = 0.86;
/// Base brightness multiplier of the line shader.
pub const BRIGHTNESS_BASE: f32 = 0.15;
/// Base line width in framebuffer pixels.
pub const LINE_WIDTH_BASE: f32 = 1.0;
/// Background channels are dimmed to keep trails visible.
pub const BACKGROUND_SCALE: f32 = 0.05;
/// Exponent multiplier used by the blur control.
pub const BLUR_MULTIPLIER: f32 = 0.125;
/// Exponent multiplier used by every other control.
pub const DEFAULT_MULTIPLIER: f32 = 1.0;
/// Lower bound of the line-width factor.
pub const MIN_LINE_WIDTH_FACTOR: f32 = 0.01;

const CONTROL_CENTER: f32 = 127.0;

/// Maps a raw control value (0-254, centre 127) onto a multiplicative factor.
///
/// `scaled_factor(127, m)` is exactly `1.0` and the mapping is strictly
/// increasing for positive multipliers.
pub fn scaled_factor(value: u32, multiplier: f32) -> f32 {
    let normalized = (value as f32 - CONTROL_CENTER) / CONTROL_CENTER;
    (normalized * multiplier).exp()
}

/// Driver workarounds selected by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompatibilityFlags {
    pub smaller_textures: bool,
    pub non_power_of_two: bool,
    pub non_square: bool,
    pub single_framebuffer: bool,
}

impl CompatibilityFlags {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            smaller_textures: settings.use_smaller_textures,
            non_power_of_two: settings.use_non_power_of_two_textures,
            non_square: settings.use_non_square_textures,
            single_framebuffer: settings.use_one_framebuffer,
        }
    }
}

#[derive(Debug)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

#[derive(Debug)]
struct AtomicRgb([AtomicF32; 3]);

impl AtomicRgb {
    fn new(rgb: [f32; 3]) -> Self {
        Self(rgb.map(AtomicF32::new))
    }

    fn load(&self) -> [f32; 3] {
        [self.0[0].load(), self.0[1].load(), self.0[2].load()]
    }

    fn store(&self, rgb: [f32; 3]) {
        for (slot, value) in self.0.iter().zip(rgb) {
            slot.store(value);
        }
    }
}

/// Shared, lock-free parameter block read by the compositor every frame.
#[derive(Debug)]
pub struct RenderParameters {
    background: AtomicRgb,
    lines: AtomicRgb,
    blur_factor: AtomicF32,
    brightness_factor: AtomicF32,
    line_width_factor: AtomicF32,
    speed_factor: AtomicF32,
    rotation_speed_factor: AtomicF32,
    smaller_textures: AtomicBool,
    non_power_of_two: AtomicBool,
    non_square: AtomicBool,
    single_framebuffer: AtomicBool,
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            background: AtomicRgb::new([0.0; 3]),
            lines: AtomicRgb::new([1.0; 3]),
            blur_factor: AtomicF32::new(1.0),
            brightness_factor: AtomicF32::new(1.0),
            line_width_factor: AtomicF32::new(1.0),
            speed_factor: AtomicF32::new(1.0),
            rotation_speed_factor: AtomicF32::new(1.0),
            smaller_textures: AtomicBool::new(false),
            non_power_of_two: AtomicBool::new(false),
            non_square: AtomicBool::new(false),
            single_framebuffer: AtomicBool::new(false),
        }
    }
}

impl RenderParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let params = Self::default();
        params.apply(settings);
        params
    }

    /// Stores every value of `settings`, one relaxed store per parameter.
    pub fn apply(&self, settings: &Settings) {
        self.set_background_color(settings.background_color);
        self.set_lines_color(settings.lines_color);
        self.set_blur(settings.blur);
        self.set_brightness(settings.brightness);
        self.set_line_width(settings.linewidth);
        self.set_rotation_speed(settings.rotationspeed);
        self.set_speed(settings.speed);
        self.set_compatibility(CompatibilityFlags::from_settings(settings));
    }

    pub fn set_background_color(&self, color: PackedRgb) {
        self.background
            .store(normalized_rgb(color).map(|channel| channel * BACKGROUND_SCALE));
    }

    pub fn set_lines_color(&self, color: PackedRgb) {
        self.lines.store(normalized_rgb(color));
    }

    pub fn set_blur(&self, value: u32) {
        self.blur_factor
            .store(scaled_factor(value, BLUR_MULTIPLIER));
    }

    pub fn set_brightness(&self, value: u32) {
        self.brightness_factor
            .store(scaled_factor(value, DEFAULT_MULTIPLIER));
    }

    pub fn set_line_width(&self, value: u32) {
        let factor = scaled_factor(value, DEFAULT_MULTIPLIER).max(MIN_LINE_WIDTH_FACTOR);
        self.line_width_factor.store(factor);
    }

    pub fn set_rotation_speed(&self, value: u32) {
        self.rotation_speed_factor
            .store(scaled_factor(value, DEFAULT_MULTIPLIER));
    }

    pub fn set_speed(&self, value: u32) {
        self.speed_factor
            .store(scaled_factor(value, DEFAULT_MULTIPLIER));
    }

    pub fn set_compatibility(&self, flags: CompatibilityFlags) {
        self.smaller_textures
            .store(flags.smaller_textures, Ordering::Relaxed);
        self.non_power_of_two
            .store(flags.non_power_of_two, Ordering::Relaxed);
        self.non_square.store(flags.non_square, Ordering::Relaxed);
        self.single_framebuffer
            .store(flags.single_framebuffer, Ordering::Relaxed);
    }

    pub fn compatibility(&self) -> CompatibilityFlags {
        CompatibilityFlags {
            smaller_textures: self.smaller_textures.load(Ordering::Relaxed),
            non_power_of_two: self.non_power_of_two.load(Ordering::Relaxed),
            non_square: self.non_square.load(Ordering::Relaxed),
            single_framebuffer: self.single_framebuffer.load(Ordering::Relaxed),
        }
    }

    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            background: self.background.load(),
            lines: self.lines.load(),
            blur_factor: self.blur_factor.load(),
            brightness_factor: self.brightness_factor.load(),
            line_width_factor: self.line_width_factor.load(),
            speed_factor: self.speed_factor.load(),
            rotation_speed_factor: self.rotation_speed_factor.load(),
            compatibility: self.compatibility(),
        }
    }
}

/// Plain copy of [`RenderParameters`] taken at the start of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSnapshot {
    /// Background colour, already dimmed by [`BACKGROUND_SCALE`].
    pub background: [f32; 3],
    pub lines: [f32; 3],
    pub blur_factor: f32,
    pub brightness_factor: f32,
    pub line_width_factor: f32,
    pub speed_factor: f32,
    pub rotation_speed_factor: f32,
    pub compatibility: CompatibilityFlags,
}

impl ParameterSnapshot {
    /// Alpha applied when the previous frame is blended into the current one.
    pub fn blur_alpha(&self) -> f32 {
        BLUR_BASE * self.blur_factor
    }

    pub fn brightness(&self) -> f32 {
        BRIGHTNESS_BASE * self.brightness_factor
    }

    pub fn line_width(&self) -> f32 {
        LINE_WIDTH_BASE * self.line_width_factor
    }

    pub fn background_color(&self) -> wgpu::Color {
        wgpu::Color {
            r: self.background[0] as f64,
            g: self.background[1] as f64,
            b: self.background[2] as f64,
            a: 1.0,
        }
    }
}

fn normalized_rgb(color: PackedRgb) -> [f32; 3] {
    [color.red(), color.green(), color.blue()].map(|channel| channel as f32 / 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centre_value_maps_to_unit_factor() {
        assert_eq!(scaled_factor(127, BLUR_MULTIPLIER), 1.0);
        assert_eq!(scaled_factor(127, DEFAULT_MULTIPLIER), 1.0);
    }

    #[test]
    fn factor_is_strictly_increasing() {
        let mut previous = scaled_factor(0, DEFAULT_MULTIPLIER);
        for value in 1..=254 {
            let current = scaled_factor(value, DEFAULT_MULTIPLIER);
            assert!(current > previous, "factor not increasing at {value}");
            previous = current;
        }
    }

    #[test]
    fn factor_extremes_follow_exponential_mapping() {
        let low = scaled_factor(0, DEFAULT_MULTIPLIER);
        let high = scaled_factor(254, DEFAULT_MULTIPLIER);
        assert!((low - (-1.0f32).exp()).abs() < 1e-6);
        assert!((high - 1.0f32.exp()).abs() < 1e-5);
        let blur_high = scaled_factor(254, BLUR_MULTIPLIER);
        assert!((blur_high - 0.125f32.exp()).abs() < 1e-6);
    }

    #[test]
    fn defaults_match_fresh_settings() {
        let fresh = RenderParameters::default().snapshot();
        let applied = RenderParameters::from_settings(&Settings::default()).snapshot();
        assert_eq!(fresh, applied);
        assert_eq!(fresh.background, [0.0; 3]);
        assert_eq!(fresh.lines, [1.0; 3]);
        assert!((fresh.blur_alpha() - 0.86).abs() < 1e-6);
        assert!((fresh.brightness() - 0.15).abs() < 1e-6);
        assert_eq!(fresh.line_width(), 1.0);
    }

    #[test]
    fn background_is_dimmed() {
        let params = RenderParameters::new();
        params.set_background_color(PackedRgb::new(255, 0, 51));
        let snapshot = params.snapshot();
        assert!((snapshot.background[0] - 0.05).abs() < 1e-6);
        assert_eq!(snapshot.background[1], 0.0);
        assert!((snapshot.background[2] - 0.01).abs() < 1e-6);
    }

    #[test]
    fn line_width_factor_has_a_floor() {
        let params = RenderParameters::new();
        params.set_line_width(0);
        let expected = (-1.0f32).exp();
        assert!((params.snapshot().line_width_factor - expected).abs() < 1e-6);
        assert!(expected > MIN_LINE_WIDTH_FACTOR);
        assert_eq!(
            scaled_factor(0, DEFAULT_MULTIPLIER * 10.0).max(MIN_LINE_WIDTH_FACTOR),
            MIN_LINE_WIDTH_FACTOR
        );
    }

    #[test]
    fn compatibility_flags_round_trip_through_settings() {
        let settings = Settings {
            use_one_framebuffer: true,
            use_non_square_textures: true,
            ..Settings::default()
        };
        let params = RenderParameters::from_settings(&settings);
        let flags = params.compatibility();
        assert!(flags.single_framebuffer);
        assert!(flags.non_square);
        assert!(!flags.smaller_textures);
        assert!(!flags.non_power_of_two);
    }
}
