use std::path::Path;

use anyhow::{Context, Result};
use colorwheel::{Argb, ColorWheelPicker, DialogOutcome, TouchEvent, TouchPhase};
use linesettings::{PackedRgb, SettingKey, Settings};
use tracing::{debug, info};

use crate::cli::{ColorArgs, ColorTarget};

impl ColorTarget {
    pub fn key(self) -> SettingKey {
        match self {
            ColorTarget::Background => SettingKey::BackgroundColor,
            ColorTarget::Lines => SettingKey::LinesColor,
        }
    }

    fn current(self, settings: &Settings) -> PackedRgb {
        match self {
            ColorTarget::Background => settings.background_color,
            ColorTarget::Lines => settings.lines_color,
        }
    }

    fn store(self, settings: &mut Settings, color: PackedRgb) {
        match self {
            ColorTarget::Background => settings.background_color = color,
            ColorTarget::Lines => settings.lines_color = color,
        }
    }
}

/// Where on the wheel the user "touched".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelPoint {
    /// Degrees clockwise from the positive x axis, placed on the ring.
    Angle(f32),
    /// Raw view coordinates.
    View(f32, f32),
}

impl WheelPoint {
    pub fn from_args(args: &ColorArgs) -> Option<Self> {
        match (args.angle, args.at) {
            (Some(degrees), _) => Some(WheelPoint::Angle(degrees)),
            (None, Some((x, y))) => Some(WheelPoint::View(x, y)),
            (None, None) => None,
        }
    }
}

/// Runs one drag on a fresh picker seeded with `initial` and returns the
/// confirmed color.
pub fn pick(initial: PackedRgb, point: WheelPoint) -> PackedRgb {
    let mut changes = 0usize;
    let mut picker = ColorWheelPicker::new(Argb::new(0xFF00_0000 | initial.packed()), |color| {
        changes += 1;
        debug!(%color, "color changed");
    });

    let (x, y) = match point {
        WheelPoint::Angle(degrees) => picker.geometry().indicator_position(degrees.to_radians()),
        WheelPoint::View(x, y) => (x, y),
    };
    picker.handle_touch(TouchEvent::new(TouchPhase::Down, x, y));
    picker.handle_touch(TouchEvent::new(TouchPhase::Move, x, y));
    picker.handle_touch(TouchEvent::new(TouchPhase::Up, x, y));

    let chosen = picker
        .finish(DialogOutcome::Confirmed)
        .map(|argb| PackedRgb::from_packed(argb.rgb()))
        .unwrap_or(initial);
    debug!(changes, "picker closed");
    chosen
}

pub fn run(args: &ColorArgs, settings_path: &Path) -> Result<()> {
    let point = WheelPoint::from_args(args).context("either --angle or --at is required")?;
    let mut settings = Settings::load_or_default(settings_path)?;
    let color = pick(args.target.current(&settings), point);
    println!("{color}");

    if args.dry_run {
        return Ok(());
    }

    args.target.store(&mut settings, color);
    settings
        .persist(settings_path)
        .with_context(|| format!("failed to store {}", args.target.key()))?;
    info!(
        key = %args.target.key(),
        %color,
        path = %settings_path.display(),
        "stored picked color"
    );
    Ok(())
}
