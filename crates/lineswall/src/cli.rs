use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "lineswall",
    author,
    version,
    about = "Animated lines wallpaper",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Preview window size (e.g. `1080x1920`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Optional FPS cap (0 = uncapped, vsync only).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Seed for the random line set; omit for a new pattern every launch.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Freeze the animation clock at this many milliseconds.
    #[arg(long, value_name = "MILLISECONDS")]
    pub still_time: Option<u64>,

    /// Settings file to read instead of the one in the config directory.
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// How often the settings file is checked for changes (e.g. `500ms`, `2s`).
    #[arg(
        long,
        value_name = "DURATION",
        value_parser = parse_poll_interval,
        default_value = "500ms"
    )]
    pub poll_interval: Duration,

    /// Prefer the high-performance GPU over the low-power one.
    #[arg(long)]
    pub high_performance: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the preview window (same as running without a subcommand).
    Run(RunArgs),
    /// Inspect or edit the wallpaper settings.
    Settings(SettingsCommand),
    /// Pick a colour on the colour wheel and store it.
    Color(ColorArgs),
}

#[derive(Parser, Debug)]
pub struct SettingsCommand {
    /// Settings file to operate on instead of the one in the config directory.
    #[arg(long, value_name = "FILE", global = true)]
    pub file: Option<PathBuf>,
    #[command(subcommand)]
    pub action: SettingsAction,
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Print the resolved settings file path.
    Where,
    /// Print every setting.
    Show {
        /// Emit JSON instead of TOML.
        #[arg(long)]
        json: bool,
    },
    /// Print a single setting.
    Get {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// Validate and store a single setting.
    Set {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "VALUE", allow_hyphen_values = true)]
        value: String,
    },
    /// Restore every setting to its default.
    Reset,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorTarget {
    Background,
    Lines,
}

#[derive(Parser, Debug)]
pub struct ColorArgs {
    /// Which colour setting to change.
    #[arg(value_enum)]
    pub target: ColorTarget,

    /// Position on the ring as an angle in degrees, clockwise from the right.
    #[arg(
        long,
        value_name = "DEGREES",
        allow_hyphen_values = true,
        conflicts_with = "at",
        required_unless_present = "at"
    )]
    pub angle: Option<f32>,

    /// Touch position in wheel view coordinates (e.g. `16,100`).
    #[arg(long, value_name = "X,Y", value_parser = parse_point, allow_hyphen_values = true)]
    pub at: Option<(f32, f32)>,

    /// Print the picked colour without storing it.
    #[arg(long)]
    pub dry_run: bool,

    /// Settings file to update instead of the one in the config directory.
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{}'", w.trim()))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{}'", h.trim()))?;
    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".into());
    }
    Ok((width, height))
}

pub fn parse_poll_interval(value: &str) -> Result<Duration, String> {
    let duration = humantime::parse_duration(value.trim())
        .map_err(|err| format!("invalid poll interval '{value}': {err}"))?;
    if duration.is_zero() {
        return Err("poll interval must be greater than zero".into());
    }
    Ok(duration)
}

pub fn parse_point(value: &str) -> Result<(f32, f32), String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| "expected X,Y".to_string())?;
    let x = x
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("invalid x coordinate '{}'", x.trim()))?;
    let y = y
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("invalid y coordinate '{}'", y.trim()))?;
    if !x.is_finite() || !y.is_finite() {
        return Err("coordinates must be finite".into());
    }
    Ok((x, y))
}
