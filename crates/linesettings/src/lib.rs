use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// Largest raw value a slider control can hold.
pub const CONTROL_MAX: u32 = 254;
/// Slider midpoint; maps to a factor of exactly 1.0.
pub const CONTROL_DEFAULT: u32 = 127;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to access settings file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Invalid(String),
    #[error("unknown setting '{0}'")]
    UnknownKey(String),
}

/// An RGB color packed as `0xRRGGBB`. Any alpha byte is discarded.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PackedRgb(u32);

impl PackedRgb {
    pub const BLACK: PackedRgb = PackedRgb(0x000000);
    pub const WHITE: PackedRgb = PackedRgb(0xFFFFFF);

    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Self((u32::from(red) << 16) | (u32::from(green) << 8) | u32::from(blue))
    }

    /// Accepts `0xAARRGGBB` or `0xRRGGBB`; the alpha byte is dropped.
    pub fn from_packed(value: u32) -> Self {
        Self(value & 0x00FF_FFFF)
    }

    pub fn packed(self) -> u32 {
        self.0
    }

    pub fn red(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    pub fn green(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    pub fn blue(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

impl fmt::Display for PackedRgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

impl fmt::Debug for PackedRgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackedRgb({self})")
    }
}

impl FromStr for PackedRgb {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("color must not be empty".to_string());
        }

        let hex = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix("0x"))
            .or_else(|| trimmed.strip_prefix("0X"));
        if let Some(hex) = hex {
            if hex.len() != 6 && hex.len() != 8 {
                return Err(format!(
                    "invalid color '{trimmed}'; expected #rrggbb or #aarrggbb"
                ));
            }
            return u32::from_str_radix(hex, 16)
                .map(PackedRgb::from_packed)
                .map_err(|err| format!("invalid color '{trimmed}': {err}"));
        }

        // Signed integers follow the platform convention of ARGB stored in an i32,
        // so `-1` is opaque white.
        trimmed
            .parse::<i64>()
            .map_err(|_| format!("invalid color '{trimmed}'; expected #rrggbb or an integer"))
            .and_then(packed_from_integer)
    }
}

fn packed_from_integer(value: i64) -> Result<PackedRgb, String> {
    if value < i64::from(i32::MIN) || value > i64::from(u32::MAX) {
        return Err(format!("color value {value} is out of range"));
    }
    Ok(PackedRgb::from_packed(value as u32))
}

impl Serialize for PackedRgb {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PackedRgb {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Str(String),
            Num(i64),
        }

        match Helper::deserialize(deserializer)? {
            Helper::Str(raw) => raw.parse().map_err(de::Error::custom),
            Helper::Num(value) => packed_from_integer(value).map_err(de::Error::custom),
        }
    }
}

/// Names of every persisted setting, spelled exactly as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    BackgroundColor,
    LinesColor,
    Blur,
    Brightness,
    LineWidth,
    RotationSpeed,
    Speed,
    UseSmallerTextures,
    UseNonPowerOfTwoTextures,
    UseNonSquareTextures,
    UseOneFramebuffer,
}

impl SettingKey {
    pub const ALL: [SettingKey; 11] = [
        SettingKey::BackgroundColor,
        SettingKey::LinesColor,
        SettingKey::Blur,
        SettingKey::Brightness,
        SettingKey::LineWidth,
        SettingKey::RotationSpeed,
        SettingKey::Speed,
        SettingKey::UseSmallerTextures,
        SettingKey::UseNonPowerOfTwoTextures,
        SettingKey::UseNonSquareTextures,
        SettingKey::UseOneFramebuffer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::BackgroundColor => "backgroundColor",
            SettingKey::LinesColor => "linesColor",
            SettingKey::Blur => "blur",
            SettingKey::Brightness => "brightness",
            SettingKey::LineWidth => "linewidth",
            SettingKey::RotationSpeed => "rotationspeed",
            SettingKey::Speed => "speed",
            SettingKey::UseSmallerTextures => "use_smaller_textures",
            SettingKey::UseNonPowerOfTwoTextures => "use_non_power_of_two_textures",
            SettingKey::UseNonSquareTextures => "use_non_square_textures",
            SettingKey::UseOneFramebuffer => "use_one_framebuffer",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        SettingKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ConfigError::UnknownKey(trimmed.to_string()))
    }
}

/// Scalar key/value state consumed by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "backgroundColor")]
    pub background_color: PackedRgb,
    #[serde(rename = "linesColor")]
    pub lines_color: PackedRgb,
    pub blur: u32,
    pub brightness: u32,
    pub linewidth: u32,
    pub rotationspeed: u32,
    pub speed: u32,
    pub use_smaller_textures: bool,
    pub use_non_power_of_two_textures: bool,
    pub use_non_square_textures: bool,
    pub use_one_framebuffer: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            background_color: PackedRgb::BLACK,
            lines_color: PackedRgb::WHITE,
            blur: CONTROL_DEFAULT,
            brightness: CONTROL_DEFAULT,
            linewidth: CONTROL_DEFAULT,
            rotationspeed: CONTROL_DEFAULT,
            speed: CONTROL_DEFAULT,
            use_smaller_textures: false,
            use_non_power_of_two_textures: false,
            use_non_square_textures: false,
            use_one_framebuffer: false,
        }
    }
}

impl Settings {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(input)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reads `path`, falling back to defaults when the file does not exist yet.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn persist(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let serialized = self.to_toml_string()?;
        fs::write(path, serialized).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in self.controls() {
            if value > CONTROL_MAX {
                return Err(ConfigError::Invalid(format!(
                    "{key} must be between 0 and {CONTROL_MAX}, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// The five slider controls paired with their keys.
    pub fn controls(&self) -> [(SettingKey, u32); 5] {
        [
            (SettingKey::Blur, self.blur),
            (SettingKey::Brightness, self.brightness),
            (SettingKey::LineWidth, self.linewidth),
            (SettingKey::RotationSpeed, self.rotationspeed),
            (SettingKey::Speed, self.speed),
        ]
    }

    pub fn get(&self, key: SettingKey) -> String {
        match key {
            SettingKey::BackgroundColor => self.background_color.to_string(),
            SettingKey::LinesColor => self.lines_color.to_string(),
            SettingKey::Blur => self.blur.to_string(),
            SettingKey::Brightness => self.brightness.to_string(),
            SettingKey::LineWidth => self.linewidth.to_string(),
            SettingKey::RotationSpeed => self.rotationspeed.to_string(),
            SettingKey::Speed => self.speed.to_string(),
            SettingKey::UseSmallerTextures => self.use_smaller_textures.to_string(),
            SettingKey::UseNonPowerOfTwoTextures => {
                self.use_non_power_of_two_textures.to_string()
            }
            SettingKey::UseNonSquareTextures => self.use_non_square_textures.to_string(),
            SettingKey::UseOneFramebuffer => self.use_one_framebuffer.to_string(),
        }
    }

    /// Parses `raw` according to the type of `key` and stores it.
    pub fn set(&mut self, key: SettingKey, raw: &str) -> Result<(), ConfigError> {
        match key {
            SettingKey::BackgroundColor => self.background_color = parse_color(key, raw)?,
            SettingKey::LinesColor => self.lines_color = parse_color(key, raw)?,
            SettingKey::Blur => self.blur = parse_control(key, raw)?,
            SettingKey::Brightness => self.brightness = parse_control(key, raw)?,
            SettingKey::LineWidth => self.linewidth = parse_control(key, raw)?,
            SettingKey::RotationSpeed => self.rotationspeed = parse_control(key, raw)?,
            SettingKey::Speed => self.speed = parse_control(key, raw)?,
            SettingKey::UseSmallerTextures => self.use_smaller_textures = parse_flag(key, raw)?,
            SettingKey::UseNonPowerOfTwoTextures => {
                self.use_non_power_of_two_textures = parse_flag(key, raw)?
            }
            SettingKey::UseNonSquareTextures => {
                self.use_non_square_textures = parse_flag(key, raw)?
            }
            SettingKey::UseOneFramebuffer => self.use_one_framebuffer = parse_flag(key, raw)?,
        }
        Ok(())
    }
}

fn parse_color(key: SettingKey, raw: &str) -> Result<PackedRgb, ConfigError> {
    raw.parse()
        .map_err(|err| ConfigError::Invalid(format!("{key}: {err}")))
}

fn parse_control(key: SettingKey, raw: &str) -> Result<u32, ConfigError> {
    let value: u32 = raw.trim().parse().map_err(|_| {
        ConfigError::Invalid(format!(
            "{key} expects an integer between 0 and {CONTROL_MAX}, got '{}'",
            raw.trim()
        ))
    })?;
    if value > CONTROL_MAX {
        return Err(ConfigError::Invalid(format!(
            "{key} must be between 0 and {CONTROL_MAX}, got {value}"
        )));
    }
    Ok(value)
}

fn parse_flag(key: SettingKey, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => Err(ConfigError::Invalid(format!(
            "{key} expects true or false, got '{other}'"
        ))),
    }
}
