use std::fmt;

/// A 32-bit color packed as `0xAARRGGBB`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Argb(u32);

impl Argb {
    pub const fn new(packed: u32) -> Self {
        Self(packed)
    }

    pub fn from_channels(alpha: u8, red: u8, green: u8, blue: u8) -> Self {
        Self(
            (u32::from(alpha) << 24)
                | (u32::from(red) << 16)
                | (u32::from(green) << 8)
                | u32::from(blue),
        )
    }

    pub fn packed(self) -> u32 {
        self.0
    }

    /// The color without its alpha byte, as `0xRRGGBB`.
    pub fn rgb(self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    pub fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(self) -> u8 {
        self.0 as u8
    }

    pub(crate) fn channels(self) -> [u8; 4] {
        [self.alpha(), self.red(), self.green(), self.blue()]
    }
}

impl fmt::Display for Argb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08x}", self.0)
    }
}

impl fmt::Debug for Argb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Argb({self})")
    }
}
