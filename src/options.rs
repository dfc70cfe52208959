use std::fmt;
use std::str::FromStr;

use image::Rgba;
use qrcode::EcLevel;

use crate::error::{Error, Result};

pub const MIN_MARGIN: u32 = 0;
pub const MAX_MARGIN: u32 = 8;
pub const DEFAULT_MARGIN: u32 = 4;

/// Named preview size. Each class maps to a fixed pixel dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SizeClass {
    Small,
    #[default]
    Medium,
    Large,
}

impl SizeClass {
    pub const ALL: [SizeClass; 3] = [SizeClass::Small, SizeClass::Medium, SizeClass::Large];

    pub fn as_str(self) -> &'static str {
        match self {
            SizeClass::Small => "small",
            SizeClass::Medium => "medium",
            SizeClass::Large => "large",
        }
    }
}

pub const fn size_class_to_pixels(class: SizeClass) -> u32 {
    match class {
        SizeClass::Small => 200,
        SizeClass::Medium => 300,
        SizeClass::Large => 400,
    }
}

impl FromStr for SizeClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(SizeClass::Small),
            "medium" => Ok(SizeClass::Medium),
            "large" => Ok(SizeClass::Large),
            _ => Err(Error::parse("size class", s)),
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// QR error correction level, L (~7%) to H (~30%) recoverable damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorCorrection {
    L,
    #[default]
    M,
    Q,
    H,
}

impl ErrorCorrection {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCorrection::L => "L",
            ErrorCorrection::M => "M",
            ErrorCorrection::Q => "Q",
            ErrorCorrection::H => "H",
        }
    }
}

impl From<ErrorCorrection> for EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::L => EcLevel::L,
            ErrorCorrection::M => EcLevel::M,
            ErrorCorrection::Q => EcLevel::Q,
            ErrorCorrection::H => EcLevel::H,
        }
    }
}

impl FromStr for ErrorCorrection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "low" => Ok(ErrorCorrection::L),
            "m" | "medium" => Ok(ErrorCorrection::M),
            "q" | "quartile" => Ok(ErrorCorrection::Q),
            "h" | "high" => Ok(ErrorCorrection::H),
            _ => Err(Error::parse("error correction level", s)),
        }
    }
}

impl fmt::Display for ErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cosmetic hint only. No renderer changes its output for `Rounded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CornerStyle {
    #[default]
    Sharp,
    Rounded,
}

impl FromStr for CornerStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sharp" => Ok(CornerStyle::Sharp),
            "rounded" => Ok(CornerStyle::Rounded),
            _ => Err(Error::parse("corner style", s)),
        }
    }
}

/// An RGBA color, written and parsed as CSS-style hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const BLACK: Color = Color([0, 0, 0, 255]);
    pub const WHITE: Color = Color([255, 255, 255, 255]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color([r, g, b, 255])
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba(self.0)
    }

    /// `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.0;
        if a == 255 {
            format!("#{:02x}{:02x}{:02x}", r, g, b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
        }
    }
}

impl FromStr for Color {
    type Err = Error;

    /// Accepts `#rgb`, `#rgba`, `#rrggbb` and `#rrggbbaa`; the `#` is optional.
    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::parse("color", s));
        }

        let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17);
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);

        let channels = match hex.len() {
            3 => [nibble(0), nibble(1), nibble(2), Ok(255)],
            4 => [nibble(0), nibble(1), nibble(2), nibble(3)],
            6 => [byte(0), byte(2), byte(4), Ok(255)],
            8 => [byte(0), byte(2), byte(4), byte(6)],
            _ => return Err(Error::parse("color", s)),
        };

        let mut rgba = [0u8; 4];
        for (slot, channel) in rgba.iter_mut().zip(channels) {
            *slot = channel.map_err(|_| Error::parse("color", s))?;
        }
        Ok(Color(rgba))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Two-sided clamp. Unlike `Ord::clamp` it never panics; `hi` wins if the bounds cross.
pub fn clamp<T: Ord>(value: T, lo: T, hi: T) -> T {
    value.max(lo).min(hi)
}

/// Everything the interactive editor lets the user change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    pub content: String,
    pub size_class: SizeClass,
    pub foreground: Color,
    pub background: Color,
    pub error_correction: ErrorCorrection,
    pub corner_style: CornerStyle,
    pub margin: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        GenerationOptions {
            content: String::new(),
            size_class: SizeClass::Medium,
            foreground: Color::BLACK,
            background: Color::WHITE,
            error_correction: ErrorCorrection::M,
            corner_style: CornerStyle::Sharp,
            margin: DEFAULT_MARGIN,
        }
    }
}

impl GenerationOptions {
    pub fn with_content(content: impl Into<String>) -> Self {
        GenerationOptions {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn pixel_size(&self) -> u32 {
        size_class_to_pixels(self.size_class)
    }

    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }
}
