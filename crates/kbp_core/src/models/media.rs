//! Media-related data structures (colors, resolutions, backgrounds).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const PROJECT_EXTENSIONS: &[&str] = &["kbp"];
pub const SUBTITLE_EXTENSIONS: &[&str] = &["ass"];
pub const LRC_EXTENSIONS: &[&str] = &["lrc"];
pub const DOBLON_EXTENSIONS: &[&str] = &["txt"];
pub const AUDIO_EXTENSIONS: &[&str] = &["flac", "wav", "ogg", "opus", "mp3", "aac", "m4a", "wma"];
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "jfif", "jxl", "bmp", "tiff", "webp",
];
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "webm", "mov", "m4v", "flv", "mpg", "mpeg", "wmv",
];

/// Lowercased extension of a path, empty if it has none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Whether a background file is a still image or a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = extension_of(path);
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else {
            None
        }
    }
}

/// Error returned when a color or resolution string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{value}'")]
pub struct ValueParseError {
    pub kind: &'static str,
    pub value: String,
}

impl ValueParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Whether the color has any transparency.
    pub fn is_translucent(&self) -> bool {
        self.a < 0xff
    }

    /// Color in ffmpeg's `0xRRGGBB[@alpha]` notation.
    pub fn to_ffmpeg(&self) -> String {
        if self.is_translucent() {
            format!(
                "0x{:02x}{:02x}{:02x}@{:.3}",
                self.r,
                self.g,
                self.b,
                self.a as f64 / 255.0
            )
        } else {
            format!("0x{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.is_translucent() {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl FromStr for Color {
    type Err = ValueParseError;

    /// Parses `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if !(hex.len() == 6 || hex.len() == 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValueParseError::new("color", s));
        }
        let byte = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ValueParseError::new("color", s))
        };
        let a = if hex.len() == 8 { byte(6)? } else { 0xff };
        Ok(Self::rgba(byte(0)?, byte(2)?, byte(4)?, a))
    }
}

impl Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Output frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Common output sizes.
    pub const PRESETS: &'static [Resolution] = &[
        Resolution::new(1500, 1080),
        Resolution::new(1920, 1080),
        Resolution::new(3000, 2160),
        Resolution::new(3840, 2160),
        Resolution::new(1000, 720),
        Resolution::new(1280, 720),
        Resolution::new(640, 480),
    ];

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(1500, 1080)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = ValueParseError;

    /// Parses `WxH`, ignoring anything after the first whitespace
    /// (so `"1920x1080 (1080p)"` is accepted).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let head = s.split_whitespace().next().unwrap_or_default();
        let (w, h) = head
            .split_once(['x', 'X'])
            .ok_or_else(|| ValueParseError::new("resolution", s))?;
        let width: u32 = w.parse().map_err(|_| ValueParseError::new("resolution", s))?;
        let height: u32 = h.parse().map_err(|_| ValueParseError::new("resolution", s))?;
        if width == 0 || height == 0 {
            return Err(ValueParseError::new("resolution", s));
        }
        Ok(Self::new(width, height))
    }
}

impl Serialize for Resolution {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Resolution {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// What is shown behind the lyrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Background {
    Color(Color),
    Image(PathBuf),
    Video(PathBuf),
}

impl Background {
    /// Background for a media file, classified by extension.
    pub fn from_media(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        match MediaKind::from_path(&path)? {
            MediaKind::Image => Some(Self::Image(path)),
            MediaKind::Video => Some(Self::Video(path)),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Color(_) => None,
            Self::Image(p) | Self::Video(p) => Some(p),
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Self::Color(c) => c.to_string(),
            Self::Image(p) | Self::Video(p) => p.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_parses_rgb_and_rgba() {
        let c: Color = "#102030".parse().unwrap();
        assert_eq!(c, Color::rgb(0x10, 0x20, 0x30));
        assert!(!c.is_translucent());

        let c: Color = "10203080".parse().unwrap();
        assert_eq!(c.a, 0x80);
        assert!(c.is_translucent());
        assert_eq!(c.to_string(), "#10203080");
    }

    #[test]
    fn color_rejects_garbage() {
        assert!("#12345".parse::<Color>().is_err());
        assert!("#gg0000".parse::<Color>().is_err());
    }

    #[test]
    fn color_ffmpeg_notation() {
        assert_eq!(Color::rgb(255, 0, 16).to_ffmpeg(), "0xff0010");
        assert_eq!(Color::rgba(0, 0, 0, 0).to_ffmpeg(), "0x000000@0.000");
    }

    #[test]
    fn resolution_parses_labelled_preset() {
        let r: Resolution = "1920x1080 (1080p)".parse().unwrap();
        assert_eq!(r, Resolution::new(1920, 1080));
        assert!("1920".parse::<Resolution>().is_err());
        assert!("0x10".parse::<Resolution>().is_err());
    }

    #[test]
    fn background_from_media_uses_extension() {
        assert_eq!(
            Background::from_media("a/bg.JPG"),
            Some(Background::Image(PathBuf::from("a/bg.JPG")))
        );
        assert_eq!(
            Background::from_media("bg.webm"),
            Some(Background::Video(PathBuf::from("bg.webm")))
        );
        assert_eq!(Background::from_media("bg.txt"), None);
    }
}
