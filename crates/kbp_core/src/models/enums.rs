//! Core enums used throughout the pipeline.

use serde::{Deserialize, Serialize};

/// Category a dropped file is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    /// Karaoke project file (`.kbp`).
    Project,
    /// Ready-made subtitle document (`.ass`).
    Subtitle,
    Audio,
    /// Still image or video used behind the lyrics.
    Background,
}

impl FileCategory {
    /// All categories in table column order.
    pub fn all() -> &'static [FileCategory] {
        &[Self::Project, Self::Subtitle, Self::Audio, Self::Background]
    }

    /// Whether files of this category can be the primary file of a bundle.
    pub fn is_primary(&self) -> bool {
        matches!(self, Self::Project | Self::Subtitle)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Subtitle => "subtitle",
            Self::Audio => "audio",
            Self::Background => "background",
        }
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lyric formats that can be imported into a project file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LyricFormat {
    /// Timed LRC lyrics.
    Lrc,
    /// Doblon plain-text lyric export.
    DoblonTxt,
}

impl LyricFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lrc => "lrc",
            Self::DoblonTxt => "doblon-txt",
        }
    }
}

/// Subtitle canvas presets.
///
/// Each preset pairs the subtitle target width with whether the project's
/// border area is kept. The canvas height is 216 with borders, 192 without.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AspectPreset {
    /// CDG, borders (25:18).
    #[default]
    CdgBorders,
    /// Wide, borders (16:9).
    WideBorders,
    /// Standard, borders (4:3).
    StandardBorders,
    /// CDG no border (3:2).
    CdgNoBorder,
    /// Wide no border (16:9).
    WideNoBorder,
}

impl AspectPreset {
    /// Native project width; presets using it need no explicit width option.
    pub const NATIVE_WIDTH: u32 = 300;

    pub const ALL: &'static [AspectPreset] = &[
        Self::CdgBorders,
        Self::WideBorders,
        Self::StandardBorders,
        Self::CdgNoBorder,
        Self::WideNoBorder,
    ];

    /// Value written in the config file.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CdgBorders => "cdg-borders",
            Self::WideBorders => "wide-borders",
            Self::StandardBorders => "standard-borders",
            Self::CdgNoBorder => "cdg-no-border",
            Self::WideNoBorder => "wide-no-border",
        }
    }

    /// Subtitle target width for this preset.
    pub fn target_width(&self) -> u32 {
        match self {
            Self::CdgBorders => 300,
            Self::WideBorders => 384,
            Self::StandardBorders => 288,
            Self::CdgNoBorder => 288,
            Self::WideNoBorder => 341,
        }
    }

    /// Whether the project border is kept.
    pub fn border(&self) -> bool {
        matches!(
            self,
            Self::CdgBorders | Self::WideBorders | Self::StandardBorders
        )
    }

    /// Width/height ratio of the subtitle canvas.
    pub fn ass_ratio(&self) -> f64 {
        ass_ratio(self.target_width(), self.border())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CdgBorders => "CDG, borders (25:18)",
            Self::WideBorders => "Wide, borders (16:9)",
            Self::StandardBorders => "Standard, borders (4:3)",
            Self::CdgNoBorder => "CDG no border (3:2)",
            Self::WideNoBorder => "Wide no border (16:9)",
        }
    }
}

impl std::fmt::Display for AspectPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Subtitle canvas ratio for a target width.
pub fn ass_ratio(target_width: u32, border: bool) -> f64 {
    let height = if border { 216.0 } else { 192.0 };
    target_width as f64 / height
}

/// How lines too wide for the canvas are wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WrapStyle {
    #[default]
    NoWrap,
    EvenSplit,
    TopSplit,
    BottomSplit,
}

impl WrapStyle {
    /// Value passed to the subtitle compiler.
    pub fn as_arg(&self) -> &'static str {
        match self {
            Self::NoWrap => "no_wrap",
            Self::EvenSplit => "even_split",
            Self::TopSplit => "top_split",
            Self::BottomSplit => "bottom_split",
        }
    }
}

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    #[default]
    Mp4,
    Mkv,
    Webm,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
            Self::Webm => "webm",
        }
    }

    /// Video encoders offered for this container, preferred first.
    pub fn video_codecs(&self) -> &'static [&'static str] {
        match self {
            Self::Mp4 => &["h264", "libvpx-vp9", "libx265", "libaom-av1"],
            Self::Mkv => &["libvpx-vp9", "h264", "libx265", "libaom-av1"],
            Self::Webm => &["libvpx-vp9", "libaom-av1"],
        }
    }

    /// Audio encoders offered for this container, preferred first.
    pub fn audio_codecs(&self) -> &'static [&'static str] {
        match self {
            Self::Mp4 => &["aac", "mp3", "opus"],
            Self::Mkv => &["flac", "opus", "aac", "mp3"],
            Self::Webm => &["opus"],
        }
    }

    pub fn supports_video_codec(&self, codec: &str) -> bool {
        self.video_codecs().contains(&codec)
    }

    /// `copy` is always accepted for audio.
    pub fn supports_audio_codec(&self, codec: &str) -> bool {
        codec == "copy" || self.audio_codecs().contains(&codec)
    }
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}
