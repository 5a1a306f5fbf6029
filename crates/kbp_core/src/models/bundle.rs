//! Track bundles: one row of work per karaoke track.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::enums::FileCategory;
use super::media::{Background, ValueParseError};

/// A fixed clip overlaid at the start or end of a render.
///
/// Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipOverlay {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// How long the clip is displayed.
    #[serde(default = "default_clip_length")]
    pub length: f64,
    /// How much of `length` overlaps the song itself.
    #[serde(default)]
    pub overlap: f64,
    #[serde(default)]
    pub fade_in: f64,
    #[serde(default)]
    pub fade_out: f64,
    /// Mix the clip's own audio into the output.
    #[serde(default)]
    pub sound: bool,
    /// Fade through black instead of cross-fading with alpha.
    #[serde(default)]
    pub fade_black: bool,
}

fn default_clip_length() -> f64 {
    5.0
}

impl Default for ClipOverlay {
    fn default() -> Self {
        Self {
            enabled: false,
            file: None,
            length: default_clip_length(),
            overlap: 0.0,
            fade_in: 0.0,
            fade_out: 0.0,
            sound: false,
            fade_black: false,
        }
    }
}

impl ClipOverlay {
    /// Create an enabled overlay for a clip file.
    pub fn new(file: impl Into<PathBuf>, length: f64) -> Self {
        Self {
            enabled: true,
            file: Some(file.into()),
            length,
            ..Self::default()
        }
    }

    pub fn with_overlap(mut self, overlap: f64) -> Self {
        self.overlap = overlap;
        self
    }

    pub fn with_fades(mut self, fade_in: f64, fade_out: f64) -> Self {
        self.fade_in = fade_in;
        self.fade_out = fade_out;
        self
    }

    pub fn with_sound(mut self, sound: bool) -> Self {
        self.sound = sound;
        self
    }

    pub fn with_fade_black(mut self, fade_black: bool) -> Self {
        self.fade_black = fade_black;
        self
    }

    /// Enabled with a file to show.
    pub fn is_active(&self) -> bool {
        self.enabled && self.file.is_some() && self.length > 0.0
    }

    /// Portion of the clip that does not overlap the song.
    pub fn padding(&self) -> f64 {
        (self.length - self.overlap.clamp(0.0, self.length)).max(0.0)
    }
}

/// Intro and outro overlays of one bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntroOutroSettings {
    #[serde(default)]
    pub intro: ClipOverlay,
    #[serde(default)]
    pub outro: ClipOverlay,
}

/// Parse a clip time written as `mm:ss.zzz`, `ss.zzz`, or plain seconds.
pub fn parse_clip_time(value: &str) -> Result<f64, ValueParseError> {
    let err = || ValueParseError {
        kind: "time",
        value: value.to_string(),
    };
    let value_trimmed = value.trim();
    let seconds = match value_trimmed.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: u32 = minutes.parse().map_err(|_| err())?;
            let seconds: f64 = seconds.parse().map_err(|_| err())?;
            if !(0.0..60.0).contains(&seconds) {
                return Err(err());
            }
            minutes as f64 * 60.0 + seconds
        }
        None => value_trimmed.parse().map_err(|_| err())?,
    };
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(seconds)
    } else {
        Err(err())
    }
}

/// Column of a bundle that can be filled by association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BundleSlot {
    Audio,
    Background,
}

impl BundleSlot {
    /// Category of files that fill this slot.
    pub fn category(&self) -> FileCategory {
        match self {
            Self::Audio => FileCategory::Audio,
            Self::Background => FileCategory::Background,
        }
    }
}

/// Value held by a bundle slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotValue {
    Audio(PathBuf),
    Background(Background),
}

/// One logical karaoke track and the files chosen for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackBundle {
    /// Project or subtitle file driving the render.
    pub primary: PathBuf,
    pub primary_kind: FileCategory,
    #[serde(default)]
    pub audio: Option<PathBuf>,
    #[serde(default)]
    pub background: Option<Background>,
    #[serde(default)]
    pub advanced: IntroOutroSettings,
}

impl TrackBundle {
    pub fn new(primary: impl Into<PathBuf>, primary_kind: FileCategory) -> Self {
        Self {
            primary: primary.into(),
            primary_kind,
            audio: None,
            background: None,
            advanced: IntroOutroSettings::default(),
        }
    }

    pub fn with_audio(mut self, audio: impl Into<PathBuf>) -> Self {
        self.audio = Some(audio.into());
        self
    }

    pub fn with_background(mut self, background: Background) -> Self {
        self.background = Some(background);
        self
    }

    /// Label used in progress and error messages.
    pub fn label(&self) -> String {
        self.primary
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.primary.display().to_string())
    }

    pub fn is_filled(&self, slot: BundleSlot) -> bool {
        match slot {
            BundleSlot::Audio => self.audio.is_some(),
            BundleSlot::Background => self.background.is_some(),
        }
    }

    pub fn get(&self, slot: BundleSlot) -> Option<SlotValue> {
        match slot {
            BundleSlot::Audio => self.audio.clone().map(SlotValue::Audio),
            BundleSlot::Background => self.background.clone().map(SlotValue::Background),
        }
    }

    /// Fill a slot from a file path. Returns false if the file is not
    /// usable for the slot (e.g. an unknown background type).
    pub fn set_file(&mut self, slot: BundleSlot, path: &Path) -> bool {
        match slot {
            BundleSlot::Audio => {
                self.audio = Some(path.to_path_buf());
                true
            }
            BundleSlot::Background => match Background::from_media(path) {
                Some(bg) => {
                    self.background = Some(bg);
                    true
                }
                None => false,
            },
        }
    }

    /// Display text of a slot, empty when unset.
    pub fn slot_display(&self, slot: BundleSlot) -> String {
        match self.get(slot) {
            Some(SlotValue::Audio(p)) => p.display().to_string(),
            Some(SlotValue::Background(bg)) => bg.display_name(),
            None => String::new(),
        }
    }
}
