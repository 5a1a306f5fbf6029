//! Interfaces to the collaborators the pipeline drives but does not own.
//!
//! - [`ProjectParser`]: reads karaoke project files and imports lyric files
//! - [`SubtitleCompiler`]: turns a parsed project into a subtitle document
//! - [`MediaProber`]: reads frame size and duration of media files
//!
//! Implementations backed by real tools live in [`ffprobe`] and [`kbputils`].
//! Tests supply scripted fakes.

mod errors;
pub mod ffprobe;
pub mod kbputils;
#[cfg(test)]
pub(crate) mod testing;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::{Color, LyricFormat, WrapStyle};

pub use errors::{
    ParseError, ParseResult, ProbeError, ProbeResult, SubtitleCompileError,
    SubtitleCompileResult,
};
pub use ffprobe::FfprobeProber;
pub use kbputils::KbputilsTool;

/// A parsed karaoke project.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDocument {
    pub path: PathBuf,
    /// Audio file named in the project's track info, as written.
    pub audio_reference: Option<String>,
    /// Palette entry 0, the project's background color.
    pub palette_background: Option<Color>,
}

impl ProjectDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            audio_reference: None,
            palette_background: None,
        }
    }

    /// Referenced audio resolved relative to the project's directory.
    pub fn resolved_audio(&self) -> Option<PathBuf> {
        let reference = self.audio_reference.as_deref()?.trim();
        if reference.is_empty() {
            return None;
        }
        let audio = PathBuf::from(reference);
        if audio.is_absolute() {
            return Some(audio);
        }
        let base = self.path.parent().unwrap_or_else(|| Path::new(""));
        Some(base.join(audio))
    }
}

/// Options applied when a lyric file is converted to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricOptions {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub audio_file: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default = "default_max_lines_per_page")]
    pub max_lines_per_page: u32,
}

fn default_max_lines_per_page() -> u32 {
    6
}

impl Default for LyricOptions {
    fn default() -> Self {
        Self {
            title: String::new(),
            artist: String::new(),
            audio_file: String::new(),
            comments: String::new(),
            max_lines_per_page: default_max_lines_per_page(),
        }
    }
}

/// Reads project files and converts lyric files into projects.
pub trait ProjectParser: Send + Sync {
    /// Parse a project file.
    fn parse(&self, path: &Path) -> ParseResult<ProjectDocument>;

    /// Convert a lyric file into a project written at `target`.
    fn import_lyrics(
        &self,
        source: &Path,
        format: LyricFormat,
        target: &Path,
        options: &LyricOptions,
    ) -> ParseResult<()>;
}

/// Options for subtitle compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleOptions {
    pub target_width: u32,
    pub border: bool,
    pub fade_in_ms: u32,
    pub fade_out_ms: u32,
    /// Replaces the project's own timestamp offset when set.
    pub offset_ms: Option<i64>,
    /// Render palette index 0 transparent.
    pub transparency: bool,
    pub overlap_wipe: bool,
    pub experimental_spacing: bool,
    pub wrap: WrapStyle,
}

impl Default for SubtitleOptions {
    fn default() -> Self {
        Self {
            target_width: 300,
            border: true,
            fade_in_ms: 50,
            fade_out_ms: 50,
            offset_ms: None,
            transparency: true,
            overlap_wipe: true,
            experimental_spacing: false,
            wrap: WrapStyle::NoWrap,
        }
    }
}

/// A compiled subtitle document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleDocument {
    pub contents: String,
}

/// Produces subtitle documents from projects.
pub trait SubtitleCompiler: Send + Sync {
    fn compile(
        &self,
        project: &ProjectDocument,
        options: &SubtitleOptions,
    ) -> SubtitleCompileResult<SubtitleDocument>;
}

/// Frame size and duration of a media file.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    /// Seconds, when known.
    pub duration: Option<f64>,
    pub has_audio: bool,
}

/// Duration of an audio file.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioInfo {
    /// Seconds, when the container reports it.
    pub duration: Option<f64>,
}

/// Reads media properties.
pub trait MediaProber: Send + Sync {
    /// Probe a visual media file. Fails when no video stream has a size.
    fn probe(&self, path: &Path) -> ProbeResult<MediaInfo>;

    /// Probe an audio file. Fails when the file has no audio stream.
    fn probe_audio(&self, path: &Path) -> ProbeResult<AudioInfo>;
}
