//! Global render settings consumed by the compiler.

use std::path::PathBuf;

use crate::external::SubtitleOptions;
use crate::models::{AspectPreset, Color, Container, Resolution, WrapStyle};

use super::plan::Quality;

/// Immutable settings applied to every bundle of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    /// Output folder; `None` uses a `kbp2video` folder next to each primary.
    pub output_dir: Option<PathBuf>,

    pub aspect: AspectPreset,
    pub fade_in_ms: u32,
    pub fade_out_ms: u32,
    pub offset_ms: Option<i64>,
    pub transparency: bool,
    pub overlap_wipe: bool,
    pub experimental_spacing: bool,
    pub wrap: WrapStyle,

    /// Used when a bundle has no background.
    pub background_color: Color,
    /// Output size for color backgrounds and scaled backgrounds.
    pub resolution: Resolution,
    pub scale_background: bool,
    pub loop_background: bool,
    pub frame_rate: u32,

    pub container: Container,
    pub video_codec: String,
    pub quality: Quality,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub no_audio: bool,

    /// Only write subtitle files, no encode.
    pub subtitle_only: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            output_dir: None,
            aspect: AspectPreset::default(),
            fade_in_ms: 50,
            fade_out_ms: 50,
            offset_ms: None,
            transparency: true,
            overlap_wipe: true,
            experimental_spacing: false,
            wrap: WrapStyle::default(),
            background_color: Color::BLACK,
            resolution: Resolution::default(),
            scale_background: false,
            loop_background: false,
            frame_rate: 60,
            container: Container::Mp4,
            video_codec: "h264".to_string(),
            quality: Quality::Level(23),
            audio_codec: "aac".to_string(),
            audio_bitrate: "256k".to_string(),
            no_audio: false,
            subtitle_only: false,
        }
    }
}

impl RenderSettings {
    /// Options passed to the subtitle compiler.
    pub fn subtitle_options(&self) -> SubtitleOptions {
        SubtitleOptions {
            target_width: self.aspect.target_width(),
            border: self.aspect.border(),
            fade_in_ms: self.fade_in_ms,
            fade_out_ms: self.fade_out_ms,
            offset_ms: self.offset_ms,
            transparency: self.transparency,
            overlap_wipe: self.overlap_wipe,
            experimental_spacing: self.experimental_spacing,
            wrap: self.wrap,
        }
    }
}
