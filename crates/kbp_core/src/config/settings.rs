//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::external::LyricOptions;
use crate::logging::{LogConfig, LogLevel};
use crate::models::{
    parse_clip_time, AspectPreset, ClipOverlay, Color, Container, IntroOutroSettings, Resolution,
    ValueParseError, WrapStyle,
};
use crate::render::{Quality, RenderSettings};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub subtitle: SubtitleSettings,

    #[serde(default)]
    pub video: VideoSettings,

    #[serde(default)]
    pub audio: AudioSettings,

    /// Options for converting lyric files into projects.
    #[serde(default)]
    pub lyrics: LyricOptions,

    #[serde(default)]
    pub tools: ToolSettings,

    #[serde(default)]
    pub batch: BatchSettings,

    /// Clip shown over the start of every track.
    #[serde(default)]
    pub intro: ClipSettings,

    /// Clip shown over the end of every track.
    #[serde(default)]
    pub outro: ClipSettings,
}

impl Settings {
    /// Immutable render settings for one batch.
    pub fn render_settings(&self) -> RenderSettings {
        let output_dir = match self.paths.output_folder.trim() {
            "" => None,
            dir => Some(PathBuf::from(dir)),
        };
        RenderSettings {
            output_dir,
            aspect: self.subtitle.aspect,
            fade_in_ms: self.subtitle.fade_in_ms,
            fade_out_ms: self.subtitle.fade_out_ms,
            offset_ms: self.subtitle.offset_ms,
            transparency: self.subtitle.transparency,
            overlap_wipe: self.subtitle.overlap_wipe,
            experimental_spacing: self.subtitle.experimental_spacing,
            wrap: self.subtitle.wrap,
            background_color: self.video.background_color,
            resolution: self.video.resolution,
            scale_background: self.video.scale_background,
            loop_background: self.video.loop_background,
            frame_rate: self.video.frame_rate.max(1),
            container: self.video.container,
            video_codec: self.video.codec.clone(),
            quality: if self.video.lossless {
                Quality::Lossless
            } else {
                Quality::Level(self.video.quality)
            },
            audio_codec: self.audio.codec.clone(),
            audio_bitrate: self.audio.bitrate.clone(),
            no_audio: self.audio.no_audio,
            subtitle_only: self.batch.subtitle_only,
        }
    }

    /// Intro and outro overlays applied to every bundle of a batch.
    pub fn intro_outro(&self) -> Result<IntroOutroSettings, ValueParseError> {
        Ok(IntroOutroSettings {
            intro: self.intro.to_overlay()?,
            outro: self.outro.to_overlay()?,
        })
    }

    /// Per-job logger configuration.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.logging.level,
            compact: self.logging.compact,
            progress_step: self.logging.progress_step,
            error_tail: self.logging.error_tail as usize,
            show_timestamps: true,
            show_command: self.logging.show_command,
        }
    }
}

/// Output and log locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Output folder for subtitles and videos. Empty writes into a
    /// `kbp2video` folder next to each project.
    #[serde(default)]
    pub output_folder: String,

    /// Folder for per-job log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: String::new(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level written to job logs.
    #[serde(default)]
    pub level: LogLevel,

    /// Use compact log format.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Progress step, percent (seconds when the song length is unknown).
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Number of encoder output lines attached to a failed job.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Log the encoder command one option per line.
    #[serde(default)]
    pub show_command: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            progress_step: default_progress_step(),
            error_tail: default_error_tail(),
            show_command: false,
        }
    }
}

/// Subtitle conversion options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleSettings {
    #[serde(default)]
    pub aspect: AspectPreset,

    #[serde(default = "default_fade_ms")]
    pub fade_in_ms: u32,

    #[serde(default = "default_fade_ms")]
    pub fade_out_ms: u32,

    /// Replaces each project's own timestamp offset when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_ms: Option<i64>,

    /// Render palette color 0 transparent.
    #[serde(default = "default_true")]
    pub transparency: bool,

    /// Emit tags for overlapping wipes.
    #[serde(default = "default_true")]
    pub overlap_wipe: bool,

    #[serde(default)]
    pub experimental_spacing: bool,

    #[serde(default)]
    pub wrap: WrapStyle,
}

fn default_fade_ms() -> u32 {
    50
}

impl Default for SubtitleSettings {
    fn default() -> Self {
        Self {
            aspect: AspectPreset::default(),
            fade_in_ms: default_fade_ms(),
            fade_out_ms: default_fade_ms(),
            offset_ms: None,
            transparency: true,
            overlap_wipe: true,
            experimental_spacing: false,
            wrap: WrapStyle::default(),
        }
    }
}

/// Background and video encoding options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoSettings {
    /// Used when a track has no background. `#RRGGBB` or `#RRGGBBAA`.
    #[serde(default)]
    pub background_color: Color,

    /// Output size for color backgrounds and scaled backgrounds.
    #[serde(default)]
    pub resolution: Resolution,

    /// Scale image and video backgrounds to fit `resolution`.
    #[serde(default)]
    pub scale_background: bool,

    /// Loop video backgrounds instead of holding their last frame.
    #[serde(default)]
    pub loop_background: bool,

    #[serde(default)]
    pub container: Container,

    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Constant-quality level (CRF); ignored when `lossless` is set.
    #[serde(default = "default_quality")]
    pub quality: u32,

    #[serde(default)]
    pub lossless: bool,

    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
}

fn default_video_codec() -> String {
    "h264".to_string()
}

fn default_quality() -> u32 {
    23
}

fn default_frame_rate() -> u32 {
    60
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            background_color: Color::BLACK,
            resolution: Resolution::default(),
            scale_background: false,
            loop_background: false,
            container: Container::default(),
            codec: default_video_codec(),
            quality: default_quality(),
            lossless: false,
            frame_rate: default_frame_rate(),
        }
    }
}

/// Audio encoding options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSettings {
    #[serde(default = "default_audio_codec")]
    pub codec: String,

    #[serde(default = "default_audio_bitrate")]
    pub bitrate: String,

    /// Leave the audio track out of the output.
    #[serde(default)]
    pub no_audio: bool,
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> String {
    "256k".to_string()
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            codec: default_audio_codec(),
            bitrate: default_audio_bitrate(),
            no_audio: false,
        }
    }
}

/// External programs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,

    #[serde(default = "default_kbputils")]
    pub kbputils: String,

    /// How often a running encode checks for cancellation.
    #[serde(default = "default_cancel_poll_ms")]
    pub cancel_poll_ms: u64,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_kbputils() -> String {
    "kbputils".to_string()
}

fn default_cancel_poll_ms() -> u64 {
    100
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            kbputils: default_kbputils(),
            cancel_poll_ms: default_cancel_poll_ms(),
        }
    }
}

/// Batch behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Only write subtitle files.
    #[serde(default)]
    pub subtitle_only: bool,

    /// Leave background slots empty during association.
    #[serde(default)]
    pub skip_backgrounds: bool,

    /// Replace existing subtitle files without asking.
    #[serde(default)]
    pub overwrite: bool,
}

/// An intro or outro clip as written in the config.
///
/// Times accept `mm:ss.zzz`, `ss.zzz` or plain seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Image or video to overlay. Empty disables the clip.
    #[serde(default)]
    pub file: String,

    #[serde(default = "default_clip_length")]
    pub length: String,

    /// Part of `length` drawn over the song rather than before or after it.
    #[serde(default = "default_clip_zero")]
    pub overlap: String,

    #[serde(default = "default_clip_zero")]
    pub fade_in: String,

    #[serde(default = "default_clip_zero")]
    pub fade_out: String,

    /// Mix the clip's own audio into the output.
    #[serde(default)]
    pub sound: bool,

    /// Fade through black instead of alpha.
    #[serde(default)]
    pub fade_black: bool,
}

fn default_clip_length() -> String {
    "5".to_string()
}

fn default_clip_zero() -> String {
    "0".to_string()
}

impl Default for ClipSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            file: String::new(),
            length: default_clip_length(),
            overlap: default_clip_zero(),
            fade_in: default_clip_zero(),
            fade_out: default_clip_zero(),
            sound: false,
            fade_black: false,
        }
    }
}

impl ClipSettings {
    /// Parse the clip times into an overlay.
    pub fn to_overlay(&self) -> Result<ClipOverlay, ValueParseError> {
        let file = match self.file.trim() {
            "" => None,
            file => Some(PathBuf::from(file)),
        };
        Ok(ClipOverlay {
            enabled: self.enabled,
            file,
            length: parse_clip_time(&self.length)?,
            overlap: parse_clip_time(&self.overlap)?,
            fade_in: parse_clip_time(&self.fade_in)?,
            fade_out: parse_clip_time(&self.fade_out)?,
            sound: self.sound,
            fade_black: self.fade_black,
        })
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Subtitle,
    Video,
    Audio,
    Lyrics,
    Tools,
    Batch,
    Intro,
    Outro,
}

impl ConfigSection {
    pub fn all() -> &'static [ConfigSection] {
        &[
            ConfigSection::Paths,
            ConfigSection::Logging,
            ConfigSection::Subtitle,
            ConfigSection::Video,
            ConfigSection::Audio,
            ConfigSection::Lyrics,
            ConfigSection::Tools,
            ConfigSection::Batch,
            ConfigSection::Intro,
            ConfigSection::Outro,
        ]
    }

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Subtitle => "subtitle",
            ConfigSection::Video => "video",
            ConfigSection::Audio => "audio",
            ConfigSection::Lyrics => "lyrics",
            ConfigSection::Tools => "tools",
            ConfigSection::Batch => "batch",
            ConfigSection::Intro => "intro",
            ConfigSection::Outro => "outro",
        }
    }

    /// Comment written above the table.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Output and log folders",
            ConfigSection::Logging => "Per-job logging",
            ConfigSection::Subtitle => "Subtitle conversion",
            ConfigSection::Video => "Background and video encoding",
            ConfigSection::Audio => "Audio encoding",
            ConfigSection::Lyrics => "Lyric file import",
            ConfigSection::Tools => "External programs",
            ConfigSection::Batch => "Batch behavior",
            ConfigSection::Intro => "Clip overlaid at the start of every track",
            ConfigSection::Outro => "Clip overlaid at the end of every track",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[video]"));
        assert!(toml.contains("background_color = \"#000000\""));
        assert!(toml.contains("aspect = \"cdg-borders\""));
    }

    #[test]
    fn settings_round_trip() {
        let mut settings = Settings::default();
        settings.subtitle.offset_ms = Some(-120);
        settings.video.resolution = Resolution::new(1920, 1080);
        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.subtitle.offset_ms, Some(-120));
        assert_eq!(parsed.video.resolution, Resolution::new(1920, 1080));
        assert_eq!(parsed.logging.compact, settings.logging.compact);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[video]\ncontainer = \"webm\"\ncodec = \"libvpx-vp9\"";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        assert_eq!(parsed.video.container, Container::Webm);
        assert_eq!(parsed.video.frame_rate, 60);
        assert_eq!(parsed.audio.codec, "aac");
        assert_eq!(parsed.lyrics.max_lines_per_page, 6);
    }

    #[test]
    fn clip_sections_parse_times() {
        let content = r#"
[intro]
enabled = true
file = "/clips/logo.png"
length = "0:07.500"
overlap = "2"
fade_in = "0.5"
fade_out = "1"
"#;
        let parsed: Settings = toml::from_str(content).unwrap();
        let advanced = parsed.intro_outro().unwrap();
        assert_eq!(
            advanced.intro,
            ClipOverlay::new("/clips/logo.png", 7.5)
                .with_overlap(2.0)
                .with_fades(0.5, 1.0)
        );
        assert!(!advanced.outro.is_active());
    }

    #[test]
    fn bad_clip_time_is_an_error() {
        let mut settings = Settings::default();
        settings.outro.length = "1:75".to_string();
        let err = settings.intro_outro().unwrap_err();
        assert_eq!(err.kind, "time");
        assert_eq!(err.value, "1:75");
    }

    #[test]
    fn render_settings_projection() {
        let mut settings = Settings::default();
        let defaults = settings.render_settings();
        assert_eq!(defaults, RenderSettings::default());

        settings.paths.output_folder = "/videos".to_string();
        settings.video.lossless = true;
        settings.subtitle.aspect = AspectPreset::WideBorders;
        settings.batch.subtitle_only = true;
        let render = settings.render_settings();
        assert_eq!(render.output_dir, Some(PathBuf::from("/videos")));
        assert_eq!(render.quality, Quality::Lossless);
        assert_eq!(render.aspect, AspectPreset::WideBorders);
        assert!(render.subtitle_only);
    }
}
