//! Data models for kbp2video.
//!
//! This module contains the core data structures shared by the pipeline:
//! - Enums for file categories, aspect presets, containers, wrap styles
//! - Media structures (colors, resolutions, backgrounds)
//! - Track bundles and their intro/outro overlay settings

mod bundle;
mod enums;
mod media;

// Re-export all public types
pub use bundle::{
    parse_clip_time, BundleSlot, ClipOverlay, IntroOutroSettings, SlotValue, TrackBundle,
};
pub use enums::{ass_ratio, AspectPreset, Container, FileCategory, LyricFormat, WrapStyle};
pub use media::{
    extension_of, Background, Color, MediaKind, Resolution, ValueParseError,
    AUDIO_EXTENSIONS, DOBLON_EXTENSIONS, IMAGE_EXTENSIONS, LRC_EXTENSIONS, PROJECT_EXTENSIONS,
    SUBTITLE_EXTENSIONS, VIDEO_EXTENSIONS,
};
