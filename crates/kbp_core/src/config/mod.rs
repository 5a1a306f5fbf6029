//! Configuration management for kbp2video.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Defaults filled in on load
//!
//! # Example
//!
//! ```no_run
//! use kbp_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new("kbp2video.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Codec: {}", config.settings().video.codec);
//!
//! config.settings_mut().video.frame_rate = 30;
//! config.update_section(ConfigSection::Video).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    AudioSettings, BatchSettings, ClipSettings, ConfigSection, LoggingSettings, PathSettings, Settings,
    SubtitleSettings, ToolSettings, VideoSettings,
};
