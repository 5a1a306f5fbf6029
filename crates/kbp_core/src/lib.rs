//! kbp2video core - turns karaoke projects into lyric videos
//!
//! This crate contains all business logic with zero UI dependencies:
//! associating project files with their media, compiling render plans and
//! running them through ffmpeg. It is used by the `kbp2video` CLI.

pub mod association;
pub mod config;
pub mod external;
pub mod geometry;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod render;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
