//! Render plans: everything needed to produce one video.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::graph::CompositionGraph;

/// Why an input file is part of the render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InputRole {
    Background,
    Audio,
    /// Intro or outro clip.
    Overlay,
}

/// One `-i` input with the options placed before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputDescriptor {
    pub role: InputRole,
    pub path: PathBuf,
    pub options: Vec<String>,
}

impl InputDescriptor {
    pub fn new(role: InputRole, path: impl Into<PathBuf>) -> Self {
        Self {
            role,
            path: path.into(),
            options: Vec::new(),
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(options.into_iter().map(Into::into));
        self
    }
}

/// Video quality setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Quality {
    /// Constant-quality level (CRF).
    Level(u32),
    Lossless,
}

/// Audio encoding of the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioOutput {
    pub codec: String,
    pub bitrate: Option<String>,
}

/// Output muxing options.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputOptions {
    pub video_codec: String,
    pub quality: Quality,
    pub pixel_format: String,
    pub frame_rate: u32,
    /// `None` when the output has no audio track.
    pub audio: Option<AudioOutput>,
}

/// The encode step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodePlan {
    pub inputs: Vec<InputDescriptor>,
    pub graph: CompositionGraph,
    pub output_path: PathBuf,
    pub output: OutputOptions,
    /// Total output length in seconds; `None` when the audio length is
    /// unknown and the encode is bounded by its shortest stream.
    pub expected_duration: Option<f64>,
}

/// A compiled, immutable description of one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPlan {
    /// Name shown in progress and error messages.
    pub label: String,
    pub primary: PathBuf,
    pub subtitle_path: PathBuf,
    /// `None` in subtitle-only mode.
    pub encode: Option<EncodePlan>,
    /// Non-fatal problems found while compiling.
    pub warnings: Vec<String>,
}

impl RenderPlan {
    pub fn expected_duration(&self) -> Option<f64> {
        self.encode.as_ref().and_then(|e| e.expected_duration)
    }

    pub fn output_path(&self) -> &Path {
        self.encode
            .as_ref()
            .map(|e| e.output_path.as_path())
            .unwrap_or(&self.subtitle_path)
    }
}
