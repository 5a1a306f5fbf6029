//! Render-plan compilation errors.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::external::{ParseError, ProbeError, SubtitleCompileError};

/// Why one bundle could not be compiled.
///
/// Each variant aborts only the bundle it was raised for.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("'{primary}': no audio file selected")]
    MissingAudio { primary: PathBuf },

    #[error("Audio file not found: {path}")]
    AudioNotFound { path: PathBuf },

    #[error("Cannot read audio '{path}': {source}")]
    UnreadableAudio {
        path: PathBuf,
        #[source]
        source: ProbeError,
    },

    #[error("Cannot determine size of background '{path}': {source}")]
    UnreadableBackground {
        path: PathBuf,
        #[source]
        source: ProbeError,
    },

    #[error("Cannot read {which} clip '{path}': {source}")]
    UnreadableClip {
        which: &'static str,
        path: PathBuf,
        #[source]
        source: ProbeError,
    },

    #[error("Subtitle file not found: {path}")]
    SubtitleNotFound { path: PathBuf },

    #[error("Unable to process project '{path}': {source}")]
    Project {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("Subtitle conversion failed for '{path}': {source}")]
    Subtitle {
        path: PathBuf,
        #[source]
        source: SubtitleCompileError,
    },

    #[error("Duration of '{path}' is unknown; {reason}")]
    UnknownDuration { path: PathBuf, reason: &'static str },

    #[error("I/O error while {operation} '{path}': {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CompileError {
    pub fn missing_audio(primary: &Path) -> Self {
        Self::MissingAudio {
            primary: primary.to_path_buf(),
        }
    }

    pub fn audio_not_found(path: &Path) -> Self {
        Self::AudioNotFound {
            path: path.to_path_buf(),
        }
    }

    pub fn unreadable_audio(path: &Path, source: ProbeError) -> Self {
        Self::UnreadableAudio {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn unreadable_background(path: &Path, source: ProbeError) -> Self {
        Self::UnreadableBackground {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn unreadable_clip(which: &'static str, path: &Path, source: ProbeError) -> Self {
        Self::UnreadableClip {
            which,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn project(path: &Path, source: ParseError) -> Self {
        Self::Project {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn subtitle(path: &Path, source: SubtitleCompileError) -> Self {
        Self::Subtitle {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn unknown_duration(path: &Path, reason: &'static str) -> Self {
        Self::UnknownDuration {
            path: path.to_path_buf(),
            reason,
        }
    }

    pub fn io(operation: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
