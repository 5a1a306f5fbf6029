//! Errors raised by external collaborators.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Project file could not be read or converted.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read project '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed project '{path}': {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("Lyric import of '{path}' failed: {message}")]
    ImportFailed { path: PathBuf, message: String },
}

impl ParseError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn malformed(path: &Path, message: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn import_failed(path: &Path, message: impl Into<String>) -> Self {
        Self::ImportFailed {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Subtitle document could not be produced.
#[derive(Error, Debug)]
pub enum SubtitleCompileError {
    #[error("Failed to run {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    #[error("Subtitle conversion of '{path}' produced no output")]
    EmptyOutput { path: PathBuf },
}

impl SubtitleCompileError {
    pub fn launch(tool: impl Into<String>, source: io::Error) -> Self {
        Self::Launch {
            tool: tool.into(),
            source,
        }
    }

    pub fn command_failed(
        tool: impl Into<String>,
        exit_code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }
}

pub type SubtitleCompileResult<T> = Result<T, SubtitleCompileError>;

/// Media file could not be probed.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to run {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} could not read '{path}': {message}")]
    Unreadable {
        tool: String,
        path: PathBuf,
        message: String,
    },

    #[error("Failed to parse probe output for '{path}': {message}")]
    InvalidOutput { path: PathBuf, message: String },

    #[error("No {stream} stream in '{path}'")]
    MissingStream { path: PathBuf, stream: &'static str },
}

impl ProbeError {
    pub fn unreadable(tool: impl Into<String>, path: &Path, message: impl Into<String>) -> Self {
        Self::Unreadable {
            tool: tool.into(),
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn invalid_output(path: &Path, message: impl Into<String>) -> Self {
        Self::InvalidOutput {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn missing_stream(path: &Path, stream: &'static str) -> Self {
        Self::MissingStream {
            path: path.to_path_buf(),
            stream,
        }
    }
}

pub type ProbeResult<T> = Result<T, ProbeError>;
