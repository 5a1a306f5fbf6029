//! Error types for batch execution.
//!
//! Errors carry context that chains through layers:
//! Job → Compile/Encode → Detail

use std::io;

use thiserror::Error;

use crate::render::CompileError;

/// Why one job of a batch did not produce its output.
#[derive(Error, Debug)]
pub enum JobError {
    /// The bundle never compiled into a plan.
    #[error("'{label}': {source}")]
    Compile {
        label: String,
        #[source]
        source: CompileError,
    },

    /// The encoder could not be started.
    #[error("'{label}': failed to start {program}: {source}")]
    Launch {
        label: String,
        program: String,
        #[source]
        source: io::Error,
    },

    /// The encoder exited unsuccessfully.
    #[error("'{label}': {program} failed with {status}{tail}")]
    EncoderFailed {
        label: String,
        program: String,
        /// `exit code N` or `a signal`.
        status: String,
        /// Last encoder output lines, prefixed with a newline when present.
        tail: String,
    },

    /// Waiting on or stopping the encoder failed.
    #[error("'{label}': I/O error while {operation}: {source}")]
    Io {
        label: String,
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    /// The batch was cancelled while this job ran.
    #[error("'{label}' was cancelled")]
    Cancelled { label: String },
}

impl JobError {
    pub fn compile(label: impl Into<String>, source: CompileError) -> Self {
        Self::Compile {
            label: label.into(),
            source,
        }
    }

    pub fn launch(label: impl Into<String>, program: impl Into<String>, source: io::Error) -> Self {
        Self::Launch {
            label: label.into(),
            program: program.into(),
            source,
        }
    }

    pub fn encoder_failed(
        label: impl Into<String>,
        program: impl Into<String>,
        code: Option<i32>,
        tail: &[String],
    ) -> Self {
        let status = match code {
            Some(code) => format!("exit code {}", code),
            None => "a signal".to_string(),
        };
        let tail = if tail.is_empty() {
            String::new()
        } else {
            format!("\n{}", tail.join("\n"))
        };
        Self::EncoderFailed {
            label: label.into(),
            program: program.into(),
            status,
            tail,
        }
    }

    pub fn io(label: impl Into<String>, operation: &'static str, source: io::Error) -> Self {
        Self::Io {
            label: label.into(),
            operation,
            source,
        }
    }

    pub fn cancelled(label: impl Into<String>) -> Self {
        Self::Cancelled {
            label: label.into(),
        }
    }

    /// Fatal errors remove the job from the batch's expected completions.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Cancelled { .. })
    }
}

/// Result type for job execution.
pub type JobResult<T> = Result<T, JobError>;
