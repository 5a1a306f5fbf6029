//! Logging infrastructure for kbp2video.
//!
//! This module provides:
//! - Per-job loggers with file + callback dual output
//! - Compact mode with progress filtering
//! - Tail buffer of encoder output for error reports
//! - Integration with the `tracing` ecosystem
//!
//! # Example
//!
//! ```no_run
//! use kbp_core::logging::{JobLogger, LogConfig};
//!
//! let logger = JobLogger::new("My Song", "/path/to/logs", LogConfig::default(), None).unwrap();
//!
//! logger.job(1, 3, "My Song");
//! logger.command("ffmpeg -i song.mp3 ...");
//! logger.progress(42.0, Some(180.0));
//! logger.success("Wrote My Song.mp4");
//! ```

mod job_logger;
mod types;

pub use job_logger::{JobLogger, JobLoggerBuilder};
pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG` and falls back to `default_level`. Output goes to
/// stderr so stdout stays free for command output.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init();
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
