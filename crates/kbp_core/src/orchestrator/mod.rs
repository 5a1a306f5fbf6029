//! Batch orchestrator for running render plans.
//!
//! Compiled plans become batch items that run strictly one after another
//! through an external encoder. Progress, errors and the terminal outcome
//! are reported as [`BatchEvent`]s.
//!
//! # Architecture
//!
//! ```text
//! JobOrchestrator
//!     ├── Job 1: EncoderArgsBuilder → EncoderLauncher → ProgressTracker
//!     ├── Job 2: (compile failed, reported as fatal)
//!     └── Job 3: ...
//! ```
//!
//! # Example
//!
//! ```ignore
//! use kbp_core::orchestrator::{CancelToken, FfmpegLauncher, JobOrchestrator};
//!
//! let orchestrator = JobOrchestrator::new(Arc::new(FfmpegLauncher::default()), logs_dir);
//! let (handle, mut events) = orchestrator.spawn(items, CancelToken::new());
//! while let Some(event) = events.blocking_recv() {
//!     println!("{:?}", event);
//! }
//! let report = handle.join().unwrap();
//! ```

mod cancel;
mod errors;
mod events;
mod job;
mod process;
mod progress;
mod runner;

pub use cancel::CancelToken;
pub use errors::{JobError, JobResult};
pub use events::{BatchEvent, BatchProgress};
pub use job::{BatchItem, BatchReport, JobRecord, JobState};
pub use process::{EncoderLauncher, EncoderProcess, FfmpegLauncher, LinePoll, ProcessExit};
pub use progress::{parse_out_time, ProgressTracker};
pub use runner::{JobOrchestrator, DEFAULT_POLL_INTERVAL};
