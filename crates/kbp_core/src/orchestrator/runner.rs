//! Sequential batch runner.
//!
//! Jobs run one at a time in plan order. Each job gets its own log file.
//! While the encoder runs, the cancel token is checked between output
//! lines; cancelling kills the encoder and leaves later jobs pending.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::cancel::CancelToken;
use super::errors::{JobError, JobResult};
use super::events::BatchEvent;
use super::job::{BatchItem, BatchReport, JobRecord, JobState};
use super::process::{EncoderLauncher, EncoderProcess, LinePoll};
use super::progress::ProgressTracker;
use crate::logging::{JobLogger, LogConfig};
use crate::render::{EncoderArgsBuilder, RenderPlan};

/// Default interval between cancellation checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runs batches of render plans through an encoder.
pub struct JobOrchestrator {
    launcher: Arc<dyn EncoderLauncher>,
    log_dir: PathBuf,
    log_config: LogConfig,
    poll_interval: Duration,
}

/// Effective position of the running job within the batch.
#[derive(Debug, Clone, Copy)]
struct Slot {
    /// Jobs completed so far.
    completed: usize,
    /// Jobs still expected to complete, including this one.
    count: usize,
    /// 1-based position in plan order.
    number: usize,
    total: usize,
}

impl JobOrchestrator {
    pub fn new(launcher: Arc<dyn EncoderLauncher>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            launcher,
            log_dir: log_dir.into(),
            log_config: LogConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_log_config(mut self, config: LogConfig) -> Self {
        self.log_config = config;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run a batch on a worker thread.
    ///
    /// Events arrive on the returned receiver until a terminal event
    /// (`Finished` or `Cancelled`); the thread yields the final report.
    pub fn spawn(
        self,
        items: Vec<BatchItem>,
        cancel: CancelToken,
    ) -> (JoinHandle<BatchReport>, UnboundedReceiver<BatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = std::thread::spawn(move || self.run(items, &cancel, &tx));
        (handle, rx)
    }

    /// Run a batch on the current thread.
    ///
    /// A failing job is reported as a fatal error and the batch continues.
    pub fn run(
        &self,
        items: Vec<BatchItem>,
        cancel: &CancelToken,
        events: &UnboundedSender<BatchEvent>,
    ) -> BatchReport {
        let total = items.len();
        let mut report = BatchReport {
            jobs: items.iter().map(|item| JobRecord::pending(item.label())).collect(),
            cancelled: false,
        };
        let mut completed = 0;
        let mut count = total;

        tracing::info!("Starting batch of {} job(s)", total);
        emit(events, BatchEvent::Started { job_count: total });

        for (index, item) in items.into_iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!("Batch cancelled before '{}'", item.label());
                report.cancelled = true;
                emit(events, BatchEvent::Cancelled);
                return report;
            }

            let started = Instant::now();
            let result = match item {
                BatchItem::Failed { label, error } => Err(JobError::compile(label, error)),
                BatchItem::Ready(plan) => {
                    for warning in &plan.warnings {
                        emit(
                            events,
                            BatchEvent::Error {
                                message: format!("'{}': {}", plan.label, warning),
                                fatal: false,
                            },
                        );
                    }
                    report.jobs[index].state = JobState::Running;
                    let slot = Slot {
                        completed,
                        count,
                        number: index + 1,
                        total,
                    };
                    self.run_job(&plan, slot, cancel, events)
                }
            };

            let record = &mut report.jobs[index];
            record.duration = started.elapsed();
            match result {
                Ok(output) => {
                    tracing::info!("Job '{}' wrote {}", record.label, output.display());
                    record.state = JobState::Succeeded;
                    record.output = Some(output.clone());
                    completed += 1;
                    emit(
                        events,
                        BatchEvent::JobSucceeded {
                            label: record.label.clone(),
                            output,
                        },
                    );
                }
                Err(err @ JobError::Cancelled { .. }) => {
                    tracing::warn!("{}", err);
                    record.state = JobState::Cancelled;
                    record.error = Some(err.to_string());
                    report.cancelled = true;
                    emit(events, BatchEvent::Cancelled);
                    return report;
                }
                Err(err) => {
                    tracing::error!("{}", err);
                    record.state = JobState::Failed;
                    record.error = Some(err.to_string());
                    count = count.saturating_sub(1);
                    emit(
                        events,
                        BatchEvent::Error {
                            message: err.to_string(),
                            fatal: err.is_fatal(),
                        },
                    );
                }
            }
        }

        let had_fatal_errors = report.had_fatal_errors();
        tracing::info!(
            "Batch finished: {} succeeded, {} failed",
            report.count(JobState::Succeeded),
            report.fatal_errors()
        );
        emit(events, BatchEvent::Finished { had_fatal_errors });
        report
    }

    /// Run one plan. Returns the written file.
    fn run_job(
        &self,
        plan: &RenderPlan,
        slot: Slot,
        cancel: &CancelToken,
        events: &UnboundedSender<BatchEvent>,
    ) -> JobResult<PathBuf> {
        let label = plan.label.as_str();
        let Some(encode) = plan.encode.as_ref() else {
            // Subtitle-only: the subtitle was written while compiling
            return Ok(plan.subtitle_path.clone());
        };

        let logger = JobLogger::new(label, &self.log_dir, self.log_config.clone(), None)
            .map_err(|e| JobError::io(label, "creating job log", e))?;
        logger.job(slot.number, slot.total, label);
        for warning in &plan.warnings {
            logger.warn(warning);
        }
        logger.json("render plan", encode);

        let program = self.launcher.program().to_string();
        let args = EncoderArgsBuilder::new(encode).build();
        logger.encoder_command(&program, &args);

        let process = self
            .launcher
            .launch(&args)
            .map_err(|e| JobError::launch(label, &program, e));
        let mut process = match process {
            Ok(process) => process,
            Err(err) => {
                logger.error(&err.to_string());
                return Err(err);
            }
        };

        let total = encode.expected_duration;
        let mut tracker = ProgressTracker::new();
        loop {
            if cancel.is_cancelled() {
                match stop(process.as_mut(), label) {
                    Ok(()) => logger.warn("Cancelled; encoder stopped"),
                    Err(err) => logger.warn(&format!("Cancelled; {}", err)),
                }
                return Err(JobError::cancelled(label));
            }
            match process.poll_line(self.poll_interval) {
                LinePoll::Stdout(line) => {
                    if let Some(elapsed) = tracker.update(&line) {
                        logger.progress(elapsed, total);
                        emit(events, progress_event(slot, label, elapsed, total));
                    }
                }
                LinePoll::Stderr(line) => logger.output_line(&line),
                LinePoll::Idle => {}
                LinePoll::Closed => break,
            }
        }

        let exit = process
            .wait()
            .map_err(|e| JobError::io(label, "waiting for the encoder", e))?;
        if !exit.success {
            logger.show_tail(&program);
            let err = JobError::encoder_failed(label, &program, exit.code, &logger.get_tail());
            logger.error(&err.to_string());
            return Err(err);
        }

        let elapsed = total.or(tracker.last()).unwrap_or(0.0);
        logger.progress(elapsed, total);
        emit(events, progress_event(slot, label, elapsed, total));
        logger.success(&format!("Wrote {}", encode.output_path.display()));
        Ok(encode.output_path.clone())
    }
}

fn stop(process: &mut dyn EncoderProcess, label: &str) -> JobResult<()> {
    process
        .kill()
        .map_err(|e| JobError::io(label, "stopping the encoder", e))?;
    process
        .wait()
        .map_err(|e| JobError::io(label, "waiting for the encoder", e))?;
    Ok(())
}

fn progress_event(slot: Slot, label: &str, elapsed: f64, total: Option<f64>) -> BatchEvent {
    BatchEvent::Progress {
        job_index: slot.completed,
        job_count: slot.count,
        label: label.to_string(),
        elapsed,
        total,
    }
}

/// Send an event; a dropped receiver is not an error.
fn emit(events: &UnboundedSender<BatchEvent>, event: BatchEvent) {
    let _ = events.send(event);
}
