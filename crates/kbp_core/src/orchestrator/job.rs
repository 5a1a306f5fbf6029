//! Batch items, job states and the batch report.

use std::path::PathBuf;
use std::time::Duration;

use crate::render::{CompileError, RenderPlan};

/// One entry of a batch: a compiled plan, or the error that kept a bundle
/// from compiling. Failed items are reported in order without running.
#[derive(Debug)]
pub enum BatchItem {
    Ready(RenderPlan),
    Failed { label: String, error: CompileError },
}

impl BatchItem {
    pub fn label(&self) -> &str {
        match self {
            Self::Ready(plan) => &plan.label,
            Self::Failed { label, .. } => label,
        }
    }
}

impl From<RenderPlan> for BatchItem {
    fn from(plan: RenderPlan) -> Self {
        Self::Ready(plan)
    }
}

/// Lifecycle of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

/// Outcome of one job.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub label: String,
    pub state: JobState,
    /// Written file on success.
    pub output: Option<PathBuf>,
    pub error: Option<String>,
    /// Wall-clock time spent running.
    pub duration: Duration,
}

impl JobRecord {
    pub fn pending(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: JobState::Pending,
            output: None,
            error: None,
            duration: Duration::ZERO,
        }
    }
}

/// Outcome of a whole batch, in plan order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub jobs: Vec<JobRecord>,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn count(&self, state: JobState) -> usize {
        self.jobs.iter().filter(|j| j.state == state).count()
    }

    pub fn fatal_errors(&self) -> usize {
        self.count(JobState::Failed)
    }

    pub fn had_fatal_errors(&self) -> bool {
        self.fatal_errors() > 0
    }
}
