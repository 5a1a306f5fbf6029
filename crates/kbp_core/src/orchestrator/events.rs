//! Events emitted while a batch runs, and their aggregation into overall
//! progress.

use std::path::PathBuf;

/// Event sent to the batch observer.
///
/// `job_index` and `job_count` are effective values: `job_index` counts the
/// jobs already completed, and every fatal error lowers `job_count`, so
/// overall progress only covers jobs still expected to finish.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started {
        job_count: usize,
    },
    Progress {
        job_index: usize,
        job_count: usize,
        label: String,
        /// Encoded seconds.
        elapsed: f64,
        /// Expected seconds, `None` when unknown.
        total: Option<f64>,
    },
    /// A job finished and wrote `output`.
    JobSucceeded {
        label: String,
        output: PathBuf,
    },
    Error {
        message: String,
        fatal: bool,
    },
    /// Terminal: the batch was cancelled.
    Cancelled,
    /// Terminal: every job ran.
    Finished {
        had_fatal_errors: bool,
    },
}

impl BatchEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Finished { .. })
    }
}

/// Running view of a batch built from its events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchProgress {
    pub job_index: usize,
    pub job_count: usize,
    pub label: Option<String>,
    pub elapsed: f64,
    pub total: Option<f64>,
    pub fatal_errors: usize,
    pub warnings: usize,
    pub finished: bool,
    pub cancelled: bool,
}

impl BatchProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &BatchEvent) {
        match event {
            BatchEvent::Started { job_count } => {
                *self = Self {
                    job_count: *job_count,
                    ..Self::default()
                };
            }
            BatchEvent::Progress {
                job_index,
                job_count,
                label,
                elapsed,
                total,
            } => {
                self.job_index = *job_index;
                self.job_count = *job_count;
                if self.label.as_deref() != Some(label.as_str()) {
                    self.label = Some(label.clone());
                }
                self.elapsed = *elapsed;
                self.total = *total;
            }
            BatchEvent::JobSucceeded { .. } => {
                self.job_index += 1;
                self.elapsed = 0.0;
                self.total = None;
            }
            BatchEvent::Error { fatal: true, .. } => {
                self.fatal_errors += 1;
                self.job_count = self.job_count.saturating_sub(1);
                self.elapsed = 0.0;
                self.total = None;
            }
            BatchEvent::Error { fatal: false, .. } => self.warnings += 1,
            BatchEvent::Cancelled => self.cancelled = true,
            BatchEvent::Finished { .. } => self.finished = true,
        }
    }

    /// Percent of the current job, `None` when its length is unknown.
    pub fn job_percent(&self) -> Option<f64> {
        let total = self.total.filter(|t| *t > 0.0)?;
        Some((self.elapsed / total * 100.0).clamp(0.0, 100.0))
    }

    /// Overall percent: `(index * 100 + job percent) / (count * 100)`.
    pub fn overall_percent(&self) -> f64 {
        if self.finished || self.job_count == 0 {
            return 100.0;
        }
        let done = self.job_index as f64 * 100.0 + self.job_percent().unwrap_or(0.0);
        (done / (self.job_count as f64 * 100.0) * 100.0).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(job_index: usize, job_count: usize, elapsed: f64) -> BatchEvent {
        BatchEvent::Progress {
            job_index,
            job_count,
            label: "Song".to_string(),
            elapsed,
            total: Some(200.0),
        }
    }

    #[test]
    fn overall_progress_spans_jobs() {
        let mut p = BatchProgress::new();
        p.apply(&BatchEvent::Started { job_count: 4 });
        assert_eq!(p.overall_percent(), 0.0);

        p.apply(&progress(0, 4, 100.0));
        assert_eq!(p.job_percent(), Some(50.0));
        assert!((p.overall_percent() - 12.5).abs() < 1e-9);

        p.apply(&BatchEvent::JobSucceeded {
            label: "Song".to_string(),
            output: PathBuf::from("/out/Song.mp4"),
        });
        assert!((p.overall_percent() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn fatal_errors_shrink_the_denominator() {
        let mut p = BatchProgress::new();
        p.apply(&BatchEvent::Started { job_count: 4 });
        p.apply(&BatchEvent::Error {
            message: "bad".to_string(),
            fatal: false,
        });
        assert_eq!(p.job_count, 4);

        p.apply(&BatchEvent::Error {
            message: "worse".to_string(),
            fatal: true,
        });
        assert_eq!(p.job_count, 3);
        p.apply(&progress(0, 3, 200.0));
        assert!((p.overall_percent() - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!((p.fatal_errors, p.warnings), (1, 1));
    }

    #[test]
    fn unknown_total_counts_completed_jobs_only() {
        let mut p = BatchProgress::new();
        p.apply(&BatchEvent::Started { job_count: 2 });
        p.apply(&BatchEvent::Progress {
            job_index: 1,
            job_count: 2,
            label: "B".to_string(),
            elapsed: 42.0,
            total: None,
        });
        assert_eq!(p.job_percent(), None);
        assert_eq!(p.overall_percent(), 50.0);

        p.apply(&BatchEvent::Finished {
            had_fatal_errors: false,
        });
        assert_eq!(p.overall_percent(), 100.0);
        assert!(BatchEvent::Cancelled.is_terminal());
    }
}
