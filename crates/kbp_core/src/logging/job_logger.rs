//! Per-job logger with file and callback output.
//!
//! Each render job gets its own logger that:
//! - Writes to a dedicated log file
//! - Sends messages to a callback (if provided)
//! - Supports compact mode with progress filtering
//! - Keeps a tail of encoder output for error reports

use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

/// Per-job logger with dual output (file + callback).
pub struct JobLogger {
    job_name: String,
    log_path: PathBuf,
    file_writer: Arc<Mutex<Option<BufWriter<File>>>>,
    callback: Arc<Mutex<Option<LogCallback>>>,
    config: LogConfig,
    /// Recent encoder output, bounded by `error_tail`.
    tail_buffer: Arc<Mutex<VecDeque<String>>>,
    /// Last progress step logged (compact mode).
    last_step: Arc<Mutex<Option<u32>>>,
}

impl JobLogger {
    /// Create a logger writing `<log_dir>/<job_name>.log`.
    pub fn new(
        job_name: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        callback: Option<LogCallback>,
    ) -> std::io::Result<Self> {
        let job_name = job_name.into();
        let log_dir = log_dir.as_ref();

        fs::create_dir_all(log_dir)?;
        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&job_name)));
        let file_writer = BufWriter::new(File::create(&log_path)?);

        Ok(Self {
            job_name,
            log_path,
            file_writer: Arc::new(Mutex::new(Some(file_writer))),
            callback: Arc::new(Mutex::new(callback)),
            tail_buffer: Arc::new(Mutex::new(VecDeque::with_capacity(config.error_tail))),
            config,
            last_step: Arc::new(Mutex::new(None)),
        })
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Log a message at the specified level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }
        let formatted = self.format_message(message);
        self.output(&formatted);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Success.format(message));
    }

    pub fn section(&self, name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Section.format(name));
    }

    /// Log a job header: `=== Job 2/5: label ===`.
    pub fn job(&self, index: usize, count: usize, label: &str) {
        let header = format!("Job {}/{}: {}", index, count, label);
        self.log(LogLevel::Info, &MessagePrefix::Job.format(&header));
    }

    /// Log a command being executed.
    pub fn command(&self, command: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Command.format(command));
    }

    /// Log an encoder invocation, one option per line when `show_command`
    /// is set, otherwise as a single line.
    pub fn encoder_command(&self, program: &str, tokens: &[String]) {
        if self.config.show_command {
            self.section("encoder command");
            self.info(&crate::render::format_tokens_pretty(program, tokens));
        } else {
            self.command(&format!("{} {}", program, tokens.join(" ")));
        }
    }

    /// Log encode progress (filtered in compact mode).
    ///
    /// With a known total the step is in percent, otherwise in seconds of
    /// encoded time. Returns true if the line was logged.
    pub fn progress(&self, elapsed: f64, total: Option<f64>) -> bool {
        let percent = total
            .filter(|t| *t > 0.0)
            .map(|t| ((elapsed / t) * 100.0).clamp(0.0, 100.0) as u32);

        if self.config.compact {
            let step = self.config.progress_step.max(1);
            let value = percent.unwrap_or(elapsed.max(0.0) as u32);
            let current_step = value / step;
            let mut last = self.last_step.lock();
            let done = percent == Some(100);
            if matches!(*last, Some(l) if current_step <= l) && !done {
                return false;
            }
            if done && *last == Some(u32::MAX) {
                return false;
            }
            *last = Some(if done { u32::MAX } else { current_step });
        }

        let msg = match percent {
            Some(p) => format!("Progress: {}% ({:.1}s)", p, elapsed),
            None => format!("Progress: {:.1}s encoded", elapsed),
        };
        self.log(LogLevel::Info, &msg);
        true
    }

    /// Record an encoder output line.
    ///
    /// Every line goes to the tail buffer; compact mode logs nothing else.
    pub fn output_line(&self, line: &str) {
        {
            let mut buffer = self.tail_buffer.lock();
            if self.config.error_tail == 0 {
                buffer.clear();
            } else {
                while buffer.len() >= self.config.error_tail {
                    buffer.pop_front();
                }
                buffer.push_back(line.to_string());
            }
        }

        if self.config.compact {
            return;
        }
        self.output(&self.format_message(&format!("[encoder] {}", line)));
    }

    /// Write the tail buffer to the log (typically after an error).
    pub fn show_tail(&self, header: &str) {
        let buffer = self.tail_buffer.lock();
        if buffer.is_empty() {
            return;
        }

        self.output(&self.format_message(&format!("[{}/tail]", header)));
        for line in buffer.iter() {
            self.output(&self.format_message(line));
        }
    }

    pub fn get_tail(&self) -> Vec<String> {
        self.tail_buffer.lock().iter().cloned().collect()
    }

    /// Log a value as pretty JSON.
    pub fn json<T: serde::Serialize>(&self, title: &str, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => {
                self.section(title);
                self.debug(&json);
            }
            Err(e) => self.warn(&format!("Cannot serialize {}: {}", title, e)),
        }
    }

    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Flush and close the log file. Later messages only reach the callback.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }
        if let Some(ref callback) = *self.callback.lock() {
            callback(formatted);
        }
    }
}

impl Drop for JobLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Make a job label safe for use as a filename.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect();
    if cleaned.trim().is_empty() {
        "job".to_string()
    } else {
        cleaned
    }
}

/// Builder for creating a [`JobLogger`].
pub struct JobLoggerBuilder {
    job_name: String,
    log_dir: PathBuf,
    config: LogConfig,
    callback: Option<LogCallback>,
}

impl JobLoggerBuilder {
    pub fn new(job_name: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            job_name: job_name.into(),
            log_dir: log_dir.into(),
            config: LogConfig::default(),
            callback: None,
        }
    }

    pub fn config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn compact(mut self, compact: bool) -> Self {
        self.config.compact = compact;
        self
    }

    pub fn progress_step(mut self, step: u32) -> Self {
        self.config.progress_step = step;
        self
    }

    pub fn callback(mut self, callback: LogCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn build(self) -> std::io::Result<JobLogger> {
        JobLogger::new(self.job_name, self.log_dir, self.config, self.callback)
    }
}
