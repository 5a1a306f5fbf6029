//! Encoder process abstraction.
//!
//! The orchestrator only needs to read output lines with a timeout, kill
//! and wait. [`FfmpegLauncher`] does this for a real child process with one
//! reader thread per pipe feeding a channel.

use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

/// Result of waiting for one output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinePoll {
    /// A line from stdout (progress).
    Stdout(String),
    /// A line from stderr (diagnostics).
    Stderr(String),
    /// Nothing arrived within the timeout.
    Idle,
    /// Both pipes are closed.
    Closed,
}

/// How the process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    pub success: bool,
    /// `None` when ended by a signal.
    pub code: Option<i32>,
}

impl ProcessExit {
    pub fn success() -> Self {
        Self {
            success: true,
            code: Some(0),
        }
    }

    pub fn failure(code: i32) -> Self {
        Self {
            success: false,
            code: Some(code),
        }
    }
}

/// A running encoder.
pub trait EncoderProcess: Send {
    fn poll_line(&mut self, timeout: Duration) -> LinePoll;

    /// Terminate the process. Killing an exited process is not an error.
    fn kill(&mut self) -> io::Result<()>;

    /// Wait for exit and release the pipes.
    fn wait(&mut self) -> io::Result<ProcessExit>;
}

/// Starts encoder processes.
pub trait EncoderLauncher: Send + Sync {
    /// Program name used in logs and error messages.
    fn program(&self) -> &str;

    fn launch(&self, args: &[String]) -> io::Result<Box<dyn EncoderProcess>>;
}

/// Launches ffmpeg with piped stdout and stderr.
#[derive(Debug, Clone)]
pub struct FfmpegLauncher {
    program: String,
}

impl FfmpegLauncher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfmpegLauncher {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl EncoderLauncher for FfmpegLauncher {
    fn program(&self) -> &str {
        &self.program
    }

    fn launch(&self, args: &[String]) -> io::Result<Box<dyn EncoderProcess>> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        tracing::debug!("Started {} (pid {})", self.program, child.id());

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, tx.clone(), LinePoll::Stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, tx, LinePoll::Stderr));
        }

        Ok(Box::new(ChildProcess { child, rx, readers }))
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    pipe: R,
    tx: Sender<LinePoll>,
    wrap: fn(String) -> LinePoll,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let reader = BufReader::new(pipe);
        // ffmpeg ends status lines with '\r' as well as '\n'
        for line in reader.split(b'\n').map_while(Result::ok) {
            let text = String::from_utf8_lossy(&line);
            for part in text.split('\r').map(str::trim_end).filter(|p| !p.is_empty()) {
                if tx.send(wrap(part.to_string())).is_err() {
                    return;
                }
            }
        }
    })
}

struct ChildProcess {
    child: Child,
    rx: Receiver<LinePoll>,
    readers: Vec<JoinHandle<()>>,
}

impl EncoderProcess for ChildProcess {
    fn poll_line(&mut self, timeout: Duration) -> LinePoll {
        match self.rx.recv_timeout(timeout) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => LinePoll::Idle,
            Err(RecvTimeoutError::Disconnected) => LinePoll::Closed,
        }
    }

    fn kill(&mut self) -> io::Result<()> {
        match self.child.kill() {
            Err(e) if e.kind() != io::ErrorKind::InvalidInput => Err(e),
            _ => Ok(()),
        }
    }

    fn wait(&mut self) -> io::Result<ProcessExit> {
        let status = self.child.wait()?;
        for reader in self.readers.drain(..) {
            let _ = reader.join();
        }
        Ok(ProcessExit {
            success: status.success(),
            code: status.code(),
        })
    }
}
