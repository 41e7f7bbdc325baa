//! Bounded execution of the external commands the detector depends on.
//!
//! `ps`, `uptime`, `getent` and `ssh` all run through [`ToolRunner`]. Each
//! command gets a wall-clock limit, after which it is sent SIGTERM and then
//! SIGKILL. Its output is captured up to a byte cap and it sees a scrubbed
//! environment with `LC_ALL=C`, so decimal points in load averages and
//! percentages do not depend on the caller's locale.
//!
//! Output pipes are drained by one reader thread per stream. A reader keeps
//! consuming (and discarding) past the cap, so a chatty command never stalls
//! on a full pipe, and the runner stops waiting for a reader shortly after
//! the command exits, so a leftover grandchild holding the pipe open cannot
//! hang a check.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

/// Default wall-clock limit per command.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default cap per output stream (1 MiB; `ps -A` on a large host is a few
/// hundred KiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Time between SIGTERM and SIGKILL.
const TERM_GRACE: Duration = Duration::from_millis(500);

/// How long to wait for readers once the command has exited.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Poll interval while the command runs.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Characters that never appear in a command name we run.
const SHELL_METACHARS: &[char] = &[';', '|', '&', '$', '`', '>', '<', '\n', '(', ')'];

/// Why a command could not be run at all.
///
/// A command that runs and fails is not an error here; its exit status is
/// in [`ToolOutput`].
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("command failed to spawn: {0}")]
    SpawnFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid command path: {0}")]
    InvalidPath(String),
}

/// What a finished (or killed) command left behind.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub command: String,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the command was killed by a signal.
    pub exit_code: Option<i32>,
    /// Either stream hit the byte cap.
    pub truncated: bool,
    pub timed_out: bool,
    pub duration: Duration,
}

impl ToolOutput {
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Exited normally with status 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// One command invocation.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub command: String,
    pub args: Vec<String>,
    /// Overrides the runner's limit.
    pub timeout: Option<Duration>,
    /// Variables kept from the caller's environment besides `PATH`.
    pub passthrough_env: Vec<String>,
}

impl ToolSpec {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            timeout: None,
            passthrough_env: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_passthrough_env<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.passthrough_env.extend(names.into_iter().map(Into::into));
        self
    }

    fn validate(&self) -> Result<(), ToolError> {
        if self.command.is_empty() || self.command.contains(SHELL_METACHARS) {
            return Err(ToolError::InvalidPath(self.command.clone()));
        }
        Ok(())
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let kept = std::iter::once("PATH").chain(self.passthrough_env.iter().map(String::as_str));
        for name in kept {
            if let Some(value) = std::env::var_os(name) {
                command.env(name, value);
            }
        }
        command.env("LC_ALL", "C").env("LANG", "C");
        command
    }
}

/// Runs commands under a time limit and output cap.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    timeout: Duration,
    max_output_bytes: usize,
}

impl Default for ToolRunner {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

impl ToolRunner {
    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Change the per-stream byte cap.
    pub fn with_output_cap(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Shorthand for [`ToolRunner::run`] with borrowed arguments.
    pub fn run_tool(&self, cmd: &str, args: &[&str]) -> Result<ToolOutput, ToolError> {
        let spec = ToolSpec::new(cmd, args.iter().map(|s| s.to_string()).collect());
        self.run(&spec)
    }

    #[instrument(level = "debug", skip(self, spec), fields(cmd = %spec.command))]
    pub fn run(&self, spec: &ToolSpec) -> Result<ToolOutput, ToolError> {
        spec.validate()?;
        let timeout = spec.timeout.unwrap_or(self.timeout);
        debug!(args = ?spec.args, timeout_ms = timeout.as_millis() as u64, "running command");

        let start = Instant::now();
        let mut child = spec.to_command().spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ToolError::CommandNotFound(spec.command.clone()),
            _ => ToolError::SpawnFailed(e.to_string()),
        })?;

        let stdout = child
            .stdout
            .take()
            .map(|s| StreamCapture::spawn(s, self.max_output_bytes));
        let stderr = child
            .stderr
            .take()
            .map(|s| StreamCapture::spawn(s, self.max_output_bytes));

        let (exit_code, timed_out) = wait_until(&mut child, start + timeout)?;

        let stdout = stdout.map(StreamCapture::finish).unwrap_or_default();
        let stderr = stderr.map(StreamCapture::finish).unwrap_or_default();
        let duration = start.elapsed();
        debug!(
            duration_ms = duration.as_millis() as u64,
            exit_code = ?exit_code,
            timed_out,
            "command finished"
        );

        Ok(ToolOutput {
            command: spec.command.clone(),
            truncated: stdout.truncated || stderr.truncated,
            stdout: stdout.data,
            stderr: stderr.data,
            exit_code,
            timed_out,
            duration,
        })
    }
}

/// Poll the child until it exits or the deadline passes.
fn wait_until(child: &mut Child, deadline: Instant) -> Result<(Option<i32>, bool), ToolError> {
    loop {
        if let Some(status) = child.try_wait()? {
            trace!(exit_code = ?status.code(), "command exited");
            return Ok((status.code(), false));
        }
        if Instant::now() >= deadline {
            warn!(pid = child.id(), "command timed out, terminating");
            terminate(child);
            let code = child.try_wait().ok().flatten().and_then(|s| s.code());
            return Ok((code, true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// SIGTERM, then SIGKILL if the child is still there after the grace period.
#[cfg(unix)]
fn terminate(child: &mut Child) {
    let pid = child.id() as libc::pid_t;
    // SAFETY: pid is our own child, which has not been reaped yet.
    unsafe {
        libc::kill(pid, libc::SIGTERM);
    }
    let grace_end = Instant::now() + TERM_GRACE;
    while Instant::now() < grace_end {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        thread::sleep(POLL_INTERVAL);
    }
    debug!(pid, "still running after SIGTERM, sending SIGKILL");
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Bytes kept from one stream.
#[derive(Debug, Default)]
struct Captured {
    data: Vec<u8>,
    truncated: bool,
}

impl Captured {
    fn push(&mut self, chunk: &[u8], cap: usize) {
        let room = cap.saturating_sub(self.data.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.data.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }
}

/// A reader thread filling a shared, capped buffer.
struct StreamCapture {
    buffer: Arc<Mutex<Captured>>,
    done: mpsc::Receiver<()>,
}

impl StreamCapture {
    fn spawn<R: Read + Send + 'static>(mut stream: R, cap: usize) -> Self {
        let buffer = Arc::new(Mutex::new(Captured::default()));
        let (tx, done) = mpsc::channel();
        let shared = Arc::clone(&buffer);
        thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match stream.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        if let Ok(mut captured) = shared.lock() {
                            captured.push(&chunk[..n], cap);
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
            let _ = tx.send(());
        });
        Self { buffer, done }
    }

    /// Whatever was read by EOF, or by the drain grace period.
    fn finish(self) -> Captured {
        if self.done.recv_timeout(DRAIN_GRACE).is_err() {
            trace!("stream still open after exit, keeping what was read");
        }
        self.buffer
            .lock()
            .map(|mut captured| std::mem::take(&mut *captured))
            .unwrap_or_default()
    }
}
