//! Runs the single-host check on remote hosts over `ssh`.
//!
//! Every host gets its own worker thread (optionally capped). Results are
//! handed back as each host finishes, so output from fast hosts is not held
//! up by slow or unreachable ones.

use crate::collect::{ToolRunner, ToolSpec};
use crate::exit_codes::ExitCode;
use crate::log_event;
use crate::logging::{event_names, LogContext, Stage};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

/// `ssh` exits 255 when the connection itself fails.
const SSH_CONNECTION_FAILED: i32 = 255;

/// Environment the ssh client needs to find keys and agents.
const SSH_PASSTHROUGH_ENV: &[&str] = &["HOME", "USER", "LOGNAME", "SSH_AUTH_SOCK"];

/// Check flags forwarded to every host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardedFlags {
    pub scan: bool,
    pub force: bool,
}

/// Configuration for SSH-based fleet checks.
#[derive(Debug, Clone)]
pub struct SshCheckConfig {
    /// SSH user (if different from current user).
    pub user: Option<String>,
    /// Path to SSH identity file.
    pub identity_file: Option<String>,
    /// SSH port (default: 22).
    pub port: Option<u16>,
    /// Connection timeout in seconds.
    pub connect_timeout: u64,
    /// Total time one host may take.
    pub command_timeout: u64,
    /// Remote binary name/path.
    pub remote_binary: String,
    /// Extra SSH options passed via -o.
    pub ssh_options: Vec<String>,
    /// Maximum concurrent hosts; 0 is unbounded.
    pub parallel: usize,
    pub flags: ForwardedFlags,
}

impl Default for SshCheckConfig {
    fn default() -> Self {
        Self {
            user: None,
            identity_file: None,
            port: None,
            connect_timeout: 10,
            command_timeout: 120,
            remote_binary: "runaway".to_string(),
            ssh_options: vec![
                "BatchMode=yes".to_string(),
                "StrictHostKeyChecking=accept-new".to_string(),
            ],
            parallel: 0,
            flags: ForwardedFlags::default(),
        }
    }
}

impl SshCheckConfig {
    pub fn from_fleet_config(config: &crate::config::FleetConfig, flags: ForwardedFlags) -> Self {
        Self {
            user: config.ssh_user.clone(),
            identity_file: config
                .identity_file
                .as_ref()
                .map(|p| p.display().to_string()),
            port: config.ssh_port,
            connect_timeout: config.connect_timeout_secs,
            command_timeout: config.command_timeout_secs,
            remote_binary: config.remote_binary.clone(),
            ssh_options: config.ssh_options.clone(),
            parallel: config.parallel,
            flags,
        }
    }
}

/// Outcome for one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostStatus {
    Runaway,
    Clean,
    Failed,
}

/// Result of checking a single host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostCheckResult {
    pub host: String,
    pub status: HostStatus,
    /// Payload lines the remote check printed.
    pub lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl HostCheckResult {
    pub fn failed(host: &str, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            host: host.to_string(),
            status: HostStatus::Failed,
            lines: Vec::new(),
            exit_code: None,
            error: Some(error.into()),
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// Result of a fleet-wide check.
#[derive(Debug, Clone, Serialize)]
pub struct FleetReport {
    pub group: String,
    /// RFC 3339 time the fan-out started.
    pub started_at: String,
    pub total_hosts: usize,
    pub excluded: Vec<String>,
    pub runaway_hosts: usize,
    pub clean_hosts: usize,
    pub failed_hosts: usize,
    /// In completion order.
    pub results: Vec<HostCheckResult>,
    pub duration_ms: u64,
}

impl FleetReport {
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from_verdict(self.runaway_hosts > 0)
    }
}

/// Something that can run the check on one host.
pub trait HostExecutor: Send + Sync {
    fn check_host(&self, host: &str) -> HostCheckResult;
}

/// Build the SSH command arguments for checking a remote host.
pub fn build_ssh_args(host: &str, config: &SshCheckConfig) -> Vec<String> {
    let mut args = Vec::new();

    args.push("-o".to_string());
    args.push(format!("ConnectTimeout={}", config.connect_timeout));

    for opt in &config.ssh_options {
        args.push("-o".to_string());
        args.push(opt.clone());
    }

    if let Some(ref identity) = config.identity_file {
        args.push("-i".to_string());
        args.push(identity.clone());
    }

    if let Some(port) = config.port {
        args.push("-p".to_string());
        args.push(port.to_string());
    }

    let target = if let Some(ref user) = config.user {
        format!("{}@{}", user, host)
    } else {
        host.to_string()
    };
    args.push(target);

    let mut remote = format!("{} check", config.remote_binary);
    if config.flags.scan {
        remote.push_str(" --scan");
    }
    if config.flags.force {
        remote.push_str(" --force");
    }
    args.push(remote);

    args
}

/// Map a remote check's exit status and stdout to a host result.
pub fn interpret_remote(
    host: &str,
    exit_code: Option<i32>,
    stdout: &str,
    stderr: &str,
    duration: Duration,
) -> HostCheckResult {
    let lines: Vec<String> = stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    let status = match exit_code {
        Some(code) if code == ExitCode::Runaway.as_i32() => HostStatus::Runaway,
        Some(code) if code == ExitCode::Clean.as_i32() => HostStatus::Clean,
        Some(SSH_CONNECTION_FAILED) => {
            return HostCheckResult::failed(
                host,
                format!("ssh connection failed: {}", stderr.trim()),
                duration,
            )
        }
        Some(code) => {
            return HostCheckResult {
                exit_code: Some(code),
                ..HostCheckResult::failed(
                    host,
                    format!("remote check exited with {}: {}", code, stderr.trim()),
                    duration,
                )
            }
        }
        None => return HostCheckResult::failed(host, "remote check killed by signal", duration),
    };
    HostCheckResult {
        host: host.to_string(),
        status,
        lines,
        exit_code,
        error: None,
        duration_ms: duration.as_millis() as u64,
    }
}

/// Runs `ssh` through the tool runner.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    config: SshCheckConfig,
    runner: ToolRunner,
}

impl SshExecutor {
    pub fn new(config: SshCheckConfig) -> Self {
        let runner = ToolRunner::with_timeout(Duration::from_secs(config.command_timeout));
        Self { config, runner }
    }
}

impl HostExecutor for SshExecutor {
    fn check_host(&self, host: &str) -> HostCheckResult {
        let start = Instant::now();
        let spec = ToolSpec::new("ssh", build_ssh_args(host, &self.config))
            .with_passthrough_env(SSH_PASSTHROUGH_ENV.iter().copied());
        match self.runner.run(&spec) {
            Ok(output) if output.timed_out => HostCheckResult::failed(
                host,
                format!("timed out after {}s", self.config.command_timeout),
                start.elapsed(),
            ),
            Ok(output) => interpret_remote(
                host,
                output.exit_code,
                &output.stdout_str(),
                &output.stderr_str(),
                start.elapsed(),
            ),
            Err(e) => HostCheckResult::failed(host, format!("ssh failed: {}", e), start.elapsed()),
        }
    }
}

/// Check every host concurrently.
///
/// `on_result` is called on the calling thread as each host finishes.
pub fn check_fleet<E, F>(
    group: &str,
    hosts: Vec<String>,
    excluded: Vec<String>,
    parallel: usize,
    executor: Arc<E>,
    log: &LogContext,
    mut on_result: F,
) -> FleetReport
where
    E: HostExecutor + 'static,
    F: FnMut(&HostCheckResult),
{
    let start = Instant::now();
    let started_at = chrono::Utc::now().to_rfc3339();
    let total_hosts = hosts.len();
    let workers = if parallel == 0 {
        total_hosts
    } else {
        parallel.min(total_hosts)
    };

    let queue = Arc::new(Mutex::new(hosts.into_iter().collect::<VecDeque<_>>()));
    let (tx, rx) = mpsc::channel::<HostCheckResult>();

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let executor = Arc::clone(&executor);
        let tx = tx.clone();
        handles.push(std::thread::spawn(move || loop {
            let next = queue.lock().ok().and_then(|mut q| q.pop_front());
            let Some(host) = next else {
                break;
            };
            if tx.send(executor.check_host(&host)).is_err() {
                break;
            }
        }));
    }
    drop(tx);

    let mut results = Vec::with_capacity(total_hosts);
    for result in rx {
        match result.status {
            HostStatus::Failed => log_event!(
                log,
                WARN,
                event_names::FLEET_HOST_FAILED,
                Stage::Fleet,
                "host check failed",
                host = result.host.as_str(),
                error = result.error.as_deref().unwrap_or(""),
                duration_ms = result.duration_ms
            ),
            _ => log_event!(
                log,
                INFO,
                event_names::FLEET_HOST_FINISHED,
                Stage::Fleet,
                "host check finished",
                host = result.host.as_str(),
                runaway = result.status == HostStatus::Runaway,
                duration_ms = result.duration_ms
            ),
        }
        on_result(&result);
        results.push(result);
    }

    for handle in handles {
        let _ = handle.join();
    }

    let count = |status: HostStatus| results.iter().filter(|r| r.status == status).count();
    FleetReport {
        group: group.to_string(),
        started_at,
        total_hosts,
        excluded,
        runaway_hosts: count(HostStatus::Runaway),
        clean_hosts: count(HostStatus::Clean),
        failed_hosts: count(HostStatus::Failed),
        duration_ms: start.elapsed().as_millis() as u64,
        results,
    }
}
