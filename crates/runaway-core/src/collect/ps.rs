//! Portable Unix metrics adapter backed by `ps` and `uptime`.
//!
//! Used on platforms without a Linux-style /proc. Memory pressure comes from
//! `vm_stat` on macOS and is unavailable elsewhere. No portable command
//! reports I/O-wait, so this adapter leaves it unavailable and triage reads
//! it as zero.

use super::parsers::{parse_ps_pids, parse_ps_sample, parse_uptime_load, parse_vm_stat};
use super::procfs::sysconf_cpu_count;
use super::tool_runner::{ToolOutput, ToolRunner, ToolSpec};
use super::types::{LoadAverages, ProcessSample};
use super::{MetricsAdapter, SampleError};
use std::time::Duration;
use tracing::debug;

/// Build the `ps` arguments for sampling one process.
pub fn build_sample_args(pid: u32) -> Vec<String> {
    vec![
        "-o".to_string(),
        "nice=,ppid=,%cpu=,%mem=".to_string(),
        "-p".to_string(),
        pid.to_string(),
    ]
}

/// Read the result of a `ps -p PID` run.
///
/// `ps` reports a missing pid by printing nothing and exiting non-zero. Only
/// that exact shape means the process is gone; a timeout, a signal, a
/// complaint on stderr or output that does not parse means `ps` itself
/// failed.
pub fn interpret_sample(
    pid: u32,
    output: &ToolOutput,
) -> Result<Option<ProcessSample>, SampleError> {
    if output.timed_out {
        return Err(SampleError::TimedOut {
            command: output.command.clone(),
        });
    }

    let stdout = output.stdout_str();
    if !stdout.trim().is_empty() {
        return parse_ps_sample(pid, &stdout)
            .map(Some)
            .ok_or(SampleError::Malformed { pid });
    }

    let stderr = output.stderr_str();
    match output.exit_code {
        Some(code) if code != 0 && stderr.trim().is_empty() => Ok(None),
        code => Err(SampleError::Failed {
            command: output.command.clone(),
            detail: match stderr.trim() {
                "" => format!("no output, exit status {code:?}"),
                text => text.to_string(),
            },
        }),
    }
}

/// Metrics from `ps(1)` and `uptime(1)`.
#[derive(Debug, Clone, Default)]
pub struct PsAdapter {
    runner: ToolRunner,
}

impl PsAdapter {
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }

    fn stdout_of(&self, spec: ToolSpec) -> Option<String> {
        match self.runner.run(&spec) {
            Ok(output) if output.timed_out => {
                debug!(command = %spec.command, "command timed out");
                None
            }
            Ok(output) if !output.success() => {
                debug!(command = %spec.command, exit = ?output.exit_code, "command failed");
                None
            }
            Ok(output) => Some(output.stdout_str()),
            Err(e) => {
                debug!(command = %spec.command, error = %e, "command failed");
                None
            }
        }
    }

    fn physical_memory_bytes(&self) -> Option<u64> {
        let args = vec!["-n".to_string(), "hw.memsize".to_string()];
        self.stdout_of(ToolSpec::new("sysctl", args))?
            .trim()
            .parse()
            .ok()
    }
}

impl MetricsAdapter for PsAdapter {
    fn platform(&self) -> &str {
        "ps"
    }

    fn load_averages(&self) -> Option<LoadAverages> {
        parse_uptime_load(&self.stdout_of(ToolSpec::new("uptime", Vec::new()))?)
    }

    fn memory_used_ratio(&self) -> Option<f64> {
        if !cfg!(target_os = "macos") {
            return None;
        }
        let total = self.physical_memory_bytes()?;
        parse_vm_stat(&self.stdout_of(ToolSpec::new("vm_stat", Vec::new()))?)?.used_ratio(total)
    }

    fn io_wait_ratio(&self, _window: Duration) -> Option<f64> {
        None
    }

    fn cpu_count(&self) -> Option<u32> {
        sysconf_cpu_count()
    }

    fn list_pids(&self) -> Vec<u32> {
        let args = vec!["-A".to_string(), "-o".to_string(), "pid=".to_string()];
        self.stdout_of(ToolSpec::new("ps", args))
            .map(|out| parse_ps_pids(&out))
            .unwrap_or_default()
    }

    fn sample_process(&self, pid: u32) -> Result<Option<ProcessSample>, SampleError> {
        let output = self.runner.run(&ToolSpec::new("ps", build_sample_args(pid)))?;
        interpret_sample(pid, &output)
    }
}
