//! Metric collection.
//!
//! The decision layer never branches on platform identity. It sees one
//! [`MetricsAdapter`] and a set of plain numeric readings:
//! - Procfs adapter (Linux): everything read from /proc
//! - ps adapter (other Unix): load and process samples from `ps`/`uptime`
//! - Static adapter (`test-utils`): fixture readings for tests
//!
//! A `None` reading means the dimension is unavailable on this host. Callers
//! degrade it to a neutral value instead of aborting. Process sampling keeps
//! "the process is gone" (`Ok(None)`) apart from "the adapter could not
//! tell" (`Err(SampleError)`).

pub mod parsers;
pub mod procfs;
pub mod ps;
pub mod tool_runner;
mod types;

pub use parsers::{
    parse_cpu_count, parse_cpu_times, parse_loadavg, parse_meminfo, parse_meminfo_used_ratio,
    parse_proc_stat, parse_ps_pids, parse_ps_sample, parse_uptime_load, parse_uptime_seconds,
    parse_vm_stat, MemInfo, ProcStat, VmStat,
};
pub use procfs::ProcfsAdapter;
pub use ps::PsAdapter;
pub use tool_runner::{ToolError, ToolOutput, ToolRunner, ToolSpec};
pub use types::{CpuTimes, LoadAverages, ProcessSample, RawMetrics};

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A process could not be sampled, though it may still be running.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("{command} timed out")]
    TimedOut { command: String },

    #[error("{command} failed: {detail}")]
    Failed { command: String, detail: String },

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unparsable sample for pid {pid}")]
    Malformed { pid: u32 },
}

/// Source of host and process readings.
pub trait MetricsAdapter: Send + Sync {
    /// Short name for logs (`procfs`, `ps`, `static`).
    fn platform(&self) -> &str;

    /// 1, 5 and 15 minute load averages.
    fn load_averages(&self) -> Option<LoadAverages>;

    /// Fraction of physical memory in use.
    fn memory_used_ratio(&self) -> Option<f64>;

    /// Fraction of CPU time spent in iowait, averaged over `window`.
    ///
    /// Blocks for `window`.
    fn io_wait_ratio(&self, window: Duration) -> Option<f64>;

    /// Online CPU count.
    fn cpu_count(&self) -> Option<u32>;

    /// Every pid currently visible.
    fn list_pids(&self) -> Vec<u32>;

    /// Sample one process.
    ///
    /// `Ok(None)` means the process no longer exists. An error is never
    /// evidence that it is gone.
    fn sample_process(&self, pid: u32) -> Result<Option<ProcessSample>, SampleError>;
}

/// Pick the adapter for the running platform.
pub fn detect_adapter(command_timeout: Duration) -> Box<dyn MetricsAdapter> {
    if cfg!(target_os = "linux") && std::path::Path::new("/proc/loadavg").exists() {
        Box::new(ProcfsAdapter::default())
    } else {
        Box::new(PsAdapter::new(ToolRunner::with_timeout(command_timeout)))
    }
}
