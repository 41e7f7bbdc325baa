//! Linux metrics adapter backed by /proc.

use super::parsers::{
    parse_cpu_count, parse_cpu_times, parse_loadavg, parse_meminfo, parse_meminfo_used_ratio,
    parse_proc_stat, parse_uptime_seconds,
};
use super::types::{LoadAverages, ProcessSample};
use super::{MetricsAdapter, SampleError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;
use tracing::trace;

/// System clock ticks per second (USER_HZ, typically 100).
#[cfg(unix)]
pub fn clk_tck() -> u64 {
    static CLK_TCK: OnceLock<u64> = OnceLock::new();
    *CLK_TCK.get_or_init(|| {
        let tck = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        if tck > 0 {
            tck as u64
        } else {
            100
        }
    })
}

#[cfg(not(unix))]
pub fn clk_tck() -> u64 {
    100
}

/// Memory page size in bytes.
#[cfg(unix)]
pub fn page_size() -> u64 {
    static PAGE_SIZE: OnceLock<u64> = OnceLock::new();
    *PAGE_SIZE.get_or_init(|| {
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            size as u64
        } else {
            4096
        }
    })
}

#[cfg(not(unix))]
pub fn page_size() -> u64 {
    4096
}

/// Online CPUs according to sysconf.
#[cfg(unix)]
pub fn sysconf_cpu_count() -> Option<u32> {
    let cpus = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
    (cpus > 0).then_some(cpus as u32)
}

#[cfg(not(unix))]
pub fn sysconf_cpu_count() -> Option<u32> {
    None
}

/// The pid's directory vanished, or the process exited mid-read (ESRCH).
fn is_gone(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::NotFound || e.raw_os_error() == Some(libc::ESRCH)
}

/// Reads every metric from a procfs mount.
///
/// The root defaults to `/proc`; tests point it at a fixture directory laid
/// out the same way.
#[derive(Debug)]
pub struct ProcfsAdapter {
    root: PathBuf,
    mem_total_kb: OnceLock<Option<u64>>,
}

impl Default for ProcfsAdapter {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl ProcfsAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mem_total_kb: OnceLock::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, rel: impl AsRef<Path>) -> Option<String> {
        let path = self.root.join(rel);
        match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) => {
                trace!(path = %path.display(), error = %e, "procfs read failed");
                None
            }
        }
    }

    /// Read `<pid>/stat`; `Ok(None)` once the process directory is gone.
    fn read_pid_stat(&self, pid: u32) -> Result<Option<String>, SampleError> {
        let path = self.root.join(format!("{pid}/stat"));
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if is_gone(&e) => Ok(None),
            Err(source) => Err(SampleError::Read { path, source }),
        }
    }

    fn mem_total_kb(&self) -> Option<u64> {
        *self
            .mem_total_kb
            .get_or_init(|| Some(parse_meminfo(&self.read("meminfo")?)?.total_kb))
    }
}

impl MetricsAdapter for ProcfsAdapter {
    fn platform(&self) -> &str {
        "procfs"
    }

    fn load_averages(&self) -> Option<LoadAverages> {
        parse_loadavg(&self.read("loadavg")?)
    }

    fn memory_used_ratio(&self) -> Option<f64> {
        parse_meminfo_used_ratio(&self.read("meminfo")?)
    }

    fn io_wait_ratio(&self, window: Duration) -> Option<f64> {
        let before = parse_cpu_times(&self.read("stat")?)?;
        thread::sleep(window);
        let after = parse_cpu_times(&self.read("stat")?)?;
        after.iowait_ratio_since(&before)
    }

    fn cpu_count(&self) -> Option<u32> {
        self.read("stat")
            .and_then(|stat| parse_cpu_count(&stat))
            .or_else(sysconf_cpu_count)
    }

    fn list_pids(&self) -> Vec<u32> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut pids: Vec<u32> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str()?.parse::<u32>().ok())
            .filter(|&pid| pid > 0)
            .collect();
        pids.sort_unstable();
        pids
    }

    fn sample_process(&self, pid: u32) -> Result<Option<ProcessSample>, SampleError> {
        let Some(content) = self.read_pid_stat(pid)? else {
            return Ok(None);
        };
        let stat = parse_proc_stat(&content).ok_or(SampleError::Malformed { pid })?;
        let cpu_percent = self
            .read("uptime")
            .and_then(|u| parse_uptime_seconds(&u))
            .map(|uptime| stat.cpu_percent(uptime, clk_tck()))
            .unwrap_or(0.0);
        let mem_percent = self
            .mem_total_kb()
            .map(|total| stat.mem_percent(page_size(), total))
            .unwrap_or(0.0);

        Ok(Some(ProcessSample {
            pid,
            nice: Some(stat.nice),
            parent_pid: stat.ppid,
            cpu_percent,
            mem_percent,
        }))
    }
}
