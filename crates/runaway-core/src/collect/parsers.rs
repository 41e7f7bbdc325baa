//! Parsers for the text formats the metric adapters read.
//!
//! Every parser takes the raw content and returns `None` when the content is
//! not in the expected shape. None of them panic on arbitrary input; the fuzz
//! targets under `fuzz/` exercise each one.
//!
//! # Formats Parsed
//! - `/proc/loadavg` and `uptime(1)` output - load averages
//! - `/proc/meminfo` - total and available memory
//! - `/proc/stat` - aggregate CPU time counters and online CPU count
//! - `/proc/uptime` - seconds since boot
//! - `/proc/[pid]/stat` - parent, nice, CPU ticks, start time, RSS
//! - `ps -o nice=,ppid=,%cpu=,%mem=` output - one process sample
//! - `vm_stat` output (macOS) - free and reclaimable page counts

use super::types::{CpuTimes, LoadAverages, ProcessSample};
use serde::{Deserialize, Serialize};

/// Memory figures from /proc/meminfo, in kB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemInfo {
    pub total_kb: u64,
    pub available_kb: u64,
}

impl MemInfo {
    /// Fraction of memory in use, in [0,1].
    pub fn used_ratio(&self) -> Option<f64> {
        if self.total_kb == 0 {
            return None;
        }
        let used = self.total_kb.saturating_sub(self.available_kb);
        Some((used as f64 / self.total_kb as f64).clamp(0.0, 1.0))
    }
}

/// Page counts from macOS `vm_stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmStat {
    pub page_size: u64,
    pub free: u64,
    pub inactive: u64,
    pub speculative: u64,
}

impl VmStat {
    /// Fraction of `total_bytes` in use, counting free, inactive and
    /// speculative pages as available.
    pub fn used_ratio(&self, total_bytes: u64) -> Option<f64> {
        if total_bytes == 0 {
            return None;
        }
        let available = self
            .free
            .saturating_add(self.inactive)
            .saturating_add(self.speculative)
            .saturating_mul(self.page_size);
        let used = total_bytes.saturating_sub(available);
        Some((used as f64 / total_bytes as f64).clamp(0.0, 1.0))
    }
}

/// Fields of /proc/[pid]/stat used for a process sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcStat {
    pub ppid: u32,
    /// User-mode CPU time in clock ticks.
    pub utime: u64,
    /// Kernel-mode CPU time in clock ticks.
    pub stime: u64,
    pub nice: i32,
    /// Start time in clock ticks after boot.
    pub starttime: u64,
    /// Resident set size in pages.
    pub rss_pages: u64,
}

impl ProcStat {
    /// Lifetime CPU usage in percent of one core, the way `ps` computes %CPU.
    pub fn cpu_percent(&self, uptime_secs: f64, clk_tck: u64) -> f64 {
        if clk_tck == 0 {
            return 0.0;
        }
        let hz = clk_tck as f64;
        let elapsed = uptime_secs - self.starttime as f64 / hz;
        if !(elapsed > 0.0) {
            return 0.0;
        }
        let cpu_secs = self.utime.saturating_add(self.stime) as f64 / hz;
        cpu_secs / elapsed * 100.0
    }

    /// Resident memory in percent of `total_kb`.
    pub fn mem_percent(&self, page_size: u64, total_kb: u64) -> f64 {
        if total_kb == 0 {
            return 0.0;
        }
        let rss_kb = self.rss_pages.saturating_mul(page_size) / 1024;
        rss_kb as f64 / total_kb as f64 * 100.0
    }
}

/// Parse /proc/loadavg: `0.52 0.58 0.59 1/467 12345`.
pub fn parse_loadavg(content: &str) -> Option<LoadAverages> {
    let mut fields = content.split_whitespace();
    let one = parse_load_value(fields.next()?)?;
    let five = parse_load_value(fields.next()?)?;
    let fifteen = parse_load_value(fields.next()?)?;
    Some(LoadAverages::new(one, five, fifteen))
}

/// Parse the load averages out of `uptime` output.
///
/// Accepts both `load average: 0.52, 0.58, 0.59` (Linux, Solaris) and
/// `load averages: 0.52 0.58 0.59` (BSD, macOS).
pub fn parse_uptime_load(output: &str) -> Option<LoadAverages> {
    let start = output.find("load average")?;
    let rest = &output[start..];
    let colon = rest.find(':')?;
    let mut values = rest[colon + 1..]
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(parse_load_value);
    let one = values.next()??;
    let five = values.next()??;
    let fifteen = values.next()??;
    Some(LoadAverages::new(one, five, fifteen))
}

fn parse_load_value(s: &str) -> Option<f64> {
    let v: f64 = s.trim().parse().ok()?;
    if v.is_finite() && v >= 0.0 {
        Some(v)
    } else {
        None
    }
}

/// Parse /proc/meminfo.
///
/// Kernels older than 3.14 lack `MemAvailable`; `MemFree + Buffers + Cached`
/// stands in for it there.
pub fn parse_meminfo(content: &str) -> Option<MemInfo> {
    let mut total = None;
    let mut available = None;
    let mut free = None;
    let mut buffers = 0u64;
    let mut cached = 0u64;

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let value = rest
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok());
        match (key.trim(), value) {
            ("MemTotal", Some(v)) => total = Some(v),
            ("MemAvailable", Some(v)) => available = Some(v),
            ("MemFree", Some(v)) => free = Some(v),
            ("Buffers", Some(v)) => buffers = v,
            ("Cached", Some(v)) => cached = v,
            _ => {}
        }
    }

    let total_kb = total?;
    let available_kb = match available {
        Some(v) => v,
        None => free?.saturating_add(buffers).saturating_add(cached),
    };
    Some(MemInfo {
        total_kb,
        available_kb,
    })
}

/// Fraction of memory in use according to /proc/meminfo.
pub fn parse_meminfo_used_ratio(content: &str) -> Option<f64> {
    parse_meminfo(content)?.used_ratio()
}

/// Parse the aggregate `cpu` line of /proc/stat.
///
/// The total covers user through steal; guest time is already folded into
/// user by the kernel and is not added twice.
pub fn parse_cpu_times(content: &str) -> Option<CpuTimes> {
    let line = content
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))?;
    let columns: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(|v| v.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    // user nice system idle iowait [irq softirq steal]
    if columns.len() < 5 {
        return None;
    }
    let total = columns.iter().try_fold(0u64, |acc, v| acc.checked_add(*v))?;
    Some(CpuTimes {
        total,
        iowait: columns[4],
    })
}

/// Count the per-CPU `cpuN` lines of /proc/stat (online CPUs).
pub fn parse_cpu_count(content: &str) -> Option<u32> {
    let count = content
        .lines()
        .filter(|l| {
            l.strip_prefix("cpu")
                .and_then(|rest| rest.chars().next())
                .is_some_and(|c| c.is_ascii_digit())
        })
        .count();
    (count > 0).then_some(count as u32)
}

/// Parse /proc/uptime: `350735.47 234388.90`.
pub fn parse_uptime_seconds(content: &str) -> Option<f64> {
    let v: f64 = content.split_whitespace().next()?.parse().ok()?;
    v.is_finite().then_some(v)
}

/// Parse macOS `vm_stat` output.
///
/// ```text
/// Mach Virtual Memory Statistics: (page size of 16384 bytes)
/// Pages free:                               12345.
/// Pages active:                            234567.
/// ```
pub fn parse_vm_stat(output: &str) -> Option<VmStat> {
    let mut lines = output.lines();
    let header = lines.next()?;
    let page_size: u64 = header
        .split("page size of")
        .nth(1)?
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;
    if page_size == 0 {
        return None;
    }

    let mut stat = VmStat {
        page_size,
        ..VmStat::default()
    };
    let mut saw_free = false;
    for line in lines {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let Ok(pages) = value.trim().trim_end_matches('.').parse::<u64>() else {
            continue;
        };
        match key.trim() {
            "Pages free" => {
                stat.free = pages;
                saw_free = true;
            }
            "Pages inactive" => stat.inactive = pages,
            "Pages speculative" => stat.speculative = pages,
            _ => {}
        }
    }
    saw_free.then_some(stat)
}

/// Parse /proc/[pid]/stat.
pub fn parse_proc_stat(content: &str) -> Option<ProcStat> {
    // comm may contain spaces and parentheses; the last ')' ends it
    let comm_end = content.rfind(')')?;
    let after_comm = content.get(comm_end + 2..)?;

    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    if fields.len() < 22 {
        return None;
    }

    // Field indices (0-indexed after comm):
    // 1: ppid, 11: utime, 12: stime, 16: nice, 19: starttime, 21: rss
    Some(ProcStat {
        ppid: fields[1].parse().ok()?,
        utime: fields[11].parse().ok()?,
        stime: fields[12].parse().ok()?,
        nice: fields[16].parse().ok()?,
        starttime: fields[19].parse().ok()?,
        rss_pages: fields[21].parse::<i64>().ok()?.max(0) as u64,
    })
}

/// Parse one line of `ps -o nice=,ppid=,%cpu=,%mem= -p PID`.
///
/// Empty output means the process is gone. A `-` in the nice column (real-time
/// scheduling classes) reads as unavailable.
pub fn parse_ps_sample(pid: u32, output: &str) -> Option<ProcessSample> {
    let line = output.lines().find(|l| !l.trim().is_empty())?;
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return None;
    }
    let nice = match fields[0] {
        "-" => None,
        raw => Some(raw.parse::<i32>().ok()?),
    };
    let parent_pid = fields[1].parse().ok()?;
    let cpu_percent = parse_percent(fields[2])?;
    let mem_percent = parse_percent(fields[3])?;
    Some(ProcessSample {
        pid,
        nice,
        parent_pid,
        cpu_percent,
        mem_percent,
    })
}

fn parse_percent(s: &str) -> Option<f64> {
    let v: f64 = s.parse().ok()?;
    (v.is_finite() && v >= 0.0).then_some(v)
}

/// Parse `ps -A -o pid=` output into a pid list.
pub fn parse_ps_pids(output: &str) -> Vec<u32> {
    output
        .lines()
        .filter_map(|l| l.trim().parse::<u32>().ok())
        .filter(|&pid| pid > 0)
        .collect()
}
