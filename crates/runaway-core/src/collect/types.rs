//! Metric types produced by the adapters.

use serde::{Deserialize, Serialize};

/// System load averages in load-average units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadAverages {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

impl LoadAverages {
    pub fn new(one: f64, five: f64, fifteen: f64) -> Self {
        Self { one, five, fifteen }
    }
}

/// Aggregate CPU time counters from the `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuTimes {
    /// Sum of every column on the line.
    pub total: u64,
    /// The iowait column.
    pub iowait: u64,
}

impl CpuTimes {
    /// Fraction of elapsed CPU time spent in iowait between two samples.
    ///
    /// Returns `None` when the counters did not advance or went backwards.
    pub fn iowait_ratio_since(&self, earlier: &CpuTimes) -> Option<f64> {
        let total = self.total.checked_sub(earlier.total)?;
        let iowait = self.iowait.checked_sub(earlier.iowait)?;
        if total == 0 {
            return None;
        }
        Some((iowait as f64 / total as f64).clamp(0.0, 1.0))
    }
}

/// Host-level readings for one triage call.
///
/// Built once per triage by the check context; the I/O-wait field is the
/// result of a single timed sample and is never refreshed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawMetrics {
    pub load: LoadAverages,
    /// Fraction of physical memory in use, in [0,1].
    pub memory_used_ratio: f64,
    /// Fraction of CPU time spent waiting on I/O, in [0,1].
    pub io_wait_ratio: f64,
    /// Online CPUs, always at least 1.
    pub cpu_count: u32,
}

/// Per-process readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessSample {
    pub pid: u32,
    /// Nice value; `None` when the platform cannot report it.
    pub nice: Option<i32>,
    pub parent_pid: u32,
    /// CPU usage in percent of one core, as `ps` reports it. May exceed 100.
    pub cpu_percent: f64,
    /// Resident memory in percent of physical memory. May exceed 100.
    pub mem_percent: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iowait_ratio_from_deltas() {
        let a = CpuTimes {
            total: 1000,
            iowait: 100,
        };
        let b = CpuTimes {
            total: 1400,
            iowait: 200,
        };
        assert_eq!(b.iowait_ratio_since(&a), Some(0.25));
    }

    #[test]
    fn iowait_ratio_needs_progress() {
        let a = CpuTimes {
            total: 1000,
            iowait: 100,
        };
        assert_eq!(a.iowait_ratio_since(&a), None);
        let wrapped = CpuTimes {
            total: 10,
            iowait: 1,
        };
        assert_eq!(wrapped.iowait_ratio_since(&a), None);
    }
}
