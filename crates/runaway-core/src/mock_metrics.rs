//! Fixture metrics for testing.
//!
//! [`StaticAdapter`] answers every [`MetricsAdapter`] call from values set
//! up front, so checks can be driven end to end without touching the host.
//!
//! # Example
//!
//! ```ignore
//! use runaway_core::mock_metrics::{MockSampleBuilder, StaticAdapter};
//!
//! let adapter = StaticAdapter::new()
//!     .load(0.1, 0.1, 0.1)
//!     .cpus(4)
//!     .with_process(MockSampleBuilder::new(1234).orphan().cpu(35.0).build())
//!     .with_vanished(5678);
//! ```

use crate::collect::{LoadAverages, MetricsAdapter, ProcessSample, SampleError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Builder for `ProcessSample` instances.
///
/// Defaults to an idle, un-niced child of some shell.
#[derive(Debug, Clone)]
pub struct MockSampleBuilder {
    sample: ProcessSample,
}

impl MockSampleBuilder {
    pub fn new(pid: u32) -> Self {
        Self {
            sample: ProcessSample {
                pid,
                nice: Some(0),
                parent_pid: 500,
                cpu_percent: 0.0,
                mem_percent: 0.0,
            },
        }
    }

    pub fn nice(mut self, nice: i32) -> Self {
        self.sample.nice = Some(nice);
        self
    }

    pub fn nice_unavailable(mut self) -> Self {
        self.sample.nice = None;
        self
    }

    pub fn parent(mut self, ppid: u32) -> Self {
        self.sample.parent_pid = ppid;
        self
    }

    /// Re-parent to init.
    pub fn orphan(self) -> Self {
        self.parent(1)
    }

    pub fn cpu(mut self, percent: f64) -> Self {
        self.sample.cpu_percent = percent;
        self
    }

    pub fn mem(mut self, percent: f64) -> Self {
        self.sample.mem_percent = percent;
        self
    }

    pub fn build(self) -> ProcessSample {
        self.sample
    }
}

/// A metrics adapter with fixed readings.
#[derive(Debug, Default)]
pub struct StaticAdapter {
    load: Option<LoadAverages>,
    memory: Option<f64>,
    iowait: Option<f64>,
    cpus: Option<u32>,
    processes: BTreeMap<u32, ProcessSample>,
    vanished: Vec<u32>,
    unreadable: Vec<u32>,
    iowait_samples: AtomicUsize,
    cpu_lookups: AtomicUsize,
}

impl StaticAdapter {
    /// An adapter with every reading unavailable and no processes.
    pub fn new() -> Self {
        Self::default()
    }

    /// A quiet four-CPU machine.
    pub fn idle_machine() -> Self {
        Self::new().load(0.1, 0.1, 0.1).memory(0.1).iowait(0.01).cpus(4)
    }

    pub fn load(mut self, one: f64, five: f64, fifteen: f64) -> Self {
        self.load = Some(LoadAverages::new(one, five, fifteen));
        self
    }

    pub fn memory(mut self, ratio: f64) -> Self {
        self.memory = Some(ratio);
        self
    }

    pub fn iowait(mut self, ratio: f64) -> Self {
        self.iowait = Some(ratio);
        self
    }

    pub fn cpus(mut self, count: u32) -> Self {
        self.cpus = Some(count);
        self
    }

    pub fn with_process(mut self, sample: ProcessSample) -> Self {
        self.processes.insert(sample.pid, sample);
        self
    }

    /// A pid that is listed but gone by the time it is sampled.
    pub fn with_vanished(mut self, pid: u32) -> Self {
        self.vanished.push(pid);
        self
    }

    /// A pid that is listed but whose sample fails, as when `ps` times out.
    pub fn with_unreadable(mut self, pid: u32) -> Self {
        self.unreadable.push(pid);
        self
    }

    /// How many times I/O-wait was sampled.
    pub fn iowait_samples(&self) -> usize {
        self.iowait_samples.load(Ordering::SeqCst)
    }

    /// How many times the CPU count was asked for.
    pub fn cpu_lookups(&self) -> usize {
        self.cpu_lookups.load(Ordering::SeqCst)
    }
}

impl MetricsAdapter for StaticAdapter {
    fn platform(&self) -> &str {
        "static"
    }

    fn load_averages(&self) -> Option<LoadAverages> {
        self.load
    }

    fn memory_used_ratio(&self) -> Option<f64> {
        self.memory
    }

    fn io_wait_ratio(&self, _window: Duration) -> Option<f64> {
        self.iowait_samples.fetch_add(1, Ordering::SeqCst);
        self.iowait
    }

    fn cpu_count(&self) -> Option<u32> {
        self.cpu_lookups.fetch_add(1, Ordering::SeqCst);
        self.cpus
    }

    fn list_pids(&self) -> Vec<u32> {
        let mut pids: Vec<u32> = self
            .processes
            .keys()
            .copied()
            .chain(self.vanished.iter().copied())
            .chain(self.unreadable.iter().copied())
            .collect();
        pids.sort_unstable();
        pids.dedup();
        pids
    }

    fn sample_process(&self, pid: u32) -> Result<Option<ProcessSample>, SampleError> {
        if self.unreadable.contains(&pid) {
            return Err(SampleError::TimedOut {
                command: "ps".to_string(),
            });
        }
        Ok(self.processes.get(&pid).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let s = MockSampleBuilder::new(9).build();
        assert_eq!(s.pid, 9);
        assert_eq!(s.nice, Some(0));
        assert_eq!(s.parent_pid, 500);
        assert_eq!(MockSampleBuilder::new(9).orphan().build().parent_pid, 1);
        assert_eq!(MockSampleBuilder::new(9).nice_unavailable().build().nice, None);
    }

    #[test]
    fn adapter_lists_vanished_but_cannot_sample_them() {
        let adapter = StaticAdapter::idle_machine()
            .with_process(MockSampleBuilder::new(20).build())
            .with_vanished(10)
            .with_unreadable(30);
        assert_eq!(adapter.list_pids(), vec![10, 20, 30]);
        assert!(matches!(adapter.sample_process(10), Ok(None)));
        assert!(matches!(adapter.sample_process(20), Ok(Some(_))));
        assert!(adapter.sample_process(30).is_err());
    }

    #[test]
    fn unavailable_by_default() {
        let adapter = StaticAdapter::new();
        assert!(adapter.load_averages().is_none());
        assert!(adapter.io_wait_ratio(Duration::ZERO).is_none());
        assert_eq!(adapter.iowait_samples(), 1);
    }
}
