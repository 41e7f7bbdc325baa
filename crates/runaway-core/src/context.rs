//! Request-scoped state for one check.

use crate::collect::{LoadAverages, MetricsAdapter, RawMetrics};
use crate::decision::{assess_with, ProcessAssessment};
use crate::inference::RUNAWAY_RULES;
use crate::log_event;
use crate::logging::{event_names, hostname, LogContext, Stage};
use std::cell::OnceCell;
use std::time::Duration;

/// Everything one check needs: the adapter plus lazily memoized host facts.
pub struct CheckContext<'a> {
    adapter: &'a dyn MetricsAdapter,
    iowait_window: Duration,
    cpu_count: OnceCell<u32>,
    hostname: OnceCell<String>,
    pub log: LogContext,
}

impl<'a> CheckContext<'a> {
    pub fn new(adapter: &'a dyn MetricsAdapter, iowait_window: Duration, log: LogContext) -> Self {
        Self {
            adapter,
            iowait_window,
            cpu_count: OnceCell::new(),
            hostname: OnceCell::new(),
            log,
        }
    }

    /// Fix the hostname instead of asking the OS.
    pub fn with_hostname(self, name: impl Into<String>) -> Self {
        // a fresh context has nothing cached yet
        let _ = self.hostname.set(name.into());
        self
    }

    pub fn adapter(&self) -> &dyn MetricsAdapter {
        self.adapter
    }

    pub fn iowait_window(&self) -> Duration {
        self.iowait_window
    }

    /// Online CPU count, looked up once. Unavailable reads as 1.
    pub fn cpu_count(&self) -> u32 {
        *self.cpu_count.get_or_init(|| match self.adapter.cpu_count() {
            Some(n) if n > 0 => n,
            _ => {
                self.unavailable("cpu_count");
                1
            }
        })
    }

    pub fn hostname(&self) -> &str {
        self.hostname.get_or_init(hostname)
    }

    /// One immutable snapshot for triage. Blocks for the I/O-wait window.
    pub fn raw_metrics(&self) -> RawMetrics {
        let load = self.adapter.load_averages().unwrap_or_else(|| {
            self.unavailable("load");
            LoadAverages::default()
        });
        let memory_used_ratio = self.adapter.memory_used_ratio().unwrap_or_else(|| {
            self.unavailable("memory");
            0.0
        });
        let io_wait_ratio = self
            .adapter
            .io_wait_ratio(self.iowait_window)
            .unwrap_or_else(|| {
                self.unavailable("iowait");
                0.0
            });

        RawMetrics {
            load,
            memory_used_ratio: memory_used_ratio.clamp(0.0, 1.0),
            io_wait_ratio: io_wait_ratio.clamp(0.0, 1.0),
            cpu_count: self.cpu_count(),
        }
    }

    /// Sample and score one process.
    ///
    /// A failed sample is logged and reported as unavailable, never as
    /// vanished.
    pub fn assess(&self, pid: u32) -> ProcessAssessment {
        match self.adapter.sample_process(pid) {
            Ok(Some(sample)) => {
                let assessment = assess_with(&RUNAWAY_RULES, sample);
                log_event!(
                    self.log,
                    DEBUG,
                    event_names::SCAN_PROC_SCORED,
                    Stage::Scan,
                    "process scored",
                    pid = pid,
                    badness = assessment.score().value(),
                    verdict = assessment.verdict.as_str()
                );
                assessment
            }
            Ok(None) => {
                log_event!(
                    self.log,
                    DEBUG,
                    event_names::SCAN_PROC_VANISHED,
                    Stage::Scan,
                    "process vanished before sampling",
                    pid = pid
                );
                ProcessAssessment::vanished(pid)
            }
            Err(e) => {
                let error = e.to_string();
                log_event!(
                    self.log,
                    WARN,
                    event_names::METRIC_UNAVAILABLE,
                    Stage::Scan,
                    "process sample unavailable, scoring as neutral",
                    metric = "process",
                    pid = pid,
                    error = error.as_str(),
                    platform = self.adapter.platform()
                );
                ProcessAssessment::unavailable(pid)
            }
        }
    }

    fn unavailable(&self, metric: &'static str) {
        log_event!(
            self.log,
            WARN,
            event_names::METRIC_UNAVAILABLE,
            Stage::Triage,
            "metric unavailable, reading as neutral",
            metric = metric,
            platform = self.adapter.platform()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::{ProcessSample, SampleError};
    use crate::decision::ProcessVerdict;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingAdapter {
        cpu_calls: AtomicUsize,
        iowait_calls: AtomicUsize,
    }

    impl MetricsAdapter for CountingAdapter {
        fn platform(&self) -> &str {
            "counting"
        }
        fn load_averages(&self) -> Option<LoadAverages> {
            None
        }
        fn memory_used_ratio(&self) -> Option<f64> {
            Some(1.7)
        }
        fn io_wait_ratio(&self, _window: Duration) -> Option<f64> {
            self.iowait_calls.fetch_add(1, Ordering::SeqCst);
            None
        }
        fn cpu_count(&self) -> Option<u32> {
            self.cpu_calls.fetch_add(1, Ordering::SeqCst);
            Some(8)
        }
        fn list_pids(&self) -> Vec<u32> {
            vec![10]
        }
        fn sample_process(&self, pid: u32) -> Result<Option<ProcessSample>, SampleError> {
            if pid == 12 {
                return Err(SampleError::TimedOut {
                    command: "ps".to_string(),
                });
            }
            Ok((pid == 10).then_some(ProcessSample {
                pid,
                nice: Some(0),
                parent_pid: 1,
                cpu_percent: 35.0,
                mem_percent: 5.0,
            }))
        }
    }

    fn ctx(adapter: &CountingAdapter) -> CheckContext<'_> {
        CheckContext::new(adapter, Duration::ZERO, LogContext::new("run-test", "host-test"))
    }

    #[test]
    fn cpu_count_is_memoized() {
        let adapter = CountingAdapter::default();
        let ctx = ctx(&adapter);
        assert_eq!(ctx.cpu_count(), 8);
        assert_eq!(ctx.cpu_count(), 8);
        let _ = ctx.raw_metrics();
        assert_eq!(adapter.cpu_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn raw_metrics_degrades_and_samples_iowait_once() {
        let adapter = CountingAdapter::default();
        let ctx = ctx(&adapter);
        let m = ctx.raw_metrics();
        assert_eq!(m.load, LoadAverages::default());
        assert_eq!(m.io_wait_ratio, 0.0);
        assert_eq!(m.memory_used_ratio, 1.0);
        assert_eq!(m.cpu_count, 8);
        assert_eq!(adapter.iowait_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn assess_distinguishes_vanished() {
        let adapter = CountingAdapter::default();
        let ctx = ctx(&adapter);
        assert_eq!(ctx.assess(10).verdict, ProcessVerdict::Runaway);
        assert_eq!(ctx.assess(11).verdict, ProcessVerdict::Vanished);

        let failed = ctx.assess(12);
        assert_eq!(failed.verdict, ProcessVerdict::Unavailable);
        assert_eq!(failed.score().value(), 0.0);
    }

    #[test]
    fn hostname_override() {
        let adapter = CountingAdapter::default();
        let ctx = ctx(&adapter).with_hostname("node07");
        assert_eq!(ctx.hostname(), "node07");
    }
}
