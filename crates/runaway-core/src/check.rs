//! Single-host check: triage, then optionally score every process.

use crate::collect::RawMetrics;
use crate::context::CheckContext;
use crate::decision::{triage, ProcessAssessment, ProcessVerdict, TriageReport, VerdictCounts};
use crate::exit_codes::ExitCode;
use crate::log_event;
use crate::logging::{event_names, Stage};
use serde::Serialize;
use std::time::Instant;

/// What the check should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    /// Whole-machine check.
    Machine {
        /// Score every process when triage trips.
        scan: bool,
        /// Score every process whatever triage says.
        force: bool,
    },
    /// Verdict for one process only.
    Process(u32),
}

impl CheckMode {
    pub fn name(&self) -> &'static str {
        match self {
            CheckMode::Machine { .. } => "machine",
            CheckMode::Process(_) => "process",
        }
    }
}

/// Result of one check on one host.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub hostname: String,
    pub run_id: String,
    /// RFC 3339 time the check started.
    pub checked_at: String,
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<RawMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triage: Option<TriageReport>,
    /// Whether the per-process scan ran.
    pub scanned: bool,
    pub counts: VerdictCounts,
    /// Runaway processes found by the scan, in pid order.
    pub runaways: Vec<ProcessAssessment>,
    /// Single-process mode result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ProcessAssessment>,
}

impl CheckReport {
    fn new(ctx: &CheckContext<'_>, mode: CheckMode) -> Self {
        Self {
            hostname: ctx.hostname().to_string(),
            run_id: ctx.log.run_id.clone(),
            checked_at: chrono::Utc::now().to_rfc3339(),
            mode: mode.name(),
            metrics: None,
            triage: None,
            scanned: false,
            counts: VerdictCounts::default(),
            runaways: Vec::new(),
            target: None,
        }
    }

    /// Whether triage tripped.
    pub fn machine_runaway(&self) -> bool {
        self.triage
            .as_ref()
            .map(|t| t.state.is_runaway())
            .unwrap_or(false)
    }

    /// Pids to report, in order.
    pub fn runaway_pids(&self) -> Vec<u32> {
        match &self.target {
            Some(t) if t.verdict.is_runaway() => vec![t.pid],
            Some(_) => Vec::new(),
            None => self.runaways.iter().map(|a| a.pid).collect(),
        }
    }

    /// Anything to report at all.
    pub fn is_runaway(&self) -> bool {
        match &self.target {
            Some(t) => t.verdict.is_runaway(),
            None => self.machine_runaway() || !self.runaways.is_empty(),
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match &self.target {
            Some(t) if t.verdict == ProcessVerdict::Vanished => ExitCode::Vanished,
            _ => ExitCode::from_verdict(self.is_runaway()),
        }
    }
}

/// Run one check.
pub fn run_check(ctx: &CheckContext<'_>, mode: CheckMode) -> CheckReport {
    let mut report = CheckReport::new(ctx, mode);

    match mode {
        CheckMode::Process(pid) => {
            let assessment = ctx.assess(pid);
            report.counts = VerdictCounts::tally([&assessment]);
            report.target = Some(assessment);
        }
        CheckMode::Machine { scan, force } => {
            let metrics = ctx.raw_metrics();
            let triage = triage(&metrics);
            log_event!(
                ctx.log,
                INFO,
                event_names::TRIAGE_FINISHED,
                Stage::Triage,
                "triage finished",
                state = triage.state.as_str(),
                weighted_load = triage.weighted_load,
                memory_used_ratio = triage.memory_used_ratio,
                io_wait_ratio = triage.io_wait_ratio,
                cpu_count = triage.cpu_count
            );

            if force || (scan && triage.state.is_runaway()) {
                scan_all(ctx, &mut report);
            }
            report.metrics = Some(metrics);
            report.triage = Some(triage);
        }
    }

    report
}

fn scan_all(ctx: &CheckContext<'_>, report: &mut CheckReport) {
    let started = Instant::now();
    let pids = ctx.adapter().list_pids();
    log_event!(
        ctx.log,
        INFO,
        event_names::SCAN_STARTED,
        Stage::Scan,
        "scanning processes",
        processes = pids.len()
    );

    let mut counts = VerdictCounts::default();
    for pid in pids {
        let assessment = ctx.assess(pid);
        counts.record(assessment.verdict);
        if assessment.verdict.is_runaway() {
            report.runaways.push(assessment);
        }
    }
    report.scanned = true;
    report.counts = counts;

    log_event!(
        ctx.log,
        INFO,
        event_names::SCAN_FINISHED,
        Stage::Scan,
        "scan finished",
        runaway = counts.runaway,
        clean = counts.clean,
        vanished = counts.vanished,
        unavailable = counts.unavailable,
        duration_ms = started.elapsed().as_millis() as u64
    );
}
