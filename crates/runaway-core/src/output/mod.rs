//! Rendering of check results.
//!
//! The text payload is the stdout contract: the hostname alone for a
//! runaway machine without per-process detail, otherwise one
//! `hostname pid` line per runaway process. Diagnostics are separate and
//! go to stderr.

use crate::check::CheckReport;
use crate::decision::{ProcessAssessment, LOAD_THRESHOLD, MEMORY_THRESHOLD};
use crate::inference::{CoverReport, RuleInput, RuleSet};
use runaway_common::OutputFormat;
use std::fmt::Write as _;
use std::io::{self, Write};

/// Payload lines for a check.
pub fn check_lines(report: &CheckReport) -> Vec<String> {
    if report.target.is_some() || report.scanned {
        return report
            .runaway_pids()
            .into_iter()
            .map(|pid| format!("{} {}", report.hostname, pid))
            .collect();
    }
    if report.machine_runaway() {
        vec![report.hostname.clone()]
    } else {
        Vec::new()
    }
}

/// Write the check payload in the requested format.
pub fn write_check<W: Write>(
    out: &mut W,
    report: &CheckReport,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => {
            for line in check_lines(report) {
                writeln!(out, "{line}")?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)?;
        }
    }
    out.flush()
}

/// Human breakdown of how the verdicts were reached.
pub fn diagnostics(report: &CheckReport) -> String {
    let mut s = String::new();

    if let Some(t) = &report.triage {
        let _ = writeln!(s, "{}: machine {}", report.hostname, t.state);
        let _ = writeln!(
            s,
            "  load    {:.5} (limit {:.5})",
            t.weighted_load, LOAD_THRESHOLD
        );
        let _ = writeln!(
            s,
            "  memory  {:.5} (limit {:.5})",
            t.memory_used_ratio, MEMORY_THRESHOLD
        );
        let _ = writeln!(
            s,
            "  iowait  {:.5} (limit {:.5})",
            t.io_wait_ratio, t.io_wait_limit
        );
        let _ = writeln!(s, "  cpus    {}", t.cpu_count);
        if !t.tripped.is_empty() {
            let gates: Vec<String> = t.tripped.iter().map(|g| g.to_string()).collect();
            let _ = writeln!(s, "  tripped {}", gates.join(", "));
        }
    }

    if report.scanned {
        let _ = write!(
            s,
            "{}: scanned {} processes, {} runaway, {} vanished",
            report.hostname,
            report.counts.total(),
            report.counts.runaway,
            report.counts.vanished
        );
        if report.counts.unavailable > 0 {
            let _ = write!(s, ", {} unavailable", report.counts.unavailable);
        }
        let _ = writeln!(s);
    }

    for assessment in report.target.iter().chain(report.runaways.iter()) {
        describe_process(&mut s, assessment);
    }
    s
}

fn describe_process(s: &mut String, a: &ProcessAssessment) {
    let _ = write!(s, "pid {} {}", a.pid, a.verdict);
    let Some(badness) = &a.badness else {
        let _ = writeln!(s);
        return;
    };
    let _ = write!(s, " badness {}", badness.score);
    if let Some(dominant) = badness.dominant() {
        let _ = write!(s, " ({})", dominant.label);
    }
    let _ = writeln!(s);

    if let Some(sample) = &a.sample {
        let nice = sample
            .nice
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            s,
            "  sample  nice {} ppid {} cpu {:.1}% mem {:.1}%",
            nice, sample.parent_pid, sample.cpu_percent, sample.mem_percent
        );
    }
    if let Some(inputs) = &a.inputs {
        let parts: Vec<String> = RuleInput::ALL
            .iter()
            .map(|&i| format!("{} {}", i, inputs.get(i)))
            .collect();
        let _ = writeln!(s, "  inputs  {}", parts.join(" "));
    }
    let parts: Vec<String> = badness
        .clauses
        .iter()
        .map(|c| format!("{} {}", c.label, c.strength))
        .collect();
    let _ = writeln!(s, "  clauses {}", parts.join(" "));
}

/// The rule cover and its validation summary.
pub fn rules_summary(rules: &RuleSet, report: &CoverReport) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "{rules}");
    let _ = writeln!(
        s,
        "cover ok: {} assignments, {} on, {} off, {} don't-care",
        report.assignments, report.on_set, report.off_set, report.dont_care
    );
    for clause in &report.clauses {
        let _ = writeln!(
            s,
            "  {} {:<10} essential for {} assignment(s)",
            clause.cube, clause.label, clause.essential
        );
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::{LoadAverages, ProcessSample, RawMetrics};
    use crate::decision::{assess_sample, triage, VerdictCounts};

    fn base(scanned: bool, load: f64) -> CheckReport {
        let metrics = RawMetrics {
            load: LoadAverages::new(load, load, load),
            memory_used_ratio: 0.1,
            io_wait_ratio: 0.0,
            cpu_count: 1,
        };
        CheckReport {
            hostname: "node01".into(),
            run_id: "run-t".into(),
            checked_at: "2026-01-01T00:00:00+00:00".into(),
            mode: "machine",
            metrics: Some(metrics),
            triage: Some(triage(&metrics)),
            scanned,
            counts: VerdictCounts::default(),
            runaways: Vec::new(),
            target: None,
        }
    }

    fn hot(pid: u32) -> ProcessAssessment {
        assess_sample(
            pid,
            Some(ProcessSample {
                pid,
                nice: Some(0),
                parent_pid: 1,
                cpu_percent: 35.0,
                mem_percent: 5.0,
            }),
        )
    }

    #[test]
    fn clean_machine_prints_nothing() {
        assert!(check_lines(&base(false, 0.1)).is_empty());
    }

    #[test]
    fn runaway_machine_prints_hostname() {
        assert_eq!(check_lines(&base(false, 3.0)), vec!["node01"]);
    }

    #[test]
    fn scan_prints_host_pid_pairs() {
        let mut report = base(true, 3.0);
        report.runaways = vec![hot(12), hot(40)];
        assert_eq!(check_lines(&report), vec!["node01 12", "node01 40"]);

        // tripped triage with nothing found prints nothing
        report.runaways.clear();
        assert!(check_lines(&report).is_empty());
    }

    #[test]
    fn single_process_prints_pair_when_runaway() {
        let mut report = base(false, 0.0);
        report.triage = None;
        report.target = Some(hot(77));
        assert_eq!(check_lines(&report), vec!["node01 77"]);

        report.target = Some(assess_sample(77, None));
        assert!(check_lines(&report).is_empty());
    }

    #[test]
    fn json_payload() {
        let mut buf = Vec::new();
        write_check(&mut buf, &base(false, 3.0), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["triage"]["tripped"][0], "load");
    }

    #[test]
    fn diagnostics_explain_clauses() {
        let mut report = base(true, 3.0);
        report.runaways = vec![hot(12)];
        report.counts = VerdictCounts {
            runaway: 1,
            clean: 3,
            vanished: 1,
            unavailable: 0,
        };
        let text = diagnostics(&report);
        assert!(text.contains("machine runaway"));
        assert!(text.contains("tripped load"));
        assert!(text.contains("scanned 5 processes, 1 runaway, 1 vanished"));
        assert!(text.contains("pid 12 runaway badness 0.66667 (orphan_cpu)"));
        assert!(text.contains("disowned 1.00000"));
    }
}
