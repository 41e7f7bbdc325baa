//! End-to-end check scenarios driven through the static metrics adapter.

use runaway_core::check::{run_check, CheckMode, CheckReport};
use runaway_core::context::CheckContext;
use runaway_core::decision::{MachineState, ProcessVerdict, TriageGate};
use runaway_core::exit_codes::ExitCode;
use runaway_core::logging::LogContext;
use runaway_core::mock_metrics::{MockSampleBuilder, StaticAdapter};
use runaway_core::output::check_lines;
use std::time::Duration;

fn check(adapter: &StaticAdapter, mode: CheckMode) -> CheckReport {
    let ctx = CheckContext::new(
        adapter,
        Duration::ZERO,
        LogContext::new("run-scenario", "host-scenario"),
    )
    .with_hostname("node01");
    run_check(&ctx, mode)
}

/// Disowned, not nice, 35% CPU.
fn orphan_at_35(pid: u32) -> runaway_core::collect::ProcessSample {
    MockSampleBuilder::new(pid).orphan().cpu(35.0).mem(5.0).build()
}

#[test]
fn disowned_moderate_cpu_is_runaway() {
    let adapter = StaticAdapter::idle_machine().with_process(orphan_at_35(4242));
    let report = check(&adapter, CheckMode::Process(4242));

    let target = report.target.as_ref().unwrap();
    assert_eq!(target.verdict, ProcessVerdict::Runaway);
    let badness = target.badness.as_ref().unwrap();
    assert_eq!(badness.dominant().unwrap().label, "orphan_cpu");
    assert!(badness.score.value() > 0.6);

    assert_eq!(check_lines(&report), vec!["node01 4242"]);
    assert_eq!(report.exit_code(), ExitCode::Runaway);
}

#[test]
fn nice_owned_light_process_is_clean() {
    let sample = MockSampleBuilder::new(77)
        .nice(10)
        .parent(500)
        .cpu(10.0)
        .mem(5.0)
        .build();
    let adapter = StaticAdapter::idle_machine().with_process(sample);
    let report = check(&adapter, CheckMode::Process(77));

    let target = report.target.as_ref().unwrap();
    assert_eq!(target.verdict, ProcessVerdict::Clean);
    assert_eq!(target.score().value(), 0.0);
    assert!(check_lines(&report).is_empty());
    assert_eq!(report.exit_code(), ExitCode::Clean);
}

#[test]
fn full_core_is_runaway_whoever_owns_it() {
    for builder in [
        MockSampleBuilder::new(90).parent(500),
        MockSampleBuilder::new(90).orphan().nice(19),
        MockSampleBuilder::new(90).nice_unavailable(),
    ] {
        let adapter = StaticAdapter::idle_machine().with_process(builder.cpu(100.0).mem(5.0).build());
        let report = check(&adapter, CheckMode::Process(90));
        let target = report.target.as_ref().unwrap();
        assert_eq!(target.verdict, ProcessVerdict::Runaway);
        assert_eq!(target.score().value(), 1.0);
    }
}

#[test]
fn idle_machine_is_clean() {
    let adapter = StaticAdapter::idle_machine();
    let report = check(&adapter, CheckMode::Machine { scan: false, force: false });

    let triage = report.triage.as_ref().unwrap();
    assert_eq!(triage.state, MachineState::Clean);
    assert!(triage.tripped.is_empty());
    assert!((triage.weighted_load - 0.025).abs() < 1e-9);
    assert_eq!(triage.io_wait_limit, 0.25);

    assert!(check_lines(&report).is_empty());
    assert_eq!(report.exit_code(), ExitCode::Clean);
    assert_eq!(adapter.iowait_samples(), 1);
}

#[test]
fn vanished_process_exits_255() {
    let adapter = StaticAdapter::idle_machine().with_vanished(31337);
    let report = check(&adapter, CheckMode::Process(31337));

    let target = report.target.as_ref().unwrap();
    assert_eq!(target.verdict, ProcessVerdict::Vanished);
    assert!(target.sample.is_none());
    assert_eq!(report.counts.vanished, 1);
    assert_eq!(report.counts.runaway, 0);
    assert!(check_lines(&report).is_empty());
    assert_eq!(report.exit_code(), ExitCode::Vanished);
}

#[test]
fn failed_sample_is_not_a_vanish() {
    let adapter = StaticAdapter::idle_machine().with_unreadable(4242);
    let report = check(&adapter, CheckMode::Process(4242));

    let target = report.target.as_ref().unwrap();
    assert_eq!(target.verdict, ProcessVerdict::Unavailable);
    assert_eq!(report.counts.vanished, 0);
    assert_eq!(report.counts.unavailable, 1);
    assert!(check_lines(&report).is_empty());
    assert_ne!(report.exit_code(), ExitCode::Vanished);
    assert_eq!(report.exit_code(), ExitCode::Clean);
}

#[test]
fn vanished_processes_do_not_count_as_runaway() {
    let adapter = StaticAdapter::idle_machine()
        .with_process(orphan_at_35(10))
        .with_process(MockSampleBuilder::new(11).build())
        .with_vanished(12)
        .with_vanished(13);
    let report = check(&adapter, CheckMode::Machine { scan: false, force: true });

    assert!(report.scanned);
    assert_eq!(report.counts.runaway, 1);
    assert_eq!(report.counts.clean, 1);
    assert_eq!(report.counts.vanished, 2);
    assert_eq!(report.runaway_pids(), vec![10]);
    assert_eq!(check_lines(&report), vec!["node01 10"]);
    assert_eq!(report.exit_code(), ExitCode::Runaway);
}

#[test]
fn overloaded_machine_prints_hostname_only() {
    let adapter = StaticAdapter::idle_machine()
        .load(8.0, 8.0, 8.0)
        .with_process(orphan_at_35(10));
    let report = check(&adapter, CheckMode::Machine { scan: false, force: false });

    let triage = report.triage.as_ref().unwrap();
    assert_eq!(triage.state, MachineState::Runaway);
    assert_eq!(triage.tripped, vec![TriageGate::Load]);
    assert!(!report.scanned);
    assert_eq!(check_lines(&report), vec!["node01"]);
    assert_eq!(report.exit_code(), ExitCode::Runaway);
}

#[test]
fn scan_runs_only_when_triage_trips() {
    let idle = StaticAdapter::idle_machine().with_process(orphan_at_35(10));
    let report = check(&idle, CheckMode::Machine { scan: true, force: false });
    assert!(!report.scanned);
    assert!(report.runaways.is_empty());
    assert_eq!(report.exit_code(), ExitCode::Clean);

    let busy = StaticAdapter::idle_machine()
        .memory(0.95)
        .with_process(orphan_at_35(10))
        .with_process(MockSampleBuilder::new(20).cpu(100.0).build());
    let report = check(&busy, CheckMode::Machine { scan: true, force: false });
    assert!(report.scanned);
    assert_eq!(check_lines(&report), vec!["node01 10", "node01 20"]);
}

#[test]
fn unavailable_readings_degrade_to_clean() {
    let adapter = StaticAdapter::new();
    let report = check(&adapter, CheckMode::Machine { scan: false, force: false });

    let triage = report.triage.as_ref().unwrap();
    assert_eq!(triage.state, MachineState::Clean);
    assert_eq!(triage.cpu_count, 1);
    assert_eq!(triage.weighted_load, 0.0);
    assert_eq!(adapter.cpu_lookups(), 1);
}
