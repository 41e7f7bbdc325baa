//! Structured event definitions for logging.
//!
//! Every event emitted through `log_event!` carries a stable name from
//! [`event_names`], the run and host correlation IDs, and a [`Stage`].

use serde::{Deserialize, Serialize};

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Stages of one detector run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Whole-machine triage.
    Triage,
    /// Per-process scoring.
    Scan,
    /// Fleet fan-out.
    Fleet,
    /// Rule table validation.
    Rules,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Triage => "triage",
            Stage::Scan => "scan",
            Stage::Fleet => "fleet",
            Stage::Rules => "rules",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";

    // Triage stage
    pub const TRIAGE_FINISHED: &str = "triage.finished";
    pub const METRIC_UNAVAILABLE: &str = "metric.unavailable";

    // Scan stage
    pub const SCAN_STARTED: &str = "scan.started";
    pub const SCAN_PROC_SCORED: &str = "scan.proc_scored";
    pub const SCAN_PROC_VANISHED: &str = "scan.proc_vanished";
    pub const SCAN_FINISHED: &str = "scan.finished";

    // Fleet stage
    pub const FLEET_RESOLVED: &str = "fleet.resolved";
    pub const FLEET_HOST_FINISHED: &str = "fleet.host_finished";
    pub const FLEET_HOST_FAILED: &str = "fleet.host_failed";

    // Rules
    pub const RULES_VALIDATED: &str = "rules.validated";

    // Config/init events
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";
    pub const CONFIG_ERROR: &str = "config.error";
}

/// Correlation IDs shared by every event of one run.
#[derive(Debug, Clone)]
pub struct LogContext {
    /// Unique ID for this invocation.
    pub run_id: String,
    /// Host identifier.
    pub host_id: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>, host_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            host_id: host_id.into(),
        }
    }

    /// Context with a fresh run ID for this host.
    pub fn for_this_run() -> Self {
        Self::new(super::generate_run_id(), super::get_host_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_holds_ids() {
        let ctx = LogContext::new("run-abc", "host-xyz");
        assert_eq!(ctx.run_id, "run-abc");
        assert_eq!(ctx.host_id, "host-xyz");
    }

    #[test]
    fn fresh_context_has_prefixed_ids() {
        let ctx = LogContext::for_this_run();
        assert!(ctx.run_id.starts_with("run-"));
        assert!(ctx.host_id.starts_with("host-"));
    }

    #[test]
    fn level_from_tracing() {
        assert_eq!(Level::from(tracing::Level::WARN), Level::Warn);
        assert_eq!(Level::from(tracing::Level::TRACE), Level::Trace);
    }

    #[test]
    fn event_names_are_dotted() {
        for name in [
            event_names::RUN_STARTED,
            event_names::TRIAGE_FINISHED,
            event_names::SCAN_PROC_VANISHED,
            event_names::FLEET_HOST_FAILED,
            event_names::CONFIG_DEFAULT_USED,
        ] {
            assert!(name.contains('.'), "{name}");
        }
    }

    #[test]
    fn stage_display_matches_serde() {
        for stage in [
            Stage::Init,
            Stage::Triage,
            Stage::Scan,
            Stage::Fleet,
            Stage::Rules,
        ] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
        }
    }
}
