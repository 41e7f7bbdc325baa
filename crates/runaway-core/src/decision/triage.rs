//! Machine-level triage.
//!
//! Three independent crisp gates over one [`RawMetrics`] snapshot. Any
//! breached gate marks the machine as running away and justifies the
//! per-process scan.

use crate::collect::{LoadAverages, RawMetrics};
use serde::{Deserialize, Serialize};

/// Weights of the 1, 5 and 15 minute load averages.
pub const LOAD_WEIGHTS: (f64, f64, f64) = (1.0, 4.0, 2.0);
/// Weighted load per CPU above which the machine is overloaded.
pub const LOAD_THRESHOLD: f64 = 0.70;
/// Memory-used ratio above which the machine is under memory pressure.
pub const MEMORY_THRESHOLD: f64 = 0.80;

/// Machine verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineState {
    Runaway,
    Clean,
}

impl MachineState {
    pub fn is_runaway(self) -> bool {
        self == MachineState::Runaway
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Runaway => "runaway",
            Self::Clean => "clean",
        }
    }
}

impl std::fmt::Display for MachineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One triage gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageGate {
    Load,
    Memory,
    IoWait,
}

impl std::fmt::Display for TriageGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::Memory => write!(f, "memory"),
            Self::IoWait => write!(f, "iowait"),
        }
    }
}

/// Triage outcome with the numbers behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageReport {
    pub state: MachineState,
    pub weighted_load: f64,
    pub memory_used_ratio: f64,
    pub io_wait_ratio: f64,
    /// I/O-wait limit for this host, `1 / cpu_count`.
    pub io_wait_limit: f64,
    pub cpu_count: u32,
    /// Every gate that was breached, in evaluation order.
    pub tripped: Vec<TriageGate>,
}

/// Load average weighted toward the 5 minute figure, per CPU.
pub fn weighted_load(load: &LoadAverages, cpu_count: u32) -> f64 {
    let (w1, w5, w15) = LOAD_WEIGHTS;
    let total = w1 + w5 + w15;
    (load.one * w1 + load.five * w5 + load.fifteen * w15) / total / cpu_count.max(1) as f64
}

/// Run the three gates.
pub fn triage(metrics: &RawMetrics) -> TriageReport {
    let cpu_count = metrics.cpu_count.max(1);
    let weighted_load = weighted_load(&metrics.load, cpu_count);
    let io_wait_limit = 1.0 / cpu_count as f64;

    let mut tripped = Vec::new();
    if weighted_load > LOAD_THRESHOLD {
        tripped.push(TriageGate::Load);
    }
    if metrics.memory_used_ratio > MEMORY_THRESHOLD {
        tripped.push(TriageGate::Memory);
    }
    if metrics.io_wait_ratio > io_wait_limit {
        tripped.push(TriageGate::IoWait);
    }

    TriageReport {
        state: if tripped.is_empty() {
            MachineState::Clean
        } else {
            MachineState::Runaway
        },
        weighted_load,
        memory_used_ratio: metrics.memory_used_ratio,
        io_wait_ratio: metrics.io_wait_ratio,
        io_wait_limit,
        cpu_count,
        tripped,
    }
}
