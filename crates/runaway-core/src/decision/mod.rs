//! Decision layer: machine triage and per-process verdicts.

pub mod triage;
pub mod verdict;

pub use triage::{
    triage, weighted_load, MachineState, TriageGate, TriageReport, LOAD_THRESHOLD, LOAD_WEIGHTS,
    MEMORY_THRESHOLD,
};
pub use verdict::{
    assess_sample, assess_with, classify, ProcessAssessment, ProcessVerdict, VerdictCounts,
    BADNESS_THRESHOLD,
};
