//! Fuzzification of a process sample into the six rule inputs.

use crate::collect::ProcessSample;
use runaway_common::ProcessId;
use runaway_fuzzy::{FuzzyValue, TriangularMembership};
use serde::{Deserialize, Serialize};

/// "CPU use is moderate": peak at 30% of one core.
pub const MID_CPU: TriangularMembership = TriangularMembership::fixed(0.15, 0.30);
/// "CPU use is high": peak at a full core.
pub const HI_CPU: TriangularMembership = TriangularMembership::fixed(0.70, 1.0);
/// "Memory use is moderate": peak at 15% of RAM.
pub const MID_MEM: TriangularMembership = TriangularMembership::fixed(0.15, 0.15);
/// "Memory use is high": peak at all of RAM.
pub const HI_MEM: TriangularMembership = TriangularMembership::fixed(0.85, 1.0);

/// Highest nice value; a process at this niceness is fully "nice".
pub const MAX_NICE: f64 = 20.0;

/// The rule inputs, in truth-table column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleInput {
    Nice,
    Disowned,
    MidCpu,
    MidMem,
    HiCpu,
    HiMem,
}

impl RuleInput {
    pub const COUNT: usize = 6;

    pub const ALL: [RuleInput; Self::COUNT] = [
        RuleInput::Nice,
        RuleInput::Disowned,
        RuleInput::MidCpu,
        RuleInput::MidMem,
        RuleInput::HiCpu,
        RuleInput::HiMem,
    ];

    /// Column position in the truth table.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column label used in the truth table's `.ilb` line.
    pub fn label(self) -> &'static str {
        match self {
            RuleInput::Nice => "nice",
            RuleInput::Disowned => "disowned",
            RuleInput::MidCpu => "midcpu",
            RuleInput::MidMem => "midmem",
            RuleInput::HiCpu => "hicpu",
            RuleInput::HiMem => "himem",
        }
    }
}

impl std::fmt::Display for RuleInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Graded truth of every rule input for one process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuzzyInputs {
    pub nice: FuzzyValue,
    pub disowned: FuzzyValue,
    pub mid_cpu: FuzzyValue,
    pub mid_mem: FuzzyValue,
    pub hi_cpu: FuzzyValue,
    pub hi_mem: FuzzyValue,
}

impl FuzzyInputs {
    /// Fuzzify a sample.
    ///
    /// CPU is clamped to one full core before grading; memory is not clamped,
    /// so readings past 100% fall off both memory triangles.
    pub fn from_sample(sample: &ProcessSample) -> Self {
        let cpu_ratio = cpu_ratio(sample.cpu_percent);
        let mem_ratio = mem_ratio(sample.mem_percent);
        Self {
            nice: nice_truth(sample.nice),
            disowned: FuzzyValue::from_bool(ProcessId(sample.parent_pid).is_init()),
            mid_cpu: MID_CPU.grade(cpu_ratio),
            mid_mem: MID_MEM.grade(mem_ratio),
            hi_cpu: HI_CPU.grade(cpu_ratio),
            hi_mem: HI_MEM.grade(mem_ratio),
        }
    }

    /// Truth of one input.
    pub fn get(&self, input: RuleInput) -> FuzzyValue {
        match input {
            RuleInput::Nice => self.nice,
            RuleInput::Disowned => self.disowned,
            RuleInput::MidCpu => self.mid_cpu,
            RuleInput::MidMem => self.mid_mem,
            RuleInput::HiCpu => self.hi_cpu,
            RuleInput::HiMem => self.hi_mem,
        }
    }

    /// Crisp inputs: 1 where the assignment bit is set.
    pub fn from_assignment(assignment: [bool; RuleInput::COUNT]) -> Self {
        let v = |input: RuleInput| FuzzyValue::from_bool(assignment[input.index()]);
        Self {
            nice: v(RuleInput::Nice),
            disowned: v(RuleInput::Disowned),
            mid_cpu: v(RuleInput::MidCpu),
            mid_mem: v(RuleInput::MidMem),
            hi_cpu: v(RuleInput::HiCpu),
            hi_mem: v(RuleInput::HiMem),
        }
    }
}

/// CPU percent as a fraction of one core, clamped to at most 1.
///
/// A non-finite reading is malformed and counts as no CPU use. `f64::min`
/// would otherwise turn NaN and infinity into a full core.
pub fn cpu_ratio(cpu_percent: f64) -> f64 {
    if !cpu_percent.is_finite() {
        return 0.0;
    }
    (cpu_percent / 100.0).min(1.0)
}

/// Memory percent as a fraction of RAM. Not clamped.
pub fn mem_ratio(mem_percent: f64) -> f64 {
    mem_percent / 100.0
}

/// Niceness as a truth value: 0 for nice <= 0 or unknown, else nice/20.
pub fn nice_truth(nice: Option<i32>) -> FuzzyValue {
    match nice {
        Some(n) if n > 0 => FuzzyValue::new(n as f64 / MAX_NICE),
        _ => FuzzyValue::FALSE,
    }
}
