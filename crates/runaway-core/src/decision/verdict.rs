//! Process-level verdict.

use crate::collect::ProcessSample;
use crate::inference::{Badness, FuzzyInputs, RuleSet, RUNAWAY_RULES};
use runaway_fuzzy::FuzzyValue;
use serde::Serialize;

/// Badness above which a process is a runaway. Equal is clean.
pub const BADNESS_THRESHOLD: f64 = 0.30;

/// Verdict for one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessVerdict {
    Runaway,
    Clean,
    /// The process exited before it could be sampled. Not evidence either way.
    Vanished,
    /// The adapter failed to sample a process that may still be running.
    /// Scores as neutral and is never counted as vanished.
    Unavailable,
}

impl ProcessVerdict {
    pub fn is_runaway(self) -> bool {
        self == ProcessVerdict::Runaway
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Runaway => "runaway",
            Self::Clean => "clean",
            Self::Vanished => "vanished",
            Self::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for ProcessVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold a badness score.
pub fn classify(score: FuzzyValue) -> ProcessVerdict {
    if score.exceeds(BADNESS_THRESHOLD) {
        ProcessVerdict::Runaway
    } else {
        ProcessVerdict::Clean
    }
}

/// Everything known about one process after scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessAssessment {
    pub pid: u32,
    pub verdict: ProcessVerdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<ProcessSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<FuzzyInputs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badness: Option<Badness>,
}

impl ProcessAssessment {
    pub fn vanished(pid: u32) -> Self {
        Self {
            pid,
            verdict: ProcessVerdict::Vanished,
            sample: None,
            inputs: None,
            badness: None,
        }
    }

    /// A process the adapter could not sample.
    pub fn unavailable(pid: u32) -> Self {
        Self {
            verdict: ProcessVerdict::Unavailable,
            ..Self::vanished(pid)
        }
    }

    /// Badness score, zero when nothing was sampled.
    pub fn score(&self) -> FuzzyValue {
        self.badness
            .as_ref()
            .map(|b| b.score)
            .unwrap_or(FuzzyValue::FALSE)
    }
}

/// Score a sample against a rule set.
pub fn assess_with(rules: &RuleSet, sample: ProcessSample) -> ProcessAssessment {
    let inputs = FuzzyInputs::from_sample(&sample);
    let badness = rules.score(&inputs);
    ProcessAssessment {
        pid: sample.pid,
        verdict: classify(badness.score),
        sample: Some(sample),
        inputs: Some(inputs),
        badness: Some(badness),
    }
}

/// Score a sample against the shipped rules; `None` means it vanished.
pub fn assess_sample(pid: u32, sample: Option<ProcessSample>) -> ProcessAssessment {
    match sample {
        Some(sample) => assess_with(&RUNAWAY_RULES, sample),
        None => ProcessAssessment::vanished(pid),
    }
}

/// Per-verdict counts over a scan. Vanished processes are kept apart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VerdictCounts {
    pub runaway: usize,
    pub clean: usize,
    pub vanished: usize,
    pub unavailable: usize,
}

impl VerdictCounts {
    pub fn tally<'a>(assessments: impl IntoIterator<Item = &'a ProcessAssessment>) -> Self {
        let mut counts = Self::default();
        for a in assessments {
            counts.record(a.verdict);
        }
        counts
    }

    pub fn record(&mut self, verdict: ProcessVerdict) {
        match verdict {
            ProcessVerdict::Runaway => self.runaway += 1,
            ProcessVerdict::Clean => self.clean += 1,
            ProcessVerdict::Vanished => self.vanished += 1,
            ProcessVerdict::Unavailable => self.unavailable += 1,
        }
    }

    /// Processes that were actually scored.
    pub fn scored(&self) -> usize {
        self.runaway + self.clean
    }

    /// Every process looked at.
    pub fn total(&self) -> usize {
        self.scored() + self.vanished + self.unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(nice: i32, ppid: u32, cpu: f64, mem: f64) -> ProcessSample {
        ProcessSample {
            pid: 4242,
            nice: Some(nice),
            parent_pid: ppid,
            cpu_percent: cpu,
            mem_percent: mem,
        }
    }

    #[test]
    fn threshold_is_strict() {
        assert_eq!(classify(FuzzyValue::new(0.30)), ProcessVerdict::Clean);
        assert_eq!(classify(FuzzyValue::new(0.300001)), ProcessVerdict::Runaway);
        assert_eq!(classify(FuzzyValue::FALSE), ProcessVerdict::Clean);
    }

    #[test]
    fn orphan_at_moderate_cpu_is_runaway() {
        let a = assess_sample(4242, Some(sample(0, 1, 35.0, 5.0)));
        assert_eq!(a.verdict, ProcessVerdict::Runaway);
        assert_eq!(a.badness.as_ref().unwrap().dominant().unwrap().label, "orphan_cpu");
    }

    #[test]
    fn nice_child_is_clean() {
        let a = assess_sample(4242, Some(sample(10, 500, 10.0, 5.0)));
        assert_eq!(a.verdict, ProcessVerdict::Clean);
        assert!(a.score().value() < BADNESS_THRESHOLD);
    }

    #[test]
    fn vanished_has_no_score() {
        let a = assess_sample(7, None);
        assert_eq!(a.verdict, ProcessVerdict::Vanished);
        assert_eq!(a.score(), FuzzyValue::FALSE);
        assert!(a.sample.is_none());
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["verdict"], "vanished");
        assert!(json.get("badness").is_none());
    }

    #[test]
    fn tally_keeps_vanished_apart() {
        let all = vec![
            assess_sample(1, Some(sample(0, 500, 100.0, 1.0))),
            assess_sample(2, Some(sample(0, 500, 1.0, 1.0))),
            assess_sample(3, None),
        ];
        let counts = VerdictCounts::tally(&all);
        assert_eq!(
            counts,
            VerdictCounts {
                runaway: 1,
                clean: 1,
                vanished: 1,
                unavailable: 0
            }
        );
        assert_eq!(counts.scored(), 2);
    }

    #[test]
    fn unavailable_is_neither_scored_nor_vanished() {
        let mut counts = VerdictCounts::default();
        let a = ProcessAssessment::unavailable(4);
        counts.record(a.verdict);
        assert_eq!(counts.vanished, 0);
        assert_eq!(counts.scored(), 0);
        assert_eq!(counts.total(), 1);
        assert_eq!(a.score(), FuzzyValue::FALSE);
        assert!(!a.verdict.is_runaway());
    }
}
