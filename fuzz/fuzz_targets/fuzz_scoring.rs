//! Fuzz target for process scoring.
//!
//! Arbitrary samples, including non-finite percentages, must score to a
//! truth value in [0, 1].

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use runaway_core::collect::ProcessSample;
use runaway_core::decision::assess_sample;
use runaway_core::inference::FuzzyInputs;

#[derive(Debug, Arbitrary)]
struct SampleInput {
    pid: u32,
    nice: Option<i32>,
    parent_pid: u32,
    cpu_percent: f64,
    mem_percent: f64,
}

fuzz_target!(|input: SampleInput| {
    let sample = ProcessSample {
        pid: input.pid,
        nice: input.nice,
        parent_pid: input.parent_pid,
        cpu_percent: input.cpu_percent,
        mem_percent: input.mem_percent,
    };
    if !sample.cpu_percent.is_finite() {
        let inputs = FuzzyInputs::from_sample(&sample);
        assert_eq!(inputs.hi_cpu.value(), 0.0);
        assert_eq!(inputs.mid_cpu.value(), 0.0);
    }
    let score = assess_sample(sample.pid, Some(sample)).score().value();
    assert!((0.0..=1.0).contains(&score));
});
