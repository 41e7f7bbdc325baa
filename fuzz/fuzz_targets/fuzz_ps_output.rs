//! Fuzz target for `ps` output parsing.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use runaway_core::collect::{parse_ps_pids, parse_ps_sample};

#[derive(Debug, Arbitrary)]
struct PsInput<'a> {
    pid: u32,
    output: &'a str,
}

fuzz_target!(|input: PsInput<'_>| {
    let _ = parse_ps_pids(input.output);
    if let Some(sample) = parse_ps_sample(input.pid, input.output) {
        assert_eq!(sample.pid, input.pid);
    }
});
