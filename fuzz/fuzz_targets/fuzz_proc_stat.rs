//! Fuzz target for /proc/[pid]/stat and /proc/stat parsing.
//!
//! Tests that `parse_proc_stat` and `parse_cpu_times` handle arbitrary input
//! without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use runaway_core::collect::{parse_cpu_count, parse_cpu_times, parse_proc_stat};

fuzz_target!(|data: &str| {
    // The parsers should never panic, only return None for malformed input
    let _ = parse_proc_stat(data);
    let _ = parse_cpu_times(data);
    let _ = parse_cpu_count(data);
});
