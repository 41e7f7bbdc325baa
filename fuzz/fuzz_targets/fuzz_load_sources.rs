//! Fuzz target for load average sources: /proc/loadavg, `uptime` output and
//! /proc/uptime.

#![no_main]

use libfuzzer_sys::fuzz_target;
use runaway_core::collect::{parse_loadavg, parse_uptime_load, parse_uptime_seconds};

fuzz_target!(|data: &str| {
    let _ = parse_loadavg(data);
    let _ = parse_uptime_load(data);
    let _ = parse_uptime_seconds(data);
});
