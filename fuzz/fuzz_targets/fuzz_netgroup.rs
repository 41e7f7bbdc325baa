//! Fuzz target for `getent netgroup` output parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use runaway_core::fleet::parse_netgroup;

fuzz_target!(|data: &str| {
    let hosts = parse_netgroup(data);
    for host in &hosts {
        assert!(!host.is_empty() && host != "-");
    }
});
