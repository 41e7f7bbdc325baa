//! Fuzz target for memory sources: /proc/meminfo and macOS `vm_stat`.

#![no_main]

use libfuzzer_sys::fuzz_target;
use runaway_core::collect::{parse_meminfo, parse_meminfo_used_ratio, parse_vm_stat};

fuzz_target!(|data: &str| {
    let _ = parse_meminfo(data);
    if let Some(ratio) = parse_meminfo_used_ratio(data) {
        assert!(ratio.is_finite());
    }
    if let Some(stat) = parse_vm_stat(data) {
        if let Some(ratio) = stat.used_ratio(u64::MAX) {
            assert!((0.0..=1.0).contains(&ratio));
        }
    }
});
