//! Fuzz target for config.toml parsing.
//!
//! Tests that configuration parsing and validation handle arbitrary input
//! without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use runaway_core::config::RunawayConfig;
use std::path::Path;

fuzz_target!(|data: &str| {
    // Should never panic, only return an error
    let _ = RunawayConfig::from_toml(data, Path::new("fuzz.toml"));
});
