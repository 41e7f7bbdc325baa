//! Fuzz target for PLA truth table parsing and cover validation.
//!
//! Any table that parses must be checkable against the built-in rules
//! without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use runaway_core::inference::{validate_cover, TruthTable, RUNAWAY_RULES};

fuzz_target!(|data: &str| {
    if let Ok(table) = TruthTable::parse(data) {
        let _ = validate_cover(&table, &RUNAWAY_RULES);
    }
});
