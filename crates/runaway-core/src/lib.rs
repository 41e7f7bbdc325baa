//! Runaway process detector core library.
//!
//! This library provides:
//! - Metric collection behind one adapter trait (procfs, `ps`)
//! - The fuzzy rule engine and its truth-table validation
//! - Machine triage and per-process verdicts
//! - The single-host check and the fleet fan-out
//! - Exit codes, configuration and structured logging
//!
//! The binary entry point is in `main.rs`.

pub mod check;
pub mod collect;
pub mod config;
pub mod context;
pub mod decision;
pub mod exit_codes;
pub mod fleet;
pub mod inference;
pub mod logging;
pub mod output;

// Re-export test utilities for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod mock_metrics;
