//! Runaway detector common types, IDs, and errors.
//!
//! This crate provides foundational types shared across runaway-core modules:
//! - Process identity type
//! - Common error taxonomy with stable codes
//! - Output format specifications

pub mod error;
pub mod id;
pub mod output;

pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use id::ProcessId;
pub use output::OutputFormat;
