//! Error types for the runaway detector.
//!
//! Every error carries:
//! - A stable numeric code for machine parsing
//! - A category for grouping
//! - A recoverability hint
//! - A remediation sentence for humans
//!
//! The detection core itself degrades instead of failing (a missing metric
//! reads as neutral, a vanished process is its own verdict), so these errors
//! surface only at the edges: configuration, rule-table authoring, fleet
//! resolution and I/O.
//!
//! # Agent-Facing Output
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 40,
//!   "category": "fleet",
//!   "message": "host group 'compute' resolved to no hosts",
//!   "recoverable": true,
//!   "context": { "group": "compute" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for runaway detector operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors.
    Config,
    /// Rule table authoring and cover validation errors.
    Rules,
    /// Fleet fan-out errors.
    Fleet,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Rules => write!(f, "rules"),
            ErrorCategory::Fleet => write!(f, "fleet"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for the runaway detector.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    // Rule errors (20-29)
    #[error("invalid truth table: {0}")]
    TruthTable(String),

    #[error("rule cover does not match truth table: {0}")]
    RuleCover(String),

    // Fleet errors (40-49)
    #[error("host group '{group}' resolved to no hosts")]
    EmptyHostGroup { group: String },

    #[error("host group resolution failed: {0}")]
    HostResolution(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the stable error code for this error type.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::TruthTable(_) => 20,
            Error::RuleCover(_) => 21,
            Error::EmptyHostGroup { .. } => 40,
            Error::HostResolution(_) => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) => ErrorCategory::Config,
            Error::TruthTable(_) | Error::RuleCover(_) => ErrorCategory::Rules,
            Error::EmptyHostGroup { .. } | Error::HostResolution(_) => ErrorCategory::Fleet,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable by the user.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::TruthTable(_) => true,
            Error::RuleCover(_) => true,
            Error::EmptyHostGroup { .. } => true,
            Error::HostResolution(_) => true,
            Error::Io(_) => true,
            // serializing our own report; nothing the user can change
            Error::Json(_) => false,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => {
                "Check the TOML syntax of the config file, or run 'runaway config show' to see the defaults."
            }
            Error::TruthTable(_) => {
                "The rule table must be an Espresso PLA file with six inputs and one output."
            }
            Error::RuleCover(_) => {
                "Re-run the logic minimizer on the truth table and update the rule cover to match."
            }
            Error::EmptyHostGroup { .. } => {
                "Check the group name against the inventory file and 'getent netgroup'."
            }
            Error::HostResolution(_) => {
                "Check that the inventory file parses and that getent is installed."
            }
            Error::Io(_) => "Check file permissions and paths, then retry.",
            Error::Json(_) => "Invalid JSON. Check the input with 'jq .'.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::TruthTable(_) => "Invalid Truth Table",
            Error::RuleCover(_) => "Rule Cover Mismatch",
            Error::EmptyHostGroup { .. } => "Empty Host Group",
            Error::HostResolution(_) => "Host Resolution Failed",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }

    /// Format for a terminal: headline, reason and fix.
    pub fn to_human(&self) -> String {
        format!(
            "✗ {}\n  Reason: {}\n  Fix: {}",
            self.headline(),
            self,
            self.remediation()
        )
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (e.g., the host group).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::EmptyHostGroup { group } => {
                context.insert("group".to_string(), serde_json::json!(group));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_grouped_by_category() {
        assert_eq!(Error::Config("x".into()).code(), 10);
        assert_eq!(Error::RuleCover("x".into()).code(), 21);
        assert_eq!(
            Error::EmptyHostGroup {
                group: "g".into()
            }
            .code(),
            40
        );
    }

    #[test]
    fn categories() {
        assert_eq!(
            Error::TruthTable("x".into()).category(),
            ErrorCategory::Rules
        );
        assert_eq!(
            Error::HostResolution("x".into()).category(),
            ErrorCategory::Fleet
        );
        let io = Error::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.category(), ErrorCategory::Io);
    }

    #[test]
    fn only_report_serialization_is_unrecoverable() {
        assert!(Error::Config("x".into()).is_recoverable());
        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!Error::Json(bad).is_recoverable());
    }

    #[test]
    fn structured_error_carries_context() {
        let err = Error::EmptyHostGroup {
            group: "compute".into(),
        };
        let structured = StructuredError::from(&err);
        assert_eq!(structured.code, 40);
        assert_eq!(structured.category, ErrorCategory::Fleet);
        assert_eq!(structured.context["group"], serde_json::json!("compute"));

        let json = structured.to_json();
        assert!(json.contains("\"category\":\"fleet\""));
    }

    #[test]
    fn human_format_has_fix_line() {
        let text = Error::Config("bad key".into()).to_human();
        assert!(text.contains("Configuration Error"));
        assert!(text.contains("Fix:"));
    }
}
