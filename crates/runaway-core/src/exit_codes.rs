//! Exit codes for the runaway CLI.
//!
//! Exit codes communicate the verdict without requiring output parsing, so
//! shell wrappers and fleet fan-out can act on them directly.
//!
//! Exit code ranges:
//! - 0, 1, 255: verdicts (runaway, clean, vanished / nothing to check)
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors (bugs, should be reported)

use runaway_common::{Error, ErrorCategory};

/// Exit codes for runaway operations.
///
/// These codes are a stable contract for automation. Changes require
/// a major version bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Verdicts
    // ========================================================================
    /// A runaway machine state or runaway process was detected
    Runaway = 0,

    /// Nothing runaway was found
    Clean = 1,

    /// Target process vanished, or the host group resolved to nothing
    Vanished = 255,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments or input file
    ArgsError = 10,

    /// Configuration file missing or malformed
    ConfigError = 11,

    /// Rule cover does not match its truth table
    RuleCoverError = 12,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    /// Successful completion of a command that renders no verdict.
    pub const OK: ExitCode = ExitCode::Runaway;

    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Exit code for a verdict.
    pub fn from_verdict(runaway: bool) -> Self {
        if runaway {
            ExitCode::Runaway
        } else {
            ExitCode::Clean
        }
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Runaway => "OK_RUNAWAY",
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::Vanished => "OK_VANISHED",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::RuleCoverError => "ERR_RULE_COVER",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::EmptyHostGroup { .. } => ExitCode::Vanished,
            Error::RuleCover(_) => ExitCode::RuleCoverError,
            Error::TruthTable(_) => ExitCode::ArgsError,
            _ => match err.category() {
                ErrorCategory::Config => ExitCode::ConfigError,
                ErrorCategory::Fleet => ExitCode::ArgsError,
                ErrorCategory::Io => ExitCode::IoError,
                _ => ExitCode::InternalError,
            },
        }
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_codes_are_stable() {
        assert_eq!(ExitCode::Runaway.as_i32(), 0);
        assert_eq!(ExitCode::Clean.as_i32(), 1);
        assert_eq!(ExitCode::Vanished.as_i32(), 255);
        assert_eq!(i32::from(ExitCode::ConfigError), 11);
    }

    #[test]
    fn errors_map_to_codes() {
        assert_eq!(
            ExitCode::from(&Error::EmptyHostGroup {
                group: "g".into()
            }),
            ExitCode::Vanished
        );
        assert_eq!(
            ExitCode::from(&Error::Config("bad".into())),
            ExitCode::ConfigError
        );
        assert_eq!(
            ExitCode::from(&Error::RuleCover("x".into())),
            ExitCode::RuleCoverError
        );
        let io = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "x"));
        assert_eq!(ExitCode::from(&io), ExitCode::IoError);
    }

    #[test]
    fn display_includes_name_and_number() {
        assert_eq!(ExitCode::Clean.to_string(), "OK_CLEAN (1)");
    }
}
