//! Logging configuration.
//!
//! Sources, lowest to highest priority: built-in defaults, `RUST_LOG`,
//! `RUNAWAY_LOG` (which masks `RUST_LOG`), `RUNAWAY_LOG_FORMAT`,
//! `RUNAWAY_LOG_TIMESTAMPS`, then the CLI's `-v`/`-q`/`--format`.

use std::fmt;
use std::str::FromStr;

/// Log line format on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    Jsonl,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Human => "human",
            LogFormat::Jsonl => "jsonl",
        })
    }
}

/// Minimum level that is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    const NAMES: [(LogLevel, &'static str); 6] = [
        (LogLevel::Trace, "trace"),
        (LogLevel::Debug, "debug"),
        (LogLevel::Info, "info"),
        (LogLevel::Warn, "warn"),
        (LogLevel::Error, "error"),
        (LogLevel::Off, "off"),
    ];

    /// Level selected by the `-v` count and `-q` flag; quiet wins.
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Option<Self> {
        match (quiet, verbose) {
            (true, _) => Some(LogLevel::Error),
            (false, 0) => None,
            (false, 1) => Some(LogLevel::Debug),
            (false, _) => Some(LogLevel::Trace),
        }
    }

    /// Most verbose level named anywhere in a `RUST_LOG` directive list.
    fn from_rust_log(directives: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .filter(|(level, _)| *level != LogLevel::Off)
            .find(|(_, name)| directives.contains(name))
            .map(|(level, _)| *level)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let s = match s.as_str() {
            "warning" => "warn",
            "none" | "quiet" => "off",
            other => other,
        };
        Self::NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(level, _)| *level)
            .ok_or_else(|| format!("unknown log level: {s}"))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = Self::NAMES
            .iter()
            .find(|(level, _)| level == self)
            .map_or("off", |(_, name)| *name);
        f.write_str(name)
    }
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Prefix human lines with a timestamp. JSONL lines always carry one.
    pub timestamps: bool,
}

impl Default for LogConfig {
    /// Warn level, so an interactive check prints nothing but its payload.
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LogLevel::Warn,
            timestamps: false,
        }
    }
}

impl LogConfig {
    /// Resolve from the process environment plus CLI overrides.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::from_lookup(|name| std::env::var(name).ok(), cli_level, cli_format)
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        cli_level: Option<LogLevel>,
        cli_format: Option<LogFormat>,
    ) -> Self {
        let defaults = LogConfig::default();

        let env_level = match lookup("RUNAWAY_LOG") {
            Some(val) => val.parse().ok(),
            None => lookup("RUST_LOG").and_then(|val| LogLevel::from_rust_log(&val)),
        };
        let env_format = lookup("RUNAWAY_LOG_FORMAT").and_then(|val| val.parse().ok());
        let timestamps = lookup("RUNAWAY_LOG_TIMESTAMPS")
            .map(|val| matches!(val.trim(), "1" | "true" | "yes"))
            .unwrap_or(defaults.timestamps);

        LogConfig {
            level: cli_level.or(env_level).unwrap_or(defaults.level),
            format: cli_format.or(env_format).unwrap_or(defaults.format),
            timestamps,
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn format_parse() {
        assert_eq!("human".parse::<LogFormat>(), Ok(LogFormat::Human));
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Jsonl));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn level_parse_and_display() {
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("quiet".parse::<LogLevel>(), Ok(LogLevel::Off));
        assert!("loud".parse::<LogLevel>().is_err());
        for (level, name) in LogLevel::NAMES {
            assert_eq!(level.to_string(), name);
            assert_eq!(name.parse::<LogLevel>(), Ok(level));
        }
    }

    #[test]
    fn verbosity_mapping() {
        assert_eq!(LogLevel::from_verbosity(0, false), None);
        assert_eq!(LogLevel::from_verbosity(1, false), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_verbosity(3, false), Some(LogLevel::Trace));
        assert_eq!(LogLevel::from_verbosity(2, true), Some(LogLevel::Error));
    }

    #[test]
    fn runaway_log_masks_rust_log() {
        let config = LogConfig::from_lookup(
            env(&[("RUNAWAY_LOG", "info"), ("RUST_LOG", "trace")]),
            None,
            None,
        );
        assert_eq!(config.level, LogLevel::Info);

        // an unparsable RUNAWAY_LOG still masks RUST_LOG
        let config = LogConfig::from_lookup(
            env(&[("RUNAWAY_LOG", "loud"), ("RUST_LOG", "trace")]),
            None,
            None,
        );
        assert_eq!(config.level, LogLevel::Warn);
    }

    #[test]
    fn rust_log_directives() {
        let level = |v: &str| LogConfig::from_lookup(env(&[("RUST_LOG", v)]), None, None).level;
        assert_eq!(level("runaway=debug"), LogLevel::Debug);
        assert_eq!(level("warn,runaway_core=trace"), LogLevel::Trace);
        assert_eq!(level("runaway"), LogLevel::Warn);
    }

    #[test]
    fn format_and_timestamps_from_env() {
        let config = LogConfig::from_lookup(
            env(&[("RUNAWAY_LOG_FORMAT", "jsonl"), ("RUNAWAY_LOG_TIMESTAMPS", "1")]),
            None,
            None,
        );
        assert_eq!(config.format, LogFormat::Jsonl);
        assert!(config.timestamps);
    }

    #[test]
    fn cli_overrides_env() {
        let config = LogConfig::from_lookup(
            env(&[("RUNAWAY_LOG", "trace"), ("RUNAWAY_LOG_FORMAT", "jsonl")]),
            Some(LogLevel::Error),
            Some(LogFormat::Human),
        );
        assert_eq!(config.level, LogLevel::Error);
        assert_eq!(config.format, LogFormat::Human);
    }

    #[test]
    fn defaults() {
        assert_eq!(
            LogConfig::from_lookup(env(&[]), None, None),
            LogConfig::default()
        );
        assert_eq!(LogConfig::default().level, LogLevel::Warn);
    }
}
