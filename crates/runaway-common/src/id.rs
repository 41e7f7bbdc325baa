//! Process identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The init process; anything re-parented to it has been disowned.
pub const INIT_PID: ProcessId = ProcessId(1);

/// Process ID wrapper with display formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(pub u32);

impl ProcessId {
    /// Whether this is the init process.
    pub fn is_init(self) -> bool {
        self == INIT_PID
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ProcessId {
    fn from(pid: u32) -> Self {
        ProcessId(pid)
    }
}

impl FromStr for ProcessId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u32>() {
            Ok(0) => Err("process id must be positive".to_string()),
            Ok(pid) => Ok(ProcessId(pid)),
            Err(_) => Err(format!("invalid process id: {}", s)),
        }
    }
}
