//! Fleet mode: resolve a host group and run the check on every host.

pub mod discovery;
pub mod ssh_check;

pub use discovery::{
    parse_netgroup, resolve_group, DiscoveryError, HostGroupResolver, HostInventory,
    InventoryResolver, NetgroupResolver, ResolvedGroup,
};
pub use ssh_check::{
    build_ssh_args, check_fleet, interpret_remote, FleetReport, ForwardedFlags, HostCheckResult,
    HostExecutor, HostStatus, SshCheckConfig, SshExecutor,
};

use crate::collect::ToolRunner;
use crate::config::FleetConfig;
use regex::Regex;
use std::time::Duration;
use thiserror::Error;

/// Fleet wrapper errors.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("host group {group} resolved to no hosts")]
    EmptyGroup { group: String },

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("invalid exclusion pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl From<FleetError> for runaway_common::Error {
    fn from(err: FleetError) -> Self {
        match err {
            FleetError::EmptyGroup { group } => runaway_common::Error::EmptyHostGroup { group },
            other => runaway_common::Error::HostResolution(other.to_string()),
        }
    }
}

/// Hosts to contact after exclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlan {
    pub group: String,
    pub source: Option<String>,
    pub hosts: Vec<String>,
    pub excluded: Vec<String>,
}

/// Split hosts into kept and excluded by `pattern`.
pub fn apply_exclusion(hosts: Vec<String>, pattern: Option<&Regex>) -> (Vec<String>, Vec<String>) {
    match pattern {
        Some(re) => hosts.into_iter().partition(|h| !re.is_match(h)),
        None => (hosts, Vec::new()),
    }
}

/// The standard resolver chain: the inventory file if configured, then
/// netgroups.
pub fn default_resolvers(config: &FleetConfig) -> Vec<Box<dyn HostGroupResolver>> {
    let mut resolvers: Vec<Box<dyn HostGroupResolver>> = Vec::new();
    if let Some(path) = &config.inventory {
        resolvers.push(Box::new(InventoryResolver::new(path.clone())));
    }
    resolvers.push(Box::new(NetgroupResolver::new(ToolRunner::with_timeout(
        Duration::from_secs(config.connect_timeout_secs),
    ))));
    resolvers
}

/// Resolve a group and apply the exclusion pattern.
///
/// An empty result, before or after exclusion, is an error: there is
/// nothing to check.
pub fn plan_hosts(
    group: &str,
    resolvers: &[Box<dyn HostGroupResolver>],
    exclude: Option<&str>,
) -> Result<HostPlan, FleetError> {
    let pattern = exclude.map(Regex::new).transpose()?;
    let resolved = resolve_group(group, resolvers)?;
    let (hosts, excluded) = apply_exclusion(resolved.hosts, pattern.as_ref());
    if hosts.is_empty() {
        return Err(FleetError::EmptyGroup {
            group: group.to_string(),
        });
    }
    Ok(HostPlan {
        group: resolved.group,
        source: resolved.source,
        hosts,
        excluded,
    })
}
