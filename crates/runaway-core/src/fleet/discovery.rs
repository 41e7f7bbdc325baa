//! Host group resolution.
//!
//! A group name resolves through a chain of resolvers; the first one that
//! knows the group wins:
//! - Inventory file (TOML, YAML or JSON, picked by extension)
//! - NIS/LDAP netgroup via `getent netgroup`

use crate::collect::{ToolError, ToolRunner, ToolSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// `getent` exit status for an unknown key.
const GETENT_NOT_FOUND: i32 = 2;

/// Errors returned by resolvers.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to read inventory {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {format} inventory {path}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },
    #[error("unsupported inventory format: {0}")]
    UnsupportedFormat(String),
    #[error("netgroup lookup failed: {0}")]
    Netgroup(String),
}

/// Source of host names for a group.
pub trait HostGroupResolver {
    /// Resolver name used for logs.
    fn name(&self) -> &str;
    /// Hosts of `group`, or `None` if this resolver does not know it.
    fn resolve(&self, group: &str) -> Result<Option<Vec<String>>, DiscoveryError>;
}

/// Inventory file contents: group name to host list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInventory {
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InventoryFormat {
    Toml,
    Yaml,
    Json,
}

impl InventoryFormat {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }
}

impl HostInventory {
    pub fn load_from_path(path: &Path) -> Result<Self, DiscoveryError> {
        let content = fs::read_to_string(path).map_err(|source| DiscoveryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let format = detect_format(path)?;
        Self::parse_str(&content, format).map_err(|message| DiscoveryError::Parse {
            path: path.to_path_buf(),
            format: format.as_str(),
            message,
        })
    }

    pub(crate) fn parse_str(content: &str, format: InventoryFormat) -> Result<Self, String> {
        match format {
            InventoryFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            InventoryFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            InventoryFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

fn detect_format(path: &Path) -> Result<InventoryFormat, DiscoveryError> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    match ext.as_str() {
        "toml" => Ok(InventoryFormat::Toml),
        "yaml" | "yml" => Ok(InventoryFormat::Yaml),
        "json" => Ok(InventoryFormat::Json),
        _ => Err(DiscoveryError::UnsupportedFormat(ext)),
    }
}

/// Groups from an inventory file.
#[derive(Debug, Clone)]
pub struct InventoryResolver {
    path: PathBuf,
}

impl InventoryResolver {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl HostGroupResolver for InventoryResolver {
    fn name(&self) -> &str {
        "inventory"
    }

    fn resolve(&self, group: &str) -> Result<Option<Vec<String>>, DiscoveryError> {
        let inventory = HostInventory::load_from_path(&self.path)?;
        Ok(inventory.groups.get(group).cloned())
    }
}

/// Groups from the system netgroup database.
#[derive(Debug, Clone, Default)]
pub struct NetgroupResolver {
    runner: ToolRunner,
}

impl NetgroupResolver {
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }
}

impl HostGroupResolver for NetgroupResolver {
    fn name(&self) -> &str {
        "netgroup"
    }

    fn resolve(&self, group: &str) -> Result<Option<Vec<String>>, DiscoveryError> {
        let spec = ToolSpec::new("getent", vec!["netgroup".to_string(), group.to_string()]);
        let output = match self.runner.run(&spec) {
            Ok(output) => output,
            Err(ToolError::CommandNotFound(_)) => {
                debug!("getent not available, skipping netgroup lookup");
                return Ok(None);
            }
            Err(e) => return Err(DiscoveryError::Netgroup(e.to_string())),
        };
        if output.timed_out {
            return Err(DiscoveryError::Netgroup("getent timed out".to_string()));
        }
        match output.exit_code {
            Some(0) => Ok(Some(parse_netgroup(&output.stdout_str()))),
            Some(GETENT_NOT_FOUND) => Ok(None),
            code => Err(DiscoveryError::Netgroup(format!(
                "getent exited with {:?}: {}",
                code,
                output.stderr_str().trim()
            ))),
        }
    }
}

/// Host names from `getent netgroup` output.
///
/// The output is the group name followed by `(host,user,domain)` triples.
/// Triples with an empty or `-` host are skipped.
pub fn parse_netgroup(output: &str) -> Vec<String> {
    let mut hosts = Vec::new();
    let mut rest = output;
    while let Some(open) = rest.find('(') {
        let after = &rest[open + 1..];
        let Some(close) = after.find(')') else {
            break;
        };
        let host = after[..close].split(',').next().unwrap_or("").trim();
        if !host.is_empty() && host != "-" && !hosts.iter().any(|h| h == host) {
            hosts.push(host.to_string());
        }
        rest = &after[close + 1..];
    }
    hosts
}

/// A resolved group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedGroup {
    pub group: String,
    /// Resolver that knew the group, if any did.
    pub source: Option<String>,
    /// Hosts in first-seen order, without duplicates.
    pub hosts: Vec<String>,
}

/// Resolve a group through a chain of resolvers.
///
/// A resolver error is fatal; a resolver that does not know the group passes
/// to the next. An unknown group resolves to an empty host list.
pub fn resolve_group(
    group: &str,
    resolvers: &[Box<dyn HostGroupResolver>],
) -> Result<ResolvedGroup, DiscoveryError> {
    for resolver in resolvers {
        if let Some(hosts) = resolver.resolve(group)? {
            let mut unique: Vec<String> = Vec::with_capacity(hosts.len());
            for host in hosts {
                let host = host.trim().to_string();
                if !host.is_empty() && !unique.contains(&host) {
                    unique.push(host);
                }
            }
            return Ok(ResolvedGroup {
                group: group.to_string(),
                source: Some(resolver.name().to_string()),
                hosts: unique,
            });
        }
        debug!(resolver = resolver.name(), group, "group not known to resolver");
    }
    Ok(ResolvedGroup {
        group: group.to_string(),
        source: None,
        hosts: Vec::new(),
    })
}
