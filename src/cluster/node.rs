//! Cluster node representation

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::DiscoveryError;

/// Cache node as reported by `config get cluster`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterNode {
    /// DNS host name (stable across node reboots)
    pub host: String,
    /// Private IP address at discovery time
    pub ip: String,
    /// Port
    pub port: u16,
}

impl ClusterNode {
    pub fn new(host: impl Into<String>, ip: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            ip: ip.into(),
            port,
        }
    }

    /// Get node address as string
    ///
    /// Always built from the host name; node IPs can change after a reboot.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ClusterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.host, self.ip, self.port)
    }
}

/// Parse one node entry from a cluster config line
///
/// Format: `<host>|<ip>|<port>`
///
/// Example:
/// ```text
/// mycluster.0001.cache.amazonaws.com|10.112.21.1|11211
/// ```
pub fn parse_node_triple(entry: &str) -> Result<ClusterNode, DiscoveryError> {
    let parts: Vec<&str> = entry.split('|').collect();
    if parts.len() != 3 {
        return Err(DiscoveryError::ProtocolParse(format!(
            "malformed node entry {:?}: expected host|ip|port",
            entry
        )));
    }

    if parts[0].is_empty() {
        return Err(DiscoveryError::ProtocolParse(format!(
            "malformed node entry {:?}: empty host",
            entry
        )));
    }

    let port: u16 = parts[2].parse().map_err(|_| {
        DiscoveryError::ProtocolParse(format!(
            "malformed node entry {:?}: invalid port {:?}",
            entry, parts[2]
        ))
    })?;

    Ok(ClusterNode::new(parts[0], parts[1], port))
}
