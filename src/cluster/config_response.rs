//! Cluster configuration snapshot from `config get cluster`

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::node::{parse_node_triple, ClusterNode};
use crate::utils::DiscoveryError;

/// Cluster configuration snapshot
///
/// Two responses compare equal when they describe the same set of nodes,
/// regardless of order or reported version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    /// Configuration version, bumped by the server on membership changes
    pub version: u64,
    /// Nodes in the order the server reported them
    pub nodes: Vec<ClusterNode>,
}

impl ConfigResponse {
    /// Parse a `config get cluster` reply (without the END line)
    ///
    /// Format:
    /// ```text
    /// CONFIG cluster 0 141\r\n
    /// 12\n
    /// host1|10.0.0.1|11211 host2|10.0.0.2|11211\n
    /// \r\n
    /// ```
    pub fn parse(response: &str) -> Result<Self, DiscoveryError> {
        let mut lines = response.split('\n').map(|l| l.trim_end_matches('\r'));

        // Header: CONFIG cluster <flag> <length>
        lines.next();

        let version_line = lines
            .next()
            .ok_or_else(|| DiscoveryError::ProtocolParse("missing config version".to_string()))?;
        let version: u64 = version_line.trim().parse().map_err(|_| {
            DiscoveryError::ProtocolParse(format!("invalid config version {:?}", version_line))
        })?;

        let nodes_line = lines
            .next()
            .ok_or_else(|| DiscoveryError::ProtocolParse("missing node list".to_string()))?;

        let nodes = nodes_line
            .split_whitespace()
            .map(parse_node_triple)
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_nodes(version, nodes)
    }

    /// Build a response from already known nodes
    pub fn from_nodes(version: u64, nodes: Vec<ClusterNode>) -> Result<Self, DiscoveryError> {
        if nodes.is_empty() {
            return Err(DiscoveryError::ProtocolParse(
                "cluster config lists no nodes".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for node in &nodes {
            if !seen.insert(node.host.as_str()) {
                return Err(DiscoveryError::ProtocolParse(format!(
                    "duplicate node host {:?}",
                    node.host
                )));
            }
        }

        Ok(Self { version, nodes })
    }

    /// Node addresses as `host:port` strings
    pub fn servers(&self) -> Vec<String> {
        self.nodes.iter().map(ClusterNode::address).collect()
    }

    /// Get number of nodes
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Check if both snapshots describe the same node set
    pub fn same_nodes(&self, other: &ConfigResponse) -> bool {
        self.node_set() == other.node_set()
    }

    fn node_set(&self) -> BTreeSet<&ClusterNode> {
        self.nodes.iter().collect()
    }
}

impl PartialEq for ConfigResponse {
    fn eq(&self, other: &Self) -> bool {
        self.same_nodes(other)
    }
}

impl Eq for ConfigResponse {}
