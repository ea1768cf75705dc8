//! Cluster discovery
//!
//! This module provides:
//! - Configuration endpoint parsing and the discovery dialog
//! - `config get cluster` parsing into a node set
//! - `stats` parsing

pub mod config_response;
pub mod endpoint;
pub mod node;
pub mod stats_response;

pub use config_response::ConfigResponse;
pub use endpoint::{Endpoint, EndpointOptions};
pub use node::ClusterNode;
pub use stats_response::StatsResponse;
