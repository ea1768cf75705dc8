//! elasticache-autodiscovery library
//!
//! Client-side auto-discovery for ElastiCache memcached clusters: reads the
//! node list from the cluster's configuration endpoint and keeps a cache
//! client pointed at the live nodes.

pub mod client;
pub mod cluster;
pub mod config;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use client::{CacheClient, CacheClientFactory, ElastiCache, RefreshOutcome};
pub use cluster::{ClusterNode, ConfigResponse, Endpoint, EndpointOptions, StatsResponse};
pub use config::{CacheOptions, ElastiCacheOptions};
pub use utils::{CacheError, ConfigError, DiscoveryError, Error, Result};
