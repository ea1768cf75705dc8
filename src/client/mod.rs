//! Client layer

pub mod cache_client;
pub mod elasticache;
pub mod raw_connection;

pub use cache_client::{CacheClient, CacheClientFactory, CacheResult};
pub use elasticache::{ElastiCache, RefreshOutcome};
pub use raw_connection::DiscoveryConnection;
