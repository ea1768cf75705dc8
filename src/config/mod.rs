//! Configuration module

pub mod options;

pub use options::{
    CacheOptions, ElastiCacheOptions, DEFAULT_MAX_RETRY_COUNT, DEFAULT_REFRESH_INTERVAL,
};
