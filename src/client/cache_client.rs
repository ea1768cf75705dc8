//! Cache client traits
//!
//! The refreshing client does not speak the memcached data protocol itself.
//! It drives any implementation of these traits:
//! - `CacheClientFactory`: builds a client for a list of `host:port` servers
//! - `CacheClient`: the cache verbs
//!
//! Implementations must report transport problems as
//! `CacheError::ConnectionFailure` so they can be retried after a refresh.

use std::collections::HashMap;

use crate::config::CacheOptions;
use crate::utils::CacheError;

pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Cache verbs of a memcached client bound to a fixed server list
///
/// Handles are shared between threads, so every verb takes `&self`.
pub trait CacheClient: Send + Sync {
    /// Invalidate all items on every server
    fn flush(&self) -> CacheResult<()>;

    /// Get one value; `raw` skips value decoding
    fn get(&self, key: &str, raw: bool) -> CacheResult<Option<Vec<u8>>>;

    /// Get several values, missing keys are absent from the map
    fn get_multi(&self, keys: &[&str], raw: bool) -> CacheResult<HashMap<String, Vec<u8>>>;

    /// Store unconditionally
    fn set(&self, key: &str, value: &[u8], ttl: u32, raw: bool, flags: u32) -> CacheResult<()>;

    /// Store only if the key is absent
    fn add(&self, key: &str, value: &[u8], ttl: u32, raw: bool, flags: u32) -> CacheResult<()>;

    /// Store only if the key is present
    fn replace(&self, key: &str, value: &[u8], ttl: u32, raw: bool, flags: u32)
        -> CacheResult<()>;

    fn append(&self, key: &str, value: &[u8], ttl: u32, flags: u32) -> CacheResult<()>;

    fn prepend(&self, key: &str, value: &[u8], ttl: u32, flags: u32) -> CacheResult<()>;

    fn delete(&self, key: &str) -> CacheResult<()>;

    /// Returns the new value
    fn increment(&self, key: &str, offset: u64) -> CacheResult<u64>;

    /// Returns the new value
    fn decrement(&self, key: &str, offset: u64) -> CacheResult<u64>;

    fn exist(&self, key: &str) -> CacheResult<bool>;

    fn touch(&self, key: &str, ttl: u32) -> CacheResult<()>;

    /// Drop and re-open all server connections
    fn reset(&self) -> CacheResult<()>;

    fn namespace(&self) -> Option<String>;
}

/// Builds cache clients for a server list
pub trait CacheClientFactory: Send + Sync {
    type Client: CacheClient;

    /// `servers` are `host:port` strings
    fn build(&self, servers: &[String], options: &CacheOptions) -> CacheResult<Self::Client>;
}

impl<C, F> CacheClientFactory for F
where
    C: CacheClient,
    F: Fn(&[String], &CacheOptions) -> CacheResult<C> + Send + Sync,
{
    type Client = C;

    fn build(&self, servers: &[String], options: &CacheOptions) -> CacheResult<C> {
        self(servers, options)
    }
}
