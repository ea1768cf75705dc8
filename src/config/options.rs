//! Client options
//!
//! Client-level settings stay with the refreshing client. Everything in
//! `CacheOptions` is handed verbatim to the cache client factory.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cluster::EndpointOptions;
use crate::utils::ConfigError;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_RETRY_COUNT: u32 = 1;

/// Options forwarded to the cache client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Key prefix applied by the cache client
    pub namespace: Option<String>,
    /// Compress values before storing
    pub compress: bool,
    /// Default TTL in seconds (0 = never expire)
    pub default_ttl: u32,
    /// Any other option, passed through untouched
    pub extra: BTreeMap<String, String>,
}

/// Refreshing client options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElastiCacheOptions {
    /// Minimum time between periodic refreshes; zero refreshes before every call
    pub refresh_interval: Duration,
    /// Extra attempts after a connection failure
    pub max_retry_count: u32,
    /// Skip discovery and use the endpoint as the only node
    pub standalone_mode: bool,
    /// Discovery connect deadline
    pub connect_timeout: Option<Duration>,
    /// Discovery read/write deadline; unset blocks indefinitely
    pub io_timeout: Option<Duration>,
    /// Pass-through options for the cache client
    pub cache: CacheOptions,
}

impl Default for ElastiCacheOptions {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            max_retry_count: DEFAULT_MAX_RETRY_COUNT,
            standalone_mode: false,
            connect_timeout: None,
            io_timeout: None,
            cache: CacheOptions::default(),
        }
    }
}

impl ElastiCacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from loose key/value pairs
    ///
    /// Client-level keys are consumed:
    /// - `refresh_interval` (seconds, negative means refresh before every call)
    /// - `max_retry_count`
    /// - `local_mode` / `standalone_mode`
    /// - `connect_timeout`, `io_timeout` (seconds)
    ///
    /// `namespace`, `compress` and `default_ttl` (alias `expires_in`) fill the
    /// typed cache options; anything else lands in `CacheOptions::extra`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut options = Self::default();

        for (key, value) in pairs {
            let key = key.into();
            let value = value.into();

            match key.as_str() {
                "refresh_interval" => {
                    let secs: i64 = parse_value(&key, &value)?;
                    options.refresh_interval = Duration::from_secs(secs.max(0) as u64);
                }
                "max_retry_count" => options.max_retry_count = parse_value(&key, &value)?,
                "local_mode" | "standalone_mode" => {
                    options.standalone_mode = parse_value(&key, &value)?
                }
                "connect_timeout" => {
                    options.connect_timeout = Some(parse_secs(&key, &value)?)
                }
                "io_timeout" => options.io_timeout = Some(parse_secs(&key, &value)?),
                "namespace" => options.cache.namespace = Some(value),
                "compress" => options.cache.compress = parse_value(&key, &value)?,
                "default_ttl" | "expires_in" => {
                    options.cache.default_ttl = parse_value(&key, &value)?
                }
                _ => {
                    options.cache.extra.insert(key, value);
                }
            }
        }

        Ok(options)
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_max_retry_count(mut self, count: u32) -> Self {
        self.max_retry_count = count;
        self
    }

    pub fn with_standalone_mode(mut self, standalone: bool) -> Self {
        self.standalone_mode = standalone;
        self
    }

    pub fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn with_cache_options(mut self, cache: CacheOptions) -> Self {
        self.cache = cache;
        self
    }

    /// Options for the configuration endpoint
    pub fn endpoint_options(&self) -> EndpointOptions {
        EndpointOptions {
            standalone_mode: self.standalone_mode,
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let secs: f64 = parse_value(key, value)?;
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
