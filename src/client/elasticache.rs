//! Self-refreshing cache client
//!
//! Wraps a cache client built for the nodes reported by a configuration
//! endpoint. Before each verb the node list is re-discovered once the refresh
//! interval has elapsed, and a connection failure triggers a refresh followed
//! by a bounded number of retries.
//!
//! Refreshes are serialized; verbs run in parallel against the current
//! snapshot, which is swapped atomically. A replaced cache client is dropped
//! once the last in-flight call using it returns.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::cache_client::{CacheClient, CacheClientFactory, CacheResult};
use crate::cluster::Endpoint;
use crate::config::ElastiCacheOptions;
use crate::utils::Result;

/// What a refresh did to the cache client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Node set unchanged, existing connections kept
    Unchanged,
    /// Node set changed, cache client rebuilt
    Rebuilt,
}

/// Endpoint and cache client from the same discovery round
struct ClusterState<C> {
    endpoint: Arc<Endpoint>,
    client: Arc<C>,
    servers: Vec<String>,
}

/// Cache client that follows cluster membership of an ElastiCache cluster
pub struct ElastiCache<F: CacheClientFactory> {
    config_endpoint: String,
    options: ElastiCacheOptions,
    factory: F,
    state: ArcSwap<ClusterState<F::Client>>,
    last_refreshed_at: Mutex<Instant>,
    /// Held for the duration of a refresh
    refresh_lock: Mutex<()>,
    /// Number of refreshes started
    generation: AtomicU64,
}

impl<F: CacheClientFactory> ElastiCache<F> {
    /// Discover the cluster and build the cache client
    pub fn new(config_endpoint: &str, options: ElastiCacheOptions, factory: F) -> Result<Self> {
        let endpoint = Endpoint::new(config_endpoint, options.endpoint_options())?;
        let servers = endpoint.config()?.servers();
        let client = factory.build(&servers, &options.cache)?;

        info!(
            endpoint = %endpoint.address(),
            nodes = servers.len(),
            "ElastiCache client initialized"
        );

        Ok(Self {
            config_endpoint: config_endpoint.to_string(),
            options,
            factory,
            state: ArcSwap::from_pointee(ClusterState {
                endpoint: Arc::new(endpoint),
                client: Arc::new(client),
                servers,
            }),
            last_refreshed_at: Mutex::new(Instant::now()),
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        })
    }

    /// Independent client with the same configuration, discovered from scratch
    pub fn try_clone(&self) -> Result<Self>
    where
        F: Clone,
    {
        Self::new(&self.config_endpoint, self.options.clone(), self.factory.clone())
    }

    pub fn options(&self) -> &ElastiCacheOptions {
        &self.options
    }

    /// Current configuration endpoint snapshot
    pub fn endpoint(&self) -> Arc<Endpoint> {
        Arc::clone(&self.state.load().endpoint)
    }

    /// Current cache client
    pub fn client(&self) -> Arc<F::Client> {
        Arc::clone(&self.state.load().client)
    }

    /// Node addresses the cache client was built with
    pub fn servers(&self) -> Vec<String> {
        self.state.load().servers.clone()
    }

    /// Engine version reported by the configuration endpoint
    pub fn engine_version(&self) -> Result<Option<String>> {
        let endpoint = self.endpoint();
        let version = endpoint.engine_version()?;
        Ok(version.map(str::to_string))
    }

    /// Re-discover the cluster now
    pub fn refresh(&self) -> Result<RefreshOutcome> {
        let _guard = self.refresh_lock.lock();
        self.do_refresh()
    }

    pub fn flush(&self) -> Result<()> {
        self.call(|c| c.flush())
    }

    pub fn get(&self, key: &str, raw: bool) -> Result<Option<Vec<u8>>> {
        self.call(|c| c.get(key, raw))
    }

    pub fn get_multi(&self, keys: &[&str], raw: bool) -> Result<HashMap<String, Vec<u8>>> {
        self.call(|c| c.get_multi(keys, raw))
    }

    pub fn set(&self, key: &str, value: &[u8], ttl: u32, raw: bool, flags: u32) -> Result<()> {
        self.call(|c| c.set(key, value, ttl, raw, flags))
    }

    pub fn add(&self, key: &str, value: &[u8], ttl: u32, raw: bool, flags: u32) -> Result<()> {
        self.call(|c| c.add(key, value, ttl, raw, flags))
    }

    pub fn replace(&self, key: &str, value: &[u8], ttl: u32, raw: bool, flags: u32) -> Result<()> {
        self.call(|c| c.replace(key, value, ttl, raw, flags))
    }

    pub fn append(&self, key: &str, value: &[u8], ttl: u32, flags: u32) -> Result<()> {
        self.call(|c| c.append(key, value, ttl, flags))
    }

    pub fn prepend(&self, key: &str, value: &[u8], ttl: u32, flags: u32) -> Result<()> {
        self.call(|c| c.prepend(key, value, ttl, flags))
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        self.call(|c| c.delete(key))
    }

    pub fn increment(&self, key: &str, offset: u64) -> Result<u64> {
        self.call(|c| c.increment(key, offset))
    }

    pub fn decrement(&self, key: &str, offset: u64) -> Result<u64> {
        self.call(|c| c.decrement(key, offset))
    }

    pub fn exist(&self, key: &str) -> Result<bool> {
        self.call(|c| c.exist(key))
    }

    pub fn touch(&self, key: &str, ttl: u32) -> Result<()> {
        self.call(|c| c.touch(key, ttl))
    }

    pub fn reset(&self) -> Result<()> {
        self.call(|c| c.reset())
    }

    pub fn namespace(&self) -> Result<Option<String>> {
        self.call(|c| Ok(c.namespace()))
    }

    /// Refresh if due, then run `op`, refreshing and retrying on connection failure
    ///
    /// A refresh that fails inside the retry loop ends the call with that
    /// discovery error; the connection failure that triggered it is logged only.
    fn call<T>(&self, op: impl Fn(&F::Client) -> CacheResult<T>) -> Result<T> {
        let generation = self.generation.load(Ordering::Acquire);
        if self.refresh_due() {
            self.refresh_after(generation)?;
        }

        let mut retries = 0;
        loop {
            let generation = self.generation.load(Ordering::Acquire);
            let client = self.client();

            match op(&*client) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_connection_failure() && retries < self.options.max_retry_count => {
                    retries += 1;
                    warn!(
                        error = %e,
                        attempt = retries,
                        max_retries = self.options.max_retry_count,
                        "Cache connection failed, refreshing cluster nodes and retrying"
                    );
                    drop(client);
                    self.refresh_after(generation)?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn refresh_due(&self) -> bool {
        let interval = self.options.refresh_interval;
        interval.is_zero() || self.last_refreshed_at.lock().elapsed() > interval
    }

    /// Refresh unless another caller started one after `generation` was observed
    fn refresh_after(&self, generation: u64) -> Result<()> {
        let _guard = self.refresh_lock.lock();
        if self.generation.load(Ordering::Acquire) != generation {
            debug!("Cluster nodes already refreshed by a concurrent call");
            return Ok(());
        }
        self.do_refresh().map(|_| ())
    }

    /// Caller must hold `refresh_lock`
    fn do_refresh(&self) -> Result<RefreshOutcome> {
        *self.last_refreshed_at.lock() = Instant::now();
        self.generation.fetch_add(1, Ordering::AcqRel);

        let old = self.state.load_full();
        let endpoint = Arc::new(old.endpoint.renew());

        let new_config = endpoint.config().map_err(|e| {
            warn!(endpoint = %endpoint.address(), error = %e, "Cluster node refresh failed");
            e
        })?;

        if old.endpoint.config()?.same_nodes(new_config) {
            debug!(version = new_config.version, "Cluster nodes unchanged");
            self.state.store(Arc::new(ClusterState {
                endpoint: Arc::clone(&endpoint),
                client: Arc::clone(&old.client),
                servers: old.servers.clone(),
            }));
            return Ok(RefreshOutcome::Unchanged);
        }

        let servers = new_config.servers();
        let client = self.factory.build(&servers, &self.options.cache)?;

        info!(
            version = new_config.version,
            old_nodes = old.servers.len(),
            new_nodes = servers.len(),
            "Cluster nodes changed, rebuilt cache client"
        );

        self.state.store(Arc::new(ClusterState {
            endpoint: Arc::clone(&endpoint),
            client: Arc::new(client),
            servers,
        }));
        Ok(RefreshOutcome::Rebuilt)
    }
}
