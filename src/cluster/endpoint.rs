//! Configuration endpoint and the discovery dialog
//!
//! An `Endpoint` fetches the cluster config and stats at most once each.
//! A newer view of the cluster always comes from a fresh `Endpoint`.

use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};
use std::time::Duration;

use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use tracing::debug;

use super::config_response::ConfigResponse;
use super::node::ClusterNode;
use super::stats_response::StatsResponse;
use crate::client::DiscoveryConnection;
use crate::utils::DiscoveryError;

/// Matches strings like "my-host.cache.aws.com:11211"
static ENDPOINT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([-.a-zA-Z0-9]+):(\d+)$").expect("valid endpoint regex"));

const STATS_COMMAND: &str = "stats\r\n";
const CONFIG_COMMAND: &str = "config get cluster\r\n";

/// IP reported for a standalone node whose host does not resolve
const UNRESOLVED_IP: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Endpoint behaviour options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointOptions {
    /// Treat the endpoint as a plain memcached node without discovery support
    pub standalone_mode: bool,
    /// Deadline for establishing the TCP connection
    pub connect_timeout: Option<Duration>,
    /// Deadline for each socket read/write; `None` blocks indefinitely
    pub io_timeout: Option<Duration>,
}

/// Configuration endpoint of a cluster
#[derive(Debug)]
pub struct Endpoint {
    host: String,
    port: u16,
    options: EndpointOptions,
    config: OnceCell<ConfigResponse>,
    stats: OnceCell<StatsResponse>,
}

impl Endpoint {
    /// Parse a `host:port` string
    pub fn new(endpoint: &str, options: EndpointOptions) -> Result<Self, DiscoveryError> {
        let malformed = || DiscoveryError::MalformedEndpoint(endpoint.to_string());

        let caps = ENDPOINT_REGEX.captures(endpoint).ok_or_else(malformed)?;
        let host = caps[1].to_string();
        let port: u16 = caps[2].parse().map_err(|_| malformed())?;

        Ok(Self {
            host,
            port,
            options,
            config: OnceCell::new(),
            stats: OnceCell::new(),
        })
    }

    /// Same address and options, empty caches
    pub fn renew(&self) -> Self {
        Self {
            host: self.host.clone(),
            port: self.port,
            options: self.options.clone(),
            config: OnceCell::new(),
            stats: OnceCell::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn options(&self) -> &EndpointOptions {
        &self.options
    }

    /// Get endpoint address as string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Cluster config, fetched on first use
    pub fn config(&self) -> Result<&ConfigResponse, DiscoveryError> {
        self.config.get_or_try_init(|| self.fetch_config())
    }

    /// Stats of the endpoint node, fetched on first use
    pub fn stats(&self) -> Result<&StatsResponse, DiscoveryError> {
        self.stats.get_or_try_init(|| {
            let data = self.remote_command(STATS_COMMAND)?;
            Ok(StatsResponse::parse(&data))
        })
    }

    /// The memcached engine version
    pub fn engine_version(&self) -> Result<Option<&str>, DiscoveryError> {
        Ok(self.stats()?.version())
    }

    fn fetch_config(&self) -> Result<ConfigResponse, DiscoveryError> {
        if self.options.standalone_mode {
            let ip = resolve(&self.host).unwrap_or(UNRESOLVED_IP);
            debug!(host = %self.host, %ip, "standalone mode, skipping discovery");
            let node = ClusterNode::new(self.host.clone(), ip.to_string(), self.port);
            return ConfigResponse::from_nodes(0, vec![node]);
        }

        let data = self.remote_command(CONFIG_COMMAND)?;
        let config = ConfigResponse::parse(&data)?;
        debug!(
            endpoint = %self.address(),
            version = config.version,
            nodes = config.num_nodes(),
            "fetched cluster config"
        );
        Ok(config)
    }

    /// Send an ASCII command on a fresh connection and return the raw reply
    fn remote_command(&self, command: &str) -> Result<String, DiscoveryError> {
        let mut conn =
            DiscoveryConnection::connect_tcp(&self.host, self.port, self.options.connect_timeout)?;
        conn.set_io_timeout(self.options.io_timeout)?;
        conn.execute(command)
    }
}

fn resolve(host: &str) -> Option<IpAddr> {
    (host, 0)
        .to_socket_addrs()
        .ok()?
        .next()
        .map(|addr| addr.ip())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{config_reply, start_silent_server, FakeDiscoveryServer};
    use crate::utils::ConnectionError;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_parse_host_and_port() {
        let endpoint = Endpoint::new(
            "my-cluster.cfg.use1.cache.amazonaws.com:11211",
            EndpointOptions::default(),
        )
        .unwrap();
        assert_eq!(endpoint.host(), "my-cluster.cfg.use1.cache.amazonaws.com");
        assert_eq!(endpoint.port(), 11211);
        assert_eq!(endpoint.address(), "my-cluster.cfg.use1.cache.amazonaws.com:11211");
    }

    #[test]
    fn test_malformed_endpoint() {
        for bad in [
            "my-cluster.cfg.use1.cache.amazonaws.com",
            "host:",
            ":11211",
            "host:port",
            "host:99999",
            "bad_host!:11211",
            "",
        ] {
            let err = Endpoint::new(bad, EndpointOptions::default()).unwrap_err();
            assert!(
                matches!(err, DiscoveryError::MalformedEndpoint(_)),
                "expected malformed endpoint for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_standalone_config_without_network() {
        // Nothing listens on this address; standalone mode must not connect
        let options = EndpointOptions {
            standalone_mode: true,
            ..Default::default()
        };
        let endpoint = Endpoint::new("localhost:1", options).unwrap();
        let config = endpoint.config().unwrap();

        assert_eq!(config.num_nodes(), 1);
        assert_eq!(config.nodes[0].host, "localhost");
        assert_eq!(config.nodes[0].port, 1);
        assert_eq!(config.servers(), vec!["localhost:1"]);
    }

    #[test]
    fn test_standalone_unresolvable_host() {
        let options = EndpointOptions {
            standalone_mode: true,
            ..Default::default()
        };
        let endpoint = Endpoint::new("no-such-host.invalid:11211", options).unwrap();
        let config = endpoint.config().unwrap();
        assert_eq!(config.nodes[0].ip, "0.0.0.0");
    }

    #[test]
    fn test_config_from_remote() {
        let server = FakeDiscoveryServer::start(
            vec![config_reply(
                12,
                &[
                    ("mycluster.0001.cache.amazonaws.com", "10.112.21.1", 11211),
                    ("mycluster.0002.cache.amazonaws.com", "10.112.21.2", 11211),
                ],
            )],
            "",
        );
        let endpoint = Endpoint::new(&server.address(), EndpointOptions::default()).unwrap();
        let config = endpoint.config().unwrap();

        assert_eq!(config.version, 12);
        assert_eq!(
            config.servers(),
            vec![
                "mycluster.0001.cache.amazonaws.com:11211",
                "mycluster.0002.cache.amazonaws.com:11211",
            ]
        );
    }

    #[test]
    fn test_config_is_memoized() {
        let server = FakeDiscoveryServer::start(
            vec![config_reply(1, &[("h1", "10.0.0.1", 11211)])],
            "",
        );
        let endpoint = Endpoint::new(&server.address(), EndpointOptions::default()).unwrap();

        endpoint.config().unwrap();
        endpoint.config().unwrap();
        assert_eq!(server.config_requests(), 1);

        // A renewed endpoint starts with empty caches
        endpoint.renew().config().unwrap();
        assert_eq!(server.config_requests(), 2);
    }

    #[test]
    fn test_stats_and_engine_version() {
        let server = FakeDiscoveryServer::start(
            vec![config_reply(1, &[("h1", "10.0.0.1", 11211)])],
            "STAT pid 42\r\nSTAT version 1.6.12\r\n",
        );
        let endpoint = Endpoint::new(&server.address(), EndpointOptions::default()).unwrap();

        assert_eq!(endpoint.engine_version().unwrap(), Some("1.6.12"));
        assert_eq!(endpoint.stats().unwrap().get("pid"), Some("42"));
        assert_eq!(server.stats_requests(), 1);
        assert_eq!(server.config_requests(), 0);
    }

    #[test]
    fn test_protocol_error_is_not_cached() {
        let server = FakeDiscoveryServer::start(vec!["CONFIG cluster 0 3\r\nxyz\n".to_string()], "");
        let endpoint = Endpoint::new(&server.address(), EndpointOptions::default()).unwrap();

        let err = endpoint.config().unwrap_err();
        assert!(matches!(err, DiscoveryError::ProtocolParse(_)));

        server.set_config(config_reply(2, &[("h1", "10.0.0.1", 11211)]));
        assert_eq!(endpoint.config().unwrap().version, 2);
    }

    #[test]
    fn test_io_timeout_on_silent_endpoint() {
        let address = start_silent_server(Duration::from_secs(10));
        let options = EndpointOptions {
            io_timeout: Some(Duration::from_millis(200)),
            ..Default::default()
        };
        let endpoint = Endpoint::new(&address, options).unwrap();

        let started = Instant::now();
        let err = endpoint.config().unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(
            matches!(err, DiscoveryError::Connection(ConnectionError::Timeout(200))),
            "unexpected error: {:?}",
            err
        );
    }

    #[test]
    fn test_no_io_timeout_blocks_until_peer_closes() {
        let address = start_silent_server(Duration::from_millis(1500));
        let endpoint = Endpoint::new(&address, EndpointOptions::default()).unwrap();

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = endpoint.config().map(|c| c.version);
            let _ = tx.send(result);
        });

        // Still waiting well past where a deadline would have fired
        assert!(rx.recv_timeout(Duration::from_millis(500)).is_err());

        // Released only when the peer closes the connection
        let result = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(matches!(
            result,
            Err(DiscoveryError::Connection(ConnectionError::Closed))
        ));
    }
}
