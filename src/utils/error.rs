//! Error types for elasticache-autodiscovery

use std::io;
use thiserror::Error;

/// Top-level error returned by the refreshing client
#[derive(Error, Debug)]
pub enum Error {
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Errors raised by the cache client are passed through untouched
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl Error {
    /// Check if this is a transport failure reported by the cache client
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Error::Cache(e) if e.is_connection_failure())
    }
}

/// Errors talking to the configuration endpoint
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Malformed configuration endpoint: {0:?} (expected host:port)")]
    MalformedEndpoint(String),

    #[error("Failed to parse discovery response: {0}")]
    ProtocolParse(String),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Connection-related errors
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        source: io::Error,
    },

    #[error("Connection closed before END")]
    Closed,

    #[error("Connection timeout after {0}ms")]
    Timeout(u64),
}

/// Errors raised by a cache client implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Transport failure talking to a cache node; the only retried condition
    #[error("Connection failure: {0}")]
    ConnectionFailure(String),

    #[error("Key not found")]
    NotFound,

    #[error("Item not stored")]
    NotStored,

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),
}

impl CacheError {
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, CacheError::ConnectionFailure(_))
    }
}

/// Option parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for option {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, Error>;
