//! Utility modules

pub mod error;

pub use error::{CacheError, ConfigError, ConnectionError, DiscoveryError, Error, Result};
