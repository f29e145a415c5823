//! Node configuration.
//!
//! Every knob is read from an environment variable with a compiled default,
//! so a fleet can be tuned per deployment without rebuilding.

use std::env;
use std::time::Duration;

/// Default registry service endpoint.
pub const DEFAULT_REGISTRY_ENDPOINT: &str = "127.0.0.1:7600";

/// Runtime settings for a cache node.
#[derive(Debug, Clone)]
pub struct Config {
    /// Capacity of each namespace's main cache in bytes. 0 means unbounded.
    pub cache_bytes: u64,
    /// Address of the service registry.
    pub registry_endpoint: String,
    /// Deadline for a single remote peer fetch.
    pub rpc_timeout: Duration,
    /// Time-to-live of a registry lease; re-announced at half this interval.
    pub lease_ttl: Duration,
}

impl Config {
    /// Loads the configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `MESHCACHE_CACHE_BYTES` - per-namespace capacity in bytes (default: 1 MiB)
    /// - `MESHCACHE_REGISTRY` - registry endpoint (default: 127.0.0.1:7600)
    /// - `MESHCACHE_RPC_TIMEOUT_SECS` - peer fetch deadline (default: 10)
    /// - `MESHCACHE_LEASE_TTL_SECS` - registry lease TTL (default: 10)
    pub fn from_env() -> Self {
        Self {
            cache_bytes: env::var("MESHCACHE_CACHE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1024 * 1024),
            registry_endpoint: env::var("MESHCACHE_REGISTRY")
                .unwrap_or_else(|_| DEFAULT_REGISTRY_ENDPOINT.to_string()),
            rpc_timeout: Duration::from_secs(
                env::var("MESHCACHE_RPC_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
            lease_ttl: Duration::from_secs(
                env::var("MESHCACHE_LEASE_TTL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_bytes: 1024 * 1024,
            registry_endpoint: DEFAULT_REGISTRY_ENDPOINT.to_string(),
            rpc_timeout: Duration::from_secs(10),
            lease_ttl: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.cache_bytes, 1024 * 1024);
        assert_eq!(config.registry_endpoint, DEFAULT_REGISTRY_ENDPOINT);
        assert_eq!(config.rpc_timeout, Duration::from_secs(10));
        assert_eq!(config.lease_ttl, Duration::from_secs(10));
    }
}
