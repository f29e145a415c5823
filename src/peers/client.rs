//! HTTP peer fetcher.
//!
//! One `RemoteFetcher` is bound to one peer's service name. Every fetch
//! resolves the name through the registry first, so a peer that re-appeared
//! at a new address is picked up without rebuilding membership, then issues
//! the get RPC under a bounded deadline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;
use crate::registry::Registry;
use crate::server::protocol::{GetRequest, ENDPOINT_RPC_GET};

use super::Fetcher;

/// Fetches values from a single remote peer over HTTP.
pub struct RemoteFetcher {
    service: String,
    registry: Arc<dyn Registry>,
    timeout: Duration,
    http: reqwest::Client,
}

impl RemoteFetcher {
    /// `service` is the peer's registry name, e.g. `meshcache/1.2.3.4:7001`.
    pub fn new(service: &str, registry: Arc<dyn Registry>, timeout: Duration) -> Self {
        Self {
            service: service.to_string(),
            registry,
            timeout,
            http: reqwest::Client::new(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

#[async_trait]
impl Fetcher for RemoteFetcher {
    async fn fetch(&self, namespace: &str, key: &str) -> Result<Vec<u8>, CacheError> {
        let addr = self
            .registry
            .lookup(&self.service)
            .await
            .map_err(|e| CacheError::Registry(e.to_string()))?;

        let request = GetRequest {
            namespace: namespace.to_string(),
            key: key.to_string(),
        };
        let response = self
            .http
            .post(format!("http://{}{}", addr, ENDPOINT_RPC_GET))
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CacheError::Timeout(self.timeout)
                } else {
                    CacheError::PeerFetch {
                        key: key.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        if !response.status().is_success() {
            return Err(CacheError::PeerFetch {
                key: key.to_string(),
                message: format!("peer {} returned {}", self.service, response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| CacheError::PeerFetch {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}
