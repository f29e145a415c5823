//! HTTP registry client.
//!
//! Talks to a registry service (see `server`). Registration re-announces at
//! half the lease TTL so a crashed node disappears within one lease window
//! without any explicit deregistration.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use super::protocol::{
    LookupResponse, RegisterRequest, RevokeRequest, ENDPOINT_LOOKUP, ENDPOINT_REGISTER,
    ENDPOINT_REVOKE,
};
use super::Registry;

/// Client of a registry service at a fixed endpoint.
pub struct HttpRegistry {
    endpoint: String,
    lease_ttl: Duration,
    http: reqwest::Client,
}

impl HttpRegistry {
    pub fn new(endpoint: &str, lease_ttl: Duration) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            lease_ttl,
            http: reqwest::Client::new(),
        }
    }

    async fn announce(&self, service: &str, addr: SocketAddr) -> anyhow::Result<()> {
        let payload = RegisterRequest {
            service: service.to_string(),
            addr: addr.to_string(),
            ttl_secs: self.lease_ttl.as_secs(),
        };
        let response = self
            .http
            .post(format!("http://{}{}", self.endpoint, ENDPOINT_REGISTER))
            .json(&payload)
            .timeout(Duration::from_secs(5))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("registry rejected registration: {}", response.status());
        }
        Ok(())
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn register(
        &self,
        service: &str,
        addr: SocketAddr,
        mut stop: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        self.announce(service, addr).await?;
        tracing::info!("registered {} at {} with {:?} lease", service, addr, self.lease_ttl);

        let refresh = self.lease_ttl / 2;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(refresh) => {
                    if let Err(e) = self.announce(service, addr).await {
                        tracing::warn!("lease refresh for {} failed: {}", service, e);
                    }
                }
                changed = stop.changed() => {
                    // A closed sender counts as a stop request too.
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        let payload = RevokeRequest {
            service: service.to_string(),
        };
        let response = self
            .http
            .post(format!("http://{}{}", self.endpoint, ENDPOINT_REVOKE))
            .json(&payload)
            .timeout(Duration::from_secs(5))
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("registry rejected revocation: {}", response.status());
        }

        tracing::info!("revoked {}", service);
        Ok(())
    }

    async fn lookup(&self, service: &str) -> anyhow::Result<SocketAddr> {
        let response = self
            .http
            .get(format!("http://{}{}", self.endpoint, ENDPOINT_LOOKUP))
            .query(&[("service", service)])
            .timeout(Duration::from_secs(5))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("service {} not resolvable: {}", service, response.status());
        }

        let body: LookupResponse = response.json().await?;
        Ok(body.addr.parse()?)
    }
}
