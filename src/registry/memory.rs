//! In-process registry.
//!
//! Backs tests and single-process fleets. Entries appear on registration
//! and vanish when the registration's stop signal fires; there is no lease
//! because the process and the registry share a fate.

use std::net::SocketAddr;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::watch;

use super::Registry;

#[derive(Default)]
pub struct MemoryRegistry {
    services: DashMap<String, SocketAddr>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently registered services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn register(
        &self,
        service: &str,
        addr: SocketAddr,
        mut stop: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        self.services.insert(service.to_string(), addr);
        tracing::debug!("registered {} at {}", service, addr);

        loop {
            if stop.changed().await.is_err() || *stop.borrow() {
                break;
            }
        }

        self.services.remove(service);
        tracing::debug!("revoked {}", service);
        Ok(())
    }

    async fn lookup(&self, service: &str) -> anyhow::Result<SocketAddr> {
        self.services
            .get(service)
            .map(|entry| *entry.value())
            .ok_or_else(|| anyhow::anyhow!("service {} not registered", service))
    }
}
