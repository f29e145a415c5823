//! Service discovery.
//!
//! Peers find each other through a registry: every node announces itself
//! under `meshcache/{addr}` with a keepalive lease, and fetchers resolve
//! those names back to addresses before dialing. The registry is the sole
//! source of peer addresses at runtime.
//!
//! Three pieces:
//! - the `Registry` capability the rest of the crate programs against,
//! - `HttpRegistry`, a client for a registry service at a configurable
//!   endpoint,
//! - `MemoryRegistry`, an in-process implementation for tests and
//!   single-process fleets.
//!
//! The registry service itself lives in `server` so a fleet can run without
//! external infrastructure; any node can host it.

pub mod http;
pub mod memory;
pub mod protocol;
pub mod server;


use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::sync::watch;

pub use http::HttpRegistry;
pub use memory::MemoryRegistry;
pub use server::RegistryService;

/// Name→address service registry.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Announces `service` at `addr` and keeps the registration alive until
    /// the stop signal fires, then revokes it. Blocks for the lifetime of
    /// the registration.
    async fn register(
        &self,
        service: &str,
        addr: SocketAddr,
        stop: watch::Receiver<bool>,
    ) -> anyhow::Result<()>;

    /// Resolves one live instance of `service`.
    async fn lookup(&self, service: &str) -> anyhow::Result<SocketAddr>;
}
