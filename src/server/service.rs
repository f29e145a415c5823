//! Server state machine and peer membership.

use std::collections::HashMap;
use std::net::{SocketAddr, SocketAddrV4};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use tokio::sync::watch;

use crate::error::CacheError;
use crate::namespace::Namespaces;
use crate::peers::{Fetcher, PeerPicker, RemoteFetcher};
use crate::registry::Registry;
use crate::routing::HashRing;

use super::handlers::{handle_rpc_get, handle_stats};
use super::protocol::{ENDPOINT_RPC_GET, ENDPOINT_STATS};

/// Registry service-name prefix; each node announces `meshcache/{addr}`.
pub const SERVICE_NAME: &str = "meshcache";

/// Virtual points per real node on the ring.
pub const DEFAULT_REPLICAS: usize = 50;

/// Membership snapshot: the ring and one fetcher per peer address. Replaced
/// wholesale by `set_peers`, so concurrent pickers observe either the old
/// or the new membership, never a half-built one.
struct PeerState {
    ring: HashRing,
    fetchers: HashMap<String, Arc<RemoteFetcher>>,
}

impl Default for PeerState {
    fn default() -> Self {
        Self {
            ring: HashRing::new(DEFAULT_REPLICAS),
            fetchers: HashMap::new(),
        }
    }
}

enum Lifecycle {
    Idle,
    Running(watch::Sender<bool>),
    Stopped,
}

/// One cache node: RPC server, registry lease holder and peer picker.
pub struct CacheServer {
    addr: SocketAddr,
    addr_str: String,
    registry: Arc<dyn Registry>,
    namespaces: Arc<Namespaces>,
    rpc_timeout: Duration,
    peers: Mutex<PeerState>,
    lifecycle: Mutex<Lifecycle>,
}

impl CacheServer {
    /// Creates an idle server for `addr`, which must be `x.x.x.x:port`.
    pub fn new(
        addr: &str,
        registry: Arc<dyn Registry>,
        namespaces: Arc<Namespaces>,
        rpc_timeout: Duration,
    ) -> Result<Arc<Self>, CacheError> {
        let addr = parse_peer_addr(addr)?;
        Ok(Arc::new(Self {
            addr,
            addr_str: addr.to_string(),
            registry,
            namespaces,
            rpc_timeout,
            peers: Mutex::new(PeerState::default()),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }))
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn namespaces(&self) -> &Arc<Namespaces> {
        &self.namespaces
    }

    /// Replaces the fleet membership: a fresh ring seeded with every peer
    /// address and a fresh fetcher per peer. The peer list should include
    /// this node's own address so the ring can route keys here.
    ///
    /// # Panics
    /// Panics when an address is not `x.x.x.x:port`; a misconfigured fleet
    /// must not come up half-routed.
    pub fn set_peers<I, S>(&self, peer_addrs: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ring = HashRing::new(DEFAULT_REPLICAS);
        let mut fetchers = HashMap::new();

        for peer in peer_addrs {
            let peer = peer.as_ref();
            if parse_peer_addr(peer).is_err() {
                panic!("invalid peer address {}, expected x.x.x.x:port", peer);
            }
            ring.add([peer]);
            let service = format!("{}/{}", SERVICE_NAME, peer);
            fetchers.insert(
                peer.to_string(),
                Arc::new(RemoteFetcher::new(
                    &service,
                    self.registry.clone(),
                    self.rpc_timeout,
                )),
            );
        }

        let mut peers = self.peers.lock().expect("peer state poisoned");
        *peers = PeerState { ring, fetchers };
        tracing::info!("{} now knows {} peers", self.addr_str, peers.fetchers.len());
    }

    /// The HTTP surface of this node.
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route(ENDPOINT_RPC_GET, post(handle_rpc_get))
            .route(ENDPOINT_STATS, get(handle_stats))
            .layer(Extension(self.namespaces.clone()))
            .layer(Extension(self.clone()))
    }

    /// Binds the listener, announces this node to the registry and serves
    /// RPCs until `stop` is called or the listener fails.
    pub async fn start(self: &Arc<Self>) -> anyhow::Result<()> {
        let stop_rx = {
            let mut lifecycle = self.lifecycle.lock().expect("lifecycle poisoned");
            if !matches!(*lifecycle, Lifecycle::Idle) {
                return Err(CacheError::AlreadyRunning.into());
            }
            let (stop_tx, stop_rx) = watch::channel(false);
            *lifecycle = Lifecycle::Running(stop_tx);
            stop_rx
        };

        let listener = tokio::net::TcpListener::bind(self.addr).await?;

        // Hold the registry lease for as long as the server runs; the stop
        // signal revokes it.
        let registry = self.registry.clone();
        let service = format!("{}/{}", SERVICE_NAME, self.addr_str);
        let addr = self.addr;
        let lease_stop = stop_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = registry.register(&service, addr, lease_stop).await {
                tracing::error!("registration of {} failed: {}", service, e);
            }
        });

        tracing::info!("cache server listening on {}", self.addr_str);

        let mut shutdown = stop_rx;
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            })
            .await?;

        tracing::info!("cache server on {} stopped", self.addr_str);
        Ok(())
    }

    /// Signals the lease revocation and the listener shutdown, and clears
    /// the membership. No-op unless the server is running.
    pub fn stop(&self) {
        {
            let mut lifecycle = self.lifecycle.lock().expect("lifecycle poisoned");
            match &*lifecycle {
                Lifecycle::Running(stop_tx) => {
                    let _ = stop_tx.send(true);
                }
                _ => return,
            }
            *lifecycle = Lifecycle::Stopped;
        }

        let mut peers = self.peers.lock().expect("peer state poisoned");
        *peers = PeerState::default();
    }
}

impl PeerPicker for CacheServer {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn Fetcher>> {
        let peers = self.peers.lock().expect("peer state poisoned");
        let owner = peers.ring.get(key)?;

        if owner == self.addr_str {
            tracing::debug!("{} is authoritative for {}", self.addr_str, key);
            return None;
        }

        tracing::debug!("{} routes {} to peer {}", self.addr_str, key, owner);
        let fetcher: Arc<dyn Fetcher> = peers.fetchers.get(owner)?.clone();
        Some(fetcher)
    }
}

fn parse_peer_addr(addr: &str) -> Result<SocketAddr, CacheError> {
    addr.parse::<SocketAddrV4>()
        .map(SocketAddr::V4)
        .map_err(|_| CacheError::InvalidPeerAddress(addr.to_string()))
}
