//! The registry service.
//!
//! A small lease table behind an HTTP API. Nodes announce themselves with a
//! TTL and refresh periodically; a background sweeper drops leases that
//! were not refreshed in time, so dead nodes stop resolving within one
//! lease window. Any process can host this, including a cache node itself.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use dashmap::DashMap;
use serde_json::json;

use super::protocol::{
    LookupQuery, LookupResponse, RegisterRequest, RevokeRequest, ENDPOINT_LOOKUP,
    ENDPOINT_REGISTER, ENDPOINT_REVOKE,
};

struct Lease {
    addr: SocketAddr,
    expires_at: Instant,
}

/// Lease table plus its HTTP surface.
pub struct RegistryService {
    leases: DashMap<String, Lease>,
}

impl RegistryService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            leases: DashMap::new(),
        })
    }

    /// The HTTP API of this registry.
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route(ENDPOINT_REGISTER, post(handle_register))
            .route(ENDPOINT_REVOKE, post(handle_revoke))
            .route(ENDPOINT_LOOKUP, get(handle_lookup))
            .layer(Extension(self.clone()))
    }

    /// Binds `addr` and serves the registry until the process exits. The
    /// lease sweeper runs alongside the listener.
    pub async fn serve(self: Arc<Self>, addr: SocketAddr) -> anyhow::Result<()> {
        self.clone().spawn_sweeper(Duration::from_secs(1));

        tracing::info!("registry listening on {}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    /// Periodically drops leases whose TTL lapsed without a refresh.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let now = Instant::now();
                self.leases.retain(|service, lease| {
                    let live = lease.expires_at > now;
                    if !live {
                        tracing::info!("lease for {} expired", service);
                    }
                    live
                });
            }
        });
    }

    fn upsert(&self, service: String, addr: SocketAddr, ttl: Duration) {
        self.leases.insert(
            service,
            Lease {
                addr,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn resolve(&self, service: &str) -> Option<SocketAddr> {
        let lease = self.leases.get(service)?;
        if lease.expires_at > Instant::now() {
            Some(lease.addr)
        } else {
            None
        }
    }

    fn revoke(&self, service: &str) -> bool {
        self.leases.remove(service).is_some()
    }
}

async fn handle_register(
    Extension(registry): Extension<Arc<RegistryService>>,
    Json(req): Json<RegisterRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let addr: SocketAddr = match req.addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::warn!("rejecting registration of {}: {}", req.service, e);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("bad address: {}", e) })),
            );
        }
    };

    registry.upsert(req.service, addr, Duration::from_secs(req.ttl_secs));
    (StatusCode::OK, Json(json!({ "ok": true })))
}

async fn handle_revoke(
    Extension(registry): Extension<Arc<RegistryService>>,
    Json(req): Json<RevokeRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    if registry.revoke(&req.service) {
        (StatusCode::OK, Json(json!({ "ok": true })))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "unknown service" })),
        )
    }
}

async fn handle_lookup(
    Extension(registry): Extension<Arc<RegistryService>>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<LookupResponse>, StatusCode> {
    match registry.resolve(&query.service) {
        Some(addr) => Ok(Json(LookupResponse {
            addr: addr.to_string(),
        })),
        None => Err(StatusCode::NOT_FOUND),
    }
}
