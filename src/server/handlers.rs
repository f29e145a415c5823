//! HTTP handlers for the node server.
//!
//! These translate the wire protocol into namespace calls. The get RPC
//! re-enters `Namespace::get` on this node, which consistent hashing
//! guarantees resolves locally, so no second routing hop happens here.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sysinfo::System;

use crate::error::CacheError;
use crate::namespace::{Namespace, Namespaces};

use super::protocol::{GetRequest, NamespaceStats, NodeStatsResponse};
use super::service::CacheServer;

/// The internode get RPC.
pub async fn handle_rpc_get(
    Extension(namespaces): Extension<Arc<Namespaces>>,
    Json(req): Json<GetRequest>,
) -> Result<Response, CacheError> {
    tracing::debug!("rpc get {}/{}", req.namespace, req.key);

    if req.key.is_empty() {
        return Err(CacheError::InvalidKey);
    }
    let namespace = namespaces
        .lookup(&req.namespace)
        .ok_or_else(|| CacheError::UnknownNamespace(req.namespace.clone()))?;

    let payload = namespace.get(&req.key, None).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        payload.bytes(),
    )
        .into_response())
}

/// Per-node cache and process statistics.
pub async fn handle_stats(
    Extension(namespaces): Extension<Arc<Namespaces>>,
    Extension(server): Extension<Arc<CacheServer>>,
) -> Json<NodeStatsResponse> {
    let mut stats: Vec<NamespaceStats> = namespaces
        .names()
        .into_iter()
        .filter_map(|name| namespaces.lookup(&name))
        .map(|namespace| NamespaceStats {
            name: namespace.name().to_string(),
            entries: namespace.entry_count(),
            used_bytes: namespace.used_bytes(),
        })
        .collect();
    stats.sort_by(|a, b| a.name.cmp(&b.name));

    let mut sys = System::new_all();
    sys.refresh_cpu();
    sys.refresh_memory();
    let cpu_usage = sys.global_cpu_info().cpu_usage();
    // sysinfo reports memory in bytes.
    let mem_total_mb = sys.total_memory() / (1024 * 1024);
    let mem_used_mb = sys.used_memory() / (1024 * 1024);

    Json(NodeStatsResponse {
        addr: server.addr().to_string(),
        namespaces: stats,
        cpu_usage,
        mem_used_mb,
        mem_total_mb,
    })
}

#[derive(Debug, Deserialize)]
pub struct ApiQuery {
    pub key: String,
}

/// Client-facing get over one namespace, for callers outside the fleet.
pub async fn handle_api_get(
    Extension(namespace): Extension<Arc<Namespace>>,
    Query(query): Query<ApiQuery>,
) -> Result<Response, CacheError> {
    let payload = namespace.get(&query.key, None).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        payload.bytes(),
    )
        .into_response())
}

/// A small router exposing one namespace at `/api?key=...`.
pub fn api_router(namespace: Arc<Namespace>) -> Router {
    Router::new()
        .route("/api", get(handle_api_get))
        .layer(Extension(namespace))
}
