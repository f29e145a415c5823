//! Internode wire protocol.
//!
//! One logical unary method: a peer posts (namespace, key) and receives the
//! raw value bytes. Errors come back as HTTP statuses with a JSON error
//! body: 400 for an empty key, 404 for an unknown namespace, 500 for cache
//! and backing-source failures.

use serde::{Deserialize, Serialize};

/// The get RPC every node serves and every fetcher calls.
pub const ENDPOINT_RPC_GET: &str = "/rpc/get";
/// Per-node cache statistics.
pub const ENDPOINT_STATS: &str = "/stats";

#[derive(Debug, Serialize, Deserialize)]
pub struct GetRequest {
    pub namespace: String,
    pub key: String,
}

/// Per-namespace counters reported by the stats endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct NamespaceStats {
    pub name: String,
    pub entries: usize,
    pub used_bytes: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeStatsResponse {
    pub addr: String,
    pub namespaces: Vec<NamespaceStats>,
    pub cpu_usage: f32,
    pub mem_used_mb: u64,
    pub mem_total_mb: u64,
}
