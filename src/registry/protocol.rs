//! Registry wire protocol.
//!
//! Service names contain slashes (`meshcache/1.2.3.4:7001`), so requests
//! carry them in JSON bodies or query strings rather than path segments.

use serde::{Deserialize, Serialize};

/// Announce or refresh a lease.
pub const ENDPOINT_REGISTER: &str = "/services/register";
/// Drop a lease ahead of its expiry.
pub const ENDPOINT_REVOKE: &str = "/services/revoke";
/// Resolve a service name to an address.
pub const ENDPOINT_LOOKUP: &str = "/services/lookup";

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub service: String,
    pub addr: String,
    /// Lease duration in seconds; the lease lapses unless refreshed.
    pub ttl_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RevokeRequest {
    pub service: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LookupQuery {
    pub service: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LookupResponse {
    pub addr: String,
}
