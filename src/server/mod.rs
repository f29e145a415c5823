//! The cache node server.
//!
//! Owns this node's view of the fleet (the hash ring and one fetcher per
//! peer), serves the internode get RPC, and doubles as the peer picker for
//! the namespaces registered on it. Lifecycle is `Idle → Running → Stopped`;
//! membership changes swap ring and fetchers atomically under one mutex.

pub mod handlers;
pub mod protocol;
pub mod service;

#[cfg(test)]
mod tests;

pub use service::{CacheServer, DEFAULT_REPLICAS, SERVICE_NAME};
