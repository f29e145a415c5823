//! Peer capabilities.
//!
//! Two small traits decouple the load pipeline from the transport: a
//! `PeerPicker` decides whether a key belongs to a remote node, and a
//! `Fetcher` retrieves a value from one. The node server implements the
//! picker; `RemoteFetcher` is the built-in HTTP fetcher.

pub mod client;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CacheError;

pub use client::RemoteFetcher;

/// Retrieves a cached value from one remote peer.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the value for (namespace, key) from the peer this fetcher is
    /// bound to. Transport and deadline failures surface unchanged.
    async fn fetch(&self, namespace: &str, key: &str) -> Result<Vec<u8>, CacheError>;
}

/// Decides where a key should be loaded.
pub trait PeerPicker: Send + Sync {
    /// Returns the fetcher for the node authoritative over `key`, or `None`
    /// when this node is the authority and the load should happen locally.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn Fetcher>>;
}
