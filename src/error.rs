//! Error types for the cache fleet.
//!
//! One typed enum covers every failure the library can surface. Handlers map
//! the kinds onto HTTP statuses through `IntoResponse`. The enum is `Clone`
//! because a coalesced load broadcasts one result to every waiter.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for cache operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// A get was issued with an empty key.
    #[error("key is required")]
    InvalidKey,

    /// The requested namespace does not exist on this node.
    #[error("namespace not found: {0}")]
    UnknownNamespace(String),

    /// The backing source rejected the load. Propagated to the caller.
    #[error("backing source failed for key {key}: {message}")]
    BackingSource { key: String, message: String },

    /// A remote peer fetch failed. Absorbed by the load pipeline, which
    /// falls back to the backing source.
    #[error("peer fetch failed for key {key}: {message}")]
    PeerFetch { key: String, message: String },

    /// A remote peer fetch exceeded its deadline. Treated like `PeerFetch`.
    #[error("peer fetch timed out after {0:?}")]
    Timeout(Duration),

    /// Service discovery could not resolve or maintain a registration.
    #[error("registry error: {0}")]
    Registry(String),

    /// `start` was called on a server that is not idle.
    #[error("server already running")]
    AlreadyRunning,

    /// A peer address did not parse as `x.x.x.x:port`.
    #[error("invalid peer address {0}, expected x.x.x.x:port")]
    InvalidPeerAddress(String),
}

impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidKey => StatusCode::BAD_REQUEST,
            CacheError::UnknownNamespace(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
