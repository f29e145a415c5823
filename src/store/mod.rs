//! In-memory storage layer.
//!
//! Three pieces stack on top of each other:
//!
//! - **`payload`**: the opaque byte value handed back to callers. Cheap to
//!   clone inside the cache, deep-copied at every external boundary.
//! - **`lru`**: a size-accounted, lazily-expiring LRU store with an eviction
//!   callback. Single-threaded; knows nothing about bytes or the network.
//! - **`cache`**: the concurrency facade. One mutex, lazy construction, the
//!   only store type the rest of the crate touches.

pub mod cache;
pub mod lru;
pub mod payload;

#[cfg(test)]
mod tests;

pub use cache::SyncCache;
pub use lru::{LruStore, Measured};
pub use payload::Payload;
