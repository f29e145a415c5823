//! meshcache - a distributed cooperative in-memory cache.
//!
//! A fleet of peer nodes partitions the keyspace with a consistent-hash
//! ring; any node answers any get by routing it to the key's authoritative
//! node, which loads misses from a user-supplied backing source exactly
//! once and memoizes the result in a bounded LRU.
//!
//! ## Architecture Modules
//!
//! - **`store`**: the in-memory layer. Byte payloads, the size-accounted
//!   expiring LRU, and the mutex facade everything else goes through.
//! - **`flight`**: per-key coalescing of concurrent loads, so N racing
//!   misses on one key cost one backing-source call.
//! - **`routing`**: the virtual-node consistent-hash ring mapping keys to
//!   nodes with minimal churn on membership changes.
//! - **`namespace`**: named cache spaces and the read-through load
//!   pipeline tying store, flight and peers together.
//! - **`peers`**: the picker and fetcher capabilities plus the HTTP peer
//!   client.
//! - **`server`**: the node server. Serves the internode get RPC, owns the
//!   fleet membership and implements peer picking.
//! - **`registry`**: service discovery. Keepalive leases, name resolution,
//!   and a hostable registry service.

pub mod config;
pub mod error;
pub mod flight;
pub mod namespace;
pub mod peers;
pub mod registry;
pub mod routing;
pub mod server;
pub mod store;
