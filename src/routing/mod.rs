//! Key-to-node routing.
//!
//! Implements consistent hashing with virtual nodes: every real node is
//! projected onto the ring at many points so that membership changes only
//! relocate a small slice of the keyspace. All nodes with the same
//! membership compute the same owner for any key, so routing needs no
//! coordination.

pub mod ring;


pub use ring::HashRing;
