//! Consistent-hash ring with virtual nodes.
//!
//! Each real node contributes `replicas` virtual points, hashed from the
//! replica index concatenated with the node name. Lookups hash the key and
//! walk clockwise to the first virtual point, wrapping at the end of the
//! sorted point vector. With enough replicas per node the keyspace spreads
//! evenly, and adding one node relocates roughly 1/N of the keys.
//!
//! The ring is construct-then-append; membership changes are handled by
//! building a fresh ring and swapping it in under the owner's lock.

use std::collections::HashMap;

/// Injectable hash function over raw bytes.
pub type HashFn = Box<dyn Fn(&[u8]) -> u32 + Send + Sync>;

/// Virtual-node consistent-hash ring.
pub struct HashRing {
    hash: HashFn,
    replicas: usize,
    points: Vec<u32>,
    owners: HashMap<u32, String>,
}

impl HashRing {
    /// Creates an empty ring using CRC32 (IEEE) as the hash.
    pub fn new(replicas: usize) -> Self {
        Self::with_hasher(replicas, Box::new(crc32fast::hash))
    }

    /// Creates an empty ring with a caller-supplied hash function.
    pub fn with_hasher(replicas: usize, hash: HashFn) -> Self {
        Self {
            hash,
            replicas,
            points: Vec::new(),
            owners: HashMap::new(),
        }
    }

    /// Adds real nodes to the ring. Each node is projected onto `replicas`
    /// virtual points named `{i}{node}`. On a hash collision the later
    /// insertion owns the point.
    pub fn add<I, S>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for node in nodes {
            let node = node.as_ref();
            for i in 0..self.replicas {
                let point = (self.hash)(format!("{}{}", i, node).as_bytes());
                self.points.push(point);
                self.owners.insert(point, node.to_string());
            }
        }
        self.points.sort_unstable();
    }

    /// Returns the node owning `key`, or `None` when the ring is empty.
    ///
    /// The owner is the first virtual point at or clockwise after the key's
    /// hash, wrapping around past the highest point.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.points.is_empty() {
            return None;
        }

        let h = (self.hash)(key.as_bytes());
        let idx = self.points.partition_point(|&point| point < h) % self.points.len();
        self.owners.get(&self.points[idx]).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
