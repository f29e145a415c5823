//! Concurrency facade over the LRU store.
//!
//! One mutex serializes every access; the critical section is a single
//! store call, so the lock is short and bounded. The underlying store is
//! built lazily on the first write, which lets a namespace exist without
//! allocating anything until it is actually used.

use std::sync::Mutex;

use super::lru::LruStore;
use super::payload::Payload;

/// Thread-safe, lazily-initialized payload cache.
pub struct SyncCache {
    max_bytes: u64,
    inner: Mutex<Option<LruStore<Payload>>>,
}

impl SyncCache {
    /// Creates a facade with the given capacity. No memory is allocated for
    /// entries until the first `add`.
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            inner: Mutex::new(None),
        }
    }

    /// Looks up a key. Returns `None` without allocating when the store was
    /// never written.
    pub fn get(&self, key: &str) -> Option<Payload> {
        let mut guard = self.inner.lock().expect("cache mutex poisoned");
        guard.as_mut()?.get(key).cloned()
    }

    /// Inserts a payload under its own expiry instant, constructing the
    /// store on first use.
    pub fn add(&self, key: &str, value: Payload) {
        let mut guard = self.inner.lock().expect("cache mutex poisoned");
        let store = guard.get_or_insert_with(|| LruStore::new(self.max_bytes, None));
        let expiry = value.expiry();
        store.add(key, value, expiry);
    }

    /// Drops an entry. Returns whether one existed.
    pub fn remove(&self, key: &str) -> bool {
        let mut guard = self.inner.lock().expect("cache mutex poisoned");
        match guard.as_mut() {
            Some(store) => store.remove(key),
            None => false,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let guard = self.inner.lock().expect("cache mutex poisoned");
        guard.as_ref().map_or(0, |store| store.len())
    }

    pub fn is_empty(&self) -> bool {
        let guard = self.inner.lock().expect("cache mutex poisoned");
        guard.as_ref().map_or(true, |store| store.is_empty())
    }

    /// Bytes accounted by the underlying store.
    pub fn used_bytes(&self) -> u64 {
        let guard = self.inner.lock().expect("cache mutex poisoned");
        guard.as_ref().map_or(0, |store| store.used_bytes())
    }
}
