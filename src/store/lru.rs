//! Size-accounted LRU store with lazy expiry.
//!
//! Entries live in a slot arena; recency order is a doubly linked list kept
//! as parallel `prev`/`next` index vectors over the slots, with a key→slot
//! map for O(1) lookup. The most recently used entry sits at the head, the
//! eviction candidate at the tail.
//!
//! Capacity is accounted in bytes: each entry contributes its key length
//! plus its value length. When `max_bytes` is exceeded the tail is evicted
//! until the store fits again. Expiry is lazy: an entry past its instant is
//! only noticed (and removed) when a `get` touches it, so expired entries
//! keep consuming capacity until observed or pushed out by pressure.
//!
//! The store is not thread-safe; `SyncCache` wraps it for concurrent use.

use std::collections::HashMap;
use std::time::Instant;

/// Capability required of cached values: report their size in bytes.
///
/// The store never inspects value contents, so it is reusable for anything
/// that can be measured.
pub trait Measured {
    fn len(&self) -> usize;
}

/// Injectable time source. Tests substitute a controllable clock.
pub type Clock = Box<dyn Fn() -> Instant + Send + Sync>;

/// Invoked with the owned key and value whenever an entry leaves the store,
/// whether by pressure, expiry, or explicit removal.
pub type EvictionCallback<V> = Box<dyn FnMut(String, V) + Send>;

/// Index sentinel for "no slot".
const NIL: usize = usize::MAX;

struct Slot<V> {
    key: String,
    value: V,
    expires_at: Option<Instant>,
}

/// Bounded, expiring LRU store.
pub struct LruStore<V> {
    max_bytes: u64,
    used_bytes: u64,
    slots: Vec<Option<Slot<V>>>,
    next: Vec<usize>,
    prev: Vec<usize>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    index: HashMap<String, usize>,
    clock: Clock,
    on_evicted: Option<EvictionCallback<V>>,
}

impl<V: Measured> LruStore<V> {
    /// Creates an empty store. `max_bytes` of 0 means unbounded.
    pub fn new(max_bytes: u64, on_evicted: Option<EvictionCallback<V>>) -> Self {
        Self {
            max_bytes,
            used_bytes: 0,
            slots: Vec::new(),
            next: Vec::new(),
            prev: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            index: HashMap::new(),
            clock: Box::new(Instant::now),
            on_evicted,
        }
    }

    /// Replaces the time source. Used by tests to drive expiry.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Looks up a key, promoting it to most recently used.
    ///
    /// An entry whose expiry instant lies strictly before now is removed
    /// (the eviction callback fires) and reported as absent.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let idx = *self.index.get(key)?;
        let expired = {
            let slot = self.slot(idx);
            matches!(slot.expires_at, Some(at) if at < (self.clock)())
        };
        if expired {
            self.evict(idx);
            return None;
        }
        self.detach(idx);
        self.attach_front(idx);
        Some(&self.slot(idx).value)
    }

    /// Inserts or updates an entry and promotes it to most recently used,
    /// then evicts from the tail while over capacity.
    pub fn add(&mut self, key: &str, value: V, expires_at: Option<Instant>) {
        if let Some(&idx) = self.index.get(key) {
            let new_len = value.len() as u64;
            let slot = self.slot_mut(idx);
            let old_len = slot.value.len() as u64;
            slot.value = value;
            slot.expires_at = expires_at;
            self.used_bytes = self.used_bytes - old_len + new_len;
            self.detach(idx);
            self.attach_front(idx);
        } else {
            self.used_bytes += key.len() as u64 + value.len() as u64;
            let idx = self.alloc(Slot {
                key: key.to_string(),
                value,
                expires_at,
            });
            self.index.insert(key.to_string(), idx);
            self.attach_front(idx);
        }

        while self.max_bytes > 0 && self.used_bytes > self.max_bytes {
            self.remove_oldest();
        }
    }

    /// Removes the least recently used entry, if any.
    pub fn remove_oldest(&mut self) {
        if self.tail != NIL {
            self.evict(self.tail);
        }
    }

    /// Removes a specific entry. Returns whether one existed.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.index.get(key).copied() {
            Some(idx) => {
                self.evict(idx);
                true
            }
            None => false,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Bytes currently accounted against the capacity.
    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }

    fn slot(&self, idx: usize) -> &Slot<V> {
        self.slots[idx].as_ref().expect("lru slot out of sync with index")
    }

    fn slot_mut(&mut self, idx: usize) -> &mut Slot<V> {
        self.slots[idx].as_mut().expect("lru slot out of sync with index")
    }

    /// Unlinks a slot, releases it to the free list, adjusts accounting and
    /// fires the eviction callback with the owned entry.
    fn evict(&mut self, idx: usize) {
        self.detach(idx);
        let slot = self.slots[idx].take().expect("lru slot out of sync with index");
        self.free.push(idx);
        self.index.remove(&slot.key);
        self.used_bytes -= slot.key.len() as u64 + slot.value.len() as u64;
        if let Some(on_evicted) = self.on_evicted.as_mut() {
            on_evicted(slot.key, slot.value);
        }
    }

    fn alloc(&mut self, slot: Slot<V>) -> usize {
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = Some(slot);
            idx
        } else {
            self.slots.push(Some(slot));
            self.next.push(NIL);
            self.prev.push(NIL);
            self.slots.len() - 1
        }
    }

    fn attach_front(&mut self, idx: usize) {
        self.prev[idx] = NIL;
        self.next[idx] = self.head;
        if self.head != NIL {
            self.prev[self.head] = idx;
        } else {
            self.tail = idx;
        }
        self.head = idx;
    }

    fn detach(&mut self, idx: usize) {
        let (p, n) = (self.prev[idx], self.next[idx]);
        if p != NIL {
            self.next[p] = n;
        } else {
            self.head = n;
        }
        if n != NIL {
            self.prev[n] = p;
        } else {
            self.tail = p;
        }
        self.prev[idx] = NIL;
        self.next[idx] = NIL;
    }
}
