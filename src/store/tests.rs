//! Storage Layer Tests
//!
//! Covers the payload view, the LRU store (accounting, ordering, eviction
//! callback, expiry) and the concurrent facade.

#[cfg(test)]
mod tests {
    use crate::store::lru::{Clock, LruStore};
    use crate::store::payload::Payload;
    use crate::store::cache::SyncCache;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    /// A clock whose current instant is `base + offset`, with the offset
    /// adjustable from the test body.
    fn manual_clock() -> (Arc<AtomicU64>, Clock) {
        let offset = Arc::new(AtomicU64::new(0));
        let base = Instant::now();
        let handle = offset.clone();
        let clock: Clock =
            Box::new(move || base + Duration::from_secs(handle.load(Ordering::SeqCst)));
        (offset, clock)
    }

    // ============================================================
    // PAYLOAD TESTS
    // ============================================================

    #[test]
    fn test_payload_len_and_display() {
        let payload = Payload::new(b"hello");
        assert_eq!(payload.len(), 5);
        assert!(!payload.is_empty());
        assert_eq!(payload.to_string(), "hello");
        assert!(payload.expiry().is_none());
    }

    #[test]
    fn test_payload_bytes_are_independent_copies() {
        let payload = Payload::new(b"abc");
        let mut first = payload.bytes();
        first[0] = b'z';

        // The stored bytes must be untouched by edits to a returned view.
        assert_eq!(payload.bytes(), b"abc");
        assert_eq!(payload.to_string(), "abc");
    }

    #[test]
    fn test_payload_construction_copies_input() {
        let mut source = b"abc".to_vec();
        let payload = Payload::new(&source);
        source[0] = b'z';
        assert_eq!(payload.bytes(), b"abc");
    }

    // ============================================================
    // LRU STORE TESTS
    // ============================================================

    #[test]
    fn test_lru_get() {
        let mut lru: LruStore<String> = LruStore::new(0, None);
        lru.add("key1", "1234".to_string(), None);

        assert_eq!(lru.get("key1"), Some(&"1234".to_string()));
        assert_eq!(lru.get("key2"), None);
    }

    #[test]
    fn test_lru_capacity_evicts_oldest() {
        let k1 = "key1";
        let k2 = "key2";
        let k3 = "k3";
        let cap = (k1.len() + k2.len() + "value1".len() + "value2".len()) as u64;

        let mut lru: LruStore<String> = LruStore::new(cap, None);
        lru.add(k1, "value1".to_string(), None);
        lru.add(k2, "value2".to_string(), None);
        lru.add(k3, "v3".to_string(), None);

        assert_eq!(lru.get("key1"), None, "oldest entry should be evicted");
        assert_eq!(lru.len(), 2);
    }

    #[test]
    fn test_lru_accounting_stays_within_capacity() {
        let cap = 40u64;
        let mut lru: LruStore<String> = LruStore::new(cap, None);

        for i in 0..50 {
            let key = format!("key{}", i);
            lru.add(&key, "0123456789".to_string(), None);
            assert!(lru.used_bytes() <= cap, "used {} over cap", lru.used_bytes());
        }
    }

    #[test]
    fn test_lru_accounting_matches_live_entries() {
        let mut lru: LruStore<String> = LruStore::new(0, None);
        lru.add("a", "xx".to_string(), None);
        lru.add("bb", "yyy".to_string(), None);
        lru.add("ccc", "z".to_string(), None);

        // a+xx = 3, bb+yyy = 5, ccc+z = 4
        assert_eq!(lru.used_bytes(), 12);

        lru.remove("bb");
        assert_eq!(lru.used_bytes(), 7);
    }

    #[test]
    fn test_lru_update_in_place_adjusts_size() {
        let mut lru: LruStore<String> = LruStore::new(1000, None);
        lru.add("key", "1".to_string(), None);
        lru.add("key", "111".to_string(), None);

        assert_eq!(lru.used_bytes(), ("key".len() + "111".len()) as u64);
        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_lru_get_promotes_to_most_recent() {
        let mut lru: LruStore<String> = LruStore::new(0, None);
        lru.add("a", "1".to_string(), None);
        lru.add("b", "2".to_string(), None);
        lru.add("c", "3".to_string(), None);

        // Touch the oldest entry, then evict twice. The touched entry must
        // survive both evictions.
        lru.get("a");
        lru.remove_oldest();
        lru.remove_oldest();

        assert_eq!(lru.len(), 1);
        assert_eq!(lru.get("a"), Some(&"1".to_string()));
        assert_eq!(lru.get("b"), None);
        assert_eq!(lru.get("c"), None);
    }

    #[test]
    fn test_lru_remove_oldest_fires_callback_once() {
        let evicted: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = evicted.clone();

        let mut lru: LruStore<String> = LruStore::new(
            0,
            Some(Box::new(move |key, value| {
                sink.lock().unwrap().push((key, value));
            })),
        );
        lru.add("first", "1".to_string(), None);
        lru.add("second", "2".to_string(), None);
        lru.remove_oldest();

        let seen = evicted.lock().unwrap();
        assert_eq!(seen.as_slice(), &[("first".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_lru_eviction_callback_order_under_pressure() {
        let evicted: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = evicted.clone();

        // Capacity holds exactly two entries of key "keyN" + value "kN".
        let mut lru: LruStore<String> = LruStore::new(
            12,
            Some(Box::new(move |key, _value| {
                sink.lock().unwrap().push(key);
            })),
        );
        lru.add("key1", "k1".to_string(), None);
        lru.add("key2", "k2".to_string(), None);
        lru.add("key3", "k3".to_string(), None);
        lru.add("key4", "k4".to_string(), None);

        assert_eq!(
            evicted.lock().unwrap().as_slice(),
            &["key1".to_string(), "key2".to_string()],
            "evictions must come off the least recently used end, oldest first"
        );
        assert_eq!(lru.len(), 2);
    }

    #[test]
    fn test_lru_oversized_entry_is_evicted_immediately() {
        let evicted: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = evicted.clone();

        let mut lru: LruStore<String> = LruStore::new(
            1,
            Some(Box::new(move |key, _value| {
                sink.lock().unwrap().push(key);
            })),
        );
        lru.add("key1", "k1".to_string(), None);

        assert!(lru.is_empty());
        assert_eq!(evicted.lock().unwrap().as_slice(), &["key1".to_string()]);
    }

    #[test]
    fn test_lru_remove_specific_key() {
        let mut lru: LruStore<String> = LruStore::new(0, None);
        lru.add("a", "1".to_string(), None);
        lru.add("b", "2".to_string(), None);

        assert!(lru.remove("a"));
        assert!(!lru.remove("a"));
        assert_eq!(lru.len(), 1);
        assert_eq!(lru.get("a"), None);
    }

    #[test]
    fn test_lru_slot_reuse_after_eviction() {
        let mut lru: LruStore<String> = LruStore::new(0, None);
        for i in 0..100 {
            lru.add(&format!("key{}", i), "v".to_string(), None);
        }
        for i in 0..50 {
            lru.remove(&format!("key{}", i));
        }
        for i in 100..150 {
            lru.add(&format!("key{}", i), "v".to_string(), None);
        }

        assert_eq!(lru.len(), 100);
        assert_eq!(lru.get("key0"), None);
        assert_eq!(lru.get("key149"), Some(&"v".to_string()));
    }

    // ============================================================
    // EXPIRY TESTS
    // ============================================================

    #[test]
    fn test_lru_expired_entry_is_removed_on_get() {
        let (offset, clock) = manual_clock();
        let now = clock();

        let evicted: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = evicted.clone();
        let mut lru: LruStore<String> = LruStore::new(
            0,
            Some(Box::new(move |key, _value| {
                sink.lock().unwrap().push(key);
            })),
        )
        .with_clock(clock);

        lru.add("song", "silence".to_string(), Some(now + Duration::from_secs(5)));
        assert_eq!(lru.get("song"), Some(&"silence".to_string()));

        // At the exact expiry instant the entry is still alive; only a
        // strictly later observation removes it.
        offset.store(5, Ordering::SeqCst);
        assert!(lru.get("song").is_some());

        offset.store(6, Ordering::SeqCst);
        assert_eq!(lru.get("song"), None);
        assert_eq!(lru.len(), 0);
        assert_eq!(evicted.lock().unwrap().as_slice(), &["song".to_string()]);
    }

    #[test]
    fn test_lru_no_expiry_never_expires() {
        let (offset, clock) = manual_clock();
        let mut lru: LruStore<String> = LruStore::new(0, None).with_clock(clock);

        lru.add("song", "forever".to_string(), None);
        offset.store(1_000_000, Ordering::SeqCst);
        assert_eq!(lru.get("song"), Some(&"forever".to_string()));
    }

    // ============================================================
    // SYNC CACHE FACADE TESTS
    // ============================================================

    #[test]
    fn test_cache_get_before_first_write_is_absent() {
        let cache = SyncCache::new(1024);
        assert!(cache.get("anything").is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.used_bytes(), 0);
    }

    #[test]
    fn test_cache_add_and_get() {
        let cache = SyncCache::new(1024);
        cache.add("key", Payload::new(b"value"));

        let hit = cache.get("key").expect("entry should be present");
        assert_eq!(hit.bytes(), b"value");
        assert!(!cache.is_empty());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.used_bytes(), ("key".len() + "value".len()) as u64);
    }

    #[test]
    fn test_cache_remove() {
        let cache = SyncCache::new(1024);
        cache.add("key", Payload::new(b"value"));

        assert!(cache.remove("key"));
        assert!(!cache.remove("key"));
        assert!(cache.get("key").is_none());
    }

    #[test]
    fn test_cache_is_shareable_across_tasks() {
        let cache = Arc::new(SyncCache::new(0));
        let mut handles = Vec::new();

        for i in 0..8 {
            let cache = cache.clone();
            handles.push(std::thread::spawn(move || {
                for j in 0..50 {
                    let key = format!("key-{}-{}", i, j);
                    cache.add(&key, Payload::new(b"x"));
                    assert!(cache.get(&key).is_some());
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 400);
    }
}
