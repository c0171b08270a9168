use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::RwLock;

/// An insertion-ordered, FIFO-evicted map: component 5 of the design (spec.md §4.5).
/// On insert past capacity, the oldest-*inserted* entry is evicted, not the
/// least-recently-*used* one — there is no promote-on-access. Reads never mutate
/// ordering, which is why a reader/writer lock (spec.md §5) is enough: the common
/// case (cache hit) only needs a read lock.
pub struct FifoCache<K, V> {
    capacity: usize,
    inner: RwLock<Inner<K, V>>,
}

struct Inner<K, V> {
    map: HashMap<K, V>,
    order: VecDeque<K>,
}

impl<K, V> FifoCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize) -> FifoCache<K, V> {
        FifoCache {
            capacity,
            inner: RwLock::new(Inner {
                map: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.read().unwrap().map.get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.read().unwrap().map.contains_key(key)
    }

    /// Inserts `value` under `key`, evicting the oldest entry if this insert would
    /// exceed capacity. A cache is lossy infrastructure (spec.md §7): this never
    /// fails — an eviction is not an error, and the caller's write already
    /// succeeded by the time it reaches the cache.
    pub fn put(&self, key: K, value: V) {
        let mut inner = self.inner.write().unwrap();
        if let Entry::Vacant(e) = inner.map.entry(key.clone()) {
            e.insert(value);
            inner.order.push_back(key);
            while inner.order.len() > self.capacity {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.map.remove(&oldest);
                }
            }
        } else {
            // Already present: entities in these namespaces are immutable, so the
            // existing entry is already the right value. Do not move it in FIFO
            // order — this cache never promotes on access.
            inner.map.insert(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn evicts_oldest_inserted_past_capacity() {
        let cache: FifoCache<u32, &'static str> = FifoCache::new(2);
        cache.put(1, "a");
        cache.put(2, "b");
        cache.put(3, "c");
        // P8: surviving ids are the `cap` most-recently-inserted.
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&1));
        assert!(cache.contains(&2));
        assert!(cache.contains(&3));
    }

    #[test]
    fn access_does_not_promote() {
        let cache: FifoCache<u32, &'static str> = FifoCache::new(2);
        cache.put(1, "a");
        cache.put(2, "b");
        // Accessing 1 repeatedly must not save it from eviction: FIFO, not LRU.
        for _ in 0..5 {
            let _ = cache.get(&1);
        }
        cache.put(3, "c");
        assert!(!cache.contains(&1));
        assert!(cache.contains(&2));
        assert!(cache.contains(&3));
    }

    #[test]
    fn many_distinct_inserts_settle_at_exactly_capacity() {
        let cache: FifoCache<u32, u32> = FifoCache::new(64);
        for i in 0..200u32 {
            cache.put(i, i);
        }
        assert_eq!(cache.len(), 64);
        for i in 136..200u32 {
            assert!(cache.contains(&i));
        }
    }
}
