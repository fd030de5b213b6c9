use crate::arena::{Entry, RecencyList};
use crate::stats::CacheStats;
use ahash::AHashMap;
use std::hash::Hash;
use std::sync::Arc;

/// Capacity-bounded least-recently-used cache.
///
/// Every hit promotes the entry to the front of the recency list; inserts
/// into a full cache evict from the back first. Nothing here expires on its
/// own. All methods take `&mut self`, callers that share the cache wrap it
/// in a lock.
pub struct LruCache<K, V> {
    list: RecencyList<K, V>,
    index: AHashMap<K, u32>,
    capacity: usize,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be > 0");
        Self {
            list: RecencyList::with_capacity(capacity),
            index: AHashMap::with_capacity(capacity),
            capacity,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Look up `key`, promoting it to most recently used on a hit.
    pub fn get(&mut self, key: &K) -> Option<Arc<V>> {
        let Some(&slot) = self.index.get(key) else {
            self.misses += 1;
            return None;
        };
        self.hits += 1;
        self.list.promote(slot);
        self.list.get(slot).map(|entry| Arc::clone(&entry.value))
    }

    /// Check for `key` without touching recency or statistics.
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Insert `value` as the most recently used entry, evicting the least
    /// recently used one if the cache is full. Returns the evicted key.
    pub fn insert(&mut self, key: K, value: V) -> Option<K> {
        if let Some(old) = self.index.remove(&key) {
            self.list.remove(old);
        }

        let mut evicted = None;
        if self.list.len() >= self.capacity {
            if let Some(entry) = self.list.pop_back() {
                self.index.remove(&entry.key);
                self.evictions += 1;
                evicted = Some(entry.key);
            }
        }

        if let Some(slot) = self.list.push_front(Entry::new(key.clone(), value)) {
            self.index.insert(key, slot);
        }
        evicted
    }

    pub fn remove(&mut self, key: &K) -> bool {
        match self.index.remove(key) {
            Some(slot) => self.list.remove(slot).is_some(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            current_size: self.list.len(),
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(capacity: usize, keys: &[u64]) -> LruCache<u64, String> {
        let mut cache = LruCache::new(capacity);
        for &k in keys {
            cache.insert(k, format!("item {k}"));
        }
        cache
    }

    #[test]
    fn get_returns_inserted_value() {
        let mut cache = filled(3, &[1, 2, 3]);
        assert_eq!(cache.get(&2).as_deref().map(String::as_str), Some("item 2"));
        assert!(cache.get(&4).is_none());
    }

    #[test]
    fn overflow_keeps_most_recent_keys() {
        for capacity in 1..6 {
            for extra in 0..4 {
                let keys: Vec<u64> = (0..(capacity + extra) as u64).collect();
                let cache = filled(capacity, &keys);

                assert_eq!(cache.len(), capacity);
                for (i, k) in keys.iter().enumerate() {
                    let survives = i >= extra;
                    assert_eq!(cache.contains(k), survives, "capacity {capacity}, key {k}");
                }
            }
        }
    }

    #[test]
    fn hit_promotes_entry() {
        let mut cache = filled(3, &[1, 2, 3]);

        // 1 is oldest; touching it makes 2 the next victim.
        assert!(cache.get(&1).is_some());
        assert_eq!(cache.insert(4, "item 4".into()), Some(2));
        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
        assert_eq!(cache.insert(5, "item 5".into()), Some(3));
    }

    #[test]
    fn missing_key_lookup_has_no_side_effects() {
        let mut cache = filled(2, &[1, 2]);
        assert!(cache.get(&7).is_none());
        assert!(cache.get(&7).is_none());
        assert_eq!(cache.len(), 2);
        // Recency untouched: 1 is still the victim.
        assert_eq!(cache.insert(3, "item 3".into()), Some(1));
    }

    #[test]
    fn reinsert_replaces_without_eviction() {
        let mut cache = filled(2, &[1, 2]);
        assert_eq!(cache.insert(1, "fresh".into()), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1).as_deref().map(String::as_str), Some("fresh"));
        assert!(cache.contains(&2));
    }

    #[test]
    fn explicit_remove() {
        let mut cache = filled(2, &[1]);
        assert!(cache.remove(&1));
        assert!(!cache.remove(&1));
        assert!(cache.is_empty());
    }

    #[test]
    fn stats_tracking() {
        let mut cache = filled(2, &[1, 2]);
        cache.get(&1);
        cache.get(&9);
        cache.insert(3, "item 3".into());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.current_size, 2);
        assert_eq!(stats.capacity, 2);
    }

    #[test]
    #[should_panic(expected = "capacity must be > 0")]
    fn zero_capacity_rejected() {
        let _ = LruCache::<u64, String>::new(0);
    }
}
