use crate::item::Item;
use parking_lot::Mutex;
use quiet_cache::{CacheStats, LruCache};

/// Process-wide store of fetched items, bounded by count.
///
/// Entries leave only through LRU eviction, never by age. A single mutex
/// covers reads and writes; it is never held across network I/O.
pub struct ItemCache {
    inner: Mutex<LruCache<u64, Item>>,
}

impl ItemCache {
    pub fn new(capacity: usize) -> Self {
        tracing::debug!(capacity, "item cache initialized");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cached copy of item `id`, flagged as served from cache. A hit makes
    /// the entry the most recently used.
    pub fn get(&self, id: u64) -> Option<Item> {
        let cached = self.inner.lock().get(&id)?;
        let mut item = Item::clone(&cached);
        item.from_cache = true;
        Some(item)
    }

    pub fn put(&self, id: u64, item: Item) {
        if let Some(evicted) = self.inner.lock().insert(id, item) {
            tracing::trace!(evicted, inserted = id, "item cache eviction");
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats()
    }
}
