use parking_lot::Mutex;
use quiet_cache::RefreshAhead;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What a reader of the [`IdListCache`] gets back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdListLookup {
    /// Ranked candidate ids; empty when nothing valid is cached.
    pub ids: Arc<[u64]>,
    /// This reader has been elected to fetch a fresh list and `put` it.
    pub should_refresh: bool,
}

/// Single shared slot holding the current top-id list.
pub struct IdListCache {
    slot: Mutex<RefreshAhead<Arc<[u64]>>>,
}

impl IdListCache {
    /// `refresh_buffer` is how long before expiry readers start being told
    /// to refresh.
    pub fn new(ttl: Duration, refresh_buffer: Duration) -> Self {
        if refresh_buffer > ttl {
            tracing::warn!(
                ttl_ms = ttl.as_millis() as u64,
                refresh_buffer_ms = refresh_buffer.as_millis() as u64,
                "refresh buffer exceeds TTL, every read will be inside the refresh window"
            );
        }
        Self {
            slot: Mutex::new(RefreshAhead::new(ttl, refresh_buffer)),
        }
    }

    pub fn get(&self) -> IdListLookup {
        self.get_at(Instant::now())
    }

    pub fn get_at(&self, now: Instant) -> IdListLookup {
        let lookup = self.slot.lock().get_at(now);
        IdListLookup {
            ids: lookup.value.unwrap_or_else(|| Arc::from(Vec::new())),
            should_refresh: lookup.should_refresh,
        }
    }

    /// Number of live cached ids. Does not take part in refresh election.
    pub fn len(&self) -> usize {
        self.slot
            .lock()
            .peek_at(Instant::now())
            .map_or(0, |ids| ids.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Install a freshly fetched list and restart the TTL.
    pub fn put(&self, ids: Vec<u64>) {
        self.put_at(ids, Instant::now());
    }

    pub fn put_at(&self, ids: Vec<u64>, now: Instant) {
        self.slot.lock().put_at(Arc::from(ids), now);
    }

    /// Give up on a refresh this reader was elected for, so the next reader
    /// in the window is elected instead.
    pub fn abandon_refresh(&self) {
        self.slot.lock().abandon_refresh();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    fn cache() -> IdListCache {
        IdListCache::new(Duration::from_secs(10), Duration::from_secs(5))
    }

    #[test]
    fn unpopulated_cache_is_empty_and_wants_refresh() {
        let lookup = cache().get();
        assert!(lookup.ids.is_empty());
        assert!(lookup.should_refresh);
    }

    #[test]
    fn put_then_get_returns_same_list() {
        let cache = cache();
        let start = Instant::now();
        cache.put_at(vec![5, 3, 8], start);

        let lookup = cache.get_at(start);
        assert_eq!(&*lookup.ids, &[5, 3, 8]);
        assert!(!lookup.should_refresh);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn refresh_window_elects_one_reader() {
        let cache = cache();
        let start = Instant::now();
        cache.put_at(vec![1, 2], start);
        let window = start + Duration::from_secs(7);

        let elected = cache.get_at(window);
        assert!(elected.should_refresh);
        assert_eq!(&*elected.ids, &[1, 2]);

        let others: Vec<_> = (0..4).map(|_| cache.get_at(window)).collect();
        assert!(others.iter().all(|l| !l.should_refresh && l.ids[..] == [1, 2]));

        cache.put_at(vec![2, 1], window);
        let after = cache.get_at(window);
        assert_eq!(&*after.ids, &[2, 1]);
        assert!(!after.should_refresh);
    }

    #[test]
    fn concurrent_readers_elect_exactly_one() {
        let cache = Arc::new(cache());
        let start = Instant::now();
        cache.put_at(vec![4, 2], start);
        let window = start + Duration::from_secs(8);

        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_at(window)
                })
            })
            .collect();
        let lookups: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(lookups.iter().filter(|l| l.should_refresh).count(), 1);
        assert!(lookups.iter().all(|l| l.ids[..] == [4, 2]));
    }

    #[test]
    fn abandon_lets_next_reader_refresh() {
        let cache = cache();
        let start = Instant::now();
        cache.put_at(vec![1], start);
        let window = start + Duration::from_secs(6);

        assert!(cache.get_at(window).should_refresh);
        assert!(!cache.get_at(window).should_refresh);
        cache.abandon_refresh();
        assert!(cache.get_at(window).should_refresh);
    }

    #[test]
    fn expired_list_reads_empty() {
        let cache = cache();
        let start = Instant::now();
        cache.put_at(vec![1, 2, 3], start);

        let lookup = cache.get_at(start + Duration::from_secs(11));
        assert!(lookup.ids.is_empty());
        assert!(lookup.should_refresh);
    }
}
