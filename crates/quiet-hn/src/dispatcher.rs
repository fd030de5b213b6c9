use crate::error::{FetchError, RemoteError};
use crate::fetcher::Fetcher;
use crate::id_cache::IdListCache;
use crate::item::Item;
use crate::item_cache::ItemCache;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Fetch tasks allowed in flight per fill unless configured otherwise.
pub const DEFAULT_WIDTH: usize = 10;

/// Turns the ranked candidate list into the first `count` story links.
///
/// Candidates are processed in batches of `width`: every id of a batch is
/// fetched concurrently, the whole batch is drained, then its results are
/// scanned in rank order. Once enough stories are collected the remainder of
/// the current batch is discarded and no further batch starts.
///
/// The dispatcher holds no lock of its own, so concurrent fills only share
/// the two caches.
pub struct Dispatcher<F> {
    fetcher: Arc<F>,
    items: Arc<ItemCache>,
    ids: Arc<IdListCache>,
    width: usize,
}

impl<F> Clone for Dispatcher<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            items: Arc::clone(&self.items),
            ids: Arc::clone(&self.ids),
            width: self.width,
        }
    }
}

/// One finished fetch task.
struct Completion {
    position: usize,
    id: u64,
    result: Result<Item, RemoteError>,
}

/// Result slots for a single batch, indexed by `position % width`.
///
/// Contract: batches start at multiples of `width` and hold at most `width`
/// ids, and every slot is drained before the next batch is placed. Under
/// that contract no two in-flight tasks map to the same slot and array order
/// equals rank order.
struct BatchSlots {
    slots: Vec<Option<Completion>>,
}

impl BatchSlots {
    fn new(width: usize) -> Self {
        Self {
            slots: (0..width).map(|_| None).collect(),
        }
    }

    fn place(&mut self, completion: Completion) {
        let slot = completion.position % self.slots.len();
        debug_assert!(
            self.slots[slot].is_none(),
            "slot {slot} reused before the batch was drained"
        );
        self.slots[slot] = Some(completion);
    }

    /// Empty every slot in array order.
    fn drain(&mut self) -> impl Iterator<Item = Completion> + '_ {
        self.slots.iter_mut().filter_map(Option::take)
    }
}

impl<F: Fetcher> Dispatcher<F> {
    pub fn new(fetcher: F, items: Arc<ItemCache>, ids: Arc<IdListCache>) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            items,
            ids,
            width: DEFAULT_WIDTH,
        }
    }

    /// Set the number of concurrent fetches per batch (at least 1).
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn item_cache(&self) -> &ItemCache {
        &self.items
    }

    pub fn id_cache(&self) -> &IdListCache {
        &self.ids
    }

    /// Collect up to `count` story links in rank order.
    ///
    /// Fails only if the candidate list cannot be obtained. Items that fail
    /// to load are logged and skipped, and running out of candidates early
    /// just yields a shorter list.
    pub async fn fill(&self, count: usize) -> Result<Vec<Item>, FetchError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let started = Instant::now();
        let candidates = self.candidate_ids().await?;

        let (tx, mut rx) = mpsc::channel(self.width);
        let mut slots = BatchSlots::new(self.width);
        let mut stories = Vec::with_capacity(count);
        let mut visited = 0;

        for (batch_no, batch) in candidates.chunks(self.width).enumerate() {
            let first = batch_no * self.width;
            for (offset, &id) in batch.iter().enumerate() {
                self.launch(id, first + offset, tx.clone());
            }

            for _ in 0..batch.len() {
                // We hold `tx`, so the channel cannot close under us.
                let Some(completion) = rx.recv().await else {
                    break;
                };
                slots.place(completion);
            }
            visited += batch.len();

            for completion in slots.drain() {
                if stories.len() >= count {
                    continue;
                }
                match completion.result {
                    Ok(item) if item.is_story_link() => stories.push(item),
                    Ok(_) => {}
                    Err(e) => {
                        metrics::counter!("quiet_hn_item_errors_total").increment(1);
                        tracing::warn!(
                            id = completion.id,
                            position = completion.position,
                            error = %e,
                            "skipping item that failed to load"
                        );
                    }
                }
            }

            if stories.len() >= count {
                break;
            }
        }

        let elapsed = started.elapsed();
        metrics::histogram!("quiet_hn_fill_seconds").record(elapsed.as_secs_f64());
        tracing::debug!(
            wanted = count,
            found = stories.len(),
            candidates = candidates.len(),
            visited,
            elapsed_ms = elapsed.as_millis() as u64,
            "fill complete"
        );

        Ok(stories)
    }

    /// Ranked candidate ids, fetched synchronously when nothing is cached and
    /// refreshed in the background when the cached list is about to expire.
    async fn candidate_ids(&self) -> Result<Arc<[u64]>, FetchError> {
        let lookup = self.ids.get();

        if lookup.ids.is_empty() && lookup.should_refresh {
            metrics::counter!("quiet_hn_top_ids_fetches_total", "mode" => "blocking").increment(1);
            let ids = match self.fetcher.top_ids().await {
                Ok(ids) => ids,
                Err(e) => {
                    // A live but empty list holds the in-flight flag for us.
                    self.ids.abandon_refresh();
                    return Err(FetchError::TopIds(e));
                }
            };
            tracing::debug!(count = ids.len(), "loaded top story ids");
            let shared: Arc<[u64]> = Arc::from(ids.clone());
            self.ids.put(ids);
            return Ok(shared);
        }

        if lookup.should_refresh {
            self.spawn_refresh();
        }
        Ok(lookup.ids)
    }

    fn spawn_refresh(&self) {
        metrics::counter!("quiet_hn_top_ids_fetches_total", "mode" => "background").increment(1);
        let fetcher = Arc::clone(&self.fetcher);
        let ids = Arc::clone(&self.ids);

        tokio::spawn(async move {
            match fetcher.top_ids().await {
                Ok(fresh) => {
                    tracing::debug!(count = fresh.len(), "refreshed top story ids");
                    ids.put(fresh);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "background refresh of top story ids failed");
                    ids.abandon_refresh();
                }
            }
        });
    }

    /// Start the fetch task for the candidate at `position`. The task sends
    /// exactly one completion, even if the fetch panics.
    fn launch(&self, id: u64, position: usize, tx: mpsc::Sender<Completion>) {
        let fetcher = Arc::clone(&self.fetcher);
        let items = Arc::clone(&self.items);

        tokio::spawn(async move {
            let result = AssertUnwindSafe(load_item(&*fetcher, &items, id))
                .catch_unwind()
                .await
                .unwrap_or(Err(RemoteError::TaskPanicked { id }))
                .map(|mut item| {
                    item.position = position;
                    item
                });

            // Only fails if the fill was dropped mid-batch.
            let _ = tx.send(Completion { position, id, result }).await;
        });
    }
}

async fn load_item<F: Fetcher>(fetcher: &F, cache: &ItemCache, id: u64) -> Result<Item, RemoteError> {
    if let Some(item) = cache.get(id) {
        metrics::counter!("quiet_hn_item_lookups_total", "source" => "cache").increment(1);
        return Ok(item);
    }

    metrics::counter!("quiet_hn_item_lookups_total", "source" => "remote").increment(1);
    let item = fetcher.item(id).await?;
    cache.put(id, item.clone());
    Ok(item)
}
