use crate::fetcher::Fetcher;
use crate::web::AppState;
use axum::extract::State;
use axum::Json;
use quiet_cache::CacheStats;
use serde::Serialize;
use std::sync::Arc;

/// Item cache counters as exposed on `/api/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheMetrics {
    pub hit_rate: f64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub capacity: usize,
}

impl From<CacheStats> for CacheMetrics {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            size: stats.current_size,
            capacity: stats.capacity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub item_cache: CacheMetrics,
    pub top_ids_cached: usize,
    pub max_concurrent: usize,
}

/// GET /api/stats: item cache counters and dispatcher settings.
pub async fn stats_handler<F: Fetcher>(State(state): State<Arc<AppState<F>>>) -> Json<StatsResponse> {
    let dispatcher = &state.dispatcher;
    Json(StatsResponse {
        item_cache: dispatcher.item_cache().stats().into(),
        top_ids_cached: dispatcher.id_cache().len(),
        max_concurrent: dispatcher.width(),
    })
}
