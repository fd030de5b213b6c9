//! Cache primitives behind the quiet-hn story fetcher.
//!
//! - [`lru::LruCache`]: capacity-bounded, least-recently-used eviction.
//! - [`refresh::RefreshAhead`]: single value with a TTL that asks one reader
//!   to refresh it shortly before it expires.
//!
//! Both take `&mut self`; thread safety is left to the owner.

pub mod arena;
pub mod lru;
pub mod refresh;
pub mod stats;

pub use lru::LruCache;
pub use refresh::{Lookup, RefreshAhead};
pub use stats::CacheStats;
