//! Fetches the current top Hacker News stories that link somewhere else.
//!
//! The [`dispatcher::Dispatcher`] pulls the ranked id list (cached with
//! refresh-ahead in an [`id_cache::IdListCache`]), fetches items in bounded
//! concurrent batches through an [`item_cache::ItemCache`], and returns the
//! first N story links in rank order.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fetcher;
pub mod id_cache;
pub mod item;
pub mod item_cache;
pub mod stats;
pub mod web;

pub use dispatcher::Dispatcher;
pub use error::{FetchError, RemoteError};
pub use fetcher::{Fetcher, HttpFetcher};
pub use item::{Item, ItemKind};
