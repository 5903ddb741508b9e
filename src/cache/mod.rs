//! Per-channel video cache.
//!
//! Entries live forever in the backing store; staleness is computed from the
//! timestamp inside each payload, never delegated to the store.

mod channel;
pub mod envelope;
mod store;

pub use channel::{CacheState, ChannelCache, DEFAULT_FRESHNESS_WINDOW, cache_key};
pub use store::{CacheStore, MemoryCacheStore, SqliteCacheStore};
