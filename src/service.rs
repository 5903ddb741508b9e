//! Wires the runtime configuration into the shared feed services used by
//! both binaries.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::aggregate::Aggregator;
use crate::cache::{CacheStore, ChannelCache, MemoryCacheStore, SqliteCacheStore};
use crate::clock::{Clock, SystemClock};
use crate::config::RuntimeConfig;
use crate::fetcher::{FetchLimits, VideoFetcher};
use crate::lists::ListStore;
use crate::search::ChannelSearch;
use crate::youtube::{ContentSource, YouTubeClient};

pub struct Services {
    pub lists: ListStore,
    pub cache: Arc<ChannelCache>,
    pub aggregator: Arc<Aggregator>,
    pub search: Arc<ChannelSearch>,
}

impl Services {
    pub fn from_config(cfg: &RuntimeConfig) -> Result<Self> {
        let source: Arc<dyn ContentSource> = Arc::new(YouTubeClient::new(
            cfg.youtube_api_base.clone(),
            cfg.youtube_api_key.clone(),
            cfg.http_timeout,
        ));
        let store: Arc<dyn CacheStore> = match &cfg.cache_db {
            Some(path) => Arc::new(SqliteCacheStore::open(path)?),
            None => {
                info!("CACHE_DB not set, keeping the video cache in memory");
                Arc::new(MemoryCacheStore::new())
            }
        };
        let lists = ListStore::open(&cfg.lists_db)
            .with_context(|| format!("opening lists DB {}", cfg.lists_db.display()))?;
        Ok(Self::assemble(source, store, Arc::new(SystemClock), lists, cfg))
    }

    fn assemble(
        source: Arc<dyn ContentSource>,
        store: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        lists: ListStore,
        cfg: &RuntimeConfig,
    ) -> Self {
        let limits = FetchLimits {
            max_pages: cfg.max_pages,
            deadline: cfg.fetch_deadline,
        };
        let fetcher = VideoFetcher::new(source.clone(), clock.clone(), limits);
        let cache = Arc::new(ChannelCache::new(store, fetcher, clock, cfg.cache_ttl));
        Self {
            lists,
            aggregator: Arc::new(Aggregator::new(cache.clone())),
            search: Arc::new(ChannelSearch::new(source)),
            cache,
        }
    }
}
