use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::envelope::{self, StoredPayload};
use super::store::CacheStore;
use crate::clock::Clock;
use crate::fetcher::VideoFetcher;
use crate::records::{ChannelCacheEntry, VideoRecord};

pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

pub fn cache_key(channel_id: &str) -> String {
    format!("yt:videos:(channelId:{channel_id})")
}

/// What the store currently holds for a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheState {
    Missing,
    Fresh(ChannelCacheEntry),
    Stale(ChannelCacheEntry),
    /// A pre-envelope bare array, served as-is.
    Legacy(Vec<VideoRecord>),
    /// Unreadable payload; holds whatever records could be recovered.
    Corrupt(Vec<VideoRecord>),
}

/// Read-through cache of a channel's videos with a time-based freshness
/// window.
///
/// Reads never fail: source and store errors degrade to stale or empty
/// results. Refreshing is read-modify-write without locking, so two callers
/// refreshing the same stale channel may both fetch and the last write wins.
pub struct ChannelCache {
    store: Arc<dyn CacheStore>,
    fetcher: VideoFetcher,
    clock: Arc<dyn Clock>,
    freshness_window_ms: i64,
}

impl ChannelCache {
    pub fn new(
        store: Arc<dyn CacheStore>,
        fetcher: VideoFetcher,
        clock: Arc<dyn Clock>,
        freshness_window: Duration,
    ) -> Self {
        Self {
            store,
            fetcher,
            clock,
            freshness_window_ms: i64::try_from(freshness_window.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// Classifies the stored payload without touching the source.
    pub fn inspect(&self, channel_id: &str) -> CacheState {
        let raw = match self.store.get(&cache_key(channel_id)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return CacheState::Missing,
            Err(err) => {
                warn!(channel_id, error = %err, "cache read failed, treating entry as missing");
                return CacheState::Missing;
            }
        };

        match envelope::decode(channel_id, &raw) {
            Ok(StoredPayload::Legacy(videos)) => CacheState::Legacy(videos),
            Ok(StoredPayload::Enveloped(entry)) => {
                let age = self.clock.now_ms().saturating_sub(entry.fetched_at);
                if age < self.freshness_window_ms {
                    CacheState::Fresh(entry)
                } else {
                    CacheState::Stale(entry)
                }
            }
            Err(err) => {
                warn!(channel_id, error = %err, "cache payload unreadable, salvaging records");
                CacheState::Corrupt(envelope::salvage(&raw))
            }
        }
    }

    /// Videos for one channel, fetching only when the entry is missing or
    /// stale.
    pub fn get_videos(&self, channel_id: &str) -> Vec<VideoRecord> {
        match self.inspect(channel_id) {
            CacheState::Fresh(entry) => {
                debug!(channel_id, fetched_at = entry.fetched_at, "cache fresh");
                entry.videos
            }
            CacheState::Legacy(videos) => {
                info!(channel_id, "serving legacy cache payload");
                videos
            }
            CacheState::Corrupt(videos) => videos,
            CacheState::Missing => {
                info!(channel_id, "no cache entry, fetching from API");
                self.refresh_with_fallback(channel_id, Vec::new())
            }
            CacheState::Stale(entry) => {
                info!(channel_id, fetched_at = entry.fetched_at, "cache stale, refreshing");
                self.refresh_with_fallback(channel_id, entry.videos)
            }
        }
    }

    /// Fetches regardless of freshness. The stored entry is only replaced by
    /// a non-empty result.
    pub fn refresh(&self, channel_id: &str) -> Vec<VideoRecord> {
        let previous = match self.inspect(channel_id) {
            CacheState::Fresh(entry) | CacheState::Stale(entry) => entry.videos,
            CacheState::Legacy(videos) | CacheState::Corrupt(videos) => videos,
            CacheState::Missing => Vec::new(),
        };
        self.refresh_with_fallback(channel_id, previous)
    }

    fn refresh_with_fallback(&self, channel_id: &str, previous: Vec<VideoRecord>) -> Vec<VideoRecord> {
        let report = self.fetcher.fetch_channel(channel_id);

        if report.videos.is_empty() {
            info!(channel_id, "fetch returned no videos, keeping previous result");
            return previous;
        }
        self.write(channel_id, &report.videos);
        report.videos
    }

    fn write(&self, channel_id: &str, videos: &[VideoRecord]) {
        let fetched_at = self.clock.now_ms();
        let payload = match envelope::encode(videos, fetched_at) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(channel_id, error = %err, "could not encode cache payload");
                return;
            }
        };
        match self.store.set(&cache_key(channel_id), &payload) {
            Ok(()) => info!(channel_id, videos = videos.len(), "cache updated"),
            Err(err) => warn!(channel_id, error = %err, "cache write failed"),
        }
    }
}
