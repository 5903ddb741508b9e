//! Merges many channels into one newest-first feed.

use std::sync::Arc;

use tracing::debug;

use crate::cache::ChannelCache;
use crate::records::VideoRecord;

pub struct Aggregator {
    cache: Arc<ChannelCache>,
}

impl Aggregator {
    pub fn new(cache: Arc<ChannelCache>) -> Self {
        Self { cache }
    }

    /// Visits the channels one at a time, in the order given, then sorts the
    /// combined result by publish time, newest first. Never fails; a channel
    /// whose fetch fails contributes its cached or empty result.
    pub fn get_videos(&self, channel_ids: &[String]) -> Vec<VideoRecord> {
        let mut videos = Vec::new();
        for channel_id in channel_ids {
            let channel_videos = self.cache.get_videos(channel_id);
            debug!(channel_id = %channel_id, videos = channel_videos.len(), "channel merged");
            videos.extend(channel_videos);
        }
        sort_newest_first(&mut videos);
        videos
    }
}

/// Stable sort, so equal timestamps keep their channel order.
pub fn sort_newest_first(videos: &mut [VideoRecord]) {
    videos.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{DEFAULT_FRESHNESS_WINDOW, MemoryCacheStore};
    use crate::fetcher::{FetchLimits, VideoFetcher};
    use crate::testing::{FakePage, FakeSource, ManualClock, page, video};

    fn aggregator(source: Arc<FakeSource>) -> Aggregator {
        let clock = Arc::new(ManualClock::new(10_000));
        let fetcher = VideoFetcher::new(source, clock.clone(), FetchLimits::default());
        let cache = ChannelCache::new(
            Arc::new(MemoryCacheStore::new()),
            fetcher,
            clock,
            DEFAULT_FRESHNESS_WINDOW,
        );
        Aggregator::new(Arc::new(cache))
    }

    fn channels(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn merges_channels_newest_first() {
        let source = Arc::new(FakeSource::new());
        source.push_page(
            "C1",
            None,
            FakePage {
                videos: vec![video("a", 100), video("b", 300)],
                next: None,
            },
        );
        source.push_page(
            "C2",
            None,
            FakePage {
                videos: vec![video("c", 200)],
                next: None,
            },
        );

        let videos = aggregator(source).get_videos(&channels(&["C1", "C2"]));
        let published: Vec<i64> = videos.iter().map(|v| v.published_at).collect();
        assert_eq!(published, [300, 200, 100]);
    }

    #[test]
    fn failing_channel_does_not_sink_the_feed() {
        let source = Arc::new(FakeSource::new());
        source.fail_page("C1", None);
        source.push_page("C2", None, page("C2", 0..3, 500, None));

        let videos = aggregator(source).get_videos(&channels(&["C1", "C2"]));
        assert_eq!(videos.len(), 3);
        assert!(videos.iter().all(|v| v.channel_id == "C2"));
    }

    #[test]
    fn second_request_is_served_from_cache() {
        let source = Arc::new(FakeSource::new());
        source.push_page("C1", None, page("C1", 0..2, 500, None));
        let aggregator = aggregator(source.clone());

        let first = aggregator.get_videos(&channels(&["C1"]));
        let second = aggregator.get_videos(&channels(&["C1"]));
        assert_eq!(first, second);
        assert_eq!(source.search_calls(), 1);
    }

    #[test]
    fn sorting_is_idempotent_and_stable() {
        let source = Arc::new(FakeSource::new());
        source.push_page("C1", None, page("C1", 0..5, 1_000, None));
        source.push_page(
            "C2",
            None,
            FakePage {
                videos: vec![video("tie", 1_002)],
                next: None,
            },
        );

        let mut videos = aggregator(source).get_videos(&channels(&["C1", "C2"]));
        let before = videos.clone();
        sort_newest_first(&mut videos);
        assert_eq!(videos, before);
        assert!(videos.windows(2).all(|w| w[0].published_at >= w[1].published_at));
        let tie_order: Vec<&str> = videos
            .iter()
            .filter(|v| v.published_at == 1_002)
            .map(|v| v.video_id.as_str())
            .collect();
        assert_eq!(tie_order, ["C1-v2", "tie"]);
    }

    #[test]
    fn no_channels_means_no_videos() {
        let source = Arc::new(FakeSource::new());
        assert!(aggregator(source.clone()).get_videos(&[]).is_empty());
        assert_eq!(source.search_calls(), 0);
    }
}
