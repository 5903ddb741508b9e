//! Drives the paged "list uploads" endpoint to completion for one channel.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::clock::Clock;
use crate::normalize::normalize_video;
use crate::records::VideoRecord;
use crate::youtube::{ContentSource, MAX_RESULTS, SourceError};

pub const DEFAULT_MAX_PAGES: usize = 200;
pub const DEFAULT_FETCH_DEADLINE: Duration = Duration::from_secs(120);

/// Bounds on a single channel fetch, protecting against a source that keeps
/// handing out continuation tokens.
#[derive(Debug, Clone, Copy)]
pub struct FetchLimits {
    pub max_pages: usize,
    pub deadline: Duration,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            deadline: DEFAULT_FETCH_DEADLINE,
        }
    }
}

/// Why a fetch stopped before the source ran out of pages.
#[derive(Debug)]
pub enum Interruption {
    Source(SourceError),
    PageCap,
    Deadline,
    RepeatedToken(String),
}

impl fmt::Display for Interruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interruption::Source(err) => write!(f, "{err}"),
            Interruption::PageCap => f.write_str("page cap reached"),
            Interruption::Deadline => f.write_str("fetch deadline exceeded"),
            Interruption::RepeatedToken(token) => {
                write!(f, "continuation token {token} was returned twice")
            }
        }
    }
}

/// Everything gathered by one fetch, including how it ended.
#[derive(Debug)]
pub struct FetchReport {
    pub videos: Vec<VideoRecord>,
    pub pages: usize,
    pub interruption: Option<Interruption>,
}

impl FetchReport {
    /// True when the source itself failed. Guard stops (page cap, deadline,
    /// repeated token) are not failures: the source behaved, we just stopped
    /// listening.
    pub fn source_failed(&self) -> bool {
        matches!(self.interruption, Some(Interruption::Source(_)))
    }
}

pub struct VideoFetcher {
    source: Arc<dyn ContentSource>,
    clock: Arc<dyn Clock>,
    limits: FetchLimits,
}

impl VideoFetcher {
    pub fn new(source: Arc<dyn ContentSource>, clock: Arc<dyn Clock>, limits: FetchLimits) -> Self {
        Self {
            source,
            clock,
            limits,
        }
    }

    /// Every video the channel exposes, unordered. Errors are logged and
    /// whatever was gathered before them is returned.
    pub fn fetch_all_videos(&self, channel_id: &str) -> Vec<VideoRecord> {
        self.fetch_channel(channel_id).videos
    }

    /// Follows continuation tokens strictly in order until the source stops
    /// returning one or a guard trips.
    pub fn fetch_channel(&self, channel_id: &str) -> FetchReport {
        let started = Instant::now();
        let mut videos = Vec::new();
        let mut seen_videos = HashSet::new();
        let mut seen_tokens = HashSet::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0;

        let interruption = loop {
            if pages >= self.limits.max_pages {
                break Some(Interruption::PageCap);
            }
            if started.elapsed() >= self.limits.deadline {
                break Some(Interruption::Deadline);
            }

            let next = match self.fetch_page(
                channel_id,
                page_token.as_deref(),
                &mut videos,
                &mut seen_videos,
            ) {
                Ok(next) => next,
                Err(err) => break Some(Interruption::Source(err)),
            };
            pages += 1;

            match next {
                Some(token) if !seen_tokens.insert(token.clone()) => {
                    break Some(Interruption::RepeatedToken(token));
                }
                Some(token) => page_token = Some(token),
                None => break None,
            }
        };

        match &interruption {
            Some(reason) => warn!(
                channel_id,
                pages,
                videos = videos.len(),
                %reason,
                "video fetch stopped early, keeping partial result"
            ),
            None => info!(channel_id, pages, videos = videos.len(), "fetched channel videos"),
        }

        FetchReport {
            videos,
            pages,
            interruption,
        }
    }

    /// Fetches one listing page plus the details of every video on it and
    /// returns the next continuation token.
    fn fetch_page(
        &self,
        channel_id: &str,
        page_token: Option<&str>,
        videos: &mut Vec<VideoRecord>,
        seen_videos: &mut HashSet<String>,
    ) -> Result<Option<String>, SourceError> {
        let page = self.source.search_channel_videos(channel_id, page_token)?;

        let ids: Vec<String> = page
            .items
            .iter()
            .filter_map(|item| item.id.as_ref())
            .filter_map(|id| id.video_id.clone())
            .filter(|id| !id.is_empty())
            .collect();

        for batch in ids.chunks(MAX_RESULTS) {
            let details = self.source.list_videos(batch)?;
            let fetched_at = self.clock.now_ms();
            for video in &details {
                if let Some(record) = normalize_video(channel_id, video, fetched_at)
                    && seen_videos.insert(record.video_id.clone())
                {
                    videos.push(record);
                }
            }
        }

        Ok(page.next_page_token.filter(|token| !token.is_empty()))
    }
}
