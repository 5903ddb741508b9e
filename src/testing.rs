//! Scripted collaborators shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use chrono::{DateTime, SecondsFormat};
use parking_lot::Mutex;

use crate::cache::CacheStore;
use crate::clock::Clock;
use crate::youtube::types::{
    Channel, ChannelSnippet, ResourceId, SearchListResponse, SearchResult, Video, VideoSnippet,
};
use crate::youtube::{ContentSource, SourceError};

pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self(AtomicI64::new(now_ms))
    }

    pub fn set(&self, now_ms: i64) {
        self.0.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cache store whose reads and/or writes fail. Counts write attempts.
pub struct BrokenStore {
    fail_reads: bool,
    fail_writes: bool,
    writes: AtomicUsize,
}

impl BrokenStore {
    pub fn new(fail_reads: bool, fail_writes: bool) -> Self {
        Self {
            fail_reads,
            fail_writes,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl CacheStore for BrokenStore {
    fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
        if self.fail_reads {
            anyhow::bail!("disk I/O error");
        }
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            anyhow::bail!("database is locked");
        }
        Ok(())
    }
}

/// One listing page: the videos it reveals and the token it hands out.
pub struct FakePage {
    pub videos: Vec<Video>,
    pub next: Option<String>,
}

/// A video published at `published_ms`.
pub fn video(id: &str, published_ms: i64) -> Video {
    let published = DateTime::from_timestamp_millis(published_ms)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true));
    Video {
        id: Some(id.to_owned()),
        snippet: Some(VideoSnippet {
            title: Some(format!("Video {id}")),
            published_at: published,
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Videos `{channel}-v{i}` for every `i` in `range`, published at `base_ms + i`.
pub fn page(channel: &str, range: Range<usize>, base_ms: i64, next: Option<&str>) -> FakePage {
    FakePage {
        videos: range
            .map(|i| video(&format!("{channel}-v{i}"), base_ms + i as i64))
            .collect(),
        next: next.map(str::to_owned),
    }
}

type PageKey = (String, Option<String>);

#[derive(Default)]
pub struct FakeSource {
    pages: Mutex<HashMap<PageKey, Option<SearchListResponse>>>,
    details: Mutex<HashMap<String, Video>>,
    channel_searches: Mutex<HashMap<String, Vec<String>>>,
    channels: Mutex<Vec<Channel>>,
    failing_details: AtomicBool,
    search_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    max_batch: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&self, channel: &str, token: Option<&str>, page: FakePage) {
        let items = page
            .videos
            .iter()
            .map(|video| SearchResult {
                id: Some(ResourceId {
                    kind: Some("youtube#video".into()),
                    video_id: video.id.clone(),
                    channel_id: None,
                }),
            })
            .collect();
        let mut details = self.details.lock();
        for video in page.videos {
            if let Some(id) = video.id.clone() {
                details.insert(id, video);
            }
        }
        self.pages.lock().insert(
            (channel.to_owned(), token.map(str::to_owned)),
            Some(SearchListResponse {
                items,
                next_page_token: page.next,
            }),
        );
    }

    pub fn fail_page(&self, channel: &str, token: Option<&str>) {
        self.pages
            .lock()
            .insert((channel.to_owned(), token.map(str::to_owned)), None);
    }

    pub fn fail_details(&self) {
        self.failing_details.store(true, Ordering::SeqCst);
    }

    pub fn add_channel(&self, id: &str, title: &str) {
        self.channels.lock().push(Channel {
            id: Some(id.to_owned()),
            snippet: Some(ChannelSnippet {
                title: Some(title.to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    pub fn set_channel_search(&self, query: &str, ids: &[&str]) {
        self.channel_searches.lock().insert(
            query.to_owned(),
            ids.iter().map(|id| id.to_string()).collect(),
        );
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub fn max_batch(&self) -> usize {
        self.max_batch.load(Ordering::SeqCst)
    }
}

fn scripted_failure() -> SourceError {
    SourceError::Status {
        status: 403,
        body: "quotaExceeded".into(),
    }
}

impl ContentSource for FakeSource {
    fn search_channel_videos(
        &self,
        channel_id: &str,
        page_token: Option<&str>,
    ) -> Result<SearchListResponse, SourceError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let key = (channel_id.to_owned(), page_token.map(str::to_owned));
        match self.pages.lock().get(&key) {
            Some(Some(page)) => Ok(page.clone()),
            Some(None) => Err(scripted_failure()),
            None => Ok(SearchListResponse::default()),
        }
    }

    fn list_videos(&self, ids: &[String]) -> Result<Vec<Video>, SourceError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.max_batch.fetch_max(ids.len(), Ordering::SeqCst);
        if self.failing_details.load(Ordering::SeqCst) {
            return Err(scripted_failure());
        }
        let details = self.details.lock();
        Ok(ids.iter().filter_map(|id| details.get(id).cloned()).collect())
    }

    fn search_channels(&self, query: &str) -> Result<SearchListResponse, SourceError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let ids = self
            .channel_searches
            .lock()
            .get(query)
            .cloned()
            .ok_or_else(scripted_failure)?;
        Ok(SearchListResponse {
            items: ids
                .into_iter()
                .map(|id| SearchResult {
                    id: Some(ResourceId {
                        kind: Some("youtube#channel".into()),
                        video_id: None,
                        channel_id: Some(id),
                    }),
                })
                .collect(),
            next_page_token: None,
        })
    }

    fn list_channels(&self, ids: &[String]) -> Result<Vec<Channel>, SourceError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        let wanted: HashSet<&String> = ids.iter().collect();
        // Reverse storage order so callers cannot rely on response order.
        Ok(self
            .channels
            .lock()
            .iter()
            .rev()
            .filter(|channel| channel.id.as_ref().is_some_and(|id| wanted.contains(id)))
            .cloned()
            .collect())
    }
}
