//! Canonical record shapes shared by the fetcher, the cache and the API.
//!
//! Field names serialize in camelCase because the cached JSON payloads and
//! the HTTP responses both use that layout; older cache payloads were written
//! with the same names, so the serde attributes here double as the on-disk
//! schema. Every field except the video ID has a default so records written by
//! older releases (which lacked `live`, for example) still deserialize.

use serde::{Deserialize, Serialize};

/// Best and fallback thumbnail URLs for a video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnails {
    pub high: Option<String>,
    pub low: Option<String>,
}

/// Live-streaming details, present only when the API reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Livestream {
    #[serde(default)]
    pub live: bool,
    #[serde(default)]
    pub viewers: u64,
    #[serde(default)]
    pub live_chat_id: String,
    #[serde(default)]
    pub actual_start_at: i64,
    #[serde(default)]
    pub scheduled_start_at: i64,
}

/// One normalized video. Immutable once produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub video_id: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub channel_title: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnails: Thumbnails,
    /// Epoch milliseconds.
    #[serde(default)]
    pub published_at: i64,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default = "zero_duration")]
    pub duration: String,
    #[serde(default)]
    pub upcoming: bool,
    #[serde(default)]
    pub livestream: Option<Livestream>,
}

pub const ZERO_DURATION: &str = "PT0S";

fn zero_duration() -> String {
    ZERO_DURATION.to_owned()
}

/// Channel summary used by search results and direct lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMeta {
    pub origin_id: String,
    pub name: String,
    pub description: String,
    pub subscriber_count: u64,
    pub avatar_url: String,
    pub banner_url: Option<String>,
    pub custom_url: String,
    pub is_verified: bool,
}

/// Cached videos for one channel together with the moment they were fetched.
///
/// `fetched_at` tracks when `videos` came from the API, not when the entry was
/// last read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCacheEntry {
    pub channel_id: String,
    pub videos: Vec<VideoRecord>,
    pub fetched_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_record_uses_camel_case_keys() {
        let record = VideoRecord {
            video_id: "v1".into(),
            channel_id: "c1".into(),
            channel_title: "Chan".into(),
            title: "Title".into(),
            description: String::new(),
            thumbnails: Thumbnails::default(),
            published_at: 42,
            view_count: 3,
            likes: 1,
            duration: ZERO_DURATION.into(),
            upcoming: false,
            livestream: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["videoId"], "v1");
        assert_eq!(value["publishedAt"], 42);
        assert!(value["livestream"].is_null());
    }

    #[test]
    fn minimal_record_fills_defaults() {
        let record: VideoRecord = serde_json::from_str(r#"{"videoId":"abc"}"#).unwrap();
        assert_eq!(record.duration, ZERO_DURATION);
        assert_eq!(record.view_count, 0);
        assert!(record.livestream.is_none());
    }

    #[test]
    fn livestream_without_live_flag_still_parses() {
        let live: Livestream = serde_json::from_str(
            r#"{"viewers":5,"liveChatId":"chat","actualStartAt":1,"scheduledStartAt":2}"#,
        )
        .unwrap();
        assert!(!live.live);
        assert_eq!(live.viewers, 5);
    }
}
