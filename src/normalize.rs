//! Converts raw API items into canonical records.
//!
//! Every function here is pure: the fetch time is passed in so the defaults
//! for missing timestamps stay deterministic under test.

use chrono::DateTime;
use url::form_urlencoded::byte_serialize;

use crate::records::{ChannelMeta, Livestream, Thumbnails, VideoRecord, ZERO_DURATION};
use crate::youtube::types::{Channel, LiveStreamingDetails, ThumbnailSet, Video};

const NO_VIDEO_TITLE: &str = "No Video Title";
const NO_CHANNEL_TITLE: &str = "No Channel Title";
const NO_CHANNEL_NAME: &str = "No Title";
const NO_CHANNEL_DESCRIPTION: &str = "No description set.";
const NO_CUSTOM_URL: &str = "@notfound";
const AVATAR_FALLBACK: &str = "https://ui-avatars.com/api/?name=";
const LIVE_MARKER: &str = "_live";

/// Builds a [`VideoRecord`] for a video fetched on behalf of `channel_id`.
///
/// Returns `None` only when the API item carries no ID.
pub fn normalize_video(channel_id: &str, video: &Video, fetched_at: i64) -> Option<VideoRecord> {
    let video_id = video.id.as_deref().filter(|id| !id.is_empty())?;
    let snippet = video.snippet.as_ref();
    let statistics = video.statistics.as_ref();
    let broadcast = snippet.and_then(|s| s.live_broadcast_content.as_deref());

    Some(VideoRecord {
        video_id: video_id.to_owned(),
        channel_id: channel_id.to_owned(),
        channel_title: non_empty(snippet.and_then(|s| s.channel_title.as_deref()))
            .unwrap_or(NO_CHANNEL_TITLE)
            .to_owned(),
        title: non_empty(snippet.and_then(|s| s.title.as_deref()))
            .unwrap_or(NO_VIDEO_TITLE)
            .to_owned(),
        description: snippet
            .and_then(|s| s.description.clone())
            .unwrap_or_default(),
        thumbnails: select_thumbnails(snippet.and_then(|s| s.thumbnails.as_ref())),
        published_at: parse_timestamp(snippet.and_then(|s| s.published_at.as_deref()), fetched_at),
        view_count: parse_count(statistics.and_then(|s| s.view_count.as_deref())),
        likes: parse_count(statistics.and_then(|s| s.like_count.as_deref())),
        duration: non_empty(
            video
                .content_details
                .as_ref()
                .and_then(|details| details.duration.as_deref()),
        )
        .unwrap_or(ZERO_DURATION)
        .to_owned(),
        upcoming: broadcast == Some("upcoming"),
        livestream: video
            .live_streaming_details
            .as_ref()
            .map(|details| normalize_livestream(details, broadcast == Some("live"), fetched_at)),
    })
}

fn normalize_livestream(details: &LiveStreamingDetails, live: bool, fetched_at: i64) -> Livestream {
    Livestream {
        live,
        viewers: parse_count(details.concurrent_viewers.as_deref()),
        live_chat_id: details.active_live_chat_id.clone().unwrap_or_default(),
        actual_start_at: parse_timestamp(details.actual_start_time.as_deref(), fetched_at),
        scheduled_start_at: parse_timestamp(details.scheduled_start_time.as_deref(), fetched_at),
    }
}

/// Builds a [`ChannelMeta`] for `origin_id`.
pub fn normalize_channel(origin_id: &str, channel: &Channel) -> ChannelMeta {
    let snippet = channel.snippet.as_ref();
    let name = non_empty(snippet.and_then(|s| s.title.as_deref()))
        .unwrap_or(NO_CHANNEL_NAME)
        .to_owned();
    let avatar_url = snippet
        .and_then(|s| s.thumbnails.as_ref())
        .and_then(|set| set.default.as_ref())
        .and_then(|thumb| non_empty(thumb.url.as_deref()))
        .map(str::to_owned)
        .unwrap_or_else(|| {
            let encoded: String = byte_serialize(name.as_bytes()).collect();
            format!("{AVATAR_FALLBACK}{encoded}")
        });
    let banner_url = channel
        .branding_settings
        .as_ref()
        .and_then(|settings| settings.image.as_ref())
        .and_then(|image| non_empty(image.banner_image_url.as_deref()))
        .map(str::to_owned);

    ChannelMeta {
        origin_id: origin_id.to_owned(),
        description: non_empty(snippet.and_then(|s| s.description.as_deref()))
            .unwrap_or(NO_CHANNEL_DESCRIPTION)
            .to_owned(),
        subscriber_count: parse_count(
            channel
                .statistics
                .as_ref()
                .and_then(|stats| stats.subscriber_count.as_deref()),
        ),
        avatar_url,
        banner_url,
        custom_url: non_empty(snippet.and_then(|s| s.custom_url.as_deref()))
            .unwrap_or(NO_CUSTOM_URL)
            .to_owned(),
        is_verified: false,
        name,
    }
}

/// Picks max-res → standard → high for the high tier and medium → default for
/// the low tier, dropping the live marker from both.
fn select_thumbnails(set: Option<&ThumbnailSet>) -> Thumbnails {
    let Some(set) = set else {
        return Thumbnails::default();
    };
    let pick = |candidates: &[&Option<crate::youtube::types::Thumbnail>]| {
        candidates
            .iter()
            .filter_map(|thumb| thumb.as_ref())
            .find_map(|thumb| non_empty(thumb.url.as_deref()))
            .map(strip_live_marker)
    };

    Thumbnails {
        high: pick(&[&set.maxres, &set.standard, &set.high]),
        low: pick(&[&set.medium, &set.default]),
    }
}

/// `.../hqdefault_live.jpg` → `.../hqdefault.jpg`. Only the file stem of the
/// last path segment is inspected, so video IDs containing `_live` survive.
pub fn strip_live_marker(url: &str) -> String {
    let (dir, file) = match url.rfind('/') {
        Some(index) => url.split_at(index + 1),
        None => ("", url),
    };
    let (stem, ext) = match file.rfind('.') {
        Some(index) => file.split_at(index),
        None => (file, ""),
    };
    match stem.strip_suffix(LIVE_MARKER) {
        Some(bare) => format!("{dir}{bare}{ext}"),
        None => url.to_owned(),
    }
}

/// RFC 3339 timestamp to epoch milliseconds; absent or invalid → `fallback`.
pub fn parse_timestamp(value: Option<&str>, fallback: i64) -> i64 {
    value
        .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
        .map(|parsed| parsed.timestamp_millis())
        .unwrap_or(fallback)
}

/// Non-negative integer counter; anything unparseable counts as zero.
pub fn parse_count(value: Option<&str>) -> u64 {
    value
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.is_empty())
}
