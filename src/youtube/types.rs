//! Raw response shapes of the Data API.
//!
//! Only the fields the normalizer reads are modelled and all of them are
//! optional: the API omits parts it was not asked for, older resources lack
//! statistics, and counters are documented as strings but have been observed
//! as plain numbers. See <https://developers.google.com/youtube/v3/docs>.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Response of `search.list`, used for both video and channel searches.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchListResponse {
    #[serde(default)]
    pub items: Vec<SearchResult>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub id: Option<ResourceId>,
}

/// Identifies the resource a search hit points at; exactly one ID is set
/// depending on `kind`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<Video>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub snippet: Option<VideoSnippet>,
    #[serde(default)]
    pub statistics: Option<VideoStatistics>,
    #[serde(default)]
    pub content_details: Option<ContentDetails>,
    #[serde(default)]
    pub live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub channel_title: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    /// `none`, `upcoming` or `live`.
    #[serde(default)]
    pub live_broadcast_content: Option<String>,
    #[serde(default)]
    pub thumbnails: Option<ThumbnailSet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThumbnailSet {
    #[serde(default)]
    pub default: Option<Thumbnail>,
    #[serde(default)]
    pub medium: Option<Thumbnail>,
    #[serde(default)]
    pub high: Option<Thumbnail>,
    #[serde(default)]
    pub standard: Option<Thumbnail>,
    #[serde(default)]
    pub maxres: Option<Thumbnail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thumbnail {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    #[serde(default, deserialize_with = "lenient_count")]
    pub view_count: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub like_count: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentDetails {
    /// ISO-8601 duration such as `PT4M13S`.
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamingDetails {
    #[serde(default, deserialize_with = "lenient_count")]
    pub concurrent_viewers: Option<String>,
    #[serde(default)]
    pub active_live_chat_id: Option<String>,
    #[serde(default)]
    pub actual_start_time: Option<String>,
    #[serde(default)]
    pub scheduled_start_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelListResponse {
    #[serde(default)]
    pub items: Vec<Channel>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub snippet: Option<ChannelSnippet>,
    #[serde(default)]
    pub statistics: Option<ChannelStatistics>,
    #[serde(default)]
    pub branding_settings: Option<BrandingSettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnippet {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub custom_url: Option<String>,
    #[serde(default)]
    pub thumbnails: Option<ThumbnailSet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatistics {
    #[serde(default, deserialize_with = "lenient_count")]
    pub subscriber_count: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrandingSettings {
    #[serde(default)]
    pub image: Option<BrandingImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandingImage {
    #[serde(default)]
    pub banner_image_url: Option<String>,
}

/// Accepts counters encoded as strings or numbers; anything else becomes `None`.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|value| value.is_finite() && *value >= 0.0)
                    .map(|value| value as u64)
            })
            .map(|count| count.to_string()),
        _ => None,
    })
}
