use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{Channel, ChannelListResponse, SearchListResponse, Video, VideoListResponse};
use super::{ContentSource, MAX_RESULTS, SourceError};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

const VIDEO_PARTS: &str = "id,contentDetails,liveStreamingDetails,snippet,statistics";
const CHANNEL_PARTS: &str = "id,snippet,statistics,brandingSettings";

/// Blocking Data API client authenticated with an API key.
///
/// The base URL is configurable so the client can be pointed at a local mock
/// of the API.
#[derive(Clone)]
pub struct YouTubeClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
        }
    }

    fn get<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        params: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(endpoint, "calling YouTube Data API");

        let mut request = self.agent.get(&url).query("key", &self.api_key);
        for (name, value) in params {
            request = request.query(name, value);
        }

        let response = request.call().map_err(SourceError::from)?;
        response
            .into_json::<T>()
            .map_err(|err| SourceError::Decode {
                endpoint,
                message: err.to_string(),
            })
    }
}

impl From<ureq::Error> for SourceError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => SourceError::Status {
                status,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => SourceError::Transport(transport.to_string()),
        }
    }
}

impl ContentSource for YouTubeClient {
    fn search_channel_videos(
        &self,
        channel_id: &str,
        page_token: Option<&str>,
    ) -> Result<SearchListResponse, SourceError> {
        let max_results = MAX_RESULTS.to_string();
        let mut params = vec![
            ("part", "id,snippet"),
            ("channelId", channel_id),
            ("type", "video"),
            ("order", "date"),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        self.get("search", &params)
    }

    fn list_videos(&self, ids: &[String]) -> Result<Vec<Video>, SourceError> {
        let joined = ids.join(",");
        let max_results = MAX_RESULTS.to_string();
        let response: VideoListResponse = self.get(
            "videos",
            &[
                ("part", VIDEO_PARTS),
                ("id", joined.as_str()),
                ("maxResults", max_results.as_str()),
            ],
        )?;
        Ok(response.items)
    }

    fn search_channels(&self, query: &str) -> Result<SearchListResponse, SourceError> {
        let max_results = MAX_RESULTS.to_string();
        self.get(
            "search",
            &[
                ("part", "id,snippet"),
                ("q", query),
                ("type", "channel"),
                ("maxResults", max_results.as_str()),
            ],
        )
    }

    fn list_channels(&self, ids: &[String]) -> Result<Vec<Channel>, SourceError> {
        let joined = ids.join(",");
        let max_results = MAX_RESULTS.to_string();
        let response: ChannelListResponse = self.get(
            "channels",
            &[
                ("part", CHANNEL_PARTS),
                ("id", joined.as_str()),
                ("maxResults", max_results.as_str()),
            ],
        )?;
        Ok(response.items)
    }
}
