//! Boundary to the YouTube Data API.
//!
//! The core only consumes four read-only listing calls, expressed by the
//! [`ContentSource`] trait so tests (and alternative transports) can stand in
//! for the real HTTP client. Quota handling and retries belong to the
//! implementation; callers treat every [`SourceError`] as opaque.

mod client;
pub mod types;

pub use client::{DEFAULT_API_BASE, YouTubeClient};

use thiserror::Error;

use self::types::{Channel, SearchListResponse, Video};

/// Largest page/batch size the API accepts for listing calls.
pub const MAX_RESULTS: usize = 50;

/// Failure reported by a [`ContentSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    /// Connection, DNS, TLS or timeout failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),
    /// The API answered with a non-success status (quota exhaustion lands here).
    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// The response body did not match the expected JSON shape.
    #[error("could not decode {endpoint} response: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },
}

/// Read-only listing operations consumed from the content API.
pub trait ContentSource: Send + Sync {
    /// One page of a channel's videos, newest first.
    fn search_channel_videos(
        &self,
        channel_id: &str,
        page_token: Option<&str>,
    ) -> Result<SearchListResponse, SourceError>;

    /// Full details for at most [`MAX_RESULTS`] video IDs.
    fn list_videos(&self, ids: &[String]) -> Result<Vec<Video>, SourceError>;

    /// Channels matching a free-text query, in relevance order.
    fn search_channels(&self, query: &str) -> Result<SearchListResponse, SourceError>;

    /// Full details for at most [`MAX_RESULTS`] channel IDs.
    fn list_channels(&self, ids: &[String]) -> Result<Vec<Channel>, SourceError>;
}
