//! Channel lookups: free-text search and direct fetch by ID. Not cached.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::normalize::normalize_channel;
use crate::records::ChannelMeta;
use crate::youtube::types::Channel;
use crate::youtube::{ContentSource, MAX_RESULTS, SourceError};

pub struct ChannelSearch {
    source: Arc<dyn ContentSource>,
}

impl ChannelSearch {
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }

    /// Searches, fetches details for every hit, and joins the two in search
    /// relevance order. Hits whose details did not come back are dropped.
    pub fn search_channels(&self, query: &str) -> Result<Vec<ChannelMeta>, SourceError> {
        let hits = self.source.search_channels(query)?;
        let ids: Vec<String> = hits
            .items
            .iter()
            .filter_map(|item| item.id.as_ref())
            .filter_map(|id| id.channel_id.clone())
            .filter(|id| !id.is_empty())
            .take(MAX_RESULTS)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let by_id: HashMap<String, Channel> = self
            .source
            .list_channels(&ids)?
            .into_iter()
            .filter_map(|channel| channel.id.clone().map(|id| (id, channel)))
            .collect();

        let results: Vec<ChannelMeta> = ids
            .iter()
            .filter_map(|id| by_id.get(id).map(|channel| normalize_channel(id, channel)))
            .collect();
        info!(query, hits = ids.len(), results = results.len(), "channel search");
        Ok(results)
    }

    /// Details for a single channel, `None` when the API does not know it.
    pub fn get_channel(&self, channel_id: &str) -> Result<Option<ChannelMeta>, SourceError> {
        let channels = self.source.list_channels(&[channel_id.to_owned()])?;
        Ok(channels
            .iter()
            .find(|channel| channel.id.as_deref() == Some(channel_id))
            .map(|channel| normalize_channel(channel_id, channel)))
    }
}
