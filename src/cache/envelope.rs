//! Versioned payload format for cached channel videos.
//!
//! | version | shape                                          |
//! |---------|------------------------------------------------|
//! | 0       | bare JSON array of video records               |
//! | 1       | `{"version":1,"videos":[...],"timestamp":ms}`  |
//!
//! Version 1 envelopes written before the `version` field existed carry only
//! `videos` and `timestamp`; an object without `version` is read as version 1.
//! Writers always emit the current version.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::records::{ChannelCacheEntry, VideoRecord};

pub const CURRENT_VERSION: u64 = 1;

/// A successfully decoded payload, tagged with the version it was stored as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredPayload {
    Legacy(Vec<VideoRecord>),
    Enveloped(ChannelCacheEntry),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON or does not match its version: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported cache payload version {0}")]
    UnsupportedVersion(u64),
    #[error("unexpected cache payload shape: {0}")]
    UnexpectedShape(&'static str),
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u64,
    videos: &'a [VideoRecord],
    timestamp: i64,
}

#[derive(Deserialize)]
struct EnvelopeV1 {
    videos: Vec<VideoRecord>,
    timestamp: i64,
}

pub fn encode(videos: &[VideoRecord], fetched_at: i64) -> Result<String, serde_json::Error> {
    serde_json::to_string(&EnvelopeRef {
        version: CURRENT_VERSION,
        videos,
        timestamp: fetched_at,
    })
}

/// Dispatches on the payload's version marker: arrays are version 0, objects
/// carry their version (defaulting to 1).
pub fn decode(channel_id: &str, raw: &str) -> Result<StoredPayload, DecodeError> {
    let value: Value = serde_json::from_str(raw)?;
    let version = match &value {
        Value::Array(_) => 0,
        Value::Object(map) => match map.get("version") {
            None => 1,
            Some(version) => version
                .as_u64()
                .ok_or(DecodeError::UnexpectedShape("non-integer version"))?,
        },
        _ => return Err(DecodeError::UnexpectedShape("neither array nor object")),
    };

    match version {
        0 => Ok(StoredPayload::Legacy(serde_json::from_value(value)?)),
        1 => {
            let envelope: EnvelopeV1 = serde_json::from_value(value)?;
            Ok(StoredPayload::Enveloped(ChannelCacheEntry {
                channel_id: channel_id.to_owned(),
                videos: envelope.videos,
                fetched_at: envelope.timestamp,
            }))
        }
        other => Err(DecodeError::UnsupportedVersion(other)),
    }
}

/// Best-effort recovery for payloads [`decode`] rejected: every element of the
/// payload's video array that still parses as a record is kept. Payloads that
/// are not JSON at all recover nothing.
pub fn salvage(raw: &str) -> Vec<VideoRecord> {
    let Ok(value) = serde_json::from_str::<Value>(raw) else {
        return Vec::new();
    };
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("videos") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<VideoRecord>(item).ok())
        .collect()
}
