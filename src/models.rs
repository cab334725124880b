//! Core data structures for the channel directory and program guide

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique channel identifier as issued by the upstream directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ChannelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One entry of the channel directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub channel_id: ChannelId,
    pub name: String,
    pub logo_url: Option<String>,
    pub group: Option<String>,
}

impl Channel {
    /// Create a channel with only the required fields set
    pub fn new(channel_id: impl Into<ChannelId>, name: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            name: name.into(),
            logo_url: None,
            group: None,
        }
    }
}

/// One programme of a channel's guide
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpgEntry {
    pub channel_id: ChannelId,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: Option<String>,
}

impl EpgEntry {
    /// Stable ordering key used when comparing guides independent of arrival order
    pub fn sort_key(&self) -> (&ChannelId, DateTime<Utc>, &str) {
        (&self.channel_id, self.start, self.title.as_str())
    }
}

/// Sort entries by channel, then start time, then title
pub fn sort_entries(entries: &mut [EpgEntry]) {
    entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}
