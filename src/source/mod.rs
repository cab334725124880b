//! Upstream data source
//!
//! A [`DataSource`] hands out raw bytes for the channel directory and for a
//! single channel's guide. It knows nothing about the payload format.

pub mod http;

use async_trait::async_trait;
use bytes::Bytes;

use crate::models::ChannelId;
use crate::utils::error::FetchError;

pub use http::HttpDataSource;

/// Raw byte provider for the refresh pipeline
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch the channel directory payload
    async fn fetch_directory(&self) -> Result<Bytes, FetchError>;

    /// Fetch the guide payload of one channel
    async fn fetch_guide(&self, channel_id: &ChannelId) -> Result<Bytes, FetchError>;
}
