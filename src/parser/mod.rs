//! Payload decoding
//!
//! A [`GuideParser`] turns the raw bytes handed out by a
//! [`DataSource`](crate::source::DataSource) into channel and guide records.

pub mod json;
pub mod time;

pub use json::JsonParser;

use crate::models::{Channel, ChannelId, EpgEntry};
use crate::utils::error::ParseError;

/// Decoder for directory and guide payloads
pub trait GuideParser: Send + Sync {
    /// Decode the channel directory
    fn parse_channels(&self, bytes: &[u8]) -> Result<Vec<Channel>, ParseError>;

    /// Decode one channel's guide
    ///
    /// `channel_id` is the channel the payload was fetched for; entries that do
    /// not name their channel are attributed to it.
    fn parse_guide(&self, channel_id: &ChannelId, bytes: &[u8])
        -> Result<Vec<EpgEntry>, ParseError>;
}
