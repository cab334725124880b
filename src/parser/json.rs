//! JSON payload parser
//!
//! Accepts either a bare array of records or an object wrapping the array
//! under one of a few well-known keys. Field names are matched leniently
//! (`channelId`, `channel_id`, `id`, ...) since upstreams differ.

use serde::Deserialize;
use serde_json::Value;

use super::time::parse_time;
use super::GuideParser;
use crate::models::{Channel, ChannelId, EpgEntry};
use crate::utils::error::ParseError;

const DIRECTORY_KEYS: &[&str] = &["channels", "data", "items"];
const GUIDE_KEYS: &[&str] = &["programs", "programmes", "epg", "data", "items"];

#[derive(Debug, Deserialize)]
struct WireChannel {
    #[serde(alias = "channelId", alias = "channelID", alias = "id")]
    channel_id: Option<Value>,
    #[serde(alias = "channelName", alias = "title")]
    name: Option<String>,
    #[serde(alias = "logo", alias = "logoUrl", alias = "icon")]
    logo_url: Option<String>,
    #[serde(alias = "groupTitle", alias = "category")]
    group: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireProgram {
    #[serde(alias = "channelId", alias = "channelID", alias = "channel")]
    channel_id: Option<Value>,
    #[serde(alias = "programName", alias = "name")]
    title: Option<String>,
    #[serde(alias = "startTime", alias = "beginTime", alias = "start_time")]
    start: Option<Value>,
    #[serde(alias = "endTime", alias = "stop", alias = "end_time")]
    end: Option<Value>,
    #[serde(alias = "desc", alias = "summary")]
    description: Option<String>,
}

/// `serde_json` implementation of [`GuideParser`]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl JsonParser {
    pub fn new() -> Self {
        Self
    }
}

impl GuideParser for JsonParser {
    fn parse_channels(&self, bytes: &[u8]) -> Result<Vec<Channel>, ParseError> {
        let items = unwrap_array(serde_json::from_slice(bytes)?, DIRECTORY_KEYS)?;

        items
            .into_iter()
            .map(|item| {
                let wire: WireChannel = serde_json::from_value(item)?;
                let channel_id = wire
                    .channel_id
                    .as_ref()
                    .and_then(id_from_value)
                    .ok_or(ParseError::MissingField("channel_id"))?;
                Ok(Channel {
                    name: non_empty(wire.name).unwrap_or_else(|| channel_id.to_string()),
                    channel_id,
                    logo_url: non_empty(wire.logo_url),
                    group: non_empty(wire.group),
                })
            })
            .collect()
    }

    fn parse_guide(
        &self,
        channel_id: &ChannelId,
        bytes: &[u8],
    ) -> Result<Vec<EpgEntry>, ParseError> {
        let items = unwrap_array(serde_json::from_slice(bytes)?, GUIDE_KEYS)?;

        items
            .into_iter()
            .map(|item| {
                let wire: WireProgram = serde_json::from_value(item)?;
                let title = non_empty(wire.title).ok_or(ParseError::MissingField("title"))?;
                let start = parse_time(
                    wire.start
                        .as_ref()
                        .ok_or(ParseError::MissingField("start"))?,
                )?;
                let end = parse_time(wire.end.as_ref().ok_or(ParseError::MissingField("end"))?)?;
                Ok(EpgEntry {
                    channel_id: wire
                        .channel_id
                        .as_ref()
                        .and_then(id_from_value)
                        .unwrap_or_else(|| channel_id.clone()),
                    title,
                    start,
                    end,
                    description: non_empty(wire.description),
                })
            })
            .collect()
    }
}

/// Extract the record array from a bare array or a known wrapper object
fn unwrap_array(value: Value, keys: &[&str]) -> Result<Vec<Value>, ParseError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            for key in keys {
                match map.remove(*key) {
                    Some(Value::Array(items)) => return Ok(items),
                    Some(Value::Null) => return Ok(Vec::new()),
                    Some(other) => {
                        return Err(ParseError::UnexpectedShape(format!(
                            "'{key}' is {}, expected an array",
                            kind(&other)
                        )))
                    }
                    None => continue,
                }
            }
            Err(ParseError::UnexpectedShape(format!(
                "object without any of {keys:?}"
            )))
        }
        other => Err(ParseError::UnexpectedShape(format!(
            "top level is {}",
            kind(&other)
        ))),
    }
}

fn id_from_value(value: &Value) -> Option<ChannelId> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(ChannelId::new(s.trim())),
        Value::Number(n) => Some(ChannelId::new(n.to_string())),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
