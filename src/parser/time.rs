//! Timestamp decoding for guide payloads
//!
//! Upstreams disagree on time formats. Accepted forms:
//! - RFC 3339 strings (`2024-01-15T10:00:00+09:00`)
//! - XMLTV-style compact strings, optionally with an offset (`20240115100000 +0900`)
//! - Unix timestamps in seconds or milliseconds, as numbers or numeric strings

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::utils::error::ParseError;

/// Anything above this is treated as milliseconds (year 5138 in seconds)
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Decode a JSON time value into UTC
pub fn parse_time(value: &Value) -> Result<DateTime<Utc>, ParseError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(from_unix)
            .ok_or_else(|| ParseError::InvalidTime(n.to_string())),
        Value::String(s) => parse_time_str(s),
        other => Err(ParseError::InvalidTime(other.to_string())),
    }
}

/// Decode a textual time value into UTC
pub fn parse_time_str(raw: &str) -> Result<DateTime<Utc>, ParseError> {
    let s = raw.trim();
    let invalid = || ParseError::InvalidTime(raw.to_string());

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        if s.len() == 14 {
            let naive = NaiveDateTime::parse_from_str(s, "%Y%m%d%H%M%S").map_err(|_| invalid())?;
            return Ok(Utc.from_utc_datetime(&naive));
        }
        return s.parse::<i64>().ok().and_then(from_unix).ok_or_else(invalid);
    }

    if let Some((stamp, offset)) = s.split_once(' ') {
        let naive =
            NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S").map_err(|_| invalid())?;
        let offset = parse_offset(offset).ok_or_else(invalid)?;
        let local = offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(invalid)?;
        return Ok(local.with_timezone(&Utc));
    }

    Err(invalid())
}

fn from_unix(ts: i64) -> Option<DateTime<Utc>> {
    if ts.abs() >= MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(ts)
    } else {
        DateTime::from_timestamp(ts, 0)
    }
}

/// Parse `+0900` / `-0530` style offsets
fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    let (sign, digits) = match (raw.strip_prefix('+'), raw.strip_prefix('-')) {
        (Some(digits), _) => (1, digits),
        (None, Some(digits)) => (-1, digits),
        (None, None) => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits.get(..2)?.parse().ok()?;
    let minutes: i32 = digits.get(2..)?.parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
