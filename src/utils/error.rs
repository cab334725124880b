//! Error types for the data source and parser collaborators
//!
//! This module defines the errors a refresh run can hit while talking to the
//! upstream data source and while decoding what it returned.

use thiserror::Error;

/// Errors that can occur while fetching raw bytes from the data source
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Upstream returned status {0}")]
    Status(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Maximum retry attempts exceeded
    #[error("Maximum retry attempts exceeded (last status: {last_status:?})")]
    MaxRetriesExceeded { last_status: Option<u16> },

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Source could not serve the request for another reason
    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    /// Check if the failure is worth retrying on a later run
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout | Self::MaxRetriesExceeded { .. } => true,
            Self::Status(code) => matches!(code, 429 | 500..=599),
            Self::InvalidUrl(_) => false,
            Self::Unavailable(_) => true,
        }
    }
}

/// Errors that can occur while decoding directory or guide bytes
#[derive(Error, Debug)]
pub enum ParseError {
    /// Payload is not valid JSON or does not match the record layout
    #[error("Malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field is missing or empty
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    /// A timestamp could not be interpreted
    #[error("Invalid time value '{0}'")]
    InvalidTime(String),

    /// The payload has neither a bare array nor a known wrapper key
    #[error("Unexpected payload shape: {0}")]
    UnexpectedShape(String),
}
