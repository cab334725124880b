//! HTTP data source with rate limiting and retries
//!
//! Fetches the directory and per-channel guides over HTTP:
//! - Rate limiting with governor
//! - Retry with exponential backoff on transient statuses
//! - Per-request transport timeout

use async_trait::async_trait;
use bytes::Bytes;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT},
    Client,
};
use std::num::NonZeroU32;
use std::time::Duration;

use super::DataSource;
use crate::config::{SourceConfig, CHANNEL_ID_PLACEHOLDER};
use crate::models::ChannelId;
use crate::utils::error::FetchError;
use crate::utils::retry::RetryConfig;

/// HTTP implementation of [`DataSource`]
pub struct HttpDataSource {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter shared by directory and guide requests
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    retry: RetryConfig,

    directory_url: String,

    /// Guide URL template containing `{channel_id}`
    guide_url: String,

    user_agent: String,
}

impl HttpDataSource {
    /// Create a data source from the `[source]` configuration section
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created and
    /// `FetchError::InvalidUrl` if the guide template lacks `{channel_id}`
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        Self::with_retry(
            config,
            RetryConfig::new(config.max_retries),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Create a data source with an explicit retry policy and timeout
    pub fn with_retry(
        config: &SourceConfig,
        retry: RetryConfig,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        if !config.guide_url.contains(CHANNEL_ID_PLACEHOLDER) {
            return Err(FetchError::InvalidUrl(config.guide_url.clone()));
        }

        let client = Client::builder().timeout(timeout).gzip(true).build()?;

        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            rate_limiter,
            retry,
            directory_url: config.directory_url.clone(),
            guide_url: config.guide_url.clone(),
            user_agent: config.user_agent.clone(),
        })
    }

    /// Resolve the guide URL of one channel
    pub fn guide_url_for(&self, channel_id: &ChannelId) -> String {
        self.guide_url
            .replace(CHANNEL_ID_PLACEHOLDER, &encode_path_segment(channel_id.as_str()))
    }

    /// GET a URL with rate limiting and retries, returning the body bytes
    async fn get_bytes(&self, url: &str) -> Result<Bytes, FetchError> {
        let mut last_status = None;

        for attempt in 0..=self.retry.max_retries {
            if attempt > 0 {
                let delay = self.retry.delay_for(attempt);
                tracing::debug!(url = %url, attempt, delay_ms = delay.as_millis() as u64, "Retrying request");
                tokio::time::sleep(delay).await;
            }

            self.rate_limiter.until_ready().await;

            match self.client.get(url).headers(self.build_headers()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response.bytes().await?);
                    } else if RetryConfig::should_retry(status.as_u16()) {
                        last_status = Some(status.as_u16());
                        continue;
                    } else {
                        return Err(FetchError::Status(status.as_u16()));
                    }
                }
                Err(e) if e.is_timeout() => return Err(FetchError::Timeout),
                Err(e) => return Err(FetchError::Http(e)),
            }
        }

        Err(FetchError::MaxRetriesExceeded { last_status })
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, value);
        }
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain;q=0.9, */*;q=0.8"),
        );
        headers
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch_directory(&self) -> Result<Bytes, FetchError> {
        tracing::debug!(url = %self.directory_url, "Fetching channel directory");
        self.get_bytes(&self.directory_url).await
    }

    async fn fetch_guide(&self, channel_id: &ChannelId) -> Result<Bytes, FetchError> {
        let url = self.guide_url_for(channel_id);
        tracing::debug!(channel_id = %channel_id, url = %url, "Fetching guide");
        self.get_bytes(&url).await
    }
}

/// Everything outside the RFC 3986 unreserved set
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}
