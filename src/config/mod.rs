//! Configuration management for epgsync
//!
//! Settings come from a TOML file, with `EPGSYNC_*` environment variables
//! layered on top. Every section has defaults, so a partial file is valid.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::refresh::pool::clamp_concurrency;
use crate::scheduler::Cadence;

/// Placeholder substituted with the channel identifier in `guide_url`
pub const CHANNEL_ID_PLACEHOLDER: &str = "{channel_id}";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Refresh cadence and fan-out settings
    pub refresh: RefreshConfig,

    /// Address handed to the serving layer
    pub server: ServerConfig,

    /// Upstream data source
    pub source: SourceConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Refresh pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Cron expression or `@every <duration>` for the scheduler
    pub cron: String,

    /// Maximum number of concurrent guide fetches (0 means the ceiling)
    pub max_concurrent: usize,
}

/// Serving layer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, passed through unmodified
    pub address: String,
}

/// Upstream data source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Channel directory endpoint
    pub directory_url: String,

    /// Guide endpoint template containing `{channel_id}`
    pub guide_url: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Retries on retryable statuses
    pub max_retries: u32,

    /// Rate limit (requests per second)
    pub requests_per_second: u32,

    /// User agent string
    pub user_agent: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            cron: String::from("0 */6 * * *"),
            max_concurrent: 16,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::from("0.0.0.0:8080"),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            directory_url: String::from("http://127.0.0.1:8000/channels"),
            guide_url: String::from("http://127.0.0.1:8000/epg/{channel_id}"),
            request_timeout_secs: 30,
            max_retries: 2,
            requests_per_second: 20,
            user_agent: format!("epgsync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from defaults plus environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from an optional file, then apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Override fields from `EPGSYNC_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_var("EPGSYNC_CRON") {
            self.refresh.cron = v;
        }
        if let Some(v) = env_var("EPGSYNC_MAX_CONCURRENT") {
            self.refresh.max_concurrent = v
                .parse()
                .with_context(|| format!("EPGSYNC_MAX_CONCURRENT is not a number: {v}"))?;
        }
        if let Some(v) = env_var("EPGSYNC_SERVER_ADDRESS") {
            self.server.address = v;
        }
        if let Some(v) = env_var("EPGSYNC_DIRECTORY_URL") {
            self.source.directory_url = v;
        }
        if let Some(v) = env_var("EPGSYNC_GUIDE_URL") {
            self.source.guide_url = v;
        }
        if let Some(v) = env_var("EPGSYNC_REQUEST_TIMEOUT") {
            self.source.request_timeout_secs = v
                .parse()
                .with_context(|| format!("EPGSYNC_REQUEST_TIMEOUT is not a number: {v}"))?;
        }
        if let Some(v) = env_var("EPGSYNC_MAX_RETRIES") {
            self.source.max_retries = v
                .parse()
                .with_context(|| format!("EPGSYNC_MAX_RETRIES is not a number: {v}"))?;
        }
        if let Some(v) = env_var("EPGSYNC_RATE_LIMIT") {
            self.source.requests_per_second = v
                .parse()
                .with_context(|| format!("EPGSYNC_RATE_LIMIT is not a number: {v}"))?;
        }
        if let Some(v) = env_var("EPGSYNC_USER_AGENT") {
            self.source.user_agent = v;
        }
        if let Some(v) = env_var("EPGSYNC_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env_var("EPGSYNC_LOG_FORMAT") {
            self.logging.format = v;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        Cadence::parse(&self.refresh.cron).context("refresh.cron is not a valid cadence")?;

        url::Url::parse(&self.source.directory_url)
            .with_context(|| format!("Invalid directory_url: {}", self.source.directory_url))?;

        if !self.source.guide_url.contains(CHANNEL_ID_PLACEHOLDER) {
            anyhow::bail!("guide_url must contain {CHANNEL_ID_PLACEHOLDER}");
        }
        url::Url::parse(&self.source.guide_url.replace(CHANNEL_ID_PLACEHOLDER, "probe"))
            .with_context(|| format!("Invalid guide_url: {}", self.source.guide_url))?;

        if self.source.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if self.source.requests_per_second == 0 {
            anyhow::bail!("requests_per_second must be greater than 0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!(
                "logging.format must be 'text' or 'json', got '{}'",
                self.logging.format
            );
        }

        Ok(())
    }

    /// Effective guide fetch concurrency after clamping
    #[must_use]
    pub fn effective_concurrency(&self) -> usize {
        clamp_concurrency(self.refresh.max_concurrent)
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.request_timeout_secs)
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
