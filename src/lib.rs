//! epgsync - Periodic channel directory and EPG refresher
//!
//! Keeps an in-memory, always-consistent snapshot of a channel directory and
//! the program guide of every channel in it, refreshed on a cron cadence.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`source`] - Upstream byte sources (HTTP with rate limiting and retries)
//! - [`parser`] - Directory and guide payload decoding
//! - [`models`] - Core data structures and types
//! - [`snapshot`] - Atomically published channel and guide snapshots
//! - [`refresh`] - Refresh cycle and bounded guide fan-out
//! - [`scheduler`] - Cron-driven trigger with skip-if-still-running
//! - [`service`] - Process lifecycle
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use epgsync::config::Config;
//! use epgsync::service::Service;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let service = Service::from_config(config)?;
//!     service.start().await?;
//!     let store = service.store();
//!     if let Some(channels) = store.load_channels() {
//!         println!("{} channels", channels.items.len());
//!     }
//!     service.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod parser;
pub mod refresh;
pub mod scheduler;
pub mod service;
pub mod snapshot;
pub mod source;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{Channel, ChannelId, EpgEntry};
    pub use crate::parser::{GuideParser, JsonParser};
    pub use crate::refresh::{BoundedFetchPool, RefreshOrchestrator, RunReport};
    pub use crate::scheduler::{Cadence, Job, Scheduler};
    pub use crate::service::Service;
    pub use crate::snapshot::SnapshotStore;
    pub use crate::source::{DataSource, HttpDataSource};
}

// Direct re-exports for convenience
pub use models::{Channel, ChannelId, EpgEntry};
pub use snapshot::SnapshotStore;
