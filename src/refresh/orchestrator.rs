//! One refresh cycle: directory phase, then EPG phase
//!
//! The directory phase fetches, parses and publishes the channel list. The
//! EPG phase fans guide fetches out over the published channel snapshot and
//! publishes the aggregate once every task is accounted for. A failed
//! directory phase skips the EPG phase and leaves both snapshots untouched.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::pool::{BoundedFetchPool, ChannelFailure};
use crate::error::{Error, Result};
use crate::parser::GuideParser;
use crate::scheduler::Job;
use crate::snapshot::SnapshotStore;
use crate::source::DataSource;
use crate::utils::format_elapsed;

/// Result of the EPG phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpgPhaseReport {
    /// Channels the phase fanned out over
    pub channels: usize,

    /// Entries published
    pub entries: usize,

    /// Channels that contributed nothing
    pub failed: Vec<ChannelFailure>,

    /// Version of the published guide snapshot
    pub version: u64,
}

/// Observable result of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReport {
    /// Directory fetch or parse failed; nothing was published
    DirectoryFailed { reason: String, elapsed: Duration },

    /// Channels were published, but the EPG phase could not start
    EpgSkipped {
        channels: usize,
        reason: String,
        elapsed: Duration,
    },

    /// Both snapshots were published
    Completed {
        epg: EpgPhaseReport,
        elapsed: Duration,
    },
}

impl RunReport {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Per-channel failures of a completed run
    pub fn failures(&self) -> &[ChannelFailure] {
        match self {
            Self::Completed { epg, .. } => &epg.failed,
            _ => &[],
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            Self::DirectoryFailed { elapsed, .. }
            | Self::EpgSkipped { elapsed, .. }
            | Self::Completed { elapsed, .. } => *elapsed,
        }
    }

    /// One-line summary for CLI output
    pub fn summary(&self) -> String {
        match self {
            Self::DirectoryFailed { reason, elapsed } => format!(
                "refresh aborted after {}: channel directory failed: {reason}",
                format_elapsed(*elapsed)
            ),
            Self::EpgSkipped {
                channels,
                reason,
                elapsed,
            } => format!(
                "refresh published {channels} channels but skipped guides after {}: {reason}",
                format_elapsed(*elapsed)
            ),
            Self::Completed { epg, elapsed } => format!(
                "refresh completed in {}: {} channels, {} guide entries, {} failed channels",
                format_elapsed(*elapsed),
                epg.channels,
                epg.entries,
                epg.failed.len()
            ),
        }
    }
}

/// Runs refresh cycles against a data source and publishes into a store
pub struct RefreshOrchestrator {
    source: Arc<dyn DataSource>,
    parser: Arc<dyn GuideParser>,
    store: Arc<SnapshotStore>,
    pool: BoundedFetchPool,
}

impl RefreshOrchestrator {
    pub fn new(
        source: Arc<dyn DataSource>,
        parser: Arc<dyn GuideParser>,
        store: Arc<SnapshotStore>,
        concurrency_limit: usize,
    ) -> Self {
        let pool = BoundedFetchPool::new(
            Arc::clone(&source),
            Arc::clone(&parser),
            concurrency_limit,
        );
        Self {
            source,
            parser,
            store,
            pool,
        }
    }

    /// Store this orchestrator publishes into
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Effective guide fetch concurrency
    pub fn concurrency_limit(&self) -> usize {
        self.pool.limit()
    }

    /// Run one full cycle. Never fails; every error ends up in the log and
    /// the returned report.
    pub async fn run(&self) -> RunReport {
        let started = Instant::now();

        if let Err(e) = self.refresh_channels().await {
            tracing::error!(
                error = %e,
                category = e.category().as_str(),
                recoverable = e.is_recoverable(),
                "Channel refresh failed, skipping EPG phase"
            );
            return RunReport::DirectoryFailed {
                reason: e.to_string(),
                elapsed: started.elapsed(),
            };
        }

        match self.refresh_epgs().await {
            Ok(epg) => {
                let report = RunReport::Completed {
                    epg,
                    elapsed: started.elapsed(),
                };
                tracing::info!(summary = %report.summary(), "Refresh run finished");
                report
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    category = e.category().as_str(),
                    recoverable = e.is_recoverable(),
                    "EPG phase aborted"
                );
                RunReport::EpgSkipped {
                    channels: self.store.load_channels().map_or(0, |c| c.items.len()),
                    reason: e.to_string(),
                    elapsed: started.elapsed(),
                }
            }
        }
    }

    /// Directory phase: fetch, parse and publish the channel list
    pub async fn refresh_channels(&self) -> Result<usize> {
        tracing::info!("Fetching channels");

        let bytes = self.source.fetch_directory().await?;
        let channels = self.parser.parse_channels(&bytes)?;

        let count = channels.len();
        let version = self.store.publish_channels(channels);
        tracing::info!(channels = count, version, "Published channels");

        Ok(count)
    }

    /// EPG phase: fan out over the channel snapshot and publish the aggregate
    ///
    /// Fetches the directory first when no channel snapshot exists; a failure
    /// there aborts the phase the same way a failed directory phase does.
    pub async fn refresh_epgs(&self) -> Result<EpgPhaseReport> {
        tracing::info!("Fetching EPGs");

        let channels = match self.store.load_channels() {
            Some(channels) => channels,
            None => {
                tracing::info!("Channel snapshot unset, fetching channels first");
                if let Err(e) = self.refresh_channels().await {
                    tracing::error!(
                        error = %e,
                        category = e.category().as_str(),
                        "Fallback channel refresh failed, skipping EPG phase"
                    );
                    return Err(e);
                }
                self.store
                    .load_channels()
                    .ok_or_else(|| Error::other("channel snapshot unset after publish"))?
            }
        };

        let output = self.pool.fetch_all(&channels.items).await;
        let failed = output.failures();
        let entries = output.entries.len();

        let version = self.store.publish_epgs(output.entries);
        tracing::info!(
            entries,
            failed_channels = failed.len(),
            version,
            "Published EPGs"
        );

        Ok(EpgPhaseReport {
            channels: channels.items.len(),
            entries,
            failed,
            version,
        })
    }
}

#[async_trait]
impl Job for RefreshOrchestrator {
    fn name(&self) -> &str {
        "refresh"
    }

    async fn execute(&self) -> Result<()> {
        self.run().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChannelId;
    use crate::refresh::pool::TaskStage;

    #[test]
    fn test_report_summary() {
        let report = RunReport::Completed {
            epg: EpgPhaseReport {
                channels: 3,
                entries: 4,
                failed: vec![ChannelFailure {
                    channel_id: ChannelId::new("b"),
                    stage: TaskStage::Fetch,
                    reason: "timeout".to_string(),
                }],
                version: 1,
            },
            elapsed: Duration::from_millis(120),
        };
        assert!(report.is_completed());
        assert_eq!(report.failures().len(), 1);
        assert_eq!(
            report.summary(),
            "refresh completed in 120ms: 3 channels, 4 guide entries, 1 failed channels"
        );
    }

    #[test]
    fn test_directory_failed_has_no_failures() {
        let report = RunReport::DirectoryFailed {
            reason: "boom".to_string(),
            elapsed: Duration::from_secs(2),
        };
        assert!(!report.is_completed());
        assert!(report.failures().is_empty());
        assert!(report.summary().contains("boom"));
    }
}
