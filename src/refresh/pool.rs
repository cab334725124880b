//! Bounded fan-out/fan-in of per-channel guide fetches
//!
//! ```text
//!                    ┌──────────────┐
//!   channels ──────▶ │  task / ch   │──┐
//!   (one task each)  │  task / ch   │──┤  bounded mpsc   ┌───────────┐
//!                    │     ...      │──┼───────────────▶ │ collector │──▶ Vec<EpgEntry>
//!                    │  task / ch   │──┘                 └───────────┘
//!                    └──────┬───────┘
//!                           │ Semaphore(limit)
//! ```
//!
//! Every channel gets exactly one task. A counting semaphore caps how many run
//! at once. Each task owns a sender clone, so the aggregation channel closes
//! only after the last task is done; `fetch_all` additionally joins every task
//! handle before waiting on the collector, so completion never depends on
//! timing.

use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;

use crate::models::{Channel, ChannelId, EpgEntry};
use crate::parser::GuideParser;
use crate::source::DataSource;

/// Hard ceiling on concurrent guide fetches
pub const MAX_CONCURRENCY: usize = 16;

/// Default capacity of the aggregation channel
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Clamp a configured limit into `[1, MAX_CONCURRENCY]`
///
/// Zero means "unset" and resolves to the ceiling, as does anything above it.
pub fn clamp_concurrency(configured: usize) -> usize {
    if configured == 0 || configured > MAX_CONCURRENCY {
        MAX_CONCURRENCY
    } else {
        configured
    }
}

/// Step of a task at which it gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStage {
    /// Waiting for a concurrency slot
    Slot,
    /// Fetching guide bytes
    Fetch,
    /// Decoding guide bytes
    Parse,
    /// Handing entries to the collector
    Emit,
    /// Task panicked or was cancelled
    Join,
}

impl fmt::Display for TaskStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Slot => "slot",
            Self::Fetch => "fetch",
            Self::Parse => "parse",
            Self::Emit => "emit",
            Self::Join => "join",
        };
        f.write_str(s)
    }
}

/// Why one channel contributed nothing to a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFailure {
    pub channel_id: ChannelId,
    pub stage: TaskStage,
    pub reason: String,
}

/// Result of one per-channel task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Guide fetched and parsed; `entries` were emitted
    Fetched { channel_id: ChannelId, entries: usize },
    /// Task terminated early and emitted nothing
    Failed(ChannelFailure),
}

impl TaskOutcome {
    pub fn channel_id(&self) -> &ChannelId {
        match self {
            Self::Fetched { channel_id, .. } => channel_id,
            Self::Failed(failure) => &failure.channel_id,
        }
    }

    fn failed(channel_id: ChannelId, stage: TaskStage, reason: impl Into<String>) -> Self {
        Self::Failed(ChannelFailure {
            channel_id,
            stage,
            reason: reason.into(),
        })
    }
}

/// Aggregated result of [`BoundedFetchPool::fetch_all`]
#[derive(Debug, Default)]
pub struct PoolOutput {
    /// All entries, in arrival order
    pub entries: Vec<EpgEntry>,

    /// One outcome per input channel, in input order
    pub outcomes: Vec<TaskOutcome>,
}

impl PoolOutput {
    /// Failures, in input order
    pub fn failures(&self) -> Vec<ChannelFailure> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                TaskOutcome::Failed(failure) => Some(failure.clone()),
                TaskOutcome::Fetched { .. } => None,
            })
            .collect()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, TaskOutcome::Fetched { .. }))
            .count()
    }
}

/// Executes per-channel fetch+parse tasks under a concurrency ceiling
pub struct BoundedFetchPool {
    source: Arc<dyn DataSource>,
    parser: Arc<dyn GuideParser>,
    limit: usize,
    buffer_size: usize,
}

impl BoundedFetchPool {
    /// Create a pool; `concurrency_limit` is clamped with [`clamp_concurrency`]
    pub fn new(
        source: Arc<dyn DataSource>,
        parser: Arc<dyn GuideParser>,
        concurrency_limit: usize,
    ) -> Self {
        Self {
            source,
            parser,
            limit: clamp_concurrency(concurrency_limit),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Set the aggregation channel capacity
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Effective concurrency limit
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Fetch and parse the guide of every channel, returning once all tasks
    /// have finished and the aggregation stream is drained
    pub async fn fetch_all(&self, channels: &[Channel]) -> PoolOutput {
        tracing::info!(
            channels = channels.len(),
            limit = self.limit,
            "Starting guide fan-out"
        );

        let (entry_tx, mut entry_rx) = mpsc::channel::<EpgEntry>(self.buffer_size);
        let semaphore = Arc::new(Semaphore::new(self.limit));

        let collector = tokio::spawn(async move {
            let mut entries = Vec::new();
            while let Some(entry) = entry_rx.recv().await {
                entries.push(entry);
            }
            entries
        });

        let (channel_ids, handles): (Vec<ChannelId>, Vec<JoinHandle<TaskOutcome>>) = channels
            .iter()
            .map(|channel| {
                let channel_id = channel.channel_id.clone();
                let handle = tokio::spawn(fetch_channel(
                    channel_id.clone(),
                    Arc::clone(&self.source),
                    Arc::clone(&self.parser),
                    Arc::clone(&semaphore),
                    entry_tx.clone(),
                ));
                (channel_id, handle)
            })
            .unzip();

        // Only task-owned senders remain; the stream closes when the last task ends.
        drop(entry_tx);

        let outcomes: Vec<TaskOutcome> = channel_ids
            .into_iter()
            .zip(futures::future::join_all(handles).await)
            .map(|(channel_id, joined)| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(channel_id = %channel_id, error = %e, "Guide task aborted");
                    TaskOutcome::failed(channel_id, TaskStage::Join, e.to_string())
                }
            })
            .collect();
        debug_assert_eq!(outcomes.len(), channels.len());

        let entries = match collector.await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(error = %e, "Guide collector aborted");
                Vec::new()
            }
        };

        let output = PoolOutput { entries, outcomes };
        tracing::info!(
            entries = output.entries.len(),
            succeeded = output.succeeded(),
            failed = output.outcomes.len() - output.succeeded(),
            "Guide fan-in complete"
        );
        output
    }
}

/// One channel's task: take a slot, fetch, parse, emit
async fn fetch_channel(
    channel_id: ChannelId,
    source: Arc<dyn DataSource>,
    parser: Arc<dyn GuideParser>,
    semaphore: Arc<Semaphore>,
    entry_tx: mpsc::Sender<EpgEntry>,
) -> TaskOutcome {
    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(e) => {
            tracing::error!(channel_id = %channel_id, error = %e, "No fetch slot");
            return TaskOutcome::failed(channel_id, TaskStage::Slot, e.to_string());
        }
    };

    tracing::debug!(channel_id = %channel_id, "Fetching guide");

    let bytes = match source.fetch_guide(&channel_id).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(
                channel_id = %channel_id,
                error = %e,
                recoverable = e.is_recoverable(),
                "Guide fetch failed"
            );
            return TaskOutcome::failed(channel_id, TaskStage::Fetch, e.to_string());
        }
    };

    let entries = match parser.parse_guide(&channel_id, &bytes) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!(channel_id = %channel_id, error = %e, "Guide parse failed");
            return TaskOutcome::failed(channel_id, TaskStage::Parse, e.to_string());
        }
    };

    let count = entries.len();
    for entry in entries {
        if entry_tx.send(entry).await.is_err() {
            tracing::error!(channel_id = %channel_id, "Collector closed before guide was emitted");
            return TaskOutcome::failed(channel_id, TaskStage::Emit, "collector closed");
        }
    }

    tracing::debug!(channel_id = %channel_id, entries = count, "Guide fetched");
    TaskOutcome::Fetched {
        channel_id,
        entries: count,
    }
}
