//! Periodic job trigger with skip-if-still-running
//!
//! The tick loop sleeps until the cadence's next fire time and then attempts
//! to launch the job. An atomic run-in-progress flag guards the launch: a tick
//! that finds the flag set is dropped, never queued. The flag is cleared by a
//! drop guard owned by the job task, so a panicking job releases it too.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::cadence::Cadence;
use super::error::{SchedulerError, SchedulerResult};

/// Work driven by the [`Scheduler`]
#[async_trait]
pub trait Job: Send + Sync + 'static {
    /// Name used in log fields
    fn name(&self) -> &str {
        "job"
    }

    /// Execute once. Errors are logged by the scheduler and never stop it.
    async fn execute(&self) -> crate::error::Result<()>;
}

/// What a single tick did
#[derive(Debug)]
pub enum TickOutcome {
    /// Job launched; the handle resolves when it finishes
    Launched(JoinHandle<()>),
    /// Previous invocation still running, tick dropped
    Skipped,
}

impl TickOutcome {
    pub fn is_launched(&self) -> bool {
        matches!(self, Self::Launched(_))
    }

    /// Wait for a launched job to finish; no-op for a skipped tick
    pub async fn wait(self) {
        if let Self::Launched(handle) = self {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Scheduled job task aborted");
            }
        }
    }
}

/// Tick counters
#[derive(Debug, Default)]
pub struct TickStats {
    pub launched: AtomicU64,
    pub skipped: AtomicU64,
    pub failed: AtomicU64,
}

/// Snapshot of tick counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStatsSnapshot {
    pub launched: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl TickStats {
    pub fn snapshot(&self) -> TickStatsSnapshot {
        TickStatsSnapshot {
            launched: self.launched.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Clears the run-in-progress flag when the job task ends
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// State shared between the scheduler handle and its tick loop
struct Inner {
    job: Arc<dyn Job>,
    running: Arc<AtomicBool>,
    stats: Arc<TickStats>,
}

impl Inner {
    fn tick(&self) -> TickOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.stats.skipped.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(job = self.job.name(), "Previous run still in progress, skipping tick");
            return TickOutcome::Skipped;
        }

        self.stats.launched.fetch_add(1, Ordering::Relaxed);
        let guard = RunGuard(Arc::clone(&self.running));
        let job = Arc::clone(&self.job);
        let stats = Arc::clone(&self.stats);

        let handle = tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = job.execute().await {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    job = job.name(),
                    error = %e,
                    category = e.category().as_str(),
                    recoverable = e.is_recoverable(),
                    "Scheduled job failed"
                );
            }
        });

        TickOutcome::Launched(handle)
    }
}

struct LoopHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Cadence-driven trigger for a single [`Job`]
pub struct Scheduler {
    cadence: Cadence,
    inner: Arc<Inner>,
    tick_loop: Mutex<Option<LoopHandle>>,
}

impl Scheduler {
    /// Create a scheduler; nothing fires until [`start`](Self::start)
    pub fn new(cadence: Cadence, job: Arc<dyn Job>) -> Self {
        Self {
            cadence,
            inner: Arc::new(Inner {
                job,
                running: Arc::new(AtomicBool::new(false)),
                stats: Arc::new(TickStats::default()),
            }),
            tick_loop: Mutex::new(None),
        }
    }

    /// Parse `expression` and create a scheduler
    pub fn from_expression(expression: &str, job: Arc<dyn Job>) -> SchedulerResult<Self> {
        Ok(Self::new(Cadence::parse(expression)?, job))
    }

    pub fn cadence(&self) -> &Cadence {
        &self.cadence
    }

    /// Arm the periodic trigger
    pub fn start(&self) -> SchedulerResult<()> {
        let mut slot = self.tick_loop.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            return Err(SchedulerError::AlreadyStarted);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(tick_loop(
            self.cadence.clone(),
            Arc::clone(&self.inner),
            stop_rx,
        ));
        *slot = Some(LoopHandle { stop_tx, task });

        tracing::info!(job = self.inner.job.name(), cadence = %self.cadence, "Scheduler started");
        Ok(())
    }

    /// Halt future ticks and wait for the tick loop to exit
    ///
    /// An in-flight job keeps running; use [`is_job_running`](Self::is_job_running)
    /// to observe it.
    pub async fn stop(&self) -> SchedulerResult<()> {
        let handle = self
            .tick_loop
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or(SchedulerError::NotStarted)?;

        // The loop also exits when the sender is gone, so a failed send is fine.
        let _ = handle.stop_tx.send(true);
        handle.task.await.map_err(|e| SchedulerError::LoopFailed {
            reason: e.to_string(),
        })?;

        tracing::info!(job = self.inner.job.name(), "Scheduler stopped");
        Ok(())
    }

    /// Attempt one invocation now, under the same skip-if-running guard
    pub fn trigger(&self) -> TickOutcome {
        self.inner.tick()
    }

    /// Whether the tick loop is armed
    pub fn is_started(&self) -> bool {
        self.tick_loop
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Whether a job invocation is currently executing
    pub fn is_job_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> TickStatsSnapshot {
        self.inner.stats.snapshot()
    }
}

async fn tick_loop(cadence: Cadence, inner: Arc<Inner>, mut stop_rx: watch::Receiver<bool>) {
    loop {
        let Some(delay) = cadence.delay_from(Utc::now()) else {
            tracing::warn!(cadence = %cadence, "Cadence has no upcoming fire time, stopping");
            break;
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                // The handle is dropped; the job task runs detached.
                let _ = inner.tick();
            }
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
        }
    }
}
