//! Periodic refresh scheduling
//!
//! # Overview
//!
//! A [`Scheduler`] owns a [`Cadence`] and a single [`Job`]. Once started, a
//! background tick loop sleeps until the next fire time and launches the job.
//! At most one invocation runs at a time: a tick that fires while the previous
//! invocation is still executing is skipped, not queued.
//!
//! ```text
//!   cadence ──▶ tick loop ──▶ run flag set? ──yes──▶ skip (counted)
//!                                  │
//!                                  no
//!                                  ▼
//!                            spawn job task ──▶ flag cleared on exit
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use epgsync::scheduler::{Job, Scheduler};
//!
//! # async fn demo(job: Arc<dyn Job>) -> anyhow::Result<()> {
//! let scheduler = Scheduler::from_expression("0 */6 * * *", job)?;
//! scheduler.trigger().wait().await;
//! scheduler.start()?;
//! // ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod cadence;
pub mod error;
pub mod trigger;

pub use cadence::Cadence;
pub use error::{SchedulerError, SchedulerResult};
pub use trigger::{Job, Scheduler, TickOutcome, TickStats, TickStatsSnapshot};
