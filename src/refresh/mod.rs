//! Refresh pipeline
//!
//! - [`orchestrator`] - One full cycle: directory phase, then EPG phase
//! - [`pool`] - Bounded per-channel fan-out and single-collector fan-in

pub mod orchestrator;
pub mod pool;

pub use orchestrator::{EpgPhaseReport, RefreshOrchestrator, RunReport};
pub use pool::{
    clamp_concurrency, BoundedFetchPool, ChannelFailure, PoolOutput, TaskOutcome, TaskStage,
    MAX_CONCURRENCY,
};
