//! Process lifecycle: eager first refresh, then periodic refreshes

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::parser::{GuideParser, JsonParser};
use crate::refresh::RefreshOrchestrator;
use crate::scheduler::{Cadence, Job, Scheduler};
use crate::snapshot::SnapshotStore;
use crate::source::{DataSource, HttpDataSource};

/// Wires the orchestrator, its store and the scheduler together
pub struct Service {
    config: Config,
    orchestrator: Arc<RefreshOrchestrator>,
    scheduler: Scheduler,
}

impl Service {
    /// Build a service over an arbitrary source and parser
    ///
    /// Fails only when the configured cadence does not parse.
    pub fn new(
        config: Config,
        source: Arc<dyn DataSource>,
        parser: Arc<dyn GuideParser>,
    ) -> Result<Self> {
        let cadence = Cadence::parse(&config.refresh.cron)?;
        let orchestrator = Arc::new(RefreshOrchestrator::new(
            source,
            parser,
            SnapshotStore::new_arc(),
            config.refresh.max_concurrent,
        ));
        let job: Arc<dyn Job> = orchestrator.clone();
        let scheduler = Scheduler::new(cadence, job);

        Ok(Self {
            config,
            orchestrator,
            scheduler,
        })
    }

    /// Build a service over the HTTP source and JSON parser
    pub fn from_config(config: Config) -> Result<Self> {
        let source = Arc::new(HttpDataSource::new(&config.source)?);
        Self::new(config, source, Arc::new(JsonParser::new()))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared snapshot store for readers
    pub fn store(&self) -> Arc<SnapshotStore> {
        Arc::clone(self.orchestrator.store())
    }

    pub fn orchestrator(&self) -> &Arc<RefreshOrchestrator> {
        &self.orchestrator
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Listen address for the serving layer, unmodified
    pub fn server_address(&self) -> &str {
        &self.config.server.address
    }

    /// Run one refresh to completion, then arm the periodic trigger
    pub async fn start(&self) -> Result<()> {
        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            cadence = %self.scheduler.cadence(),
            max_concurrent = self.orchestrator.concurrency_limit(),
            server_address = %self.server_address(),
            "Starting epgsync"
        );

        // Goes through the scheduler so a tick can never overlap it.
        self.scheduler.trigger().wait().await;

        self.scheduler.start()?;
        Ok(())
    }

    /// Stop future ticks; an in-flight refresh is left to finish
    pub async fn stop(&self) -> Result<()> {
        self.scheduler.stop().await?;
        if self.scheduler.is_job_running() {
            tracing::info!("Refresh still in progress at shutdown");
        }
        tracing::info!("epgsync stopped");
        Ok(())
    }
}
