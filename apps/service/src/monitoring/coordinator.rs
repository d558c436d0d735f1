use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::checker::Prober;
use super::persister::ResultPersister;
use super::scheduler::BatchScheduler;
use super::types::RunSummary;
use crate::database::{Store, StoreError};

#[derive(Debug, Error)]
pub enum RunError {
    /// Nothing can be checked without the monitor list
    #[error("Failed to load monitors: {0}")]
    LoadMonitors(#[source] StoreError),
}

/// Runs one full check cycle over every monitor
pub struct RunCoordinator {
    store: Arc<dyn Store>,
    scheduler: BatchScheduler,
    persister: ResultPersister,
}

impl RunCoordinator {
    pub fn new(store: Arc<dyn Store>, prober: Arc<dyn Prober>, batch_size: usize) -> Self {
        Self {
            scheduler: BatchScheduler::new(prober, batch_size),
            persister: ResultPersister::new(Arc::clone(&store)),
            store,
        }
    }

    /// Probe and persist every monitor, one batch at a time.
    ///
    /// Probe and persistence failures are folded into the summary counts;
    /// only failing to load the monitor list is an error.
    pub async fn run_cycle(&self) -> Result<RunSummary, RunError> {
        let monitors = self.store.list_monitors().await.map_err(RunError::LoadMonitors)?;

        info!(
            monitors = monitors.len(),
            batch_size = self.scheduler.batch_size(),
            "Starting check cycle"
        );

        let mut summary = RunSummary {
            total_monitors: monitors.len(),
            results: Some(Vec::with_capacity(monitors.len())),
            ..RunSummary::default()
        };

        for (index, batch) in self.scheduler.partition(&monitors).enumerate() {
            debug!(batch = index, batch_size = batch.len(), "Probing batch");

            let outcomes = self.scheduler.probe_batch(batch).await;
            let dropped = batch.len() - outcomes.len();
            if dropped > 0 {
                warn!(batch = index, dropped, "Some probes did not settle and were not recorded");
            }
            summary.dropped += dropped;

            match self.persister.persist_batch(index, &outcomes).await {
                Ok(persisted) => {
                    summary.checked += persisted.len();
                    if let Some(results) = summary.results.as_mut() {
                        results.extend(persisted);
                    }
                }
                Err(_) => summary.failed += outcomes.len(),
            }
        }

        info!(
            total_monitors = summary.total_monitors,
            checked = summary.checked,
            failed = summary.failed,
            dropped = summary.dropped,
            "Check cycle finished"
        );

        Ok(summary)
    }
}
