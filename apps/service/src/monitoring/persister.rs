use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use super::types::{BatchOutcome, MonitorRunResult};
use crate::database::{MonitorStatus, NewCheck, Store, StoreError, StoreTransaction};

/// Writes one batch of outcomes atomically
pub struct ResultPersister {
    store: Arc<dyn Store>,
}

impl ResultPersister {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Insert one check per outcome and move each monitor to `up` or `down`,
    /// all inside one transaction.
    ///
    /// On error nothing from this batch is visible and the error is already
    /// logged; the caller only has to count it.
    pub async fn persist_batch(
        &self,
        batch_index: usize,
        outcomes: &[BatchOutcome],
    ) -> Result<Vec<MonitorRunResult>, StoreError> {
        if outcomes.is_empty() {
            return Ok(Vec::new());
        }

        let result = self.write_in_transaction(outcomes).await;
        match &result {
            Ok(_) => debug!(batch = batch_index, batch_size = outcomes.len(), "Batch persisted"),
            Err(e) => error!(
                operation = "persist_batch",
                batch = batch_index,
                batch_size = outcomes.len(),
                error = %e,
                "Failed to persist batch; its monitors keep their previous status"
            ),
        }
        result
    }

    async fn write_in_transaction(
        &self,
        outcomes: &[BatchOutcome],
    ) -> Result<Vec<MonitorRunResult>, StoreError> {
        let checked_at = Utc::now();
        let mut tx = self.store.begin().await?;

        match write_batch(&mut *tx, outcomes, checked_at).await {
            Ok(results) => {
                tx.commit().await?;
                Ok(results)
            }
            Err(e) => {
                if let Err(rollback_error) = tx.rollback().await {
                    warn!("Rollback after failed batch write also failed: {rollback_error}");
                }
                Err(e)
            }
        }
    }
}

async fn write_batch(
    tx: &mut dyn StoreTransaction,
    outcomes: &[BatchOutcome],
    checked_at: DateTime<Utc>,
) -> Result<Vec<MonitorRunResult>, StoreError> {
    let new_checks: Vec<NewCheck> =
        outcomes.iter().map(|o| o.result.to_new_check(o.monitor.id, checked_at)).collect();
    let checks = tx.create_checks(&new_checks).await?;

    let mut results = Vec::with_capacity(outcomes.len());
    for (outcome, check) in outcomes.iter().zip(&checks) {
        let status = MonitorStatus::from_success(outcome.result.success);
        tx.update_monitor_status(outcome.monitor.id, status, checked_at).await?;

        results.push(MonitorRunResult {
            monitor_id: outcome.monitor.id,
            name: outcome.monitor.name.clone(),
            status,
            response_time_ms: outcome.result.response_time_ms,
            check_id: check.id,
        });
    }

    Ok(results)
}
