use std::slice::Chunks;
use std::sync::Arc;

use futures::future::join_all;
use tracing::warn;

use super::checker::Prober;
use super::types::BatchOutcome;
use crate::database::Monitor;

/// Maximum number of probes in flight at once
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Batch scheduler - probes monitors in fixed-size concurrent slices
///
/// Peak concurrency is bounded by the batch size no matter how many monitors
/// exist. Callers drive slices one at a time, so the next slice is not probed
/// until the previous one has been handled.
pub struct BatchScheduler {
    prober: Arc<dyn Prober>,
    batch_size: usize,
}

impl BatchScheduler {
    /// Create a scheduler; a batch size of zero is treated as one
    pub fn new(prober: Arc<dyn Prober>, batch_size: usize) -> Self {
        Self { prober, batch_size: batch_size.max(1) }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Contiguous, order-preserving slices of at most `batch_size` monitors
    pub fn partition<'a>(&self, monitors: &'a [Monitor]) -> Chunks<'a, Monitor> {
        monitors.chunks(self.batch_size)
    }

    /// Probe every monitor of one slice concurrently and wait for all of them.
    ///
    /// Each probe runs in its own task and writes only its own slot; slots are
    /// collected after the join. A task that dies (panics or is cancelled)
    /// loses its outcome for this cycle, while the other slots survive.
    pub async fn probe_batch(&self, batch: &[Monitor]) -> Vec<BatchOutcome> {
        let handles: Vec<_> = batch
            .iter()
            .cloned()
            .map(|monitor| {
                let prober = Arc::clone(&self.prober);
                tokio::spawn(async move {
                    let result = prober.probe(&monitor).await;
                    BatchOutcome { monitor, result }
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(batch)
            .filter_map(|(joined, monitor)| match joined {
                Ok(outcome) => Some(outcome),
                Err(error) => {
                    warn!(
                        monitor_id = %monitor.id,
                        name = %monitor.name,
                        "Probe task did not settle, dropping its outcome: {error}"
                    );
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::ProbeResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Records how many probes overlap
    #[derive(Default)]
    struct CountingProber {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Prober for CountingProber {
        async fn probe(&self, _monitor: &Monitor) -> ProbeResult {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            ProbeResult::response(200, 30)
        }
    }

    /// Panics for monitors whose name starts with "boom"
    struct PanickingProber;

    #[async_trait::async_trait]
    impl Prober for PanickingProber {
        async fn probe(&self, monitor: &Monitor) -> ProbeResult {
            if monitor.name.starts_with("boom") {
                panic!("prober blew up");
            }
            ProbeResult::response(200, 1)
        }
    }

    fn monitors(n: usize) -> Vec<Monitor> {
        (0..n).map(|i| Monitor::new(format!("m{i}"), format!("https://m{i}.example.com"), 60)).collect()
    }

    #[test]
    fn test_partition_preserves_order_and_bounds() {
        let scheduler = BatchScheduler::new(Arc::new(CountingProber::default()), 10);
        let all = monitors(25);

        let batches: Vec<_> = scheduler.partition(&all).collect();
        assert_eq!(batches.iter().map(|b| b.len()).collect::<Vec<_>>(), vec![10, 10, 5]);

        let flattened: Vec<_> = batches.concat().into_iter().map(|m| m.id).collect();
        assert_eq!(flattened, all.iter().map(|m| m.id).collect::<Vec<_>>());
    }

    #[test]
    fn test_partition_counts() {
        let scheduler = BatchScheduler::new(Arc::new(CountingProber::default()), 10);
        for (n, expected) in [(0, 0), (1, 1), (10, 1), (11, 2), (100, 10), (101, 11)] {
            assert_eq!(scheduler.partition(&monitors(n)).count(), expected, "n = {n}");
        }
    }

    #[test]
    fn test_zero_batch_size_degrades_to_sequential() {
        let scheduler = BatchScheduler::new(Arc::new(CountingProber::default()), 0);
        assert_eq!(scheduler.batch_size(), 1);
        assert_eq!(scheduler.partition(&monitors(3)).count(), 3);
    }

    #[tokio::test]
    async fn test_probes_within_batch_run_concurrently() {
        let prober = Arc::new(CountingProber::default());
        let scheduler = BatchScheduler::new(prober.clone(), 10);
        let all = monitors(25);

        for batch in scheduler.partition(&all) {
            let outcomes = scheduler.probe_batch(batch).await;
            assert_eq!(outcomes.len(), batch.len());
            assert_eq!(prober.in_flight.load(Ordering::SeqCst), 0);
        }

        assert_eq!(prober.peak.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_outcomes_keep_input_order() {
        let scheduler = BatchScheduler::new(Arc::new(CountingProber::default()), 10);
        let batch = monitors(7);

        let outcomes = scheduler.probe_batch(&batch).await;
        let ids: Vec<_> = outcomes.iter().map(|o| o.monitor.id).collect();
        assert_eq!(ids, batch.iter().map(|m| m.id).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_panicking_probe_is_dropped_not_fatal() {
        let scheduler = BatchScheduler::new(Arc::new(PanickingProber), 10);
        let mut batch = monitors(4);
        batch[2].name = "boom".into();

        let outcomes = scheduler.probe_batch(&batch).await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| o.monitor.name != "boom"));
        assert!(outcomes.iter().all(|o| o.result.success));
    }
}
