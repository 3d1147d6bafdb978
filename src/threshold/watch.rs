use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, error};

use super::{Threshold, ThresholdResult, evaluate};
use crate::metrics::MetricsCollector;
use crate::shutdown::{ShutdownSender, wait_for_shutdown};

/// Periodically evaluates the `abort_on_fail` thresholds while the run is in
/// progress. On the first failure it broadcasts shutdown and returns the
/// failing results; it returns `None` when the run ends some other way.
pub async fn watch_thresholds(
    thresholds: Arc<[Threshold]>,
    collector: Arc<MetricsCollector>,
    every: Duration,
    started: Instant,
    shutdown_tx: ShutdownSender,
) -> Option<Vec<ThresholdResult>> {
    let watched: Vec<Threshold> = thresholds
        .iter()
        .filter(|threshold| threshold.abort_on_fail)
        .cloned()
        .collect();
    if watched.is_empty() || every.is_zero() {
        return None;
    }
    let mut shutdown_rx = shutdown_tx.subscribe();
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = wait_for_shutdown(&mut shutdown_rx) => return None,
        }
        let elapsed = started.elapsed();
        let due: Vec<Threshold> = watched
            .iter()
            .filter(|threshold| elapsed >= threshold.delay_abort_eval)
            .cloned()
            .collect();
        if due.is_empty() {
            continue;
        }
        let failed: Vec<ThresholdResult> = evaluate(&due, &collector, elapsed)
            .into_iter()
            .filter(|result| !result.passed)
            .collect();
        if failed.is_empty() {
            debug!(checked = due.len(), "Live thresholds passing.");
            continue;
        }
        for result in &failed {
            error!("Threshold crossed, aborting run: {}", result);
        }
        drop(shutdown_tx.send(()));
        return Some(failed);
    }
}
