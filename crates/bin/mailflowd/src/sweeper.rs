//! Background driver that periodically resumes runs whose delay elapsed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use mailflow_app::automation_engine::AutomationEngine;
use mailflow_app::ports::Ports;

/// Sweep up to `batch_size` due tickets every `every` until `shutdown`
/// flips. A failed sweep is logged and retried on the next tick; ticks
/// missed while a sweep runs long are skipped rather than bunched up.
pub async fn run<P: Ports>(
    engine: Arc<AutomationEngine<P>>,
    every: Duration,
    batch_size: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!(interval_secs = every.as_secs(), batch_size, "delay sweeper started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = engine.sweep(batch_size).await {
                    tracing::warn!(error = %err, "sweep failed, retrying on next tick");
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    tracing::info!("delay sweeper stopped");
}
