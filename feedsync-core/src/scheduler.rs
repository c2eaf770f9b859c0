use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use crate::sync::SyncEngine;

/// Fixed-interval trigger for the reconciliation cycle. Cycle failures are
/// logged and swallowed; one bad tick never takes the loop down, the next
/// tick retries from a fresh listing.
pub struct IntervalScheduler {
    period: Duration,
}

impl IntervalScheduler {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub async fn run(&self, engine: Arc<SyncEngine>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            target: "scheduler",
            period_s = self.period.as_secs(),
            "starting manifest sync loop"
        );
        loop {
            ticker.tick().await;
            match engine.run_cycle().await {
                Ok(report) => {
                    tracing::info!(
                        target: "scheduler",
                        outcome = ?report.outcome,
                        urls = report.urls.len(),
                        duration_ms = report.duration_ms,
                        "cycle finished"
                    );
                }
                Err(err) => {
                    tracing::error!(target: "scheduler", error = %err, "cycle failed");
                }
            }
        }
    }
}
