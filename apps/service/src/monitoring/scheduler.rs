use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;

use super::cycle::{CycleSummary, MonitoringCycle};
use crate::database::models::MetricSample;

/// Drives monitoring cycles in one of three modes: a single ad hoc
/// endpoint, one pass over the registry, or a fixed-interval loop.
pub struct Scheduler {
    cycle: MonitoringCycle,
    interval: Duration,
}

impl Scheduler {
    pub fn new(cycle: MonitoringCycle, interval: Duration) -> Self {
        Self { cycle, interval }
    }

    /// Validate, probe and record exactly one caller-supplied endpoint.
    pub async fn run_single(&self, url: &str) -> Result<MetricSample> {
        self.cycle.monitor_endpoint(url).await
    }

    /// Run one monitoring cycle across the full registry.
    pub async fn run_all_once(&self) -> Result<CycleSummary> {
        self.cycle.run().await
    }

    /// Run cycles until interrupted. A failed cycle is logged and the loop
    /// carries on after the normal sleep; the interval is measured from the
    /// end of one cycle, with no wall-clock alignment.
    pub async fn run_forever(&self) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "starting scheduled monitoring"
        );

        loop {
            if let Err(e) = self.cycle.run().await {
                tracing::error!("monitoring cycle failed: {e:#}");
            }

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupt received, stopping scheduled monitoring");
                    break;
                }
                () = sleep(self.interval) => {}
            }
        }
    }
}
