use std::sync::Arc;

use anyhow::Result;

use super::probe::ProbeExecutor;
use super::recorder::MetricRecorder;
use super::registry::EndpointRegistry;
use crate::database::models::MetricSample;

/// Outcome of one pass over the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub succeeded: usize,
    pub attempted: usize,
}

/// One monitoring pass: probe every registered endpoint and record the
/// result, with total isolation between endpoints.
pub struct MonitoringCycle {
    registry: Arc<EndpointRegistry>,
    executor: ProbeExecutor,
    recorder: MetricRecorder,
}

impl MonitoringCycle {
    pub fn new(
        registry: Arc<EndpointRegistry>,
        executor: ProbeExecutor,
        recorder: MetricRecorder,
    ) -> Self {
        Self { registry, executor, recorder }
    }

    /// Probe one endpoint and persist its record.
    pub async fn monitor_endpoint(&self, url: &str) -> Result<MetricSample> {
        let reading = self.executor.probe(url).await?;
        self.recorder.record(url, &reading.last, reading.jitter).await
    }

    /// Run one full cycle. An empty registry yields `(0, 0)` without any
    /// fetch. A probe that produced a record - real or synthetic - counts
    /// as a success; invalid URLs and persistence failures count against,
    /// but never stop the remaining endpoints.
    pub async fn run(&self) -> Result<CycleSummary> {
        let endpoints = self.registry.list().await?;

        if endpoints.is_empty() {
            tracing::info!("no endpoints registered, nothing to monitor");
            return Ok(CycleSummary { succeeded: 0, attempted: 0 });
        }

        let mut succeeded = 0;
        for endpoint in &endpoints {
            match self.monitor_endpoint(&endpoint.url).await {
                Ok(sample) => {
                    succeeded += 1;
                    tracing::info!(
                        url = endpoint.url.as_str(),
                        time_total = sample.time_total,
                        jitter = sample.jitter,
                        "metrics recorded"
                    );
                }
                Err(e) => {
                    tracing::error!(url = endpoint.url.as_str(), "monitoring failed: {e:#}");
                }
            }
        }

        tracing::info!("monitoring cycle complete: {}/{} endpoints", succeeded, endpoints.len());
        Ok(CycleSummary { succeeded, attempted: endpoints.len() })
    }
}
