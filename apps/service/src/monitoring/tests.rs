/// End-to-end tests for the monitoring engine
///
/// These run the registry -> probe -> record pipeline against an in-memory
/// store and local stub servers, covering the isolation and bookkeeping
/// guarantees of the cycle and scheduler.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::{
    EndpointRegistry, MetricRecorder, MonitoringCycle, ProbeConfig, ProbeExecutor, Scheduler,
};
use crate::database::MetricStore;
use crate::database::models::{Endpoint, MetricSample};

#[derive(Default)]
struct MemoryStore {
    endpoints: Mutex<Vec<Endpoint>>,
    samples: Mutex<Vec<MetricSample>>,
    fail_listing: bool,
    list_calls: AtomicUsize,
}

impl MemoryStore {
    fn saved_samples(&self) -> Vec<MetricSample> {
        self.samples.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricStore for MemoryStore {
    async fn save_sample(&self, sample: &MetricSample) -> Result<i64> {
        let mut samples = self.samples.lock().unwrap();
        samples.push(sample.clone());
        Ok(samples.len() as i64)
    }

    async fn list_endpoints(&self) -> Result<Vec<Endpoint>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            return Err(anyhow!("listing failed"));
        }
        Ok(self.endpoints.lock().unwrap().clone())
    }

    async fn add_endpoint(&self, url: &str, added_on: SystemTime) -> Result<bool> {
        let mut endpoints = self.endpoints.lock().unwrap();
        if endpoints.iter().any(|e| e.url == url) {
            return Ok(false);
        }
        let id = endpoints.len() as i64 + 1;
        endpoints.push(Endpoint { id: Some(id), url: url.to_string(), added_on });
        Ok(true)
    }
}

fn quick_probe_config() -> ProbeConfig {
    ProbeConfig { attempts: 2, timeout: Duration::from_secs(2), delay: Duration::ZERO }
}

fn build_cycle(store: Arc<MemoryStore>, seeds: Vec<String>) -> MonitoringCycle {
    let registry = Arc::new(EndpointRegistry::with_seeds(store.clone(), seeds));
    MonitoringCycle::new(
        registry,
        ProbeExecutor::new(quick_probe_config()).unwrap(),
        MetricRecorder::new(store),
    )
}

/// Local HTTP server answering every connection with a 200, then closing.
async fn spawn_stub_server() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok")
                    .await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

#[tokio::test]
async fn test_cycle_on_empty_registry() {
    let store = Arc::new(MemoryStore::default());
    let cycle = build_cycle(store.clone(), vec![]);

    let summary = cycle.run().await.unwrap();

    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.attempted, 0);
    assert!(store.saved_samples().is_empty());
}

#[tokio::test]
async fn test_cycle_isolates_unreachable_endpoint() {
    let addr = spawn_stub_server().await;
    let good_a = format!("http://127.0.0.1:{}/a", addr.port());
    let good_c = format!("http://127.0.0.1:{}/c", addr.port());

    // Grab a free port, then close it so the middle endpoint is refused.
    let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = format!("http://127.0.0.1:{}/", closed.local_addr().unwrap().port());
    drop(closed);

    let store = Arc::new(MemoryStore::default());
    let cycle = build_cycle(store.clone(), vec![good_a.clone(), dead.clone(), good_c.clone()]);

    let summary = cycle.run().await.unwrap();

    // The dead endpoint still produced a (synthetic) record, so all three
    // count as handled.
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.succeeded, 3);

    let samples = store.saved_samples();
    assert_eq!(samples.len(), 3);

    let dead_sample = samples.iter().find(|s| s.url == dead).unwrap();
    assert_eq!(dead_sample.time_total, 0.0);
    assert_eq!(dead_sample.size_download, 0.0);
    assert_eq!(dead_sample.jitter, 0.0);

    let good_sample = samples.iter().find(|s| s.url == good_a).unwrap();
    assert!(good_sample.time_total > 0.0);
}

#[tokio::test]
async fn test_cycle_skips_invalid_endpoint_without_record() {
    let store = Arc::new(MemoryStore::default());
    let cycle = build_cycle(store.clone(), vec!["ftp://example.com".to_string()]);

    let summary = cycle.run().await.unwrap();

    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.succeeded, 0);
    assert!(store.saved_samples().is_empty());
}

#[tokio::test]
async fn test_registry_seeding_is_idempotent() {
    let store = Arc::new(MemoryStore::default());
    let registry =
        EndpointRegistry::with_seeds(store.clone(), vec!["https://example.com".to_string()]);

    assert_eq!(registry.list().await.unwrap().len(), 1);
    assert_eq!(registry.list().await.unwrap().len(), 1);

    assert!(!registry.add("https://example.com").await.unwrap());
    assert!(registry.add("https://other.example.com").await.unwrap());
    assert_eq!(registry.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_single_endpoint_mode_records_once() {
    let addr = spawn_stub_server().await;
    let url = format!("http://127.0.0.1:{}/", addr.port());

    let store = Arc::new(MemoryStore::default());
    let scheduler = Scheduler::new(build_cycle(store.clone(), vec![]), Duration::from_secs(300));

    let sample = scheduler.run_single(&url).await.unwrap();
    assert!(sample.time_total > 0.0);
    assert_eq!(store.saved_samples().len(), 1);

    assert!(scheduler.run_single("not-a-url").await.is_err());
    assert_eq!(store.saved_samples().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_run_forever_survives_cycle_errors() {
    let store = Arc::new(MemoryStore { fail_listing: true, ..Default::default() });
    let scheduler = Scheduler::new(build_cycle(store.clone(), vec![]), Duration::from_secs(300));

    let handle = tokio::spawn(async move { scheduler.run_forever().await });

    // The paused clock auto-advances through the sleeps; three intervals
    // are enough to show the loop outlived the failing cycles.
    tokio::time::sleep(Duration::from_secs(1000)).await;
    handle.abort();

    assert!(store.list_calls.load(Ordering::SeqCst) >= 3);
}
