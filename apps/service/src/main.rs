mod config;
mod database;
mod error;
mod monitoring;
mod pool;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;

use config::Config;
use database::{MetricStore, MetricStoreImpl};
use monitoring::validation::validate_endpoint;
use monitoring::{
    EndpointRegistry, MetricRecorder, MonitoringCycle, ProbeConfig, ProbeExecutor, Scheduler,
};
use pool::{LibsqlManager, LibsqlPool};

/// Probes registered HTTP(S) endpoints and records phase timings and jitter.
#[derive(Debug, Parser)]
#[command(name = "webpulse", version, about)]
struct Cli {
    /// Probe a single URL once and exit
    #[arg(long, conflicts_with_all = ["add", "schedule"])]
    url: Option<String>,

    /// Register an endpoint (duplicates are ignored), probe it once, and exit
    #[arg(long, conflicts_with = "schedule")]
    add: Option<String>,

    /// Run monitoring cycles continuously
    #[arg(long)]
    schedule: bool,

    /// Monitoring interval in seconds (overrides the configured value)
    #[arg(long)]
    interval: Option<u64>,

    /// Path to the configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_tracing();

    let cli = Cli::parse();

    let mut config =
        Config::from_config(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(interval) = cli.interval {
        config.scheduler.interval_seconds = interval;
    }
    tracing::debug!("{config}");

    let pool = open_database(&config.database.path)
        .await
        .with_context(|| format!("failed to open database at {}", config.database.path))?;
    let store: Arc<dyn MetricStore> = Arc::new(MetricStoreImpl::new_from_pool(pool));

    let registry = Arc::new(EndpointRegistry::new(store.clone()));
    let executor = ProbeExecutor::new(ProbeConfig {
        attempts: config.probe.attempts,
        timeout: Duration::from_secs(config.probe.timeout_seconds),
        delay: Duration::from_secs(config.probe.delay_seconds),
    })?;
    let recorder = MetricRecorder::new(store);
    let cycle = MonitoringCycle::new(registry.clone(), executor, recorder);
    let scheduler =
        Scheduler::new(cycle, Duration::from_secs(config.scheduler.interval_seconds));

    if let Some(url) = cli.add.as_deref() {
        let validation = validate_endpoint(url);
        if !validation.is_valid {
            bail!("rejected endpoint {url}: {}", validation.reason());
        }

        if registry.add(url).await? {
            tracing::info!(url, "endpoint registered");
        } else {
            tracing::info!(url, "endpoint was already registered");
        }

        let sample = scheduler.run_single(url).await?;
        tracing::info!(
            url,
            time_total = sample.time_total,
            jitter = sample.jitter,
            "initial metrics recorded"
        );
    } else if let Some(url) = cli.url.as_deref() {
        match scheduler.run_single(url).await {
            Ok(sample) => tracing::info!(
                url,
                time_total = sample.time_total,
                jitter = sample.jitter,
                "metrics recorded"
            ),
            Err(e) => bail!("monitoring {url} failed: {e:#}"),
        }
    } else if cli.schedule {
        scheduler.run_forever().await;
    } else {
        let summary = scheduler.run_all_once().await?;
        tracing::info!(
            "monitoring completed: {}/{} endpoints",
            summary.succeeded,
            summary.attempted
        );
    }

    Ok(())
}

async fn open_database(path: &str) -> Result<LibsqlPool> {
    let db = libsql::Builder::new_local(path).build().await?;
    let manager = LibsqlManager::new(db);
    let pool: LibsqlPool = deadpool::managed::Pool::builder(manager)
        .config(deadpool::managed::PoolConfig::default())
        .build()?;

    let conn = pool.get().await?;
    database::initialize_database(&conn).await?;

    Ok(pool)
}
