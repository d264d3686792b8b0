use anyhow::Result;
use async_trait::async_trait;
use libsql::params;
use std::time::SystemTime;

use super::models::{Endpoint, MetricSample, i64_to_timestamp, timestamp_to_i64};
use crate::pool::LibsqlPool;

/// Persistence port consumed by the monitoring engine.
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Append one metric sample.
    async fn save_sample(&self, sample: &MetricSample) -> Result<i64>;

    /// All registered endpoints.
    async fn list_endpoints(&self) -> Result<Vec<Endpoint>>;

    /// Register an endpoint. Returns true if newly added, false if the URL
    /// was already registered (never an error for the duplicate case).
    async fn add_endpoint(&self, url: &str, added_on: SystemTime) -> Result<bool>;
}

/// LibSQL-backed store
pub struct MetricStoreImpl {
    pool: LibsqlPool,
}

impl MetricStoreImpl {
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    async fn get_conn(&self) -> Result<deadpool::managed::Object<crate::pool::LibsqlManager>> {
        Ok(self.pool.get().await?)
    }

    /// Most recent samples for one endpoint, newest first.
    #[allow(dead_code)] // Public API method
    pub async fn recent_samples(&self, url: &str, limit: usize) -> Result<Vec<MetricSample>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare(
                "SELECT id, url, time_namelookup, time_connect, time_appconnect,
                        time_pretransfer, time_redirect, time_starttransfer, time_total,
                        speed_download, speed_upload, size_download, jitter, timestamp
                 FROM endpoint_metrics WHERE url = ? ORDER BY timestamp DESC LIMIT ?",
            )
            .await?;

        let mut rows = stmt.query(params![url, limit as i64]).await?;
        let mut samples = Vec::new();

        while let Some(row) = rows.next().await? {
            let timestamp: i64 = row.get(13)?;
            samples.push(MetricSample {
                id: Some(row.get(0)?),
                url: row.get(1)?,
                time_namelookup: row.get(2)?,
                time_connect: row.get(3)?,
                time_appconnect: row.get(4)?,
                time_pretransfer: row.get(5)?,
                time_redirect: row.get(6)?,
                time_starttransfer: row.get(7)?,
                time_total: row.get(8)?,
                speed_download: row.get(9)?,
                speed_upload: row.get(10)?,
                size_download: row.get(11)?,
                jitter: row.get(12)?,
                timestamp: i64_to_timestamp(timestamp),
            });
        }

        Ok(samples)
    }
}

#[async_trait]
impl MetricStore for MetricStoreImpl {
    async fn save_sample(&self, sample: &MetricSample) -> Result<i64> {
        let conn = self.get_conn().await?;
        let timestamp = timestamp_to_i64(sample.timestamp);

        conn.execute(
            "INSERT INTO endpoint_metrics (
                url, time_namelookup, time_connect, time_appconnect, time_pretransfer,
                time_redirect, time_starttransfer, time_total, speed_download, speed_upload,
                size_download, jitter, timestamp
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                sample.url.clone(),
                sample.time_namelookup,
                sample.time_connect,
                sample.time_appconnect,
                sample.time_pretransfer,
                sample.time_redirect,
                sample.time_starttransfer,
                sample.time_total,
                sample.speed_download,
                sample.speed_upload,
                sample.size_download,
                sample.jitter,
                timestamp
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn list_endpoints(&self) -> Result<Vec<Endpoint>> {
        let conn = self.get_conn().await?;
        let mut stmt = conn
            .prepare("SELECT id, url, added_on FROM monitored_endpoints ORDER BY id")
            .await?;

        let mut rows = stmt.query(()).await?;
        let mut endpoints = Vec::new();

        while let Some(row) = rows.next().await? {
            let added_on: i64 = row.get(2)?;
            endpoints.push(Endpoint {
                id: Some(row.get(0)?),
                url: row.get(1)?,
                added_on: i64_to_timestamp(added_on),
            });
        }

        Ok(endpoints)
    }

    async fn add_endpoint(&self, url: &str, added_on: SystemTime) -> Result<bool> {
        let conn = self.get_conn().await?;

        // The unique URL index makes duplicate registration a no-op; the
        // affected-row count distinguishes new from already-present.
        let affected = conn
            .execute(
                "INSERT OR IGNORE INTO monitored_endpoints (url, added_on) VALUES (?, ?)",
                params![url, timestamp_to_i64(added_on)],
            )
            .await?;

        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database;
    use std::time::Duration;

    async fn create_test_store() -> Result<(MetricStoreImpl, tempfile::TempDir)> {
        let temp_dir = tempfile::tempdir()?;
        let db_path = temp_dir.path().join("test.db");

        let db = libsql::Builder::new_local(db_path.to_string_lossy().as_ref()).build().await?;
        let manager = crate::pool::LibsqlManager::new(db);
        let pool: crate::pool::LibsqlPool = deadpool::managed::Pool::builder(manager)
            .config(deadpool::managed::PoolConfig::default())
            .build()?;

        let conn = pool.get().await?;
        database::initialize_database(&conn).await?;
        drop(conn);

        Ok((MetricStoreImpl::new_from_pool(pool), temp_dir))
    }

    fn sample_for(url: &str) -> MetricSample {
        MetricSample {
            id: None,
            url: url.to_string(),
            time_namelookup: 0.01,
            time_connect: 0.02,
            time_appconnect: 0.05,
            time_pretransfer: 0.05,
            time_redirect: 0.0,
            time_starttransfer: 0.12,
            time_total: 0.2,
            speed_download: 51200.0,
            speed_upload: 0.0,
            size_download: 10240.0,
            jitter: 0.003,
            timestamp: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn test_add_endpoint_duplicate_is_noop() -> Result<()> {
        let (store, _dir) = create_test_store().await?;
        let now = SystemTime::now();

        assert!(store.add_endpoint("https://example.com", now).await?);
        assert!(!store.add_endpoint("https://example.com", now).await?);

        let endpoints = store.list_endpoints().await?;
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].url, "https://example.com");
        Ok(())
    }

    #[tokio::test]
    async fn test_save_and_read_back_sample() -> Result<()> {
        let (store, _dir) = create_test_store().await?;

        let first = sample_for("https://example.com");
        store.save_sample(&first).await?;

        let mut second = sample_for("https://example.com");
        second.time_total = 0.35;
        second.timestamp = SystemTime::now() + Duration::from_secs(5);
        store.save_sample(&second).await?;

        let samples = store.recent_samples("https://example.com", 10).await?;
        assert_eq!(samples.len(), 2);
        // Newest first
        assert!((samples[0].time_total - 0.35).abs() < f64::EPSILON);
        assert!((samples[1].jitter - 0.003).abs() < f64::EPSILON);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_endpoints_empty_store() -> Result<()> {
        let (store, _dir) = create_test_store().await?;
        assert!(store.list_endpoints().await?.is_empty());
        Ok(())
    }
}
