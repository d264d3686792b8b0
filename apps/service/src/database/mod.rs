/// Storage layer
///
/// Persistence port (`MetricStore`) and its libsql implementation. The
/// monitoring engine only ever sees the trait.
pub mod migrations;
pub mod models;
pub mod repository;

pub use repository::{MetricStore, MetricStoreImpl};

use anyhow::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
