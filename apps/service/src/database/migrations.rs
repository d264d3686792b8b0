use anyhow::Result;
use libsql::Connection;

/// Schema version - increment when making schema changes
const SCHEMA_VERSION: i32 = 1;

/// Run database migrations
///
/// This is the single source of truth for the storage schema.
pub async fn run_migrations(conn: &Connection) -> Result<()> {
    // Create schema_migrations table first (tracks applied migrations)
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL,
            description TEXT
        )",
        (),
    )
    .await?;

    let current_version = get_current_version(conn).await?;

    if current_version >= SCHEMA_VERSION {
        tracing::debug!("database schema is up to date (version {})", current_version);
        return Ok(());
    }

    tracing::info!("running migrations from version {} to {}", current_version, SCHEMA_VERSION);

    if current_version < 1 {
        run_migration_v1(conn).await?;
        record_migration(conn, 1, "Initial endpoint and metric tables").await?;
    }

    tracing::info!("database migrations completed (now at version {})", SCHEMA_VERSION);
    Ok(())
}

/// Get current schema version from database
async fn get_current_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn.query("SELECT MAX(version) FROM schema_migrations", ()).await?;

    if let Some(row) = rows.next().await? {
        let version: Option<i32> = row.get(0)?;
        Ok(version.unwrap_or(0))
    } else {
        Ok(0)
    }
}

/// Record that a migration was applied
async fn record_migration(conn: &Connection, version: i32, description: &str) -> Result<()> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;

    conn.execute(
        "INSERT INTO schema_migrations (version, applied_at, description) VALUES (?, ?, ?)",
        libsql::params![version, now, description],
    )
    .await?;

    tracing::info!("applied migration v{}: {}", version, description);
    Ok(())
}

/// Migration v1: monitored_endpoints and endpoint_metrics tables
async fn run_migration_v1(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS monitored_endpoints (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL UNIQUE,
            added_on INTEGER NOT NULL
        )",
        (),
    )
    .await?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS endpoint_metrics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL,
            time_namelookup REAL NOT NULL DEFAULT 0,
            time_connect REAL NOT NULL DEFAULT 0,
            time_appconnect REAL NOT NULL DEFAULT 0,
            time_pretransfer REAL NOT NULL DEFAULT 0,
            time_redirect REAL NOT NULL DEFAULT 0,
            time_starttransfer REAL NOT NULL DEFAULT 0,
            time_total REAL NOT NULL DEFAULT 0,
            speed_download REAL NOT NULL DEFAULT 0,
            speed_upload REAL NOT NULL DEFAULT 0,
            size_download REAL NOT NULL DEFAULT 0,
            jitter REAL NOT NULL DEFAULT 0,
            timestamp INTEGER NOT NULL
        )",
        (),
    )
    .await?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_endpoint_metrics_url_timestamp
         ON endpoint_metrics(url, timestamp DESC)",
        (),
    )
    .await?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_endpoint_metrics_timestamp
         ON endpoint_metrics(timestamp DESC)",
        (),
    )
    .await?;

    Ok(())
}
