use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::time::Duration;

use crate::db_schema::initialize_schema;

pub type DbPool = sqlx::SqlitePool;

pub async fn create_db_pool(
    database_path: &str,
    max_connections: u32,
) -> Result<DbPool, Box<dyn std::error::Error>> {
    // Create parent directory if it doesn't exist
    if let Some(parent) = std::path::Path::new(database_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // WAL lets readers proceed while a create/attach transaction is open. The busy
    // timeout only covers transactions whose first statement is a write; one that
    // reads first and then writes fails with SQLITE_BUSY when another writer got in.
    let options = SqliteConnectOptions::new()
        .filename(database_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await?;

    initialize_schema(&pool).await?;
    info!("Database schema ready at {}", database_path);

    Ok(pool)
}

/// Single-connection pool over a private in-memory database.
///
/// Every SQLite in-memory connection is its own database, so the pool must never
/// open a second one or drop the first.
pub async fn create_in_memory_pool() -> Result<DbPool, Box<dyn std::error::Error>> {
    let options = SqliteConnectOptions::new().in_memory(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    initialize_schema(&pool).await?;

    Ok(pool)
}
