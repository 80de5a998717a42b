//! SQLite key→blob storage
//!
//! A single process-wide connection pool backs small keyed binary slots, such
//! as the last uploaded image of the previewer.
//!
//! # Examples
//! ```no_run
//! use sqldb::{create_db, blob};
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     create_db("/path/to/database.db").await?;
//!     blob::new("upload_history").await?;
//!     blob::upsert("upload_history", 0, b"png bytes").await?;
//!
//!     Ok(())
//! }
//! ```

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use sqlx::{
    Pool,
    migrate::MigrateDatabase,
    sqlite::{Sqlite, SqlitePoolOptions},
};
use tokio::sync::Mutex;

pub mod blob;

/// Maximum number of concurrent database connections in the pool
const MAX_CONNECTIONS: u32 = 3;

/// One stored slot: integer key and its binary payload.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BlobEntry {
    pub id: i64,
    pub data: Vec<u8>,
}

static POOL: Lazy<Mutex<Option<Pool<Sqlite>>>> = Lazy::new(|| Mutex::new(None));

/// Get the global database connection pool
///
/// # Errors
/// Fails when `create_db()` has not been called yet.
async fn pool() -> Result<Pool<Sqlite>> {
    POOL.lock()
        .await
        .clone()
        .context("database is not created, call `create_db` first")
}

/// Create a new SQLite database and initialize the connection pool
///
/// The database file is created if it doesn't exist. Calling it again
/// replaces the global pool.
///
/// # Errors
/// Returns an error if the database cannot be created or connected.
pub async fn create_db(db_path: &str) -> Result<()> {
    if !Sqlite::database_exists(db_path).await.unwrap_or(false) {
        Sqlite::create_database(db_path)
            .await
            .with_context(|| format!("create database {db_path} failed"))?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(&format!("sqlite:{}", db_path))
        .await
        .with_context(|| format!("connect database {db_path} failed"))?;

    *POOL.lock().await = Some(pool);

    log::debug!("database ready: {db_path}");
    Ok(())
}
