//! Persisted last-upload slot.
//!
//! The slot holds the PNG encoding of the most recently uploaded image under
//! key [`LAST_UPLOAD_KEY`]. Decoding is left to the caller so that a store
//! never needs to know about pixels.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::{
    path::Path,
    sync::{Arc, Mutex},
};

pub const UPLOAD_HISTORY_TABLE: &str = "upload_history";
pub const LAST_UPLOAD_KEY: i64 = 0;

#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Returns the stored bytes, `None` when the slot is empty.
    async fn load(&self) -> Result<Option<Vec<u8>>>;

    /// Replaces the stored bytes.
    async fn save(&self, data: &[u8]) -> Result<()>;

    /// Empties the slot. Emptying an empty slot succeeds.
    async fn remove(&self) -> Result<()>;
}

/// Slot kept in the `upload_history` table of the application database.
#[derive(Debug, Clone)]
pub struct SqliteUploadStore {
    table: String,
}

impl SqliteUploadStore {
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        let db_path = db_path
            .to_str()
            .with_context(|| format!("invalid database path {}", db_path.display()))?;

        sqldb::create_db(db_path).await?;
        Self::with_table(UPLOAD_HISTORY_TABLE).await
    }

    /// Uses `table` of an already created database.
    pub async fn with_table(table: &str) -> Result<Self> {
        sqldb::blob::new(table)
            .await
            .with_context(|| format!("create table {table} failed"))?;

        Ok(Self {
            table: table.to_string(),
        })
    }
}

#[async_trait]
impl UploadStore for SqliteUploadStore {
    async fn load(&self) -> Result<Option<Vec<u8>>> {
        sqldb::blob::select(&self.table, LAST_UPLOAD_KEY)
            .await
            .context("load last upload failed")
    }

    async fn save(&self, data: &[u8]) -> Result<()> {
        sqldb::blob::upsert(&self.table, LAST_UPLOAD_KEY, data)
            .await
            .context("save last upload failed")
    }

    async fn remove(&self) -> Result<()> {
        sqldb::blob::delete(&self.table, LAST_UPLOAD_KEY)
            .await
            .context("remove last upload failed")
    }
}

/// In-process slot. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryUploadStore {
    slot: Arc<Mutex<Option<Vec<u8>>>>,
}

impl MemoryUploadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UploadStore for MemoryUploadStore {
    async fn load(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.slot.lock().unwrap().clone())
    }

    async fn save(&self, data: &[u8]) -> Result<()> {
        *self.slot.lock().unwrap() = Some(data.to_vec());
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        self.slot.lock().unwrap().take();
        Ok(())
    }
}
