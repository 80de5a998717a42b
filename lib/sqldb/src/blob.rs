//! Keyed binary slots
//!
//! Every table created here has the layout `(id INTEGER PRIMARY KEY, data BLOB
//! NOT NULL)`. A slot is addressed by its integer key and holds at most one
//! payload; writing an occupied slot replaces it.

use super::{BlobEntry, pool};
use anyhow::Result;

/// Create a new blob table if it doesn't exist
///
/// # Arguments
/// * `table` - Name of the table to create
///
/// # Example
/// ```no_run
/// # use anyhow::Result;
/// # async fn example() -> Result<()> {
/// sqldb::blob::new("upload_history").await?;
/// # Ok(())
/// # }
/// ```
pub async fn new(table: &str) -> Result<()> {
    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
             id INTEGER PRIMARY KEY,
             data BLOB NOT NULL
             )",
        table
    ))
    .execute(&pool().await?)
    .await?;

    Ok(())
}

/// Write `data` into slot `id`, replacing any previous payload
///
/// # Example
/// ```no_run
/// # use anyhow::Result;
/// # async fn example() -> Result<()> {
/// sqldb::blob::upsert("upload_history", 0, &[0x89, b'P', b'N', b'G']).await?;
/// # Ok(())
/// # }
/// ```
pub async fn upsert(table: &str, id: i64, data: &[u8]) -> Result<()> {
    sqlx::query(&format!(
        "INSERT INTO {table} (id, data) VALUES (?, ?)
         ON CONFLICT(id) DO UPDATE SET data = excluded.data"
    ))
    .bind(id)
    .bind(data)
    .execute(&pool().await?)
    .await?;

    Ok(())
}

/// Read the payload of slot `id`
///
/// # Returns
/// `Ok(None)` when the slot is empty.
pub async fn select(table: &str, id: i64) -> Result<Option<Vec<u8>>> {
    let entry = sqlx::query_as::<_, BlobEntry>(&format!(
        "SELECT id, data FROM {} WHERE id = ?",
        table
    ))
    .bind(id)
    .fetch_optional(&pool().await?)
    .await?;

    Ok(entry.map(|e| e.data))
}

/// Empty slot `id`. Emptying an empty slot is not an error.
pub async fn delete(table: &str, id: i64) -> Result<()> {
    sqlx::query(&format!("DELETE FROM {} WHERE id = ?", table))
        .bind(id)
        .execute(&pool().await?)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_db, tests::MTX};

    const TABLE: &str = "blob_test";

    async fn init(dir: &tempfile::TempDir) -> Result<()> {
        create_db(dir.path().join("blob.db").to_str().unwrap()).await?;
        new(TABLE).await
    }

    #[tokio::test]
    async fn test_new() -> Result<()> {
        let _mtx = MTX.lock().await;
        let dir = tempfile::tempdir()?;
        init(&dir).await?;
        upsert(TABLE, 0, b"kept").await?;

        // creating twice keeps the rows
        new(TABLE).await?;
        assert_eq!(select(TABLE, 0).await?, Some(b"kept".to_vec()));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_table() -> Result<()> {
        let _mtx = MTX.lock().await;
        let dir = tempfile::tempdir()?;
        init(&dir).await?;

        assert!(select("no_such_table", 0).await.is_err());
        assert!(upsert("no_such_table", 0, b"data").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_and_select() -> Result<()> {
        let _mtx = MTX.lock().await;
        let dir = tempfile::tempdir()?;
        init(&dir).await?;

        assert_eq!(select(TABLE, 0).await?, None);

        upsert(TABLE, 0, &[1, 2, 3]).await?;
        assert_eq!(select(TABLE, 0).await?, Some(vec![1, 2, 3]));

        upsert(TABLE, 0, &[9]).await?;
        assert_eq!(select(TABLE, 0).await?, Some(vec![9]));
        assert_eq!(select(TABLE, 1).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete() -> Result<()> {
        let _mtx = MTX.lock().await;
        let dir = tempfile::tempdir()?;
        init(&dir).await?;

        upsert(TABLE, 0, b"data").await?;
        upsert(TABLE, 1, b"more").await?;

        delete(TABLE, 0).await?;
        delete(TABLE, 0).await?;
        assert_eq!(select(TABLE, 0).await?, None);
        assert_eq!(select(TABLE, 1).await?, Some(b"more".to_vec()));
        Ok(())
    }
}
