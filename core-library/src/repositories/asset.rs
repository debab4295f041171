//! Asset blob repository trait and implementation
//!
//! Backed by the `files` table. Rows are written one by one during the
//! asset-download phase of a sync; a song's assets are always optional.

use crate::error::{LibraryError, Result};
use crate::models::AssetBlob;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Asset repository interface for data access operations
#[async_trait]
pub trait AssetRepository: Send + Sync {
    /// Insert or overwrite an asset blob by id.
    async fn upsert(&self, blob: &AssetBlob) -> Result<()>;

    /// Find an asset blob by its remote id.
    ///
    /// # Returns
    /// - `Ok(Some(blob))` if found
    /// - `Ok(None)` if the asset was never downloaded (soft failure)
    async fn find_by_id(&self, id: &str) -> Result<Option<AssetBlob>>;

    /// Count stored blobs.
    async fn count(&self) -> Result<i64>;

    /// Total size in bytes of all stored blobs.
    async fn total_size(&self) -> Result<i64>;

    /// Remove every blob.
    async fn clear(&self) -> Result<()>;
}

/// SQLite implementation of AssetRepository
pub struct SqliteAssetRepository {
    pool: SqlitePool,
}

impl SqliteAssetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssetRepository for SqliteAssetRepository {
    async fn upsert(&self, blob: &AssetBlob) -> Result<()> {
        blob.validate().map_err(|e| LibraryError::InvalidInput {
            field: "AssetBlob".to_string(),
            message: e,
        })?;

        query(
            r#"
            INSERT INTO files (id, filename, data)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET filename = excluded.filename, data = excluded.data
            "#,
        )
        .bind(&blob.id)
        .bind(&blob.filename)
        .bind(&blob.data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<AssetBlob>> {
        let blob = query_as::<_, AssetBlob>("SELECT * FROM files WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(blob)
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM files")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }

    async fn total_size(&self) -> Result<i64> {
        let size: Option<i64> = query_as("SELECT SUM(LENGTH(data)) as total FROM files")
            .fetch_one(&self.pool)
            .await
            .map(|row: (Option<i64>,)| row.0)?;

        Ok(size.unwrap_or(0))
    }

    async fn clear(&self) -> Result<()> {
        query("DELETE FROM files").execute(&self.pool).await?;
        Ok(())
    }
}
