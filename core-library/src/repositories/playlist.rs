//! Playlist repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::Playlist;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Playlist repository interface for data access operations
#[async_trait]
pub trait PlaylistRepository: Send + Sync {
    /// Find a playlist by its ID
    ///
    /// # Returns
    /// - `Ok(Some(playlist))` if found
    /// - `Ok(None)` if not found
    async fn find_by_id(&self, id: &str) -> Result<Option<Playlist>>;

    /// Insert a new playlist
    ///
    /// # Errors
    /// Returns error if:
    /// - Playlist with same ID already exists
    /// - Playlist validation fails
    async fn insert(&self, playlist: &Playlist) -> Result<()>;

    /// Update an existing playlist (name, emoji, song ids, timestamps)
    ///
    /// # Errors
    /// Returns error if:
    /// - Playlist does not exist
    /// - Playlist validation fails
    async fn update(&self, playlist: &Playlist) -> Result<()>;

    /// Delete a playlist by ID
    ///
    /// # Returns
    /// - `Ok(true)` if playlist was deleted
    /// - `Ok(false)` if playlist was not found
    async fn delete(&self, id: &str) -> Result<bool>;

    /// All playlists, newest first.
    async fn all(&self) -> Result<Vec<Playlist>>;

    /// Count total playlists
    async fn count(&self) -> Result<i64>;

    /// Remove every playlist.
    async fn clear(&self) -> Result<()>;
}

/// SQLite implementation of PlaylistRepository
pub struct SqlitePlaylistRepository {
    pool: SqlitePool,
}

impl SqlitePlaylistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn decode_row(row: (String, String, String, String, i64, i64)) -> Result<Playlist> {
        let (id, name, emoji, song_ids_json, created_at, updated_at) = row;
        let song_ids =
            serde_json::from_str(&song_ids_json).map_err(|e| LibraryError::CorruptPayload {
                entity_type: "Playlist".to_string(),
                id: id.clone(),
                message: e.to_string(),
            })?;

        Ok(Playlist {
            id,
            name,
            emoji,
            song_ids,
            created_at,
            updated_at,
        })
    }

    fn encode_song_ids(playlist: &Playlist) -> Result<String> {
        serde_json::to_string(&playlist.song_ids).map_err(|e| LibraryError::InvalidInput {
            field: "Playlist".to_string(),
            message: format!("Serialization failed: {}", e),
        })
    }
}

#[async_trait]
impl PlaylistRepository for SqlitePlaylistRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Playlist>> {
        let row = query_as::<_, (String, String, String, String, i64, i64)>(
            "SELECT id, name, emoji, song_ids, created_at, updated_at FROM playlists WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::decode_row).transpose()
    }

    async fn insert(&self, playlist: &Playlist) -> Result<()> {
        playlist.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Playlist".to_string(),
            message: e,
        })?;

        let song_ids = Self::encode_song_ids(playlist)?;

        query(
            r#"
            INSERT INTO playlists (id, name, emoji, song_ids, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&playlist.id)
        .bind(&playlist.name)
        .bind(&playlist.emoji)
        .bind(song_ids)
        .bind(playlist.created_at)
        .bind(playlist.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, playlist: &Playlist) -> Result<()> {
        playlist.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Playlist".to_string(),
            message: e,
        })?;

        let song_ids = Self::encode_song_ids(playlist)?;

        let result = query(
            r#"
            UPDATE playlists
            SET name = ?, emoji = ?, song_ids = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&playlist.name)
        .bind(&playlist.emoji)
        .bind(song_ids)
        .bind(playlist.updated_at)
        .bind(&playlist.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::NotFound {
                entity_type: "Playlist".to_string(),
                id: playlist.id.clone(),
            });
        }

        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = query("DELETE FROM playlists WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn all(&self) -> Result<Vec<Playlist>> {
        let rows = query_as::<_, (String, String, String, String, i64, i64)>(
            "SELECT id, name, emoji, song_ids, created_at, updated_at FROM playlists \
             ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::decode_row).collect()
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM playlists")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }

    async fn clear(&self) -> Result<()> {
        query("DELETE FROM playlists").execute(&self.pool).await?;
        Ok(())
    }
}
