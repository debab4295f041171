//! Song repository trait and implementation
//!
//! The song table is replaced wholesale on every sync. There is no
//! incremental reconciliation: stale songs dropped from the remote
//! catalog disappear locally on the next successful run.

use crate::error::{LibraryError, Result};
use crate::models::Song;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Song repository interface for data access operations
#[async_trait]
pub trait SongRepository: Send + Sync {
    /// Replace the entire song table with the given catalog.
    ///
    /// Runs as a single transaction: clear, then bulk-insert. Either the
    /// new catalog is fully visible or the previous one is untouched.
    async fn replace_all(&self, songs: &[Song]) -> Result<()>;

    /// All songs ordered by their display ordinal.
    async fn all(&self) -> Result<Vec<Song>>;

    /// Find a song by its durable id.
    ///
    /// # Returns
    /// - `Ok(Some(song))` if found
    /// - `Ok(None)` if not found
    async fn find_by_id(&self, id: &str) -> Result<Option<Song>>;

    /// Count songs in the catalog.
    async fn count(&self) -> Result<i64>;

    /// Remove every song.
    async fn clear(&self) -> Result<()>;
}

/// SQLite implementation of SongRepository
pub struct SqliteSongRepository {
    pool: SqlitePool,
}

impl SqliteSongRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn decode(id: &str, payload: &str) -> Result<Song> {
        serde_json::from_str(payload).map_err(|e| LibraryError::CorruptPayload {
            entity_type: "Song".to_string(),
            id: id.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl SongRepository for SqliteSongRepository {
    async fn replace_all(&self, songs: &[Song]) -> Result<()> {
        for song in songs {
            song.validate().map_err(|e| LibraryError::InvalidInput {
                field: "Song".to_string(),
                message: e,
            })?;
        }

        let mut tx = self.pool.begin().await?;

        query("DELETE FROM songs").execute(&mut *tx).await?;

        for song in songs {
            let payload =
                serde_json::to_string(song).map_err(|e| LibraryError::InvalidInput {
                    field: "Song".to_string(),
                    message: format!("Serialization failed: {}", e),
                })?;

            query("INSERT INTO songs (id, ordinal, title, payload) VALUES (?, ?, ?, ?)")
                .bind(&song.id)
                .bind(song.ordinal as i64)
                .bind(&song.title)
                .bind(payload)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Song>> {
        let rows = query_as::<_, (String, String)>(
            "SELECT id, payload FROM songs ORDER BY ordinal ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|(id, payload)| Self::decode(id, payload))
            .collect()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Song>> {
        let row = query_as::<_, (String, String)>("SELECT id, payload FROM songs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|(id, payload)| Self::decode(&id, &payload))
            .transpose()
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = query_as("SELECT COUNT(*) as count FROM songs")
            .fetch_one(&self.pool)
            .await
            .map(|row: (i64,)| row.0)?;

        Ok(count)
    }

    async fn clear(&self) -> Result<()> {
        query("DELETE FROM songs").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::{Author, Verse};

    fn sample_song(id: &str, ordinal: u32, title: &str) -> Song {
        Song {
            id: id.to_string(),
            ordinal,
            title: title.to_string(),
            verses: vec![Verse {
                number: 1,
                text: "Nun danket alle Gott".to_string(),
                annotation: None,
                suggested_revision: None,
            }],
            text_authors: vec![Author {
                first_name: "Martin".to_string(),
                last_name: "Rinckart".to_string(),
                year_of_death: Some(1649),
            }],
            melodies: vec![],
            melody_authors: vec![],
            note_assets: vec![],
            categories: vec![],
        }
    }

    #[tokio::test]
    async fn test_replace_all_and_read_back() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteSongRepository::new(pool);

        let songs = vec![
            sample_song("s1", 1, "First"),
            sample_song("s2", 2, "Second"),
        ];
        repo.replace_all(&songs).await.unwrap();

        let all = repo.all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "s1");
        assert_eq!(all[0].verses[0].text, "Nun danket alle Gott");
        assert_eq!(all[1].text_authors[0].year_of_death, Some(1649));
    }

    #[tokio::test]
    async fn test_replace_all_drops_stale_songs() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteSongRepository::new(pool);

        repo.replace_all(&[
            sample_song("old1", 1, "Old"),
            sample_song("old2", 2, "Older"),
            sample_song("kept", 3, "Kept"),
        ])
        .await
        .unwrap();

        // Second sync returns a different catalog; no stale entries survive.
        repo.replace_all(&[sample_song("kept", 1, "Kept"), sample_song("new1", 2, "New")])
            .await
            .unwrap();

        let all = repo.all().await.unwrap();
        let ids: Vec<_> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["kept", "new1"]);
    }

    #[tokio::test]
    async fn test_all_is_ordered_by_ordinal() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteSongRepository::new(pool);

        // Insertion order deliberately scrambled
        repo.replace_all(&[
            sample_song("c", 3, "C"),
            sample_song("a", 1, "A"),
            sample_song("b", 2, "B"),
        ])
        .await
        .unwrap();

        let all = repo.all().await.unwrap();
        let ordinals: Vec<_> = all.iter().map(|s| s.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteSongRepository::new(pool);

        repo.replace_all(&[sample_song("s1", 1, "One")]).await.unwrap();

        assert!(repo.find_by_id("s1").await.unwrap().is_some());
        assert!(repo.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_song_rejected() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteSongRepository::new(pool);

        let mut song = sample_song("s1", 1, "One");
        song.ordinal = 0;

        let result = repo.replace_all(&[song]).await;
        assert!(result.is_err());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_count_and_clear() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteSongRepository::new(pool);

        repo.replace_all(&[sample_song("s1", 1, "One"), sample_song("s2", 2, "Two")])
            .await
            .unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);

        repo.clear().await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
