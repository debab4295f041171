//! Preferences repository trait and implementation
//!
//! A single row keyed by [`DEFAULT_PREFERENCES_ID`] holds the display
//! preferences; reads fall back to defaults when the row is absent.

use crate::error::Result;
use crate::models::{Preferences, TextSize, DEFAULT_PREFERENCES_ID};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Preferences repository interface
#[async_trait]
pub trait PreferencesRepository: Send + Sync {
    /// The persisted preferences, if any were ever saved.
    async fn get(&self) -> Result<Option<Preferences>>;

    /// Insert or overwrite the singleton preferences row.
    async fn put(&self, preferences: &Preferences) -> Result<()>;

    /// Delete the preferences row.
    async fn clear(&self) -> Result<()>;
}

/// SQLite implementation of PreferencesRepository
pub struct SqlitePreferencesRepository {
    pool: SqlitePool,
}

impl SqlitePreferencesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferencesRepository for SqlitePreferencesRepository {
    async fn get(&self) -> Result<Option<Preferences>> {
        let row = query_as::<_, (String, f64, String)>(
            "SELECT id, notation_scale, text_size FROM preferences WHERE id = ?",
        )
        .bind(DEFAULT_PREFERENCES_ID)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, notation_scale, text_size)| Preferences {
            id,
            notation_scale,
            // Unknown stored values degrade to the default size
            text_size: TextSize::parse(&text_size).unwrap_or_default(),
        }))
    }

    async fn put(&self, preferences: &Preferences) -> Result<()> {
        query(
            r#"
            INSERT INTO preferences (id, notation_scale, text_size)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                notation_scale = excluded.notation_scale,
                text_size = excluded.text_size
            "#,
        )
        .bind(&preferences.id)
        .bind(preferences.notation_scale)
        .bind(preferences.text_size.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        query("DELETE FROM preferences").execute(&self.pool).await?;
        Ok(())
    }
}
