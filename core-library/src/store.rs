//! # Local Store Facade
//!
//! [`LocalStore`] owns the SQLite pool and hands out table-scoped
//! repositories. It is constructed once at application start and injected
//! into the session manager, gateway, and sync orchestrator; collaborators
//! never share an ambient global store instance.
//!
//! It also implements the full wipe used when the server permanently
//! rejects the current credentials: first a single transaction clearing
//! every table, then an independent per-table fallback so one failing
//! table cannot block the others.

use crate::db::{create_pool, DatabaseConfig};
use crate::error::Result;
use crate::repositories::{
    SqliteAssetRepository, SqlitePlaylistRepository, SqlitePreferencesRepository,
    SqliteSessionRepository, SqliteSongRepository, SqliteUserRepository,
};
use sqlx::SqlitePool;
use tracing::{error, info, warn};

/// Every logical table in the store, in wipe order.
const ALL_TABLES: [&str; 6] = [
    "songs",
    "files",
    "auth",
    "users",
    "playlists",
    "preferences",
];

/// Durable on-device storage for songs, asset blobs, auth/session records,
/// playlists, and preferences.
#[derive(Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    /// Open (or create) the database at the configured location and run
    /// pending migrations.
    pub async fn open(config: DatabaseConfig) -> Result<Self> {
        let pool = create_pool(config).await?;
        Ok(Self { pool })
    }

    /// In-memory store with migrations applied; used by tests.
    pub async fn open_in_memory() -> Result<Self> {
        Self::open(DatabaseConfig::in_memory()).await
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn songs(&self) -> SqliteSongRepository {
        SqliteSongRepository::new(self.pool.clone())
    }

    pub fn assets(&self) -> SqliteAssetRepository {
        SqliteAssetRepository::new(self.pool.clone())
    }

    pub fn session(&self) -> SqliteSessionRepository {
        SqliteSessionRepository::new(self.pool.clone())
    }

    pub fn users(&self) -> SqliteUserRepository {
        SqliteUserRepository::new(self.pool.clone())
    }

    pub fn playlists(&self) -> SqlitePlaylistRepository {
        SqlitePlaylistRepository::new(self.pool.clone())
    }

    pub fn preferences(&self) -> SqlitePreferencesRepository {
        SqlitePreferencesRepository::new(self.pool.clone())
    }

    /// Clear every table, best-effort.
    ///
    /// First attempts a single transaction covering all six tables; if
    /// that fails, falls back to clearing each table independently so a
    /// single failing table does not block the rest. Individual fallback
    /// failures are logged and swallowed; the caller proceeds to forced
    /// re-authentication regardless.
    pub async fn wipe_all(&self) {
        info!("Wiping all local data");

        match self.wipe_all_transactional().await {
            Ok(()) => {
                info!("All local data cleared");
            }
            Err(e) => {
                warn!(error = %e, "Transactional wipe failed, clearing tables individually");
                for table in ALL_TABLES {
                    let statement = format!("DELETE FROM {}", table);
                    if let Err(e) = sqlx::query(&statement).execute(&self.pool).await {
                        error!(table, error = %e, "Failed to clear table");
                    }
                }
            }
        }
    }

    async fn wipe_all_transactional(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for table in ALL_TABLES {
            let statement = format!("DELETE FROM {}", table);
            sqlx::query(&statement).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
