//! Session and user record repositories
//!
//! Both tables are singletons: at most one session and one user record
//! exist locally at any time. Writers replace the full row inside a
//! transaction (clear, then insert) so readers never observe two rows,
//! and an interrupted write leaves at worst an empty table, which later
//! reads treat as "signed out".

use crate::error::Result;
use crate::models::{SessionRecord, UserRecord};
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Session record repository over the `auth` table
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// The current session, if one is persisted.
    async fn get(&self) -> Result<Option<SessionRecord>>;

    /// Replace the singleton session row.
    async fn replace(&self, record: &SessionRecord) -> Result<()>;

    /// Delete the session row.
    async fn clear(&self) -> Result<()>;
}

/// User record repository over the `users` table
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// The current user, if one is persisted.
    async fn get(&self) -> Result<Option<UserRecord>>;

    /// Replace the singleton user row.
    async fn replace(&self, record: &UserRecord) -> Result<()>;

    /// Delete the user row.
    async fn clear(&self) -> Result<()>;
}

/// SQLite implementation of SessionRepository
pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn get(&self) -> Result<Option<SessionRecord>> {
        let record = query_as::<_, SessionRecord>("SELECT * FROM auth LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    async fn replace(&self, record: &SessionRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        query("DELETE FROM auth").execute(&mut *tx).await?;
        query(
            "INSERT INTO auth (id, access_token, refresh_token, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.access_token)
        .bind(&record.refresh_token)
        .bind(record.expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        query("DELETE FROM auth").execute(&self.pool).await?;
        Ok(())
    }
}

/// SQLite implementation of UserRepository
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn get(&self) -> Result<Option<UserRecord>> {
        let record = query_as::<_, UserRecord>("SELECT * FROM users LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    async fn replace(&self, record: &UserRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        query("DELETE FROM users").execute(&mut *tx).await?;
        query(
            r#"
            INSERT INTO users (id, email, first_name, last_name, role, activated, skip_auth)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.email)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.role)
        .bind(record.activated)
        .bind(record.skip_auth)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        query("DELETE FROM users").execute(&self.pool).await?;
        Ok(())
    }
}
