use std::str::FromStr;

use serde::{Serialize, de::DeserializeOwned};
use sqlx::{
    Pool, Row, Sqlite,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::{debug, info, instrument};

use crate::error::AppError;

pub const CURRENT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;

/// Well-known keys, each holding one JSON document.
pub mod keys {
    pub const CURRENT_USER: &str = "currentUser";
    pub const USERS: &str = "users";
    pub const ACTIVE_SESSIONS: &str = "activeSessions";
    pub const ADMIN_DATABASE: &str = "adminDatabase";
}

/// Process-wide key/value store. Every write replaces the whole value of
/// its key; there is no locking across keys.
#[derive(Clone, Debug)]
pub struct KvStore {
    pool: Pool<Sqlite>,
}

impl KvStore {
    #[instrument]
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        info!("Opening key-value store");
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: Pool<Sqlite>) -> Result<Self, AppError> {
        sqlx::raw_sql(CURRENT_SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self, AppError> {
        Self::connect("sqlite::memory:").await
    }

    #[instrument(skip(self))]
    pub async fn get_raw(&self, key: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get::<String, _>("value")))
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        match self.get_raw(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Reads a list value, treating a missing key as empty.
    pub async fn get_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, AppError> {
        Ok(self.get(key).await?.unwrap_or_default())
    }

    #[instrument(skip(self, value))]
    pub async fn set_raw(&self, key: &str, value: &str) -> Result<(), AppError> {
        debug!(bytes = value.len(), "Writing key");
        sqlx::query(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, &raw).await
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, key: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn contains(&self, key: &str) -> Result<bool, AppError> {
        Ok(self.get_raw(key).await?.is_some())
    }
}
