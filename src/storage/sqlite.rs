use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::{debug, warn};

use super::{MIGRATION_001_ENTRIES, Store};
use crate::domain::RawEntries;

/// Entries kept in a SQLite `entries(date, amount)` table.
pub struct SqliteStore {
    pool: SqlitePool,
    location: String,
}

impl SqliteStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool, location: impl Into<String>) -> Self {
        Self {
            pool,
            location: location.into(),
        }
    }

    /// Connect to a SQLite database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool, database_url))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_ENTRIES)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Open (creating if needed) the database file at `path` and migrate it.
    pub async fn open(path: &Path) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", path.display());
        let store = Self::connect(&db_url).await?;
        store.migrate().await?;
        Ok(store)
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn load_all(&self) -> Result<RawEntries> {
        let rows = sqlx::query("SELECT date, CAST(amount AS TEXT) AS amount FROM entries")
            .fetch_all(&self.pool)
            .await
            .context("Failed to load entries")?;

        let mut entries = RawEntries::new();
        for row in &rows {
            let date: Option<String> = row.try_get("date").ok().flatten();
            let amount: Option<String> = row.try_get("amount").ok().flatten();
            match (date, amount) {
                (Some(date), Some(amount)) => {
                    entries.insert(date, amount);
                }
                _ => warn!("skipping entries row with missing date or amount"),
            }
        }

        debug!(location = %self.location, entries = entries.len(), "loaded");
        Ok(entries)
    }

    async fn save_all(&self, entries: &RawEntries) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to start transaction")?;

        sqlx::query("DELETE FROM entries")
            .execute(&mut *tx)
            .await
            .context("Failed to clear entries")?;

        for (date, amount) in entries {
            sqlx::query("INSERT INTO entries (date, amount) VALUES (?, ?)")
                .bind(date)
                .bind(amount)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to save entry {}", date))?;
        }

        tx.commit().await.context("Failed to commit entries")?;
        debug!(location = %self.location, entries = entries.len(), "saved");
        Ok(())
    }

    fn describe(&self) -> String {
        self.location.clone()
    }
}
