mod csv_file;
mod json_file;
mod sqlite;

pub use csv_file::*;
pub use json_file::*;
pub use sqlite::*;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::domain::RawEntries;

/// SQL migration for the entries table
pub const MIGRATION_001_ENTRIES: &str = include_str!("migrations/001_entries.sql");

/// Durable home of the ledger. Backends only move raw `date -> amount`
/// strings; validation happens in the domain layer.
#[async_trait]
pub trait Store: Send + Sync {
    /// Load every persisted record. A store that has never been written
    /// returns an empty map.
    async fn load_all(&self) -> Result<RawEntries>;

    /// Replace the persisted contents with `entries`.
    async fn save_all(&self, entries: &RawEntries) -> Result<()>;

    /// Human-readable location, for logs and CLI output.
    fn describe(&self) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Json,
    Csv,
    Sqlite,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Json => "json",
            StoreKind::Csv => "csv",
            StoreKind::Sqlite => "sqlite",
        }
    }

    /// Guess the backend from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "json" => Some(StoreKind::Json),
            "csv" => Some(StoreKind::Csv),
            "db" | "sqlite" | "sqlite3" => Some(StoreKind::Sqlite),
            _ => None,
        }
    }
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(StoreKind::Json),
            "csv" => Ok(StoreKind::Csv),
            "sqlite" | "db" => Ok(StoreKind::Sqlite),
            _ => Err(format!("unknown store backend: {}", s)),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Open the store of the given kind at `path`.
pub async fn open_store(kind: StoreKind, path: &Path) -> Result<Box<dyn Store>> {
    let store: Box<dyn Store> = match kind {
        StoreKind::Json => Box::new(JsonFileStore::new(path)),
        StoreKind::Csv => Box::new(CsvFileStore::new(path)),
        StoreKind::Sqlite => Box::new(SqliteStore::open(path).await?),
    };
    Ok(store)
}

/// Write `bytes` to a sibling temp file, then rename it over `path`, so a
/// failed write never leaves a truncated file behind.
pub(crate) async fn write_replacing(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let tmp = temp_sibling(path);
    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    if let Err(err) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(err).with_context(|| format!("Failed to replace {}", path.display()));
    }
    Ok(())
}

/// Read a whole file, mapping "does not exist" to `None`.
pub(crate) async fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("Failed to read {}", path.display())),
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
