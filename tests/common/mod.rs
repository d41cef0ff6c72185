// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::NaiveDate;
use savings365::LedgerService;
use savings365::domain::RawEntries;
use savings365::storage::{JsonFileStore, Store};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

/// Helper to create a test service backed by a JSON file in a temp directory
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let path = data_path(&temp_dir);
    let service = LedgerService::load(Box::new(JsonFileStore::new(path))).await;
    Ok((service, temp_dir))
}

pub fn data_path(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("savings_data.json")
}

/// Helper to parse a date string into NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Read what is currently on disk through a fresh store
pub async fn load_raw(path: &Path) -> Result<RawEntries> {
    JsonFileStore::new(path).load_all().await
}

/// A JSON file store whose writes can be made to fail on demand.
pub struct FlakyStore {
    inner: JsonFileStore,
    fail_writes: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn new(path: impl Into<PathBuf>) -> (Self, Arc<AtomicBool>) {
        let fail_writes = Arc::new(AtomicBool::new(false));
        let store = Self {
            inner: JsonFileStore::new(path),
            fail_writes: fail_writes.clone(),
        };
        (store, fail_writes)
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn load_all(&self) -> Result<RawEntries> {
        self.inner.load_all().await
    }

    async fn save_all(&self, entries: &RawEntries) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("disk full");
        }
        self.inner.save_all(entries).await
    }

    fn describe(&self) -> String {
        format!("flaky {}", self.inner.describe())
    }
}

/// A store that cannot be read at all.
pub struct UnreadableStore;

#[async_trait]
impl Store for UnreadableStore {
    async fn load_all(&self) -> Result<RawEntries> {
        bail!("permission denied")
    }

    async fn save_all(&self, _entries: &RawEntries) -> Result<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "unreadable".to_string()
    }
}
