use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::{Store, read_if_exists, write_replacing};
use crate::domain::RawEntries;

/// A single JSON object mapping ISO dates to amounts:
///
/// ```json
/// { "2025-01-01": "12", "2025-01-02": "200" }
/// ```
///
/// Numeric values are accepted on read and stored back as strings.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn load_all(&self) -> Result<RawEntries> {
        let Some(bytes) = read_if_exists(&self.path).await? else {
            debug!(path = %self.path.display(), "no data file yet");
            return Ok(RawEntries::new());
        };
        parse_entries(&bytes).with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    async fn save_all(&self, entries: &RawEntries) -> Result<()> {
        let payload = serde_json::to_vec_pretty(entries).context("Failed to encode entries")?;
        write_replacing(&self.path, &payload).await?;
        debug!(path = %self.path.display(), entries = entries.len(), "saved");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

fn parse_entries(bytes: &[u8]) -> Result<RawEntries> {
    let value: Value = serde_json::from_slice(bytes)?;
    let object = value
        .as_object()
        .ok_or_else(|| anyhow!("expected a JSON object of date -> amount"))?;

    let mut entries = RawEntries::new();
    for (date, amount) in object {
        match amount {
            Value::String(s) => {
                entries.insert(date.clone(), s.clone());
            }
            Value::Number(n) => {
                entries.insert(date.clone(), n.to_string());
            }
            other => warn!(%date, value = %other, "skipping non-scalar amount"),
        }
    }
    Ok(entries)
}
