use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

use super::{Store, read_if_exists, write_replacing};
use crate::domain::RawEntries;

/// Tabular `date,amount` records, one row per filled date, the same shape
/// as a spreadsheet with a header row.
pub struct CsvFileStore {
    path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct CsvRecord {
    date: String,
    amount: String,
}

impl CsvFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Store for CsvFileStore {
    async fn load_all(&self) -> Result<RawEntries> {
        let Some(bytes) = read_if_exists(&self.path).await? else {
            debug!(path = %self.path.display(), "no data file yet");
            return Ok(RawEntries::new());
        };
        Ok(parse_records(&bytes))
    }

    async fn save_all(&self, entries: &RawEntries) -> Result<()> {
        let mut payload = Vec::new();
        {
            let mut writer = csv::Writer::from_writer(&mut payload);
            for (date, amount) in entries {
                writer
                    .serialize(CsvRecord {
                        date: date.clone(),
                        amount: amount.clone(),
                    })
                    .context("Failed to encode CSV row")?;
            }
            // An empty ledger still gets a header row
            if entries.is_empty() {
                writer.write_record(["date", "amount"])?;
            }
            writer.flush().context("Failed to flush CSV")?;
        }

        write_replacing(&self.path, &payload).await?;
        debug!(path = %self.path.display(), entries = entries.len(), "saved");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

fn parse_records(bytes: &[u8]) -> RawEntries {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let mut entries = RawEntries::new();
    for (line_num, result) in reader.deserialize::<CsvRecord>().enumerate() {
        match result {
            Ok(record) => {
                entries.insert(record.date, record.amount);
            }
            // +2 for header and 0-indexing
            Err(e) => warn!(line = line_num + 2, error = %e, "skipping CSV row"),
        }
    }
    entries
}
