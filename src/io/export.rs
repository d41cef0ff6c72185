use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{Amount, DATE_FORMAT};

/// Ledger snapshot for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    /// `None` when every year was exported.
    pub year: Option<i32>,
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub date: NaiveDate,
    pub amount: u16,
}

/// Exporter for writing ledger entries out as CSV or JSON
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    fn selected(&self, year: Option<i32>) -> Vec<(NaiveDate, Amount)> {
        let ledger = self.service.ledger();
        match year {
            Some(year) => ledger.entries_for_year(year).collect(),
            None => ledger.entries().collect(),
        }
    }

    /// Export entries to CSV format, oldest first
    pub fn export_csv<W: Write>(&self, writer: W, year: Option<i32>) -> Result<usize> {
        let entries = self.selected(year);
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["date", "amount"])?;
        for (date, amount) in &entries {
            csv_writer.write_record([
                date.format(DATE_FORMAT).to_string(),
                amount.to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(entries.len())
    }

    /// Export entries as a JSON snapshot
    pub fn export_json<W: Write>(&self, mut writer: W, year: Option<i32>) -> Result<LedgerSnapshot> {
        let entries = self
            .selected(year)
            .into_iter()
            .map(|(date, amount)| SnapshotEntry {
                date,
                amount: amount.get(),
            })
            .collect();

        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            year,
            entries,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
