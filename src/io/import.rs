use anyhow::Result;
use std::io::Read;

use crate::application::{AppError, LedgerService, parse_date};

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Validate every row against a scratch copy of the ledger without
    /// writing anything.
    pub dry_run: bool,
}

/// Importer for loading `date,amount` rows into the ledger
pub struct Importer<'a> {
    service: &'a mut LedgerService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a mut LedgerService) -> Self {
        Self { service }
    }

    /// Import entries from CSV with a `date,amount` header.
    ///
    /// Each row goes through the same validation as a manual entry, so an
    /// amount already used in its year is reported instead of imported. A
    /// blank amount clears the date. Rows that would not change anything
    /// count as skipped.
    pub async fn import_csv<R: Read>(
        &mut self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let date_col = headers.iter().position(|h| h.eq_ignore_ascii_case("date"));
        let amount_col = headers.iter().position(|h| h.eq_ignore_ascii_case("amount"));
        let (Some(date_col), Some(amount_col)) = (date_col, amount_col) else {
            anyhow::bail!("CSV header must contain 'date' and 'amount' columns");
        };

        let mut scratch = options.dry_run.then(|| self.service.ledger().clone());
        let mut result = ImportResult::default();

        for (line_num, record) in csv_reader.records().enumerate() {
            let line = line_num + 2; // +2 for header and 0-indexing

            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let date = match parse_date(record.get(date_col).unwrap_or("")) {
                Ok(d) => d,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: Some("date".to_string()),
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            let amount = record.get(amount_col).unwrap_or("");

            let outcome = match scratch.as_mut() {
                Some(ledger) => ledger.set_entry(date, amount).map_err(AppError::from),
                None => self.service.set_entry(date, amount).await,
            };

            match outcome {
                Ok(change) if change.is_mutation() => result.imported += 1,
                Ok(_) => result.skipped += 1,
                Err(AppError::Persistence(e)) => {
                    return Err(e.context(format!("import stopped at line {}", line)));
                }
                Err(e) => result.errors.push(ImportError {
                    line,
                    field: Some("amount".to_string()),
                    error: e.to_string(),
                }),
            }
        }

        Ok(result)
    }
}
