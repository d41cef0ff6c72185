use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::domain::{DATE_FORMAT, DateRange, DayEntry, EntryChange, YearlyLedger};
use crate::storage::{Store, StoreKind, open_store};

use super::{AppError, YearSummary};

/// Application service providing the ledger operations to any client
/// (CLI, importer, tests).
///
/// The ledger is loaded once when the service is built and written back to
/// the store after every accepted change. A change is only reported as
/// successful once the store has accepted it.
pub struct LedgerService {
    ledger: YearlyLedger,
    store: Box<dyn Store>,
}

impl LedgerService {
    /// Load the ledger from `store`.
    ///
    /// An unreadable store yields an empty ledger, and malformed records are
    /// dropped one by one; both are logged rather than returned.
    pub async fn load(store: Box<dyn Store>) -> Self {
        let raw = match store.load_all().await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    store = %store.describe(),
                    error = %format!("{:#}", err),
                    "failed to load data, starting empty"
                );
                Default::default()
            }
        };

        let (ledger, discarded) = YearlyLedger::from_raw(&raw);
        for record in &discarded {
            warn!(
                key = %record.key,
                value = %record.value,
                reason = %record.reason,
                "discarding stored record"
            );
        }
        debug!(store = %store.describe(), entries = ledger.len(), "ledger loaded");

        Self { ledger, store }
    }

    /// Open the store of `kind` at `path` and load from it.
    ///
    /// Unreadable contents degrade to an empty ledger as in [`Self::load`].
    /// A store that cannot be opened at all (a SQLite file that is not a
    /// database, a failed migration) is an error instead: there would be
    /// nowhere to persist changes, and every later write would fail.
    pub async fn open(kind: StoreKind, path: &Path) -> Result<Self, AppError> {
        let store = match open_store(kind, path).await {
            Ok(store) => store,
            Err(err) => {
                warn!(
                    backend = %kind,
                    path = %path.display(),
                    error = %format!("{:#}", err),
                    "failed to open store"
                );
                return Err(AppError::Persistence(err));
            }
        };
        Ok(Self::load(store).await)
    }

    pub fn ledger(&self) -> &YearlyLedger {
        &self.ledger
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    // ========================
    // Queries
    // ========================

    pub fn get(&self, date: NaiveDate) -> Option<u16> {
        self.ledger.get(date)
    }

    pub fn used_amounts(&self, year: i32) -> BTreeSet<u16> {
        self.ledger.used_amounts(year)
    }

    pub fn total_saved(&self, year: i32) -> u32 {
        self.ledger.total_saved(year)
    }

    pub fn remaining_amounts(&self, year: i32) -> Vec<u16> {
        self.ledger.remaining_amounts(year)
    }

    /// A random unused amount for `year`; nothing is reserved.
    pub fn random_suggestion(&self, year: i32) -> Result<u16, AppError> {
        Ok(self.ledger.random_suggestion(year)?)
    }

    pub fn entries_in(&self, range: DateRange) -> Vec<DayEntry> {
        self.ledger.entries_in(range)
    }

    pub fn year_summary(&self, year: i32) -> YearSummary {
        YearSummary::for_year(&self.ledger, year)
    }

    // ========================
    // Mutations
    // ========================

    /// Set `date` to `raw_input`, or clear it when the input is blank.
    ///
    /// Rejected input leaves the ledger untouched. If the store refuses the
    /// write, the date is put back to its previous value and
    /// `AppError::Persistence` is returned.
    pub async fn set_entry(
        &mut self,
        date: NaiveDate,
        raw_input: &str,
    ) -> Result<EntryChange, AppError> {
        let change = self.ledger.set_entry(date, raw_input)?;
        if !change.is_mutation() {
            debug!(%date, ?change, "no change to persist");
            return Ok(change);
        }

        if let Err(err) = self.store.save_all(&self.ledger.to_raw()).await {
            self.ledger.restore(date, change.previous());
            warn!(
                %date,
                error = %format!("{:#}", err),
                "store write failed, change rolled back"
            );
            return Err(AppError::Persistence(err));
        }

        info!(%date, ?change, "entry saved");
        Ok(change)
    }

    /// Remove the entry for `date`, if any.
    pub async fn clear_entry(&mut self, date: NaiveDate) -> Result<EntryChange, AppError> {
        self.set_entry(date, "").await
    }
}

/// Parse an ISO 8601 (`YYYY-MM-DD`) date.
pub fn parse_date(date_str: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(date_str.trim(), DATE_FORMAT)
        .map_err(|_| AppError::InvalidDate(format!("'{}' (expected YYYY-MM-DD)", date_str)))
}
