use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{EntryError, ExhaustedError, MAX_AMOUNT, MIN_AMOUNT};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid amount '{0}': enter a whole number")]
    InvalidFormat(String),

    #[error("Amount {0} is out of range ({min}-{max})", min = MIN_AMOUNT, max = MAX_AMOUNT)]
    OutOfRange(u64),

    #[error("Amount {amount} is already used in {year} (on {held_by})")]
    DuplicateAmount {
        amount: u16,
        year: i32,
        held_by: NaiveDate,
    },

    #[error("Every amount for {0} has been used")]
    Exhausted(i32),

    #[error("Failed to persist changes: {0:#}")]
    Persistence(#[source] anyhow::Error),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Validation failures are expected outcomes that leave the ledger
    /// untouched.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AppError::InvalidFormat(_)
                | AppError::OutOfRange(_)
                | AppError::DuplicateAmount { .. }
                | AppError::Exhausted(_)
        )
    }
}

impl From<EntryError> for AppError {
    fn from(err: EntryError) -> Self {
        match err {
            EntryError::InvalidFormat(input) => AppError::InvalidFormat(input),
            EntryError::OutOfRange(value) => AppError::OutOfRange(value),
            EntryError::DuplicateAmount {
                amount,
                year,
                held_by,
            } => AppError::DuplicateAmount {
                amount,
                year,
                held_by,
            },
        }
    }
}

impl From<ExhaustedError> for AppError {
    fn from(err: ExhaustedError) -> Self {
        AppError::Exhausted(err.year)
    }
}
