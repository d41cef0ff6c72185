use chrono::{Datelike, NaiveDate};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::{Amount, AmountError, DateRange, is_blank, parse_amount};

/// Date format used for every persisted key.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Persisted form of the ledger: ISO date string -> raw amount string.
pub type RawEntries = BTreeMap<String, String>;

/// The savings ledger: at most one amount per date, and within a calendar
/// year every amount is used at most once.
///
/// Construction from persisted data discards anything that would break those
/// rules, so every method can assume they hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct YearlyLedger {
    entries: BTreeMap<NaiveDate, Amount>,
}

/// What a successful `set_entry` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryChange {
    Inserted(Amount),
    Updated { previous: Amount, current: Amount },
    /// The date already held this amount.
    Unchanged(Amount),
    Removed(Amount),
    /// Clearing a date that had no entry.
    AlreadyEmpty,
}

impl EntryChange {
    /// The value stored at the date before the change.
    pub fn previous(&self) -> Option<Amount> {
        match *self {
            EntryChange::Inserted(_) | EntryChange::AlreadyEmpty => None,
            EntryChange::Updated { previous, .. } => Some(previous),
            EntryChange::Unchanged(amount) | EntryChange::Removed(amount) => Some(amount),
        }
    }

    /// The value stored at the date after the change.
    pub fn current(&self) -> Option<Amount> {
        match *self {
            EntryChange::Inserted(amount) | EntryChange::Unchanged(amount) => Some(amount),
            EntryChange::Updated { current, .. } => Some(current),
            EntryChange::Removed(_) | EntryChange::AlreadyEmpty => None,
        }
    }

    /// Whether the ledger contents differ from before the change.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, EntryChange::Unchanged(_) | EntryChange::AlreadyEmpty)
    }
}

/// A single row of a list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayEntry {
    pub date: NaiveDate,
    pub amount: Option<u16>,
}

/// A persisted record that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscardedRecord {
    pub key: String,
    pub value: String,
    pub reason: String,
}

impl YearlyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from persisted records, skipping the ones that are
    /// malformed. When two dates of the same year carry the same amount the
    /// earlier date keeps it.
    pub fn from_raw(raw: &RawEntries) -> (Self, Vec<DiscardedRecord>) {
        let mut discarded = Vec::new();
        let mut parsed = Vec::with_capacity(raw.len());

        for (key, value) in raw {
            let date = match NaiveDate::parse_from_str(key.trim(), DATE_FORMAT) {
                Ok(date) => date,
                Err(e) => {
                    discarded.push(DiscardedRecord {
                        key: key.clone(),
                        value: value.clone(),
                        reason: format!("invalid date: {}", e),
                    });
                    continue;
                }
            };
            match parse_amount(value) {
                Ok(amount) => parsed.push((date, amount, key)),
                Err(e) => discarded.push(DiscardedRecord {
                    key: key.clone(),
                    value: value.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        parsed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.2.cmp(b.2)));

        let mut ledger = Self::new();
        let mut used: BTreeSet<(i32, Amount)> = BTreeSet::new();
        for (date, amount, key) in parsed {
            let reason = if ledger.entries.contains_key(&date) {
                Some(format!("date {} appears more than once", date))
            } else if !used.insert((date.year(), amount)) {
                Some(format!("amount {} already used in {}", amount, date.year()))
            } else {
                None
            };

            match reason {
                Some(reason) => discarded.push(DiscardedRecord {
                    key: key.clone(),
                    value: raw.get(key).cloned().unwrap_or_default(),
                    reason,
                }),
                None => {
                    ledger.entries.insert(date, amount);
                }
            }
        }

        (ledger, discarded)
    }

    /// Persisted form of the current contents.
    pub fn to_raw(&self) -> RawEntries {
        self.entries
            .iter()
            .map(|(date, amount)| (date.format(DATE_FORMAT).to_string(), amount.to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<u16> {
        self.entries.get(&date).map(|a| a.get())
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = (NaiveDate, Amount)> + '_ {
        self.entries.iter().map(|(d, a)| (*d, *a))
    }

    /// Entries dated in `year`, oldest first.
    pub fn entries_for_year(&self, year: i32) -> impl Iterator<Item = (NaiveDate, Amount)> + '_ {
        self.entries().filter(move |(date, _)| date.year() == year)
    }

    /// One row per date in `range`, oldest first, unfilled dates included.
    pub fn entries_in(&self, range: DateRange) -> Vec<DayEntry> {
        range
            .days()
            .map(|date| DayEntry {
                date,
                amount: self.get(date),
            })
            .collect()
    }

    /// Years that have at least one entry, ascending.
    pub fn years(&self) -> Vec<i32> {
        let years: BTreeSet<i32> = self.entries.keys().map(|d| d.year()).collect();
        years.into_iter().collect()
    }

    pub fn used_amounts(&self, year: i32) -> BTreeSet<u16> {
        self.entries_for_year(year).map(|(_, a)| a.get()).collect()
    }

    pub fn total_saved(&self, year: i32) -> u32 {
        self.used_amounts(year).into_iter().map(u32::from).sum()
    }

    /// Amounts not yet used in `year`, ascending.
    pub fn remaining_amounts(&self, year: i32) -> Vec<u16> {
        let used = self.used_amounts(year);
        Amount::all()
            .map(Amount::get)
            .filter(|value| !used.contains(value))
            .collect()
    }

    /// A uniformly random unused amount for `year`. Does not reserve it.
    pub fn random_suggestion(&self, year: i32) -> Result<u16, ExhaustedError> {
        self.random_suggestion_with(year, &mut rand::thread_rng())
    }

    pub fn random_suggestion_with<R: Rng + ?Sized>(
        &self,
        year: i32,
        rng: &mut R,
    ) -> Result<u16, ExhaustedError> {
        self.remaining_amounts(year)
            .choose(rng)
            .copied()
            .ok_or(ExhaustedError { year })
    }

    /// Check `raw_input` for `date` without touching the ledger.
    /// `Ok(None)` means the input clears the date.
    pub fn validate(&self, date: NaiveDate, raw_input: &str) -> Result<Option<Amount>, EntryError> {
        if is_blank(raw_input) {
            return Ok(None);
        }

        let amount = parse_amount(raw_input)?;

        let holder = self
            .entries_for_year(date.year())
            .find(|(other, a)| *a == amount && *other != date);
        if let Some((held_by, _)) = holder {
            return Err(EntryError::DuplicateAmount {
                amount: amount.get(),
                year: date.year(),
                held_by,
            });
        }

        Ok(Some(amount))
    }

    /// Validate and apply `raw_input` to `date` in memory.
    /// Blank input removes the entry; anything else must be an unused amount.
    pub fn set_entry(&mut self, date: NaiveDate, raw_input: &str) -> Result<EntryChange, EntryError> {
        let change = match self.validate(date, raw_input)? {
            None => match self.entries.remove(&date) {
                Some(previous) => EntryChange::Removed(previous),
                None => EntryChange::AlreadyEmpty,
            },
            Some(amount) => match self.entries.insert(date, amount) {
                None => EntryChange::Inserted(amount),
                Some(previous) if previous == amount => EntryChange::Unchanged(amount),
                Some(previous) => EntryChange::Updated {
                    previous,
                    current: amount,
                },
            },
        };
        Ok(change)
    }

    /// Put `date` back to `previous`, undoing an earlier `set_entry`.
    pub fn restore(&mut self, date: NaiveDate, previous: Option<Amount>) {
        match previous {
            Some(amount) => {
                self.entries.insert(date, amount);
            }
            None => {
                self.entries.remove(&date);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    InvalidFormat(String),
    OutOfRange(u64),
    DuplicateAmount {
        amount: u16,
        year: i32,
        held_by: NaiveDate,
    },
}

impl From<AmountError> for EntryError {
    fn from(err: AmountError) -> Self {
        match err {
            AmountError::InvalidFormat(input) => EntryError::InvalidFormat(input),
            AmountError::OutOfRange(value) => EntryError::OutOfRange(value),
        }
    }
}

impl fmt::Display for EntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryError::InvalidFormat(input) => {
                write!(f, "{}", AmountError::InvalidFormat(input.clone()))
            }
            EntryError::OutOfRange(value) => write!(f, "{}", AmountError::OutOfRange(*value)),
            EntryError::DuplicateAmount {
                amount,
                year,
                held_by,
            } => write!(
                f,
                "{} is already used in {} (on {})",
                amount, year, held_by
            ),
        }
    }
}

impl std::error::Error for EntryError {}

/// Every amount of the year has been used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExhaustedError {
    pub year: i32,
}

impl fmt::Display for ExhaustedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "all amounts for {} have been used", self.year)
    }
}

impl std::error::Error for ExhaustedError {}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::domain::{MAX_AMOUNT, YEARLY_TARGET};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn raw(pairs: &[(&str, &str)]) -> RawEntries {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_year(year: i32) -> YearlyLedger {
        let mut ledger = YearlyLedger::new();
        let mut day = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
        for value in 1..=MAX_AMOUNT {
            ledger.set_entry(day, &value.to_string()).unwrap();
            day = day.succ_opt().unwrap();
        }
        ledger
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = YearlyLedger::new();
        assert!(ledger.used_amounts(2025).is_empty());
        assert_eq!(ledger.total_saved(2025), 0);
        assert_eq!(ledger.remaining_amounts(2025).len(), 365);
    }

    #[test]
    fn test_set_and_read_back() {
        let mut ledger = YearlyLedger::new();
        let d = date("2025-03-14");

        assert_eq!(
            ledger.set_entry(d, "200"),
            Ok(EntryChange::Inserted(Amount::new(200).unwrap()))
        );
        assert_eq!(ledger.get(d), Some(200));

        // Re-affirming the same value is not a duplicate of itself
        assert_eq!(
            ledger.set_entry(d, "200"),
            Ok(EntryChange::Unchanged(Amount::new(200).unwrap()))
        );
    }

    #[test]
    fn test_overwrite_frees_previous_value() {
        let mut ledger = YearlyLedger::new();
        let d1 = date("2025-01-01");
        let d2 = date("2025-01-02");

        ledger.set_entry(d1, "10").unwrap();
        let change = ledger.set_entry(d1, "11").unwrap();
        assert_eq!(change.previous().map(Amount::get), Some(10));
        assert_eq!(change.current().map(Amount::get), Some(11));

        // 10 is free again
        assert!(ledger.set_entry(d2, "10").is_ok());
        assert_eq!(ledger.used_amounts(2025), BTreeSet::from([10, 11]));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut ledger = YearlyLedger::new();
        let d = date("2025-05-05");
        ledger.set_entry(d, "5").unwrap();

        assert_eq!(
            ledger.set_entry(d, ""),
            Ok(EntryChange::Removed(Amount::new(5).unwrap()))
        );
        assert_eq!(ledger.set_entry(d, "   "), Ok(EntryChange::AlreadyEmpty));
        assert_eq!(ledger.get(d), None);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_range_boundaries() {
        let mut ledger = YearlyLedger::new();
        assert_eq!(
            ledger.set_entry(date("2025-01-01"), "0"),
            Err(EntryError::OutOfRange(0))
        );
        assert_eq!(
            ledger.set_entry(date("2025-01-01"), "366"),
            Err(EntryError::OutOfRange(366))
        );
        assert!(ledger.set_entry(date("2025-01-01"), "1").is_ok());
        assert!(ledger.set_entry(date("2025-01-02"), "365").is_ok());
    }

    #[test]
    fn test_invalid_format() {
        let mut ledger = YearlyLedger::new();
        assert!(matches!(
            ledger.set_entry(date("2025-01-01"), "twelve"),
            Err(EntryError::InvalidFormat(_))
        ));
        assert!(matches!(
            ledger.set_entry(date("2025-01-01"), "-5"),
            Err(EntryError::InvalidFormat(_))
        ));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_duplicate_scoped_to_year() {
        let mut ledger = YearlyLedger::new();
        ledger.set_entry(date("2025-02-01"), "50").unwrap();

        assert_eq!(
            ledger.set_entry(date("2025-02-02"), "50"),
            Err(EntryError::DuplicateAmount {
                amount: 50,
                year: 2025,
                held_by: date("2025-02-01"),
            })
        );
        assert_eq!(ledger.get(date("2025-02-02")), None);

        assert!(ledger.set_entry(date("2026-02-02"), "50").is_ok());
    }

    #[test]
    fn test_totals_do_not_leak_across_years() {
        let mut ledger = YearlyLedger::new();
        ledger.set_entry(date("2024-12-31"), "300").unwrap();
        ledger.set_entry(date("2025-01-01"), "1").unwrap();
        ledger.set_entry(date("2025-01-02"), "2").unwrap();
        ledger.set_entry(date("2026-01-01"), "100").unwrap();

        assert_eq!(ledger.total_saved(2024), 300);
        assert_eq!(ledger.total_saved(2025), 3);
        assert_eq!(ledger.total_saved(2026), 100);
        assert_eq!(ledger.years(), vec![2024, 2025, 2026]);
    }

    #[test]
    fn test_used_and_remaining_partition() {
        let mut ledger = YearlyLedger::new();
        for (i, value) in ["3", "99", "365", "1"].iter().enumerate() {
            let d = date("2025-07-01") + chrono::Duration::days(i as i64);
            ledger.set_entry(d, value).unwrap();
        }

        let used = ledger.used_amounts(2025);
        let remaining = ledger.remaining_amounts(2025);

        assert_eq!(used.len() + remaining.len(), 365);
        assert!(remaining.iter().all(|v| !used.contains(v)));
        assert!(remaining.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(remaining.first(), Some(&2));
        assert_eq!(remaining.last(), Some(&364));
    }

    #[test]
    fn test_random_suggestion_picks_unused() {
        let mut ledger = YearlyLedger::new();
        ledger.set_entry(date("2025-01-01"), "7").unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..200 {
            let pick = ledger.random_suggestion_with(2025, &mut rng).unwrap();
            assert!((1..=365).contains(&pick));
            assert_ne!(pick, 7);
        }
        // Suggesting does not consume
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_random_suggestion_last_value() {
        let mut ledger = full_year(2025);
        ledger.set_entry(date("2025-01-10"), "").unwrap();
        assert_eq!(ledger.random_suggestion(2025), Ok(10));
    }

    #[test]
    fn test_exhausted_year() {
        let ledger = full_year(2025);
        assert_eq!(ledger.total_saved(2025), YEARLY_TARGET);
        assert!(ledger.remaining_amounts(2025).is_empty());
        assert_eq!(
            ledger.random_suggestion(2025),
            Err(ExhaustedError { year: 2025 })
        );
        assert!(ledger.random_suggestion(2026).is_ok());
    }

    #[test]
    fn test_from_raw_skips_malformed() {
        let (ledger, discarded) = YearlyLedger::from_raw(&raw(&[
            ("2025-01-01", "10"),
            ("2025-01-02", "abc"),
            ("2025-01-03", "400"),
            ("not-a-date", "5"),
            ("2025-01-04", " 20 "),
        ]));

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get(date("2025-01-04")), Some(20));
        assert_eq!(discarded.len(), 3);
        assert_eq!(ledger.total_saved(2025), 30);
    }

    #[test]
    fn test_from_raw_keeps_earliest_duplicate() {
        let (ledger, discarded) = YearlyLedger::from_raw(&raw(&[
            ("2025-03-01", "8"),
            ("2025-02-01", "8"),
            ("2026-02-01", "8"),
        ]));

        assert_eq!(ledger.get(date("2025-02-01")), Some(8));
        assert_eq!(ledger.get(date("2025-03-01")), None);
        assert_eq!(ledger.get(date("2026-02-01")), Some(8));
        assert_eq!(discarded.len(), 1);
        assert_eq!(discarded[0].key, "2025-03-01");
    }

    #[test]
    fn test_to_raw_uses_iso_keys() {
        let mut ledger = YearlyLedger::new();
        ledger.set_entry(date("2025-09-03"), "042").unwrap();

        let raw = ledger.to_raw();
        assert_eq!(raw.get("2025-09-03"), Some(&"42".to_string()));

        let (reloaded, discarded) = YearlyLedger::from_raw(&raw);
        assert!(discarded.is_empty());
        assert_eq!(reloaded, ledger);
    }

    #[test]
    fn test_restore() {
        let mut ledger = YearlyLedger::new();
        let d = date("2025-04-01");
        ledger.set_entry(d, "4").unwrap();

        let change = ledger.set_entry(d, "5").unwrap();
        ledger.restore(d, change.previous());
        assert_eq!(ledger.get(d), Some(4));

        let change = ledger.set_entry(date("2025-04-02"), "6").unwrap();
        ledger.restore(date("2025-04-02"), change.previous());
        assert_eq!(ledger.get(date("2025-04-02")), None);
    }

    #[test]
    fn test_entries_in_range() {
        let mut ledger = YearlyLedger::new();
        ledger.set_entry(date("2025-02-27"), "27").unwrap();

        let rows = ledger.entries_in(DateRange::month(2025, 2).unwrap());
        assert_eq!(rows.len(), 28);
        assert_eq!(rows[26].amount, Some(27));
        assert_eq!(rows.iter().filter(|r| r.amount.is_some()).count(), 1);
    }
}
