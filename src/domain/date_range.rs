use chrono::{Duration, NaiveDate};
use std::fmt;

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Which dates a list view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// The `n` days ending at (and including) today.
    LastDays(u32),
    Month { year: i32, month: u32 },
}

impl ViewMode {
    pub fn range(&self, today: NaiveDate) -> Result<DateRange, RangeError> {
        match *self {
            ViewMode::LastDays(days) => DateRange::last_days(today, days),
            ViewMode::Month { year, month } => DateRange::month(year, month),
        }
    }
}

impl DateRange {
    /// `days` dates ending at `today`. Zero is treated as one.
    pub fn last_days(today: NaiveDate, days: u32) -> Result<Self, RangeError> {
        let span = i64::from(days.max(1)) - 1;
        let start = today
            .checked_sub_signed(Duration::days(span))
            .ok_or(RangeError::TooManyDays(days))?;

        Ok(Self { start, end: today })
    }

    pub fn month(year: i32, month: u32) -> Result<Self, RangeError> {
        let invalid = RangeError::InvalidMonth { year, month };
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or(invalid)?;
        let next = if month == 12 {
            year.checked_add(1).and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        };
        let end = next.and_then(|d| d.pred_opt()).ok_or(invalid)?;

        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Every date in the range exactly once, oldest first.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        let end = self.end;
        (0..=(end - start).num_days()).map(move |i| start + Duration::days(i))
    }

    pub fn day_count(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    InvalidMonth { year: i32, month: u32 },
    /// The window would start before the earliest representable date.
    TooManyDays(u32),
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeError::InvalidMonth { year, month } => {
                write!(f, "invalid month {}-{:02}", year, month)
            }
            RangeError::TooManyDays(days) => write!(f, "cannot list the last {} days", days),
        }
    }
}

impl std::error::Error for RangeError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_last_seven_days_is_chronological() {
        let range = DateRange::last_days(date("2025-03-02"), 7).unwrap();
        let days: Vec<_> = range.days().collect();

        assert_eq!(days.len(), 7);
        assert_eq!(days.first(), Some(&date("2025-02-24")));
        assert_eq!(days.last(), Some(&date("2025-03-02")));
        assert!(days.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_zero_days_is_today_only() {
        let today = date("2025-03-02");
        let range = DateRange::last_days(today, 0).unwrap();
        assert_eq!(range.start, today);
        assert_eq!(range.day_count(), 1);
    }

    #[test]
    fn test_too_many_days_is_an_error() {
        let today = date("2025-06-15");
        assert_eq!(
            DateRange::last_days(today, u32::MAX),
            Err(RangeError::TooManyDays(u32::MAX))
        );

        let err = ViewMode::LastDays(u32::MAX).range(today).unwrap_err();
        assert!(err.to_string().contains("4294967295"));
    }

    #[test]
    fn test_month_lengths() {
        assert_eq!(DateRange::month(2024, 2).unwrap().day_count(), 29);
        assert_eq!(DateRange::month(2025, 2).unwrap().day_count(), 28);
        assert_eq!(DateRange::month(2025, 12).unwrap().day_count(), 31);
        assert_eq!(DateRange::month(2025, 4).unwrap().days().count(), 30);
    }

    #[test]
    fn test_month_every_day_once() {
        let range = DateRange::month(2025, 1).unwrap();
        let days: Vec<_> = range.days().collect();
        assert_eq!(days[0], date("2025-01-01"));
        assert_eq!(days[30], date("2025-01-31"));
        assert!(days.windows(2).all(|w| w[1] - w[0] == Duration::days(1)));
    }

    #[test]
    fn test_invalid_month() {
        assert_eq!(
            DateRange::month(2025, 13),
            Err(RangeError::InvalidMonth {
                year: 2025,
                month: 13
            })
        );
        assert!(DateRange::month(2025, 0).is_err());
        assert!(DateRange::month(i32::MAX, 12).is_err());
    }

    #[test]
    fn test_view_mode_range() {
        let today = date("2025-06-15");
        let week = ViewMode::LastDays(7).range(today).unwrap();
        assert!(week.contains(today));
        assert!(!week.contains(date("2025-06-08")));

        let june = ViewMode::Month {
            year: 2025,
            month: 6,
        }
        .range(today)
        .unwrap();
        assert_eq!(june.start, date("2025-06-01"));
        assert_eq!(june.end, date("2025-06-30"));
    }
}
