use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Earliest year accepted on packaging.
pub const MIN_YEAR: u16 = 2020;
/// Latest year accepted on packaging.
pub const MAX_YEAR: u16 = 2040;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("Malformed date '{0}', expected YYYY-MM-DD")]
    Malformed(String),
    #[error("Year {0} outside {MIN_YEAR}..={MAX_YEAR}")]
    YearOutOfRange(u16),
    #[error("Month {0} outside 1..=12")]
    MonthOutOfRange(u8),
    #[error("Day {0} outside 1..=31")]
    DayOutOfRange(u8),
}

/// A `YYYY-MM-DD` date as printed on packaging.
///
/// Fields are range-checked individually; the day is not checked against the
/// length of the month, so `2025-02-30` is a valid `CanonicalDate` even though
/// it is not a calendar day (see [`CanonicalDate::to_naive`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalDate {
    year: u16,
    month: u8,
    day: u8,
}

impl CanonicalDate {
    pub fn new(year: u16, month: u8, day: u8) -> Result<Self, DateError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(DateError::YearOutOfRange(year));
        }
        if !(1..=12).contains(&month) {
            return Err(DateError::MonthOutOfRange(month));
        }
        if !(1..=31).contains(&day) {
            return Err(DateError::DayOutOfRange(day));
        }
        Ok(CanonicalDate { year, month, day })
    }

    pub fn year(self) -> u16 {
        self.year
    }

    pub fn month(self) -> u8 {
        self.month
    }

    pub fn day(self) -> u8 {
        self.day
    }

    /// The real calendar day, or `None` when the day overflows its month.
    pub fn to_naive(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)
    }

    /// Signed number of days from `today` to this date, when it is a real day.
    pub fn days_from(self, today: NaiveDate) -> Option<i64> {
        self.to_naive().map(|d| (d - today).num_days())
    }
}

impl fmt::Display for CanonicalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for CanonicalDate {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DateError::Malformed(s.to_string());
        let mut parts = s.trim().splitn(3, '-');
        let (y, m, d) = match (parts.next(), parts.next(), parts.next()) {
            (Some(y), Some(m), Some(d)) if y.len() == 4 && m.len() == 2 && d.len() == 2 => {
                (y, m, d)
            }
            _ => return Err(malformed()),
        };
        let year = y.parse::<u16>().map_err(|_| malformed())?;
        let month = m.parse::<u8>().map_err(|_| malformed())?;
        let day = d.parse::<u8>().map_err(|_| malformed())?;
        CanonicalDate::new(year, month, day)
    }
}

impl TryFrom<String> for CanonicalDate {
    type Error = DateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CanonicalDate> for String {
    fn from(date: CanonicalDate) -> Self {
        date.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_zero_padded() {
        let d = CanonicalDate::new(2025, 6, 1).unwrap();
        assert_eq!(d.to_string(), "2025-06-01");
    }

    #[test]
    fn new_rejects_out_of_range_fields() {
        assert_eq!(CanonicalDate::new(2019, 1, 1), Err(DateError::YearOutOfRange(2019)));
        assert_eq!(CanonicalDate::new(2041, 1, 1), Err(DateError::YearOutOfRange(2041)));
        assert_eq!(CanonicalDate::new(2025, 0, 1), Err(DateError::MonthOutOfRange(0)));
        assert_eq!(CanonicalDate::new(2025, 13, 1), Err(DateError::MonthOutOfRange(13)));
        assert_eq!(CanonicalDate::new(2025, 1, 0), Err(DateError::DayOutOfRange(0)));
        assert_eq!(CanonicalDate::new(2025, 1, 32), Err(DateError::DayOutOfRange(32)));
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(CanonicalDate::new(2020, 1, 1).is_ok());
        assert!(CanonicalDate::new(2040, 12, 31).is_ok());
    }

    #[test]
    fn day_is_not_checked_against_month_length() {
        let d = CanonicalDate::new(2025, 2, 30).unwrap();
        assert_eq!(d.to_string(), "2025-02-30");
        assert_eq!(d.to_naive(), None);
    }

    #[test]
    fn days_from_is_signed() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        assert_eq!(CanonicalDate::new(2025, 1, 20).unwrap().days_from(today), Some(10));
        assert_eq!(CanonicalDate::new(2025, 1, 5).unwrap().days_from(today), Some(-5));
        assert_eq!(CanonicalDate::new(2025, 2, 31).unwrap().days_from(today), None);
    }

    #[test]
    fn parse_roundtrip_and_errors() {
        let d: CanonicalDate = "2031-11-09".parse().unwrap();
        assert_eq!((d.year(), d.month(), d.day()), (2031, 11, 9));
        assert!(matches!("2031/11/09".parse::<CanonicalDate>(), Err(DateError::Malformed(_))));
        assert!(matches!("31-11-09".parse::<CanonicalDate>(), Err(DateError::Malformed(_))));
        assert_eq!("2050-01-01".parse::<CanonicalDate>(), Err(DateError::YearOutOfRange(2050)));
    }

    #[test]
    fn serializes_as_string() {
        let d = CanonicalDate::new(2026, 3, 4).unwrap();
        assert_eq!(serde_json::to_string(&d).unwrap(), "\"2026-03-04\"");
        let back: CanonicalDate = serde_json::from_str("\"2026-03-04\"").unwrap();
        assert_eq!(back, d);
        assert!(serde_json::from_str::<CanonicalDate>("\"2026-13-04\"").is_err());
    }
}
