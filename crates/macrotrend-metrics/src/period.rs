//! Calendar month periods.
//!
//! A [`Period`] is a year and month. Its month index (`year * 12 + month - 1`)
//! is monotonic, so "the immediately preceding month" and "the same month a
//! year earlier" are plain index offsets regardless of year boundaries.

use crate::error::{MetricsError, Result};
use chrono::{Datelike, NaiveDate};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const MIN_INDEX: i64 = i32::MIN as i64 * 12;
const MAX_INDEX: i64 = i32::MAX as i64 * 12 + 11;

/// A calendar month.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[display("{year:04}-{month:02}")]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Create a period, validating the month.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(MetricsError::InvalidPeriod(format!(
                "month {} out of range for year {}",
                month, year
            )));
        }
        Ok(Self { year, month })
    }

    /// Rebuild a period from its month index. Indices past the range of
    /// representable years saturate at the first or last month.
    pub const fn from_index(index: i64) -> Self {
        let index = if index < MIN_INDEX {
            MIN_INDEX
        } else if index > MAX_INDEX {
            MAX_INDEX
        } else {
            index
        };
        Self {
            year: index.div_euclid(12) as i32,
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    /// Parse a BLS `(year, "Mnn")` pair.
    ///
    /// `M13` is the BLS annual average and is rejected, as is any period
    /// code that is not monthly (`Q01`, `S01`, ...).
    pub fn from_bls(year: &str, period: &str) -> Result<Self> {
        let year: i32 = year
            .trim()
            .parse()
            .map_err(|_| MetricsError::InvalidPeriod(format!("bad BLS year: {}", year)))?;
        let month = period
            .strip_prefix('M')
            .and_then(|m| m.parse::<u32>().ok())
            .ok_or_else(|| MetricsError::InvalidPeriod(format!("bad BLS period: {}", period)))?;
        if month == 13 {
            return Err(MetricsError::InvalidPeriod(format!(
                "annual average period M13 for {}",
                year
            )));
        }
        Self::new(year, month)
    }

    /// Calendar year.
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Month number, 1 through 12.
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// Monotonic month index.
    pub const fn index(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    /// The period `months` later (negative for earlier), saturating at the
    /// ends of the representable range.
    pub const fn offset(&self, months: i64) -> Self {
        Self::from_index(self.index().saturating_add(months))
    }

    /// The immediately preceding calendar month.
    pub const fn prev(&self) -> Self {
        self.offset(-1)
    }

    /// The following calendar month.
    pub const fn next(&self) -> Self {
        self.offset(1)
    }

    /// Signed number of months from `earlier` to `self`.
    pub const fn months_since(&self, earlier: &Self) -> i64 {
        self.index() - earlier.index()
    }

    /// First day of the month.
    pub fn first_day(&self) -> NaiveDate {
        // Month is validated on construction, so day 1 always exists.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }
}

impl From<NaiveDate> for Period {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl FromStr for Period {
    type Err = MetricsError;

    /// Accepts `YYYY-MM` and `YYYY-MM-DD`; the day is ignored.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(date.into());
        }

        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| MetricsError::InvalidPeriod(s.to_string()))?;
        let year = year
            .parse::<i32>()
            .map_err(|_| MetricsError::InvalidPeriod(s.to_string()))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| MetricsError::InvalidPeriod(s.to_string()))?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for Period {
    type Error = MetricsError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_display_and_parse() {
        let p = Period::new(2024, 3).unwrap();
        assert_eq!(p.to_string(), "2024-03");
        assert_eq!("2024-03".parse::<Period>().unwrap(), p);
        assert_eq!("2024-03-01".parse::<Period>().unwrap(), p);
        assert_eq!("2024-03-17".parse::<Period>().unwrap(), p);
    }

    #[rstest]
    #[case("2024-13")]
    #[case("2024-00")]
    #[case("2024")]
    #[case("March 2024")]
    #[case("")]
    fn test_parse_rejects(#[case] input: &str) {
        assert!(input.parse::<Period>().is_err());
    }

    #[test]
    fn test_offsets_cross_year_boundaries() {
        let jan = Period::new(2024, 1).unwrap();
        assert_eq!(jan.prev(), Period::new(2023, 12).unwrap());
        assert_eq!(jan.offset(-12), Period::new(2023, 1).unwrap());
        assert_eq!(jan.offset(23), Period::new(2025, 12).unwrap());
        assert_eq!(Period::new(2023, 12).unwrap().next(), jan);
        assert_eq!(jan.months_since(&Period::new(2023, 1).unwrap()), 12);
    }

    #[test]
    fn test_offsets_saturate() {
        let jan = Period::new(2024, 1).unwrap();
        assert_eq!(jan.offset(-30_000_000_000).year(), i32::MIN);
        assert_eq!(jan.offset(i64::MIN).month(), 1);
        let last = jan.offset(i64::MAX);
        assert_eq!((last.year(), last.month()), (i32::MAX, 12));
        assert!(jan.offset(-30_000_000_000) < jan);
        assert_eq!(Period::from_index(i64::MAX), last);
    }

    #[test]
    fn test_index_round_trip_and_ordering() {
        let p = Period::new(1999, 12).unwrap();
        assert_eq!(Period::from_index(p.index()), p);
        assert!(Period::new(1999, 12).unwrap() < Period::new(2000, 1).unwrap());
        assert!(Period::new(2000, 2).unwrap() > Period::new(2000, 1).unwrap());
    }

    #[test]
    fn test_from_bls() {
        assert_eq!(
            Period::from_bls("2023", "M07").unwrap(),
            Period::new(2023, 7).unwrap()
        );
        assert!(Period::from_bls("2023", "M13").is_err());
        assert!(Period::from_bls("2023", "Q01").is_err());
        assert!(Period::from_bls("20x3", "M01").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let p = Period::new(2021, 9).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"2021-09\"");
        let back: Period = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
        assert!(serde_json::from_str::<Period>("\"2021-19\"").is_err());
    }

    #[test]
    fn test_first_day() {
        let p = Period::new(2020, 2).unwrap();
        assert_eq!(p.first_day(), NaiveDate::from_ymd_opt(2020, 2, 1).unwrap());
        assert_eq!(Period::from(p.first_day()), p);
    }
}
