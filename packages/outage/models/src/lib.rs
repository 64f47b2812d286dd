#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Monthly outage record and time period types.
//!
//! The outage dataset is reported at month granularity, so every time
//! value in the dashboard is a [`YearMonth`] and every selection over time
//! is an inclusive [`MonthRange`].

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use outage_map_geography_models::RegionId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A calendar month.
///
/// Ordering is chronological (year first, then month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u8,
}

impl YearMonth {
    /// Creates a month, validating `1 <= month <= 12` and a four-digit year.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPeriodError`] if either component is out of range.
    pub fn new(year: i32, month: u32) -> Result<Self, InvalidPeriodError> {
        let invalid = || InvalidPeriodError {
            raw: format!("{year}-{month}"),
        };
        if !(1..=9999).contains(&year) || !(1..=12).contains(&month) {
            return Err(invalid());
        }
        let month = u8::try_from(month).map_err(|_| invalid())?;
        Ok(Self { year, month })
    }

    /// Month containing `date`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month() as u8,
        }
    }

    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn month(self) -> u32 {
        self.month as u32
    }

    /// Months since year 0, used for arithmetic and continuous scales.
    #[must_use]
    pub const fn ordinal(self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    /// Inverse of [`Self::ordinal`]. Clamps into the supported year range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_ordinal(ordinal: i64) -> Self {
        let ordinal = ordinal.clamp(12, 9999 * 12 + 11);
        Self {
            year: ordinal.div_euclid(12) as i32,
            month: (ordinal.rem_euclid(12) + 1) as u8,
        }
    }

    /// The month `n` months after this one (negative `n` goes back).
    #[must_use]
    pub fn offset(self, n: i64) -> Self {
        Self::from_ordinal(self.ordinal() + n)
    }

    /// First day of the month.
    #[must_use]
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month(), 1)
    }

    /// Number of days in the month.
    #[must_use]
    pub const fn days_in_month(self) -> u32 {
        match self.month {
            4 | 6 | 9 | 11 => 30,
            2 => {
                let y = self.year;
                if (y % 4 == 0 && y % 100 != 0) || y % 400 == 0 {
                    29
                } else {
                    28
                }
            }
            _ => 31,
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = InvalidPeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || InvalidPeriodError { raw: s.to_string() };
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        Self::new(year, month).map_err(|_| err())
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Error returned for a malformed or out-of-range month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPeriodError {
    /// The rejected input.
    pub raw: String,
}

impl fmt::Display for InvalidPeriodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid month '{}': expected YYYY-MM", self.raw)
    }
}

impl std::error::Error for InvalidPeriodError {}

/// An inclusive range of months with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawMonthRange")]
pub struct MonthRange {
    start: YearMonth,
    end: YearMonth,
}

#[derive(Deserialize)]
struct RawMonthRange {
    start: YearMonth,
    end: YearMonth,
}

impl TryFrom<RawMonthRange> for MonthRange {
    type Error = InvalidRangeError;

    fn try_from(raw: RawMonthRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl MonthRange {
    /// Creates a range.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRangeError`] if `start` is after `end`.
    pub fn new(start: YearMonth, end: YearMonth) -> Result<Self, InvalidRangeError> {
        if start > end {
            return Err(InvalidRangeError { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a range from two months given in either order.
    #[must_use]
    pub fn ordered(a: YearMonth, b: YearMonth) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    /// A range covering a single month.
    #[must_use]
    pub const fn single(month: YearMonth) -> Self {
        Self {
            start: month,
            end: month,
        }
    }

    #[must_use]
    pub const fn start(self) -> YearMonth {
        self.start
    }

    #[must_use]
    pub const fn end(self) -> YearMonth {
        self.end
    }

    #[must_use]
    pub fn contains(self, month: YearMonth) -> bool {
        self.start <= month && month <= self.end
    }

    /// Calendar years touched by the range.
    #[must_use]
    pub const fn years(self) -> RangeInclusive<i32> {
        self.start.year..=self.end.year
    }

    /// Number of months in the range (always at least one).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub const fn len(self) -> usize {
        (self.end.ordinal() - self.start.ordinal() + 1) as usize
    }

    /// Always `false`; a range holds at least one month.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        false
    }

    /// Iterates every month of the range in order.
    pub fn months(self) -> impl Iterator<Item = YearMonth> {
        (self.start.ordinal()..=self.end.ordinal()).map(YearMonth::from_ordinal)
    }
}

impl fmt::Display for MonthRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Error returned when a range's start is after its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidRangeError {
    /// Requested start.
    pub start: YearMonth,
    /// Requested end.
    pub end: YearMonth,
}

impl fmt::Display for InvalidRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid month range: start {} is after end {}",
            self.start, self.end
        )
    }
}

impl std::error::Error for InvalidRangeError {}

/// Outage totals for one county in one month. Immutable once loaded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutageRecord {
    /// County the row belongs to.
    pub region_id: RegionId,
    /// Month the row covers.
    pub period: YearMonth,
    /// Number of outage events.
    pub outage_count: u64,
    /// Customers without power summed over the month.
    pub customers_out: f64,
}

impl OutageRecord {
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.period.year()
    }

    #[must_use]
    pub const fn month(&self) -> u32 {
        self.period.month()
    }
}

/// What an [`AggregatedMonth`] series was aggregated over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum AggregateKey {
    /// Every county in the dataset.
    Global,
    /// A user selection of counties.
    Selection,
    /// A single county.
    Region(RegionId),
    /// All counties of one state (two-letter abbreviation).
    State(String),
}

/// Outage count total for one month of an aggregated series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedMonth {
    /// What was aggregated.
    pub key: AggregateKey,
    /// Month of the total.
    pub period: YearMonth,
    /// Sum of `outage_count` over the matching records.
    pub total_outage_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    #[test]
    fn year_month_parses_and_displays() {
        assert_eq!(ym("2021-3").to_string(), "2021-03");
        assert!("2021-13".parse::<YearMonth>().is_err());
        assert!("2021".parse::<YearMonth>().is_err());
    }

    #[test]
    fn ordinal_roundtrip_crosses_year_boundary() {
        let dec = ym("2020-12");
        assert_eq!(dec.offset(1), ym("2021-01"));
        assert_eq!(ym("2021-01").offset(-1), dec);
        assert_eq!(YearMonth::from_ordinal(dec.ordinal()), dec);
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(ym("2020-02").days_in_month(), 29);
        assert_eq!(ym("2021-02").days_in_month(), 28);
        assert_eq!(ym("1900-02").days_in_month(), 28);
        assert_eq!(ym("2000-02").days_in_month(), 29);
        assert_eq!(ym("2021-04").days_in_month(), 30);
    }

    #[test]
    fn range_rejects_reversed_bounds() {
        assert!(MonthRange::new(ym("2021-05"), ym("2021-03")).is_err());
        let range = MonthRange::ordered(ym("2021-05"), ym("2021-03"));
        assert_eq!(range.start(), ym("2021-03"));
        assert_eq!(range.len(), 3);
        assert!(range.contains(ym("2021-04")));
        assert!(!range.contains(ym("2021-06")));
    }

    #[test]
    fn range_deserialization_validates_order() {
        let ok: MonthRange =
            serde_json::from_str(r#"{"start":"2021-03","end":"2021-05"}"#).unwrap();
        assert_eq!(ok.months().count(), 3);
        let bad = serde_json::from_str::<MonthRange>(r#"{"start":"2021-06","end":"2021-05"}"#);
        assert!(bad.is_err());
    }
}
