//! Date type for market snapshots.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

use crate::error::{MarketError, MarketResult};

/// A calendar date.
///
/// Newtype wrapper around `chrono::NaiveDate`. Pricing dates, pillar dates
/// and fixing dates are all expressed with this type.
///
/// # Example
///
/// ```rust
/// use strata_core::types::Date;
///
/// let date = Date::from_ymd(2025, 6, 15).unwrap();
/// let future = date.add_months(6).unwrap();
/// assert_eq!(future.year(), 2025);
/// assert_eq!(future.month(), 12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Date(NaiveDate);

impl Date {
    /// Creates a new date from year, month, and day.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::InvalidDate` if the date is invalid.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> MarketResult<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Date)
            .ok_or_else(|| MarketError::invalid_date(format!("{year}-{month:02}-{day:02}")))
    }

    /// Creates a date from an ISO 8601 string (YYYY-MM-DD).
    ///
    /// # Errors
    ///
    /// Returns `MarketError::InvalidDate` if the string is not a valid date.
    pub fn parse(s: &str) -> MarketResult<Self> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Date)
            .map_err(|_| MarketError::invalid_date(format!("Cannot parse: {s}")))
    }

    /// Returns the year component.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Returns the month component (1-12).
    #[must_use]
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Returns the day component (1-31).
    #[must_use]
    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// Adds a number of days to the date.
    ///
    /// # Panics
    ///
    /// Panics if the result is outside the supported date range. Use
    /// [`Date::checked_add_days`] for untrusted offsets.
    #[must_use]
    pub fn add_days(&self, days: i64) -> Self {
        Date(self.0 + chrono::Duration::days(days))
    }

    /// Adds a number of days to the date.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::InvalidDate` if the result is out of range.
    pub fn checked_add_days(&self, days: i64) -> MarketResult<Self> {
        chrono::Duration::try_days(days)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .map(Date)
            .ok_or_else(|| MarketError::invalid_date(format!("{self} + {days} days")))
    }

    /// Adds a number of months to the date.
    ///
    /// If the resulting day would be invalid (e.g., Jan 31 + 1 month),
    /// it rolls back to the last valid day of the month.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::InvalidDate` if the result is out of range.
    pub fn add_months(&self, months: i32) -> MarketResult<Self> {
        let total_months =
            i64::from(self.year()) * 12 + i64::from(self.month()) - 1 + i64::from(months);
        let new_year = i32::try_from(total_months.div_euclid(12))
            .map_err(|_| MarketError::invalid_date(format!("{self} + {months} months")))?;
        let new_month = (total_months.rem_euclid(12) + 1) as u32;

        let max_day = days_in_month(new_year, new_month);
        let new_day = self.day().min(max_day);

        Self::from_ymd(new_year, new_month, new_day)
    }

    /// Adds a number of years to the date.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::InvalidDate` if the result is invalid.
    pub fn add_years(&self, years: i32) -> MarketResult<Self> {
        let months = years
            .checked_mul(12)
            .ok_or_else(|| MarketError::invalid_date(format!("{self} + {years} years")))?;
        self.add_months(months)
    }

    /// Calculates the number of calendar days between two dates.
    #[must_use]
    pub fn days_between(&self, other: &Date) -> i64 {
        (other.0 - self.0).num_days()
    }

    /// Year fraction from this date to `other` on an Actual/365 Fixed basis.
    ///
    /// This is the time axis every calibrated curve is expressed on.
    #[must_use]
    pub fn year_fraction(&self, other: &Date) -> f64 {
        self.days_between(other) as f64 / 365.0
    }

    /// Returns the underlying `NaiveDate`.
    #[must_use]
    pub fn as_naive_date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl From<NaiveDate> for Date {
    fn from(date: NaiveDate) -> Self {
        Date(date)
    }
}

impl Add<i64> for Date {
    type Output = Date;

    fn add(self, days: i64) -> Self::Output {
        self.add_days(days)
    }
}

impl Sub<i64> for Date {
    type Output = Date;

    fn sub(self, days: i64) -> Self::Output {
        self.add_days(-days)
    }
}

impl Sub<Date> for Date {
    type Output = i64;

    fn sub(self, other: Date) -> Self::Output {
        other.days_between(&self)
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            if (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0) {
                29
            } else {
                28
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_date_creation() {
        let date = Date::from_ymd(2025, 6, 15).unwrap();
        assert_eq!(date.year(), 2025);
        assert_eq!(date.month(), 6);
        assert_eq!(date.day(), 15);
    }

    #[test]
    fn test_invalid_date() {
        assert!(Date::from_ymd(2025, 2, 30).is_err());
        assert!(Date::from_ymd(2025, 13, 1).is_err());
    }

    #[test]
    fn test_add_months() {
        let date = Date::from_ymd(2025, 1, 31).unwrap();
        let result = date.add_months(1).unwrap();
        assert_eq!(result.month(), 2);
        assert_eq!(result.day(), 28);

        let back = Date::from_ymd(2025, 3, 15).unwrap().add_months(-3).unwrap();
        assert_eq!(back, Date::from_ymd(2024, 12, 15).unwrap());
    }

    #[test]
    fn test_add_years_leap_day() {
        let date = Date::from_ymd(2024, 2, 29).unwrap();
        assert_eq!(date.add_years(1).unwrap(), Date::from_ymd(2025, 2, 28).unwrap());
    }

    #[test]
    fn test_out_of_range_arithmetic_is_an_error() {
        let date = Date::from_ymd(2024, 1, 2).unwrap();
        assert!(date.add_years(999_999_999).is_err());
        assert!(date.add_months(i32::MAX).is_err());
        assert!(date.add_months(i32::MIN).is_err());
        assert!(date.checked_add_days(4_000_000_000).is_err());
        assert!(date.checked_add_days(i64::MAX).is_err());
        assert_eq!(date.checked_add_days(30).unwrap(), date.add_days(30));
    }

    #[test]
    fn test_days_between_and_year_fraction() {
        let d1 = Date::from_ymd(2025, 1, 1).unwrap();
        let d2 = Date::from_ymd(2026, 1, 1).unwrap();
        assert_eq!(d1.days_between(&d2), 365);
        assert_eq!(d2 - d1, 365);
        assert_relative_eq!(d1.year_fraction(&d2), 1.0);
    }

    #[test]
    fn test_parse_and_display() {
        let date = Date::parse("2023-08-10").unwrap();
        assert_eq!(date.to_string(), "2023-08-10");
        assert!(Date::parse("10/08/2023").is_err());
    }

    proptest! {
        #[test]
        fn prop_add_months_clamps_to_month_end(
            year in 1900i32..2200,
            month in 1u32..=12,
            day in 1u32..=31,
            months in -1200i32..1200,
        ) {
            let start = Date::from_ymd(year, month, day.min(days_in_month(year, month))).unwrap();
            let end = start.add_months(months).unwrap();
            let elapsed = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
            prop_assert_eq!(elapsed, months);
            prop_assert_eq!(end.day(), start.day().min(days_in_month(end.year(), end.month())));
        }
    }
}
