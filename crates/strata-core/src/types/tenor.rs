//! Tenors such as `3M` or `10Y`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{MarketError, MarketResult};
use crate::types::Date;

/// Unit of a [`Tenor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TenorUnit {
    /// Calendar days.
    Days,
    /// Weeks.
    Weeks,
    /// Months.
    Months,
    /// Years.
    Years,
}

/// A period expressed as a count of days, weeks, months or years.
///
/// Instruments carry their maturity as free-form specifics; when those
/// specifics parse as a tenor the instrument is treated as curve-shaped
/// and gets a pillar time.
///
/// # Example
///
/// ```rust
/// use strata_core::types::Tenor;
///
/// let t: Tenor = "18M".parse().unwrap();
/// assert_eq!(t.year_fraction(), 1.5);
/// assert!(Tenor::try_parse("Z25").is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tenor {
    length: u32,
    unit: TenorUnit,
}

impl Tenor {
    /// Creates a tenor.
    #[must_use]
    pub fn new(length: u32, unit: TenorUnit) -> Self {
        Self { length, unit }
    }

    /// Shorthand for a tenor in years.
    #[must_use]
    pub fn years(length: u32) -> Self {
        Self::new(length, TenorUnit::Years)
    }

    /// Shorthand for a tenor in months.
    #[must_use]
    pub fn months(length: u32) -> Self {
        Self::new(length, TenorUnit::Months)
    }

    /// Returns the number of units.
    #[must_use]
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Returns the unit.
    #[must_use]
    pub fn unit(&self) -> TenorUnit {
        self.unit
    }

    /// Best-effort parse: `None` when the text is not a tenor.
    #[must_use]
    pub fn try_parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s.to_uppercase().as_str() {
            "ON" | "O/N" => return Some(Self::new(1, TenorUnit::Days)),
            "TN" | "T/N" => return Some(Self::new(2, TenorUnit::Days)),
            _ => {}
        }
        let unit = match s.chars().last()?.to_ascii_uppercase() {
            'D' => TenorUnit::Days,
            'W' => TenorUnit::Weeks,
            'M' => TenorUnit::Months,
            'Y' => TenorUnit::Years,
            _ => return None,
        };
        let digits = &s[..s.len() - 1];
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let length = digits.parse().ok()?;
        Some(Self::new(length, unit))
    }

    /// Approximate length in years.
    ///
    /// Years and months are exact fractions of a year; weeks and days use a
    /// 365-day year.
    #[must_use]
    pub fn year_fraction(&self) -> f64 {
        let n = f64::from(self.length);
        match self.unit {
            TenorUnit::Years => n,
            TenorUnit::Months => n / 12.0,
            TenorUnit::Weeks => n * 7.0 / 365.0,
            TenorUnit::Days => n / 365.0,
        }
    }

    /// Date reached by rolling `start` forward by this tenor.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::InvalidDate` if the result is out of range.
    pub fn advance(&self, start: Date) -> MarketResult<Date> {
        let n = i64::from(self.length);
        match self.unit {
            TenorUnit::Days => start.checked_add_days(n),
            TenorUnit::Weeks => start.checked_add_days(7 * n),
            TenorUnit::Months => start.add_months(self.signed_length(start)?),
            TenorUnit::Years => start.add_years(self.signed_length(start)?),
        }
    }

    fn signed_length(&self, start: Date) -> MarketResult<i32> {
        i32::try_from(self.length)
            .map_err(|_| MarketError::invalid_date(format!("{start} + {self}")))
    }
}

impl fmt::Display for Tenor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            TenorUnit::Days => 'D',
            TenorUnit::Weeks => 'W',
            TenorUnit::Months => 'M',
            TenorUnit::Years => 'Y',
        };
        write!(f, "{}{}", self.length, unit)
    }
}

impl FromStr for Tenor {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse(s).ok_or_else(|| MarketError::configuration(format!("Not a tenor: {s}")))
    }
}

impl TryFrom<String> for Tenor {
    type Error = MarketError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Tenor> for String {
    fn from(tenor: Tenor) -> Self {
        tenor.to_string()
    }
}
