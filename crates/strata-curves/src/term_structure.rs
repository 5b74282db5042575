//! Calibrated term structures.
//!
//! [`TermStructure`] is the query surface every built curve exposes. Time is
//! measured in years from the reference date on an ACT/365F basis, see
//! [`Date::year_fraction`].
//!
//! # Thread Safety
//!
//! Term structures are `Send + Sync` so bumped markets can be priced in
//! parallel.

use serde::{Deserialize, Serialize};

use strata_core::types::{Date, Tenor};
use strata_core::{MarketError, MarketResult};

use crate::interpolation::InterpolationMethod;

/// Shortest horizon used when a rate is asked for at or before the reference
/// date (one day).
const MIN_RATE_HORIZON: f64 = 1.0 / 365.0;

/// Discount factor, zero rate and forward rate queries.
pub trait TermStructure: Send + Sync {
    /// Date all times are measured from.
    fn reference_date(&self) -> Date;

    /// Discount factor at `t` years from the reference date.
    ///
    /// # Errors
    ///
    /// Implementations that recalibrate lazily propagate calibration errors.
    fn discount_factor_at(&self, t: f64) -> MarketResult<f64>;

    // ========================================================================
    // Default implementations
    // ========================================================================

    /// Time in years from the reference date to `date`.
    fn time_to(&self, date: Date) -> f64 {
        self.reference_date().year_fraction(&date)
    }

    /// Discount factor at `date`.
    ///
    /// # Errors
    ///
    /// See [`TermStructure::discount_factor_at`].
    fn discount_factor(&self, date: Date) -> MarketResult<f64> {
        self.discount_factor_at(self.time_to(date))
    }

    /// Annually compounded zero rate at `t`.
    ///
    /// # Errors
    ///
    /// See [`TermStructure::discount_factor_at`].
    fn zero_rate_at(&self, t: f64) -> MarketResult<f64> {
        let t = t.max(MIN_RATE_HORIZON);
        let df = self.discount_factor_at(t)?;
        Ok(df.powf(-1.0 / t) - 1.0)
    }

    /// Annually compounded zero rate to `date`.
    ///
    /// # Errors
    ///
    /// See [`TermStructure::discount_factor_at`].
    fn zero_rate(&self, date: Date) -> MarketResult<f64> {
        self.zero_rate_at(self.time_to(date))
    }

    /// Simple forward rate between `t1` and `t2`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `t2 <= t1`.
    fn forward_rate_between(&self, t1: f64, t2: f64) -> MarketResult<f64> {
        let tau = t2 - t1;
        if tau <= 0.0 {
            return Err(MarketError::configuration(format!(
                "Forward period must be positive: {t1} to {t2}"
            )));
        }
        let df1 = self.discount_factor_at(t1)?;
        let df2 = self.discount_factor_at(t2)?;
        Ok((df1 / df2 - 1.0) / tau)
    }

    /// Simple forward rate for the period of length `tenor` starting at
    /// `date`; an overnight (1D) period when `tenor` is `None`.
    ///
    /// # Errors
    ///
    /// Propagates date arithmetic and discount factor errors.
    fn forward_rate(&self, date: Date, tenor: Option<Tenor>) -> MarketResult<f64> {
        let end = match tenor {
            Some(tenor) => tenor.advance(date)?,
            None => date.checked_add_days(1)?,
        };
        self.forward_rate_between(self.time_to(date), self.time_to(end))
    }
}

/// Discount factors at calibrated pillar times.
///
/// The first pillar is always `(0.0, 1.0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PillarCurve {
    reference_date: Date,
    times: Vec<f64>,
    discount_factors: Vec<f64>,
    interpolation: InterpolationMethod,
}

impl PillarCurve {
    /// Creates a curve from pillars after the reference date.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if lengths differ, times are not
    /// strictly increasing and positive, or a discount factor is not a
    /// positive finite number.
    pub fn new(
        reference_date: Date,
        pillars: &[(f64, f64)],
        interpolation: InterpolationMethod,
    ) -> MarketResult<Self> {
        let mut times = Vec::with_capacity(pillars.len() + 1);
        let mut discount_factors = Vec::with_capacity(pillars.len() + 1);
        times.push(0.0);
        discount_factors.push(1.0);

        for &(t, df) in pillars {
            let prev = times[times.len() - 1];
            if t.is_nan() || t <= prev {
                return Err(MarketError::configuration(format!(
                    "Pillar times must be strictly increasing: {t} after {prev}"
                )));
            }
            if !(df.is_finite() && df > 0.0) {
                return Err(MarketError::configuration(format!(
                    "Invalid discount factor {df} at t={t}"
                )));
            }
            times.push(t);
            discount_factors.push(df);
        }

        Ok(Self {
            reference_date,
            times,
            discount_factors,
            interpolation,
        })
    }

    /// Pillar times, including `0.0`.
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Discount factors at the pillar times.
    #[must_use]
    pub fn discount_factors(&self) -> &[f64] {
        &self.discount_factors
    }

    /// Interpolation method.
    #[must_use]
    pub fn interpolation(&self) -> InterpolationMethod {
        self.interpolation
    }

    /// Discount factor at `t`. Infallible counterpart of
    /// [`TermStructure::discount_factor_at`].
    #[must_use]
    pub fn df(&self, t: f64) -> f64 {
        self.interpolation
            .discount_factor(&self.times, &self.discount_factors, t)
    }
}

impl TermStructure for PillarCurve {
    fn reference_date(&self) -> Date {
        self.reference_date
    }

    fn discount_factor_at(&self, t: f64) -> MarketResult<f64> {
        Ok(self.df(t))
    }
}
