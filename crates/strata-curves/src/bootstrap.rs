//! Curve calibration.
//!
//! A [`Calibrator`] turns resolved instrument quotes and the outputs of
//! prerequisite curves into a [`PillarCurve`]. Curves call it through the
//! market they are built in and never look inside; any implementation can be
//! plugged into a market.
//!
//! [`SequentialBootstrapper`] solves one discount factor per instrument in
//! pillar order, using the already-solved part of the curve for intermediate
//! cash flows.

use std::fmt;

use tracing::debug;

use strata_core::types::{Date, Tenor};
use strata_core::{MarketError, MarketResult};

use crate::curves::CurveOutput;
use crate::instruments::{Instrument, QuoteKind};
use crate::interpolation::InterpolationMethod;
use crate::term_structure::{PillarCurve, TermStructure};

/// One resolved calibration input.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationInput {
    /// Instrument name, for error reporting.
    pub name: String,
    /// How the quote is interpreted.
    pub quote_kind: QuoteKind,
    /// Pillar date.
    pub pillar: Date,
    /// Quote value.
    pub quote: f64,
}

impl CalibrationInput {
    /// Resolves an instrument's pillar from its specifics.
    ///
    /// # Errors
    ///
    /// Returns a calibration error for `curve` if the specifics are not a
    /// tenor.
    pub fn from_instrument(
        curve: &str,
        reference_date: Date,
        instrument: &Instrument,
    ) -> MarketResult<Self> {
        let tenor = instrument.tenor().ok_or_else(|| {
            MarketError::calibration(
                curve,
                format!(
                    "Cannot resolve a pillar for '{}' from '{}'",
                    instrument.name(),
                    instrument.specifics()
                ),
            )
        })?;
        Ok(Self {
            name: instrument.name().to_string(),
            quote_kind: instrument.family().quote_kind(),
            pillar: tenor.advance(reference_date)?,
            quote: instrument.quote(),
        })
    }
}

/// Pluggable calibration procedure.
pub trait Calibrator: Send + Sync + fmt::Debug {
    /// Calibrates `curve` from `inputs`.
    ///
    /// `prerequisites` holds the built outputs of the curve's prerequisite
    /// curves, by name, in definition order.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Calibration` when the inputs are insufficient or
    /// the procedure fails.
    fn calibrate(
        &self,
        curve: &str,
        reference_date: Date,
        inputs: &[CalibrationInput],
        prerequisites: &[(String, CurveOutput)],
        interpolation: InterpolationMethod,
    ) -> MarketResult<PillarCurve>;
}

/// Sequential (pillar by pillar) bootstrapper.
///
/// | Quote kind | Solved discount factor |
/// |------------|------------------------|
/// | Deposit | `1 / (1 + q t)` |
/// | ZeroCoupon | `(1 + q)^-t` |
/// | FuturesPrice | `DF(prev) / (1 + r (t - t_prev))`, `r = (100 - q) / 100` |
/// | Swap | `(1 - q Σ τ_k DF_k) / (1 + q τ_n)` over fixed coupons |
/// | FlatRate | `exp(-q t)` |
/// | Spread | `DF_base(t) exp(-q t)` |
///
/// The first prerequisite curve, when there is one, is the base curve. Swaps
/// are then discounted on it while the calibrated curve only projects the
/// floating leg:
///
/// ```text
/// P_n = P_(n-1) / (1 + (q Σ τ_k D_k - Σ_(k<n) D_k (P_(k-1) / P_k - 1)) / D_n)
/// ```
///
/// Spread quotes without a base curve are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialBootstrapper;

impl SequentialBootstrapper {
    /// Creates a bootstrapper.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn solve(
        curve: &str,
        reference_date: Date,
        input: &CalibrationInput,
        partial: &PillarCurve,
        base: Option<&CurveOutput>,
    ) -> MarketResult<f64> {
        let t = reference_date.year_fraction(&input.pillar);
        let q = input.quote;
        let df = match input.quote_kind {
            QuoteKind::Deposit => 1.0 / (1.0 + q * t),
            QuoteKind::ZeroCoupon => (1.0 + q).powf(-t),
            QuoteKind::FlatRate => (-q * t).exp(),
            QuoteKind::FuturesPrice => {
                let (t_prev, df_prev) = partial
                    .times()
                    .iter()
                    .copied()
                    .zip(partial.discount_factors().iter().copied())
                    .last()
                    .unwrap_or((0.0, 1.0));
                let rate = (100.0 - q) / 100.0;
                df_prev / (1.0 + rate * (t - t_prev))
            }
            QuoteKind::Swap { fixed_frequency } => {
                let dates = fixed_schedule(curve, reference_date, input.pillar, fixed_frequency)?;
                if let Some(discount) = base {
                    return Self::solve_projected_swap(reference_date, input, &dates, partial, discount);
                }
                let mut annuity = 0.0;
                let mut prev = reference_date;
                for date in &dates[..dates.len() - 1] {
                    let tau = prev.year_fraction(date);
                    annuity += tau * partial.df(reference_date.year_fraction(date));
                    prev = *date;
                }
                let tau_n = prev.year_fraction(&input.pillar);
                (1.0 - q * annuity) / (1.0 + q * tau_n)
            }
            QuoteKind::Spread => {
                let base = base.ok_or_else(|| {
                    MarketError::calibration(
                        curve,
                        format!("Spread quote '{}' needs a base curve", input.name),
                    )
                })?;
                base.discount_factor_at(t)? * (-q * t).exp()
            }
        };
        Ok(df)
    }

    /// Projection discount factor at the last fixed date of a swap whose
    /// legs are discounted on `discount`. Floating periods follow the fixed
    /// schedule.
    fn solve_projected_swap(
        reference_date: Date,
        input: &CalibrationInput,
        dates: &[Date],
        partial: &PillarCurve,
        discount: &CurveOutput,
    ) -> MarketResult<f64> {
        let mut fixed = 0.0;
        let mut floating = 0.0;
        let mut prev = reference_date;
        let mut prev_projected = 1.0;
        for date in &dates[..dates.len() - 1] {
            let t = reference_date.year_fraction(date);
            let d = discount.discount_factor_at(t)?;
            let projected = partial.df(t);
            fixed += prev.year_fraction(date) * d;
            floating += d * (prev_projected / projected - 1.0);
            prev = *date;
            prev_projected = projected;
        }
        let d_n = discount.discount_factor_at(reference_date.year_fraction(&input.pillar))?;
        fixed += prev.year_fraction(&input.pillar) * d_n;
        Ok(prev_projected / (1.0 + (input.quote * fixed - floating) / d_n))
    }
}

/// Fixed coupon dates from `start` to `end`, stepping `12 / frequency` months.
fn fixed_schedule(curve: &str, start: Date, end: Date, frequency: u32) -> MarketResult<Vec<Date>> {
    if frequency == 0 || 12 % frequency != 0 {
        return Err(MarketError::calibration(
            curve,
            format!("Unsupported fixed leg frequency {frequency}"),
        ));
    }
    let step = Tenor::months(12 / frequency);
    let mut dates = Vec::new();
    let mut current = step.advance(start)?;
    while current < end {
        dates.push(current);
        current = step.advance(current)?;
    }
    dates.push(end);
    Ok(dates)
}

impl Calibrator for SequentialBootstrapper {
    fn calibrate(
        &self,
        curve: &str,
        reference_date: Date,
        inputs: &[CalibrationInput],
        prerequisites: &[(String, CurveOutput)],
        interpolation: InterpolationMethod,
    ) -> MarketResult<PillarCurve> {
        if inputs.is_empty() {
            return Err(MarketError::calibration(curve, "No instruments provided"));
        }

        let base = prerequisites.first().map(|(_, output)| output);
        let mut sorted: Vec<&CalibrationInput> = inputs.iter().collect();
        sorted.sort_by_key(|input| input.pillar);

        let mut pillars: Vec<(f64, f64)> = Vec::with_capacity(sorted.len());
        for input in sorted {
            let t = reference_date.year_fraction(&input.pillar);
            if t <= 0.0 {
                return Err(MarketError::calibration(
                    curve,
                    format!("Pillar of '{}' is not after {reference_date}", input.name),
                ));
            }
            if pillars.last().is_some_and(|&(last, _)| last >= t) {
                return Err(MarketError::calibration(
                    curve,
                    format!("Duplicate pillar {} for '{}'", input.pillar, input.name),
                ));
            }

            let partial = PillarCurve::new(reference_date, &pillars, interpolation)
                .map_err(|e| MarketError::calibration(curve, e.to_string()))?;
            let df = Self::solve(curve, reference_date, input, &partial, base)?;
            if !(df.is_finite() && df > 0.0) {
                return Err(MarketError::calibration(
                    curve,
                    format!("Invalid discount factor {df} solved for '{}'", input.name),
                ));
            }
            pillars.push((t, df));
        }

        debug!(curve = %curve, pillars = pillars.len(), "calibrated");
        PillarCurve::new(reference_date, &pillars, interpolation)
            .map_err(|e| MarketError::calibration(curve, e.to_string()))
    }
}
