//! Calibrated curve outputs.
//!
//! Outputs keep handles to the quote cells they were built from. A
//! bootstrapped output remembers the quotes it was calibrated with, its own
//! and those its prerequisite curves depend on, and recalibrates on the next
//! query once any live quote differs; spread and flat outputs read their
//! quotes at query time.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use strata_core::types::Date;
use strata_core::MarketResult;

use crate::bootstrap::{CalibrationInput, Calibrator};
use crate::instruments::Instrument;
use crate::interpolation::{linear_flat, InterpolationMethod};
use crate::term_structure::{PillarCurve, TermStructure};

/// Built term structure of a curve.
///
/// Cloning shares the calibrated state.
#[derive(Debug, Clone)]
pub enum CurveOutput {
    /// Calibrated by a [`Calibrator`].
    Bootstrapped(Arc<BootstrappedOutput>),
    /// Spread over a base curve.
    Spread(Arc<SpreadOutput>),
    /// Flat continuously compounded rate.
    Flat(Arc<FlatOutput>),
}

impl CurveOutput {
    /// Returns true if both outputs share the same calibrated state.
    #[must_use]
    pub fn ptr_eq(&self, other: &CurveOutput) -> bool {
        match (self, other) {
            (Self::Bootstrapped(a), Self::Bootstrapped(b)) => Arc::ptr_eq(a, b),
            (Self::Spread(a), Self::Spread(b)) => Arc::ptr_eq(a, b),
            (Self::Flat(a), Self::Flat(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Appends every live quote this output depends on, including those of
    /// its prerequisite and base curves.
    pub fn collect_live_quotes(&self, out: &mut Vec<f64>) {
        match self {
            Self::Bootstrapped(o) => {
                out.extend(o.instruments.iter().map(Instrument::quote));
                for (_, prerequisite) in &o.prerequisites {
                    prerequisite.collect_live_quotes(out);
                }
            }
            Self::Spread(o) => {
                o.base.collect_live_quotes(out);
                out.extend(o.instruments.iter().map(Instrument::quote));
            }
            Self::Flat(o) => out.push(o.instrument.quote()),
        }
    }
}

impl TermStructure for CurveOutput {
    fn reference_date(&self) -> Date {
        match self {
            Self::Bootstrapped(o) => o.reference_date(),
            Self::Spread(o) => o.reference_date(),
            Self::Flat(o) => o.reference_date(),
        }
    }

    fn discount_factor_at(&self, t: f64) -> MarketResult<f64> {
        match self {
            Self::Bootstrapped(o) => o.discount_factor_at(t),
            Self::Spread(o) => o.discount_factor_at(t),
            Self::Flat(o) => o.discount_factor_at(t),
        }
    }
}

#[derive(Debug)]
struct Calibrated {
    quotes: Vec<f64>,
    upstream: Vec<f64>,
    pillars: PillarCurve,
}

/// Output of a calibrated rate curve.
#[derive(Debug)]
pub struct BootstrappedOutput {
    curve: String,
    reference_date: Date,
    instruments: Vec<Instrument>,
    prerequisites: Vec<(String, CurveOutput)>,
    interpolation: InterpolationMethod,
    calibrator: Arc<dyn Calibrator>,
    state: RwLock<Calibrated>,
}

fn live_quotes(instruments: &[Instrument]) -> Vec<f64> {
    instruments.iter().map(Instrument::quote).collect()
}

fn upstream_quotes(prerequisites: &[(String, CurveOutput)]) -> Vec<f64> {
    let mut quotes = Vec::new();
    for (_, output) in prerequisites {
        output.collect_live_quotes(&mut quotes);
    }
    quotes
}

fn same_bits(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

impl BootstrappedOutput {
    /// Calibrates `instruments` for `curve` on top of the built
    /// `prerequisites`.
    ///
    /// # Errors
    ///
    /// Propagates calibration errors.
    pub fn calibrate(
        curve: impl Into<String>,
        reference_date: Date,
        instruments: Vec<Instrument>,
        prerequisites: Vec<(String, CurveOutput)>,
        interpolation: InterpolationMethod,
        calibrator: Arc<dyn Calibrator>,
    ) -> MarketResult<Self> {
        let curve = curve.into();
        let quotes = live_quotes(&instruments);
        let upstream = upstream_quotes(&prerequisites);
        let pillars = run_calibration(
            &curve,
            reference_date,
            &instruments,
            &quotes,
            &prerequisites,
            interpolation,
            calibrator.as_ref(),
        )?;
        Ok(Self {
            curve,
            reference_date,
            instruments,
            prerequisites,
            interpolation,
            calibrator,
            state: RwLock::new(Calibrated {
                quotes,
                upstream,
                pillars,
            }),
        })
    }

    /// Rebuilds an output from previously calibrated pillars and the quotes
    /// they were calibrated from, without calling the calibrator.
    ///
    /// The prerequisites are taken as current.
    #[must_use]
    pub fn restore(
        curve: impl Into<String>,
        instruments: Vec<Instrument>,
        prerequisites: Vec<(String, CurveOutput)>,
        calibrator: Arc<dyn Calibrator>,
        quotes: Vec<f64>,
        pillars: PillarCurve,
    ) -> Self {
        let upstream = upstream_quotes(&prerequisites);
        Self {
            curve: curve.into(),
            reference_date: pillars.reference_date(),
            interpolation: pillars.interpolation(),
            instruments,
            prerequisites,
            calibrator,
            state: RwLock::new(Calibrated {
                quotes,
                upstream,
                pillars,
            }),
        }
    }

    /// Instruments the curve is calibrated from.
    #[must_use]
    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    /// Prerequisite curve outputs the curve is calibrated on.
    #[must_use]
    pub fn prerequisites(&self) -> &[(String, CurveOutput)] {
        &self.prerequisites
    }

    /// Returns true if a live quote, own or upstream, differs from the
    /// calibrated one.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        let state = self.state.read();
        !same_bits(&state.quotes, &live_quotes(&self.instruments))
            || !same_bits(&state.upstream, &upstream_quotes(&self.prerequisites))
    }

    /// Calibrated pillars and the quotes they were calibrated from,
    /// recalibrating first if stale.
    ///
    /// # Errors
    ///
    /// Propagates calibration errors.
    pub fn pillars(&self) -> MarketResult<(Vec<f64>, PillarCurve)> {
        self.with_current(|c| (c.quotes.clone(), c.pillars.clone()))
    }

    fn with_current<R>(&self, f: impl FnOnce(&Calibrated) -> R) -> MarketResult<R> {
        let live = live_quotes(&self.instruments);
        let upstream = upstream_quotes(&self.prerequisites);
        {
            let state = self.state.read();
            if same_bits(&state.quotes, &live) && same_bits(&state.upstream, &upstream) {
                return Ok(f(&*state));
            }
        }

        trace!(curve = %self.curve, "quotes moved, recalibrating");
        let pillars = run_calibration(
            &self.curve,
            self.reference_date,
            &self.instruments,
            &live,
            &self.prerequisites,
            self.interpolation,
            self.calibrator.as_ref(),
        )?;
        let mut state = self.state.write();
        *state = Calibrated {
            quotes: live,
            upstream,
            pillars,
        };
        Ok(f(&*state))
    }
}

fn run_calibration(
    curve: &str,
    reference_date: Date,
    instruments: &[Instrument],
    quotes: &[f64],
    prerequisites: &[(String, CurveOutput)],
    interpolation: InterpolationMethod,
    calibrator: &dyn Calibrator,
) -> MarketResult<PillarCurve> {
    let inputs = instruments
        .iter()
        .zip(quotes)
        .map(|(instrument, &quote)| {
            CalibrationInput::from_instrument(curve, reference_date, instrument)
                .map(|input| CalibrationInput { quote, ..input })
        })
        .collect::<MarketResult<Vec<_>>>()?;
    calibrator.calibrate(curve, reference_date, &inputs, prerequisites, interpolation)
}

impl TermStructure for BootstrappedOutput {
    fn reference_date(&self) -> Date {
        self.reference_date
    }

    fn discount_factor_at(&self, t: f64) -> MarketResult<f64> {
        self.with_current(|c| c.pillars.df(t))
    }
}

/// Base curve plus a continuously compounded spread term structure.
///
/// `DF(t) = DF_base(t) * exp(-s(t) t)`, with `s` interpolated linearly
/// between spread pillars and flat beyond them.
#[derive(Debug)]
pub struct SpreadOutput {
    base: CurveOutput,
    times: Vec<f64>,
    instruments: Vec<Instrument>,
}

impl SpreadOutput {
    /// Creates a spread output.
    ///
    /// `pillars` pairs each spread instrument with its pillar time; they are
    /// sorted by time here.
    #[must_use]
    pub fn new(base: CurveOutput, mut pillars: Vec<(f64, Instrument)>) -> Self {
        pillars.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (times, instruments) = pillars.into_iter().unzip();
        Self {
            base,
            times,
            instruments,
        }
    }

    /// Spread pillar times, ascending.
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Base curve output.
    #[must_use]
    pub fn base(&self) -> &CurveOutput {
        &self.base
    }

    /// Spread at `t` from the live quotes.
    #[must_use]
    pub fn spread_at(&self, t: f64) -> f64 {
        let spreads = live_quotes(&self.instruments);
        linear_flat(&self.times, &spreads, t)
    }
}

impl TermStructure for SpreadOutput {
    fn reference_date(&self) -> Date {
        self.base.reference_date()
    }

    fn discount_factor_at(&self, t: f64) -> MarketResult<f64> {
        Ok(self.base.discount_factor_at(t)? * (-self.spread_at(t) * t).exp())
    }
}

/// Flat continuously compounded zero rate read from one instrument.
#[derive(Debug)]
pub struct FlatOutput {
    reference_date: Date,
    instrument: Instrument,
}

impl FlatOutput {
    /// Creates a flat output.
    #[must_use]
    pub fn new(reference_date: Date, instrument: Instrument) -> Self {
        Self {
            reference_date,
            instrument,
        }
    }

    /// Current rate.
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.instrument.quote()
    }
}

impl TermStructure for FlatOutput {
    fn reference_date(&self) -> Date {
        self.reference_date
    }

    fn discount_factor_at(&self, t: f64) -> MarketResult<f64> {
        Ok((-self.rate() * t).exp())
    }
}
