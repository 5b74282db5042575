//! What-if analysis: named, filtered batches of quote adjustments.
//!
//! A [`Scenario`] pairs quote adjusters with instrument filters. Applying it
//! to a market derives a new market in one step; the base market is never
//! modified.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use strata_core::MarketResult;
use strata_curves::{filter_matches, Instrument, InstrumentFilter};
use strata_market::MarketView;

use crate::error::{RiskError, RiskResult};
use crate::pricer::{Metric, Pricer};

/// How an adjustment value combines with a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    /// `quote + value`.
    Absolute,
    /// `quote * (1 + value)`.
    Relative,
    /// `value`.
    Fixed,
}

impl AdjustmentKind {
    /// Adjusted quote.
    #[must_use]
    pub fn apply(self, quote: f64, value: f64) -> f64 {
        match self {
            Self::Absolute => quote + value,
            Self::Relative => quote * (1.0 + value),
            Self::Fixed => value,
        }
    }
}

/// Produces an adjusted copy of an instrument.
pub trait QuoteAdjuster: Send + Sync + fmt::Debug {
    /// Adjusted instrument with a fresh quote cell, or an unchanged clone.
    fn adjust(&self, instrument: &Instrument) -> Instrument;
}

/// Applies the same value to every instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimpleQuoteAdjuster {
    /// Adjustment kind.
    pub kind: AdjustmentKind,
    /// Adjustment value.
    pub value: f64,
}

impl SimpleQuoteAdjuster {
    /// Creates an adjuster.
    #[must_use]
    pub fn new(kind: AdjustmentKind, value: f64) -> Self {
        Self { kind, value }
    }
}

impl QuoteAdjuster for SimpleQuoteAdjuster {
    fn adjust(&self, instrument: &Instrument) -> Instrument {
        instrument.with_quote(self.kind.apply(instrument.quote(), self.value))
    }
}

/// Adjustment as a function of pillar time in years.
type ShiftFn = dyn Fn(f64) -> f64 + Send + Sync;

/// Applies `shift(pillar_time)` to every instrument whose specifics parse
/// as a tenor. Other instruments are left unchanged.
#[derive(Clone)]
pub struct TermStructureQuoteAdjuster {
    kind: AdjustmentKind,
    shift: Arc<ShiftFn>,
}

impl TermStructureQuoteAdjuster {
    /// Creates an adjuster.
    pub fn new(kind: AdjustmentKind, shift: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            kind,
            shift: Arc::new(shift),
        }
    }

    /// Adjustment kind.
    #[must_use]
    pub fn kind(&self) -> AdjustmentKind {
        self.kind
    }
}

impl fmt::Debug for TermStructureQuoteAdjuster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TermStructureQuoteAdjuster")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl QuoteAdjuster for TermStructureQuoteAdjuster {
    fn adjust(&self, instrument: &Instrument) -> Instrument {
        match instrument.tenor_time() {
            Some(t) => instrument.with_quote(self.kind.apply(instrument.quote(), (self.shift)(t))),
            None => instrument.clone(),
        }
    }
}

/// An adjuster restricted to instruments matching a filter.
#[derive(Debug, Clone)]
pub struct SelectedQuoteAdjuster {
    adjuster: Arc<dyn QuoteAdjuster>,
    filter: Option<InstrumentFilter>,
}

impl SelectedQuoteAdjuster {
    /// Pairs `adjuster` with `filter`; `None` selects every instrument.
    pub fn new(adjuster: impl QuoteAdjuster + 'static, filter: Option<InstrumentFilter>) -> Self {
        Self {
            adjuster: Arc::new(adjuster),
            filter,
        }
    }

    /// Filter, if any.
    #[must_use]
    pub fn filter(&self) -> Option<&InstrumentFilter> {
        self.filter.as_ref()
    }

    /// Returns true if `instrument` is selected.
    #[must_use]
    pub fn matches(&self, instrument: &Instrument) -> bool {
        filter_matches(self.filter.as_ref(), instrument)
    }

    /// Adjusted copy of `instrument`.
    #[must_use]
    pub fn adjust(&self, instrument: &Instrument) -> Instrument {
        self.adjuster.adjust(instrument)
    }
}

/// A named batch of selected quote adjustments.
#[derive(Debug, Clone)]
pub struct Scenario {
    name: String,
    adjustments: Vec<SelectedQuoteAdjuster>,
}

impl Scenario {
    /// Creates an empty scenario.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            adjustments: Vec::new(),
        }
    }

    /// Appends an adjustment. Later adjustments win when several select the
    /// same instrument.
    #[must_use]
    pub fn with_adjustment(mut self, adjustment: SelectedQuoteAdjuster) -> Self {
        self.adjustments.push(adjustment);
        self
    }

    /// Scenario applying `kind`/`value` to instruments matching `filter`.
    pub fn adjust_quotes(
        name: impl Into<String>,
        kind: AdjustmentKind,
        value: f64,
        filter: Option<InstrumentFilter>,
    ) -> Self {
        Self::new(name).with_adjustment(SelectedQuoteAdjuster::new(
            SimpleQuoteAdjuster::new(kind, value),
            filter,
        ))
    }

    /// Scenario reshaping quotes by pillar time, e.g. a steepener.
    pub fn curve_shape(
        name: impl Into<String>,
        kind: AdjustmentKind,
        shift: impl Fn(f64) -> f64 + Send + Sync + 'static,
        filter: Option<InstrumentFilter>,
    ) -> Self {
        Self::new(name).with_adjustment(SelectedQuoteAdjuster::new(
            TermStructureQuoteAdjuster::new(kind, shift),
            filter,
        ))
    }

    /// Scenario name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adjustments in application order.
    #[must_use]
    pub fn adjustments(&self) -> &[SelectedQuoteAdjuster] {
        &self.adjustments
    }

    /// Adjusted instruments, keyed by name. Every adjustment works from the
    /// quotes of `market`.
    #[must_use]
    pub fn adjusted_instruments(&self, market: &MarketView) -> BTreeMap<String, Instrument> {
        let mut adjusted = BTreeMap::new();
        for adjustment in &self.adjustments {
            for instrument in market.instruments().filter(|i| adjustment.matches(i)) {
                adjusted.insert(instrument.name().to_string(), adjustment.adjust(instrument));
            }
        }
        adjusted
    }

    /// Derives the scenario market from `market`.
    ///
    /// # Errors
    ///
    /// Propagates derivation errors.
    pub fn create_market(&self, market: &MarketView) -> MarketResult<MarketView> {
        let adjusted = self.adjusted_instruments(market);
        debug!(scenario = %self.name, instruments = adjusted.len(), "applying scenario");
        market.derive(adjusted.into_values())
    }
}

/// Relative change of a scenario value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelativeChange {
    /// `change / base`.
    Value(f64),
    /// The base value is exactly zero.
    Undefined,
}

impl RelativeChange {
    /// `change / base`, or `Undefined` when `base` is zero.
    #[must_use]
    pub fn of(change: f64, base: f64) -> Self {
        if base == 0.0 {
            Self::Undefined
        } else {
            Self::Value(change / base)
        }
    }

    /// The ratio, if defined.
    #[must_use]
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            Self::Undefined => None,
        }
    }
}

/// One pricer under one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRow {
    /// Pricer name.
    pub pricer: String,
    /// Scenario name.
    pub scenario: String,
    /// Metric evaluated.
    pub metric: Metric,
    /// Value on the base market.
    pub base: f64,
    /// Value on the scenario market.
    pub scenario_value: f64,
    /// `scenario_value - base`.
    pub change_abs: f64,
    /// `change_abs / base`.
    pub change_rel: RelativeChange,
}

impl ScenarioRow {
    /// Builds a row and its changes.
    #[must_use]
    pub fn new(
        pricer: impl Into<String>,
        scenario: impl Into<String>,
        metric: Metric,
        base: f64,
        scenario_value: f64,
    ) -> Self {
        let change_abs = scenario_value - base;
        Self {
            pricer: pricer.into(),
            scenario: scenario.into(),
            metric,
            base,
            scenario_value,
            change_abs,
            change_rel: RelativeChange::of(change_abs, base),
        }
    }
}

/// Table of scenario impacts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Rows.
    pub rows: Vec<ScenarioRow>,
}

impl ScenarioReport {
    /// Rows ordered by pricer, then scenario.
    #[must_use]
    pub fn sorted(&self) -> Vec<&ScenarioRow> {
        let mut rows: Vec<&ScenarioRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| a.pricer.cmp(&b.pricer).then_with(|| a.scenario.cmp(&b.scenario)));
        rows
    }
}

fn scalar(pricer: &dyn Pricer, metric: Metric) -> RiskResult<f64> {
    pricer
        .calculate(metric)?
        .as_scalar()
        .ok_or_else(|| RiskError::unsupported(pricer.name(), metric))
}

/// Impact of `scenario` on `metric` of `pricer`, as a single-row report.
///
/// # Errors
///
/// Returns `RiskError::Pricing` when `metric` is not a scalar for this
/// pricer, and propagates derivation and pricing errors.
pub fn calculate_scenario_impact(
    scenario: &Scenario,
    pricer: &dyn Pricer,
    metric: Metric,
) -> RiskResult<ScenarioReport> {
    info!(scenario = %scenario.name(), pricer = %pricer.name(), %metric, "calculating scenario impact");
    let market = scenario.create_market(pricer.market())?;
    let scenario_pricer = pricer.with_market(Arc::new(market));

    let base = scalar(pricer, metric)?;
    let scenario_value = scalar(scenario_pricer.as_ref(), metric)?;
    Ok(ScenarioReport {
        rows: vec![ScenarioRow::new(pricer.name(), scenario.name(), metric, base, scenario_value)],
    })
}

/// Concatenates reports.
pub fn combine_scenario_results(results: impl IntoIterator<Item = ScenarioReport>) -> ScenarioReport {
    ScenarioReport {
        rows: results.into_iter().flat_map(|r| r.rows).collect(),
    }
}
