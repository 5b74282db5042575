//! Bump-and-reprice sensitivities to market instruments.
//!
//! For every instrument matching a filter, the [`RiskEngine`] bumps the quote
//! by the family's default bump, reprices every pricer and reports
//! `(bumped - base) / bump` per risk currency.
//!
//! Two strategies are available:
//!
//! - [`Strategy::FullRebuild`] derives an independent market per bump. The
//!   base market is never touched, so bumps run in parallel on the rayon
//!   pool when [`RiskConfig::parallel`] is set.
//! - [`Strategy::InPlace`] sets the live quote of the shared market, reprices,
//!   then restores the quote. It is sequential. Curves recalibrate on read
//!   from the live quotes, so both strategies agree for curves whose
//!   calibration depends only on quotes; treat disagreement beyond 1% as a
//!   signal to prefer FullRebuild.
//!
//! Any failure aborts the whole calculation. A partial ladder is never
//! returned.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, trace, warn};

use strata_core::types::{AssetClass, Currency, RiskType};
use strata_curves::{filter_matches, Instrument, InstrumentFilter};
use strata_market::MarketView;

use crate::config::RiskConfig;
use crate::error::RiskResult;
use crate::pricer::{risk_values, Pricer};

/// How bumped markets are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Derive a fresh market per bumped instrument.
    #[default]
    FullRebuild,
    /// Bump the live quote of the shared market and restore it afterwards.
    InPlace,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FullRebuild => write!(f, "full-rebuild"),
            Self::InPlace => write!(f, "in-place"),
        }
    }
}

/// Sensitivity of the pricers' value in one currency to one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRow {
    /// Currency of the value that moved.
    pub risk_currency: Currency,
    /// Instrument name.
    pub instrument: String,
    /// Value change per unit of quote.
    pub sensitivity: f64,
    /// Instrument family name.
    pub family: String,
    /// Instrument specifics.
    pub specifics: String,
    /// Instrument currency.
    pub instrument_currency: Currency,
    /// Unbumped quote.
    pub quote: f64,
    /// Asset class.
    pub asset_class: AssetClass,
    /// Risk type.
    pub risk_type: RiskType,
    /// Pillar time in years, when the specifics are a tenor.
    pub tenor_time: Option<f64>,
}

impl RiskRow {
    fn new(risk_currency: Currency, instrument: &Instrument, quote: f64, sensitivity: f64) -> Self {
        Self {
            risk_currency,
            instrument: instrument.name().to_string(),
            sensitivity,
            family: instrument.family().name().to_string(),
            specifics: instrument.specifics().to_string(),
            instrument_currency: instrument.currency(),
            quote,
            asset_class: instrument.asset_class(),
            risk_type: instrument.risk_type(),
            tenor_time: instrument.tenor_time(),
        }
    }
}

/// Table of sensitivities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    /// Rows in instrument name order, then currency order.
    pub rows: Vec<RiskRow>,
}

impl RiskReport {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total sensitivity to instruments of a family.
    #[must_use]
    pub fn total_for_family(&self, family: &str) -> f64 {
        self.rows
            .iter()
            .filter(|row| row.family == family)
            .map(|row| row.sensitivity)
            .sum()
    }

    /// Total sensitivity of `currency` value to instruments of a risk type.
    #[must_use]
    pub fn total_for_risk_type(&self, risk_type: RiskType, currency: Currency) -> f64 {
        self.rows
            .iter()
            .filter(|row| row.risk_type == risk_type && row.risk_currency == currency)
            .map(|row| row.sensitivity)
            .sum()
    }

    /// Rows for one instrument.
    pub fn rows_for_instrument<'a>(&'a self, instrument: &'a str) -> impl Iterator<Item = &'a RiskRow> {
        self.rows.iter().filter(move |row| row.instrument == instrument)
    }

    /// Rows ordered by risk currency, family, then tenor time.
    #[must_use]
    pub fn sorted(&self) -> Vec<&RiskRow> {
        let mut rows: Vec<&RiskRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| {
            a.risk_currency
                .cmp(&b.risk_currency)
                .then_with(|| a.family.cmp(&b.family))
                .then_with(|| {
                    let ta = a.tenor_time.unwrap_or(f64::INFINITY);
                    let tb = b.tenor_time.unwrap_or(f64::INFINITY);
                    ta.total_cmp(&tb)
                })
        });
        rows
    }
}

/// Bump-and-reprice risk engine.
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    config: RiskConfig,
}

impl RiskEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Sensitivities using the configured strategy and zero-removal default.
    ///
    /// # Errors
    ///
    /// See [`RiskEngine::calculate_market_risk`].
    pub fn calculate(
        &self,
        pricers: &[Box<dyn Pricer>],
        filter: Option<&InstrumentFilter>,
    ) -> RiskResult<RiskReport> {
        self.calculate_market_risk(pricers, filter, self.config.remove_zero_sens, self.config.strategy)
    }

    /// Sensitivities of the summed [`Metric::RiskValue`](crate::Metric::RiskValue)
    /// of `pricers` to every instrument matching `filter`.
    ///
    /// The market bumped is the first pricer's. An empty pricer list gives an
    /// empty report.
    ///
    /// # Errors
    ///
    /// Propagates the first derivation or pricing error.
    pub fn calculate_market_risk(
        &self,
        pricers: &[Box<dyn Pricer>],
        filter: Option<&InstrumentFilter>,
        remove_zero_sens: bool,
        strategy: Strategy,
    ) -> RiskResult<RiskReport> {
        let Some(first) = pricers.first() else {
            return Ok(RiskReport::default());
        };
        let market = Arc::clone(first.market());
        let instruments: Vec<&Instrument> = market
            .instruments()
            .filter(|instrument| filter_matches(filter, instrument))
            .collect();
        info!(
            %strategy,
            pricers = pricers.len(),
            instruments = instruments.len(),
            "calculating market risk"
        );

        let base = risk_values(pricers.iter().map(|pricer| &**pricer))?;
        let threshold = remove_zero_sens.then_some(self.config.zero_threshold);

        let ladders = match strategy {
            Strategy::FullRebuild if self.config.parallel => instruments
                .par_iter()
                .map(|instrument| Self::rebuild_bump(&market, pricers, &base, instrument, threshold))
                .collect::<RiskResult<Vec<_>>>()?,
            Strategy::FullRebuild => instruments
                .iter()
                .map(|instrument| Self::rebuild_bump(&market, pricers, &base, instrument, threshold))
                .collect::<RiskResult<Vec<_>>>()?,
            Strategy::InPlace => instruments
                .iter()
                .map(|instrument| Self::in_place_bump(pricers, &base, instrument, threshold))
                .collect::<RiskResult<Vec<_>>>()?,
        };

        let report = RiskReport {
            rows: ladders.into_iter().flatten().collect(),
        };
        info!(%strategy, rows = report.len(), "market risk complete");
        Ok(report)
    }

    fn rebuild_bump(
        market: &MarketView,
        pricers: &[Box<dyn Pricer>],
        base: &BTreeMap<Currency, f64>,
        instrument: &Instrument,
        threshold: Option<f64>,
    ) -> RiskResult<Vec<RiskRow>> {
        let (bumped, bump) = instrument.bumped();
        trace!(instrument = %instrument.name(), bump, quote = bumped.quote(), "bumping");
        let derived = Arc::new(market.derive([bumped])?);
        let rebound: Vec<Box<dyn Pricer>> = pricers
            .iter()
            .map(|pricer| pricer.with_market(Arc::clone(&derived)))
            .collect();
        let values = risk_values(rebound.iter().map(|pricer| &**pricer))?;
        Ok(ladder(base, &values, instrument, instrument.quote(), bump, threshold))
    }

    fn in_place_bump(
        pricers: &[Box<dyn Pricer>],
        base: &BTreeMap<Currency, f64>,
        instrument: &Instrument,
        threshold: Option<f64>,
    ) -> RiskResult<Vec<RiskRow>> {
        let family = instrument.family();
        let original = instrument.quote();
        let bump = family.default_bump();
        let bumped = family.bump_quote(original, bump);
        trace!(instrument = %instrument.name(), bump, quote = bumped, "bumping in place");

        instrument.set_quote(bumped);
        let values = risk_values(pricers.iter().map(|pricer| &**pricer));
        instrument.set_quote(original);

        if let Err(e) = &values {
            warn!(instrument = %instrument.name(), error = %e, "in-place bump failed, quote restored");
        }
        let values = values?;
        Ok(ladder(base, &values, instrument, original, bump, threshold))
    }
}

fn ladder(
    base: &BTreeMap<Currency, f64>,
    bumped: &BTreeMap<Currency, f64>,
    instrument: &Instrument,
    quote: f64,
    bump: f64,
    threshold: Option<f64>,
) -> Vec<RiskRow> {
    let currencies: BTreeSet<Currency> = base.keys().chain(bumped.keys()).copied().collect();
    currencies
        .into_iter()
        .filter_map(|currency| {
            let value = |values: &BTreeMap<Currency, f64>| values.get(&currency).copied().unwrap_or(0.0);
            let sensitivity = (value(bumped) - value(base)) / bump;
            match threshold {
                Some(limit) if sensitivity.abs() < limit => None,
                _ => Some(RiskRow::new(currency, instrument, quote, sensitivity)),
            }
        })
        .collect()
}
