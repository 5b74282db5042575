//! Pricers: the valuation surface the risk and scenario engines drive.
//!
//! A [`Pricer`] is bound to one [`MarketView`] and computes [`Metric`]s for a
//! trade. The engines only ever read metrics, swap markets and rebind.
//! [`CashflowPricer`] is the reference implementation: a stream of fixed and
//! floating cash flows discounted on a currency or CSA curve.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use strata_core::types::{Currency, Date};
use strata_core::{MarketError, MarketResult};
use strata_curves::{CurveOutput, TermStructure};
use strata_market::MarketView;

use crate::error::{RiskError, RiskResult};

/// Valuation metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Present value in the trade currency.
    Value,
    /// Present value converted to the pricer's reporting currency at spot.
    ReportingValue,
    /// Present value per risk currency, the input to sensitivities.
    RiskValue,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Value => "Value",
            Self::ReportingValue => "ReportingValue",
            Self::RiskValue => "RiskValue",
        };
        write!(f, "{name}")
    }
}

/// Result of a metric calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetricValue {
    /// A single number.
    Scalar(f64),
    /// One value per currency.
    ByCurrency(Vec<(Currency, f64)>),
}

impl MetricValue {
    /// The scalar value, if this is one.
    #[must_use]
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::ByCurrency(_) => None,
        }
    }

    /// The per-currency values, if this is a breakdown.
    #[must_use]
    pub fn currency_values(&self) -> Option<&[(Currency, f64)]> {
        match self {
            Self::Scalar(_) => None,
            Self::ByCurrency(values) => Some(values),
        }
    }
}

/// Computes valuation metrics for one trade against one market.
pub trait Pricer: Send + Sync {
    /// Name used in result tables.
    fn name(&self) -> &str;

    /// The market this pricer is bound to.
    fn market(&self) -> &Arc<MarketView>;

    /// Replaces the bound market.
    fn set_market(&mut self, market: Arc<MarketView>);

    /// Calculates `metric`.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::Pricing` for unsupported metrics and propagates
    /// market lookups.
    fn calculate(&self, metric: Metric) -> RiskResult<MetricValue>;

    /// A pricer for the same trade bound to `market`.
    fn with_market(&self, market: Arc<MarketView>) -> Box<dyn Pricer>;
}

/// One cash flow of a [`CashflowPricer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cashflow {
    /// Known amount paid on `date`.
    Fixed {
        /// Payment date.
        date: Date,
        /// Amount.
        amount: f64,
    },
    /// Simple-compounded index coupon over `[start, end]`, paid on `end`.
    ///
    /// Fixed from the market's fixings when `start` is on or before the
    /// pricing date, projected from the index curve otherwise.
    Floating {
        /// Index name.
        index: String,
        /// Accrual start.
        start: Date,
        /// Accrual end and payment date.
        end: Date,
        /// Notional.
        notional: f64,
        /// Spread over the index rate.
        #[serde(default)]
        spread: f64,
    },
}

impl Cashflow {
    /// Payment date.
    #[must_use]
    pub fn payment_date(&self) -> Date {
        match self {
            Self::Fixed { date, .. } => *date,
            Self::Floating { end, .. } => *end,
        }
    }
}

/// Prices a stream of single-currency cash flows.
///
/// Cash flows are discounted on the curve registered for the CSA id when one
/// is set, otherwise on the curve registered for the trade currency. Cash
/// flows paid before the pricing date are ignored. The reporting currency is
/// a constructor parameter.
#[derive(Debug, Clone)]
pub struct CashflowPricer {
    name: String,
    market: Arc<MarketView>,
    currency: Currency,
    reporting_currency: Currency,
    csa: Option<String>,
    cashflows: Vec<Cashflow>,
}

impl CashflowPricer {
    /// Creates a pricer without cash flows.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        market: Arc<MarketView>,
        currency: Currency,
        reporting_currency: Currency,
    ) -> Self {
        Self {
            name: name.into(),
            market,
            currency,
            reporting_currency,
            csa: None,
            cashflows: Vec::new(),
        }
    }

    /// Discounts on the curve registered under `csa` instead of the trade
    /// currency.
    #[must_use]
    pub fn with_csa(mut self, csa: impl Into<String>) -> Self {
        self.csa = Some(csa.into());
        self
    }

    /// Adds a cash flow.
    #[must_use]
    pub fn with_cashflow(mut self, cashflow: Cashflow) -> Self {
        self.cashflows.push(cashflow);
        self
    }

    /// Adds a fixed cash flow.
    #[must_use]
    pub fn with_fixed(self, date: Date, amount: f64) -> Self {
        self.with_cashflow(Cashflow::Fixed { date, amount })
    }

    /// Adds a floating coupon.
    #[must_use]
    pub fn with_floating(
        self,
        index: impl Into<String>,
        start: Date,
        end: Date,
        notional: f64,
        spread: f64,
    ) -> Self {
        self.with_cashflow(Cashflow::Floating {
            index: index.into(),
            start,
            end,
            notional,
            spread,
        })
    }

    /// Trade currency.
    #[must_use]
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Reporting currency.
    #[must_use]
    pub fn reporting_currency(&self) -> Currency {
        self.reporting_currency
    }

    /// Cash flows in insertion order.
    #[must_use]
    pub fn cashflows(&self) -> &[Cashflow] {
        &self.cashflows
    }

    fn discount_curve(&self) -> MarketResult<CurveOutput> {
        match &self.csa {
            Some(csa) => self.market.discount_curve(csa),
            None => self.market.discount_curve_for(self.currency),
        }
    }

    /// Amount of a cash flow, fixing or projecting floating coupons.
    ///
    /// # Errors
    ///
    /// Returns a lookup error for a missing fixing or projection curve.
    pub fn amount(&self, cashflow: &Cashflow) -> MarketResult<f64> {
        match cashflow {
            Cashflow::Fixed { amount, .. } => Ok(*amount),
            Cashflow::Floating {
                index,
                start,
                end,
                notional,
                spread,
            } => {
                let tau = start.year_fraction(end);
                if tau <= 0.0 {
                    return Err(MarketError::configuration(format!(
                        "coupon on '{index}' ends {end} before it starts {start}"
                    )));
                }
                let rate = if *start <= self.market.pricing_date() {
                    self.market.fixing(index, *start).ok_or_else(|| {
                        MarketError::lookup(format!("fixing of '{index}' on {start}"))
                    })?
                } else {
                    let curve = self.market.index_curve(index)?;
                    (curve.discount_factor(*start)? / curve.discount_factor(*end)? - 1.0) / tau
                };
                Ok(notional * (rate + spread) * tau)
            }
        }
    }

    /// Present value in the trade currency.
    ///
    /// # Errors
    ///
    /// Propagates curve, fixing and discounting lookups.
    pub fn present_value(&self) -> MarketResult<f64> {
        let pricing_date = self.market.pricing_date();
        let discount = self.discount_curve()?;
        self.cashflows
            .iter()
            .filter(|cf| cf.payment_date() >= pricing_date)
            .map(|cf| -> MarketResult<f64> {
                Ok(self.amount(cf)? * discount.discount_factor(cf.payment_date())?)
            })
            .sum()
    }
}

impl Pricer for CashflowPricer {
    fn name(&self) -> &str {
        &self.name
    }

    fn market(&self) -> &Arc<MarketView> {
        &self.market
    }

    fn set_market(&mut self, market: Arc<MarketView>) {
        self.market = market;
    }

    fn calculate(&self, metric: Metric) -> RiskResult<MetricValue> {
        let pv = self.present_value()?;
        Ok(match metric {
            Metric::Value => MetricValue::Scalar(pv),
            Metric::ReportingValue => {
                let fx = self.market.spot_fx(self.currency, self.reporting_currency)?;
                MetricValue::Scalar(pv * fx)
            }
            Metric::RiskValue => MetricValue::ByCurrency(vec![(self.currency, pv)]),
        })
    }

    fn with_market(&self, market: Arc<MarketView>) -> Box<dyn Pricer> {
        let mut pricer = self.clone();
        pricer.set_market(market);
        Box::new(pricer)
    }
}

/// Sum of the [`Metric::RiskValue`] breakdowns of `pricers`, per currency.
pub(crate) fn risk_values<'a>(
    pricers: impl IntoIterator<Item = &'a dyn Pricer>,
) -> RiskResult<BTreeMap<Currency, f64>> {
    let mut totals = BTreeMap::new();
    for pricer in pricers {
        let value = pricer.calculate(Metric::RiskValue)?;
        let values = value
            .currency_values()
            .ok_or_else(|| RiskError::unsupported(pricer.name(), Metric::RiskValue))?;
        for (currency, v) in values {
            *totals.entry(*currency).or_insert(0.0) += v;
        }
    }
    Ok(totals)
}
