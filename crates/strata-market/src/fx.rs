//! Spot FX table with inverse and triangulated lookups.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::trace;

use strata_core::types::Currency;
use strata_core::{MarketError, MarketResult};

/// One recorded spot rate: one unit of `from` buys `rate` units of `to`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FxQuote {
    /// Base currency.
    pub from: Currency,
    /// Quote currency.
    pub to: Currency,
    /// Units of `to` per unit of `from`.
    pub rate: f64,
}

/// Sparse table of spot rates.
///
/// Triangulated rates are cached on first lookup. Recording a new rate
/// clears the cache.
#[derive(Debug, Default)]
pub struct FxTable {
    rates: BTreeMap<(Currency, Currency), f64>,
    triangulated: RwLock<BTreeMap<(Currency, Currency), f64>>,
}

impl Clone for FxTable {
    fn clone(&self) -> Self {
        Self {
            rates: self.rates.clone(),
            triangulated: RwLock::new(self.triangulated.read().clone()),
        }
    }
}

impl FxTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `from -> to`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if both currencies are the same or the
    /// rate is not a positive finite number.
    pub fn insert(&mut self, from: Currency, to: Currency, rate: f64) -> MarketResult<()> {
        if from == to {
            return Err(MarketError::configuration(format!(
                "FX rate {from}/{to} must be between different currencies"
            )));
        }
        if !(rate.is_finite() && rate > 0.0) {
            return Err(MarketError::configuration(format!(
                "FX rate {from}/{to} must be positive, got {rate}"
            )));
        }
        self.rates.insert((from, to), rate);
        self.triangulated.get_mut().clear();
        Ok(())
    }

    /// Recorded rates, in currency pair order.
    #[must_use]
    pub fn quotes(&self) -> Vec<FxQuote> {
        self.rates
            .iter()
            .map(|(&(from, to), &rate)| FxQuote { from, to, rate })
            .collect()
    }

    /// Number of recorded rates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Returns true if no rates are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Direct or inverse rate.
    fn leg(&self, from: Currency, to: Currency) -> Option<f64> {
        self.rates
            .get(&(from, to))
            .copied()
            .or_else(|| self.rates.get(&(to, from)).map(|r| 1.0 / r))
    }

    /// Units of `to` per unit of `from`.
    ///
    /// Resolution order: `1.0` for equal currencies, the recorded rate, the
    /// inverse of the reverse rate, then triangulation through the first
    /// currency (in code order) with both legs known.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Lookup` if the rate cannot be resolved.
    pub fn spot(&self, from: Currency, to: Currency) -> MarketResult<f64> {
        if from == to {
            return Ok(1.0);
        }
        if let Some(rate) = self.leg(from, to) {
            return Ok(rate);
        }
        if let Some(rate) = self.triangulated.read().get(&(from, to)) {
            return Ok(*rate);
        }

        let currencies: BTreeSet<Currency> = self.rates.keys().flat_map(|&(a, b)| [a, b]).collect();
        for third in currencies {
            if third == from || third == to {
                continue;
            }
            if let (Some(third_from), Some(third_to)) = (self.leg(third, from), self.leg(third, to))
            {
                let rate = third_to / third_from;
                trace!(%from, %to, via = %third, rate, "triangulated FX");
                self.triangulated.write().insert((from, to), rate);
                return Ok(rate);
            }
        }

        Err(MarketError::lookup(format!("FX rate {from}/{to}")))
    }
}
