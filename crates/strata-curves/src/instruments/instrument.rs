//! Quoted instruments.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use strata_core::types::{AssetClass, Currency, RiskType, Tenor};

use super::family::InstrumentFamily;
use crate::quote::QuoteHandle;

/// A named, quoted market data point.
///
/// Cloning an instrument shares its quote cell, so `set_quote` on either copy
/// is seen by both and by every curve calibrated from it. Use
/// [`Instrument::with_quote`] for an independent replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    name: String,
    family: Arc<InstrumentFamily>,
    specifics: String,
    quote: QuoteHandle,
}

impl Instrument {
    /// Creates an instrument with a fresh quote cell.
    ///
    /// `specifics` identifies the instrument within its family, normally a
    /// tenor such as `"5Y"`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        family: Arc<InstrumentFamily>,
        specifics: impl Into<String>,
        quote: f64,
    ) -> Self {
        Self {
            name: name.into(),
            family,
            specifics: specifics.into(),
            quote: QuoteHandle::new(quote),
        }
    }

    /// Creates an instrument named `"{family}-{specifics}"`.
    #[must_use]
    pub fn from_family(family: Arc<InstrumentFamily>, specifics: &str, quote: f64) -> Self {
        let name = format!("{}-{}", family.name(), specifics);
        Self::new(name, family, specifics, quote)
    }

    /// Instrument name, unique within a market.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current quote.
    #[must_use]
    pub fn quote(&self) -> f64 {
        self.quote.get()
    }

    /// Overwrites the quote in place.
    ///
    /// Every holder of this quote cell sees the new value immediately,
    /// including calibrated curves. No invalidation is sent.
    pub fn set_quote(&self, value: f64) {
        self.quote.set(value);
    }

    /// Same instrument with `value` in a new, unshared quote cell.
    #[must_use]
    pub fn with_quote(&self, value: f64) -> Self {
        Self {
            name: self.name.clone(),
            family: Arc::clone(&self.family),
            specifics: self.specifics.clone(),
            quote: QuoteHandle::new(value),
        }
    }

    /// Copy bumped by the family's default bump, and the bump size used.
    #[must_use]
    pub fn bumped(&self) -> (Self, f64) {
        let bump = self.family.default_bump();
        (self.with_quote(self.family.bump_quote(self.quote(), bump)), bump)
    }

    /// Handle to the quote cell.
    #[must_use]
    pub fn quote_handle(&self) -> &QuoteHandle {
        &self.quote
    }

    /// Owning family.
    #[must_use]
    pub fn family(&self) -> &Arc<InstrumentFamily> {
        &self.family
    }

    /// Instrument specifics, normally a tenor string.
    #[must_use]
    pub fn specifics(&self) -> &str {
        &self.specifics
    }

    /// Pillar tenor, when the specifics parse as one.
    #[must_use]
    pub fn tenor(&self) -> Option<Tenor> {
        Tenor::try_parse(&self.specifics)
    }

    /// Pillar time in years, when the specifics parse as a tenor.
    #[must_use]
    pub fn tenor_time(&self) -> Option<f64> {
        self.tenor().map(|t| t.year_fraction())
    }

    /// Currency, from the family.
    #[must_use]
    pub fn currency(&self) -> Currency {
        self.family.currency()
    }

    /// Risk type, from the family.
    #[must_use]
    pub fn risk_type(&self) -> RiskType {
        self.family.risk_type()
    }

    /// Asset class, from the family.
    #[must_use]
    pub fn asset_class(&self) -> AssetClass {
        self.family.asset_class()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sofr() -> Arc<InstrumentFamily> {
        Arc::new(InstrumentFamily::swap("IRS-SOFR", Currency::USD, 1))
    }

    #[test]
    fn test_clone_shares_quote() {
        let a = Instrument::from_family(sofr(), "5Y", 0.04);
        let b = a.clone();
        b.set_quote(0.041);
        assert_eq!(a.quote(), 0.041);
        assert_eq!(a.name(), "IRS-SOFR-5Y");
    }

    #[test]
    fn test_with_quote_is_independent() {
        let a = Instrument::from_family(sofr(), "5Y", 0.04);
        let b = a.with_quote(0.05);
        assert_eq!(a.quote(), 0.04);
        assert_eq!(b.quote(), 0.05);
        assert_eq!(a.name(), b.name());
        assert!(!a.quote_handle().same_cell(b.quote_handle()));
    }

    #[test]
    fn test_bumped() {
        let a = Instrument::from_family(sofr(), "5Y", 0.04);
        let (b, bump) = a.bumped();
        assert_eq!(bump, 0.0001);
        assert_relative_eq!(b.quote(), 0.0401);
        assert_eq!(a.quote(), 0.04);
    }

    #[test]
    fn test_tenor_time() {
        let a = Instrument::from_family(sofr(), "18M", 0.04);
        assert_relative_eq!(a.tenor_time().unwrap(), 1.5);
        let b = Instrument::new("SOFR-DEC25", sofr(), "DEC25", 0.04);
        assert!(b.tenor_time().is_none());
    }

    #[test]
    fn test_classification_delegates_to_family() {
        let a = Instrument::from_family(sofr(), "2Y", 0.04);
        assert_eq!(a.currency(), Currency::USD);
        assert_eq!(a.risk_type(), RiskType::Rate);
        assert_eq!(a.asset_class(), AssetClass::Rate);
    }
}
