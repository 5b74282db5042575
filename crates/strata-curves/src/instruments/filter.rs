//! Instrument selection.

use serde::{Deserialize, Serialize};

use strata_core::types::{AssetClass, Currency, RiskType};

use super::instrument::Instrument;

/// Selects instruments by name, family and classification.
///
/// Groups combine with AND, values within a group with OR. An absent group
/// does not constrain; the default filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentFilter {
    /// Instrument names.
    pub names: Option<Vec<String>>,
    /// Family names.
    pub families: Option<Vec<String>>,
    /// Instrument currencies.
    pub currencies: Option<Vec<Currency>>,
    /// Risk types.
    pub risk_types: Option<Vec<RiskType>>,
    /// Asset classes.
    pub asset_classes: Option<Vec<AssetClass>>,
}

fn group_allows<T: PartialEq<U>, U: ?Sized>(group: Option<&Vec<T>>, value: &U) -> bool {
    group.map_or(true, |values| values.iter().any(|v| v == value))
}

impl InstrumentFilter {
    /// Filter that matches every instrument.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts to the given instrument names.
    #[must_use]
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts to the given family names.
    #[must_use]
    pub fn with_families<I, S>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.families = Some(families.into_iter().map(Into::into).collect());
        self
    }

    /// Restricts to the given currencies.
    #[must_use]
    pub fn with_currencies(mut self, currencies: impl IntoIterator<Item = Currency>) -> Self {
        self.currencies = Some(currencies.into_iter().collect());
        self
    }

    /// Restricts to the given risk types.
    #[must_use]
    pub fn with_risk_types(mut self, risk_types: impl IntoIterator<Item = RiskType>) -> Self {
        self.risk_types = Some(risk_types.into_iter().collect());
        self
    }

    /// Restricts to the given asset classes.
    #[must_use]
    pub fn with_asset_classes(mut self, classes: impl IntoIterator<Item = AssetClass>) -> Self {
        self.asset_classes = Some(classes.into_iter().collect());
        self
    }

    /// Returns true if `instrument` passes every group.
    #[must_use]
    pub fn matches(&self, instrument: &Instrument) -> bool {
        group_allows(self.names.as_ref(), instrument.name())
            && group_allows(self.families.as_ref(), instrument.family().name())
            && group_allows(self.currencies.as_ref(), &instrument.currency())
            && group_allows(self.risk_types.as_ref(), &instrument.risk_type())
            && group_allows(self.asset_classes.as_ref(), &instrument.asset_class())
    }
}

/// Applies an optional filter; `None` matches everything.
#[must_use]
pub fn filter_matches(filter: Option<&InstrumentFilter>, instrument: &Instrument) -> bool {
    filter.map_or(true, |f| f.matches(instrument))
}
