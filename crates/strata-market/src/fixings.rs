//! Historical index fixings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use strata_core::types::Date;

/// Fixings per index, kept in date order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fixings(BTreeMap<String, BTreeMap<Date, f64>>);

impl Fixings {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds fixings for `index`; a fixing on an existing date replaces it.
    pub fn add(&mut self, index: impl Into<String>, fixings: impl IntoIterator<Item = (Date, f64)>) {
        self.0.entry(index.into()).or_default().extend(fixings);
    }

    /// Fixings of `index` in date order; empty if none are recorded.
    #[must_use]
    pub fn series(&self, index: &str) -> Vec<(Date, f64)> {
        self.0
            .get(index)
            .map(|series| series.iter().map(|(d, v)| (*d, *v)).collect())
            .unwrap_or_default()
    }

    /// Fixing of `index` on `date`.
    #[must_use]
    pub fn get(&self, index: &str, date: Date) -> Option<f64> {
        self.0.get(index).and_then(|series| series.get(&date)).copied()
    }

    /// Indices with at least one fixing.
    pub fn indices(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_and_replaced() {
        let d1 = Date::from_ymd(2024, 1, 2).unwrap();
        let d2 = Date::from_ymd(2024, 1, 3).unwrap();
        let mut fixings = Fixings::new();
        fixings.add("SOFR", [(d2, 0.053), (d1, 0.0531)]);
        fixings.add("SOFR", [(d2, 0.0532)]);

        assert_eq!(fixings.series("SOFR"), vec![(d1, 0.0531), (d2, 0.0532)]);
        assert_eq!(fixings.get("SOFR", d2), Some(0.0532));
        assert_eq!(fixings.get("ESTR", d2), None);
        assert!(fixings.series("ESTR").is_empty());
        assert_eq!(fixings.indices().collect::<Vec<_>>(), vec!["SOFR"]);
    }
}
