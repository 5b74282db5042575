//! Classification of quoted instruments.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Asset class categorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    /// Equities.
    Equity,
    /// Bonds.
    Bond,
    /// Commodities.
    Commodity,
    /// Interest rates.
    Rate,
    /// Inflation.
    Inflation,
    /// Foreign exchange.
    Fx,
    /// Cash.
    Cash,
    /// Crypto assets.
    Crypto,
}

/// Market risk category an instrument contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskType {
    /// Equity price risk.
    Equity,
    /// Bond price risk.
    Bond,
    /// Commodity price risk.
    Commodity,
    /// Outright interest rate risk.
    Rate,
    /// Basis between two rate indices.
    RateBasis,
    /// Credit spread risk.
    Credit,
    /// Inflation risk.
    Inflation,
    /// FX risk.
    Fx,
    /// Default risk.
    Default,
    /// Crypto price risk.
    Crypto,
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for RiskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
