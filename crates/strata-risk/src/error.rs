//! Error types for risk and scenario calculations.

use thiserror::Error;

use strata_core::MarketError;

/// A specialized Result type for risk operations.
pub type RiskResult<T> = Result<T, RiskError>;

/// Errors that can occur during risk and scenario calculations.
#[derive(Debug, Error)]
pub enum RiskError {
    /// Market construction, derivation or lookup failed.
    #[error(transparent)]
    Market(#[from] MarketError),

    /// A pricer cannot produce the requested metric.
    #[error("pricer '{pricer}' cannot calculate {metric}")]
    Pricing {
        /// Pricer name.
        pricer: String,
        /// Requested metric.
        metric: String,
    },

    /// Engine configuration could not be read.
    #[error("invalid risk configuration: {0}")]
    Config(String),
}

impl RiskError {
    /// Creates a pricing error for an unsupported metric.
    #[must_use]
    pub fn unsupported(pricer: impl Into<String>, metric: impl ToString) -> Self {
        Self::Pricing {
            pricer: pricer.into(),
            metric: metric.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }
}
