//! Error types for market snapshot operations.
//!
//! Every layer of Strata (curves, market views, risk) reports failures
//! through [`MarketError`]. The variants mirror the failure classes a
//! market snapshot can hit: bad configuration, a corrupted dependency
//! graph, calibration failures and unresolvable lookups.

use thiserror::Error;

/// A specialized Result type for market operations.
pub type MarketResult<T> = Result<T, MarketError>;

/// The main error type for market snapshot operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    /// Inconsistent registration of instruments, curves or roles.
    #[error("Configuration error: {reason}")]
    Configuration {
        /// Description of the configuration problem.
        reason: String,
    },

    /// The curve dependency graph is corrupted (missing prerequisite or cycle).
    #[error("Corrupted market: {reason}")]
    Consistency {
        /// Description of the inconsistency.
        reason: String,
    },

    /// Curve calibration failed or was given insufficient inputs.
    #[error("Calibration of '{curve}' failed: {reason}")]
    Calibration {
        /// Name of the curve being calibrated.
        curve: String,
        /// Description of the failure.
        reason: String,
    },

    /// A requested entity (FX rate, curve role, instrument) could not be resolved.
    #[error("Lookup failed: {what}")]
    Lookup {
        /// Description of what was looked up.
        what: String,
    },

    /// Error in date construction or arithmetic.
    #[error("Invalid date: {message}")]
    InvalidDate {
        /// Description of the date error.
        message: String,
    },
}

impl MarketError {
    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Creates a consistency ("corrupted market") error.
    #[must_use]
    pub fn consistency(reason: impl Into<String>) -> Self {
        Self::Consistency {
            reason: reason.into(),
        }
    }

    /// Creates a calibration error.
    #[must_use]
    pub fn calibration(curve: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Calibration {
            curve: curve.into(),
            reason: reason.into(),
        }
    }

    /// Creates a lookup error.
    #[must_use]
    pub fn lookup(what: impl Into<String>) -> Self {
        Self::Lookup { what: what.into() }
    }

    /// Creates an invalid date error.
    #[must_use]
    pub fn invalid_date(message: impl Into<String>) -> Self {
        Self::InvalidDate {
            message: message.into(),
        }
    }

    /// Returns true for errors that indicate a construction bug rather than bad input.
    #[must_use]
    pub fn is_consistency(&self) -> bool {
        matches!(self, Self::Consistency { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MarketError::consistency("curve 'USD-OIS' requires missing curve 'EUR-OIS'");
        let msg = format!("{}", err);
        assert!(msg.contains("Corrupted market"));
        assert!(msg.contains("EUR-OIS"));
        assert!(err.is_consistency());
    }

    #[test]
    fn test_calibration_error() {
        let err = MarketError::calibration("GBP-SONIA", "no instruments");
        let msg = format!("{}", err);
        assert!(msg.contains("GBP-SONIA"));
        assert!(msg.contains("no instruments"));
        assert!(!err.is_consistency());
    }

    #[test]
    fn test_lookup_error() {
        let err = MarketError::lookup("spot FX USD/ZAR");
        assert_eq!(format!("{}", err), "Lookup failed: spot FX USD/ZAR");
    }
}
