//! Risk engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RiskError, RiskResult};
use crate::risk::Strategy;

/// Configuration of a [`RiskEngine`](crate::RiskEngine).
///
/// ```toml
/// strategy = "in_place"
/// zero_threshold = 1e-6
/// remove_zero_sens = true
/// parallel = false
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Bump strategy used by [`RiskEngine::calculate`](crate::RiskEngine::calculate).
    #[serde(default)]
    pub strategy: Strategy,

    /// Sensitivities below this magnitude are dropped when zero
    /// sensitivities are removed.
    #[serde(default = "default_zero_threshold")]
    pub zero_threshold: f64,

    /// Default for dropping zero sensitivities.
    #[serde(default)]
    pub remove_zero_sens: bool,

    /// Fan full-rebuild bumps out over the rayon pool.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

fn default_zero_threshold() -> f64 {
    1e-5
}

fn default_true() -> bool {
    true
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            zero_threshold: default_zero_threshold(),
            remove_zero_sens: false,
            parallel: true,
        }
    }
}

impl RiskConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::Config` if the text is not valid configuration.
    pub fn from_toml_str(content: &str) -> RiskResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| RiskError::config(e.to_string()))?;
        if !(config.zero_threshold.is_finite() && config.zero_threshold >= 0.0) {
            return Err(RiskError::config(format!(
                "zero_threshold must be a non-negative number, got {}",
                config.zero_threshold
            )));
        }
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `RiskError::Config` if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> RiskResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RiskError::config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }
}
