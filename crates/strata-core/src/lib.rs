//! # Strata Core
//!
//! Core types and errors shared by the Strata crates.
//!
//! - **Types**: `Date`, `Currency`, `Tenor`, instrument classification
//! - **Errors**: [`MarketError`], the single error type every market
//!   operation reports through
//!
//! ## Example
//!
//! ```rust
//! use strata_core::prelude::*;
//!
//! let pricing_date = Date::from_ymd(2023, 8, 10).unwrap();
//! let pillar = Tenor::years(5).advance(pricing_date).unwrap();
//! assert_eq!(pillar.year(), 2028);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_wrap)]

pub mod error;
pub mod types;

pub use error::{MarketError, MarketResult};
pub use types::{AssetClass, Currency, Date, RiskType, Tenor, TenorUnit};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{MarketError, MarketResult};
    pub use crate::types::{AssetClass, Currency, Date, RiskType, Tenor, TenorUnit};
}
