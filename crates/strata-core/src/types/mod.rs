//! Domain types for market snapshots.
//!
//! - [`Date`]: Calendar date
//! - [`Currency`]: ISO currency codes
//! - [`Tenor`]: Periods such as `3M` or `10Y`
//! - [`AssetClass`] and [`RiskType`]: instrument classification

mod classification;
mod currency;
mod date;
mod tenor;

pub use classification::{AssetClass, RiskType};
pub use currency::Currency;
pub use date::Date;
pub use tenor::{Tenor, TenorUnit};
