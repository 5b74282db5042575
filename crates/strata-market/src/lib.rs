//! # Strata Market
//!
//! Market snapshots for valuation and risk.
//!
//! - **[`MarketView`]**: instruments, curves, FX and fixings for one pricing
//!   date, with dependency-ordered curve building and copy-on-write
//!   [`derive`](MarketView::derive)
//! - **[`CurveGraph`]**: petgraph view of curve prerequisites, cycle
//!   detection and transitive closures
//! - **[`FxTable`]**: spot FX with inverse and triangulated lookups
//! - **[`MarketSnapshot`]**: persisted state and [`LoadMode`]
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use strata_market::prelude::*;
//!
//! let family = Arc::new(InstrumentFamily::zero_coupon("ZC-USD", Currency::USD));
//! let mut market = MarketView::new("EOD", Date::from_ymd(2024, 1, 2).unwrap());
//! market.add_instrument(Instrument::from_family(family, "5Y", 0.04)).unwrap();
//! market
//!     .add_discount_curve("USD", Curve::bootstrapped("USD", Currency::USD, ["ZC-USD-5Y"]))
//!     .unwrap();
//! market.build_curves().unwrap();
//!
//! let bumped = market.instrument("ZC-USD-5Y").unwrap().with_quote(0.05);
//! let scenario = market.derive([bumped]).unwrap();
//! assert_eq!(market.instrument("ZC-USD-5Y").unwrap().quote(), 0.04);
//! assert_eq!(scenario.instrument("ZC-USD-5Y").unwrap().quote(), 0.05);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod fixings;
pub mod fx;
pub mod graph;
pub mod snapshot;
pub mod view;

pub use fixings::Fixings;
pub use fx::{FxQuote, FxTable};
pub use graph::CurveGraph;
pub use snapshot::{LoadMode, MarketSnapshot};
pub use view::{BumpedMarket, MarketView};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::snapshot::{LoadMode, MarketSnapshot};
    pub use crate::view::{BumpedMarket, MarketView};
    pub use strata_curves::prelude::*;
}
