//! # Strata Risk
//!
//! Bump-and-reprice analytics on Strata market snapshots.
//!
//! - **[`Pricer`]**: the valuation surface the engines drive, with
//!   [`CashflowPricer`] as a reference implementation
//! - **[`RiskEngine`]**: per-instrument sensitivities, by full rebuild or
//!   in-place bumps
//! - **[`Scenario`]**: filtered quote adjustments and their impact
//! - **[`RiskConfig`]**: engine defaults, loadable from TOML
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use strata_risk::prelude::*;
//!
//! let family = Arc::new(InstrumentFamily::zero_coupon("ZC-USD", Currency::USD));
//! let mut market = MarketView::new("EOD", Date::from_ymd(2024, 1, 2).unwrap());
//! market.add_instrument(Instrument::from_family(family, "5Y", 0.04)).unwrap();
//! market
//!     .add_discount_curve("USD", Curve::bootstrapped("USD", Currency::USD, ["ZC-USD-5Y"]))
//!     .unwrap();
//! market.build_curves().unwrap();
//!
//! let pricer = CashflowPricer::new("zero", Arc::new(market), Currency::USD, Currency::USD)
//!     .with_fixed(Date::from_ymd(2029, 1, 2).unwrap(), 1_000_000.0);
//! let pricers: Vec<Box<dyn Pricer>> = vec![Box::new(pricer)];
//!
//! let report = RiskEngine::default()
//!     .calculate_market_risk(&pricers, None, true, Strategy::FullRebuild)
//!     .unwrap();
//! assert_eq!(report.rows.len(), 1);
//! assert!(report.rows[0].sensitivity < 0.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod pricer;
pub mod risk;
pub mod scenario;

pub use config::RiskConfig;
pub use error::{RiskError, RiskResult};
pub use pricer::{Cashflow, CashflowPricer, Metric, MetricValue, Pricer};
pub use risk::{RiskEngine, RiskReport, RiskRow, Strategy};
pub use scenario::{
    calculate_scenario_impact, combine_scenario_results, AdjustmentKind, QuoteAdjuster,
    RelativeChange, Scenario, ScenarioReport, ScenarioRow, SelectedQuoteAdjuster,
    SimpleQuoteAdjuster, TermStructureQuoteAdjuster,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::RiskConfig;
    pub use crate::error::{RiskError, RiskResult};
    pub use crate::pricer::{Cashflow, CashflowPricer, Metric, MetricValue, Pricer};
    pub use crate::risk::{RiskEngine, RiskReport, RiskRow, Strategy};
    pub use crate::scenario::{
        calculate_scenario_impact, combine_scenario_results, AdjustmentKind, QuoteAdjuster,
        RelativeChange, Scenario, ScenarioReport, ScenarioRow, SelectedQuoteAdjuster,
        SimpleQuoteAdjuster, TermStructureQuoteAdjuster,
    };
    pub use strata_market::prelude::*;
}
