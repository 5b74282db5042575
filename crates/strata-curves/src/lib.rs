//! # Strata Curves
//!
//! Quoted instruments and the curves calibrated from them.
//!
//! This crate provides:
//!
//! - **Quotes**: [`QuoteHandle`], the shared cell behind every instrument quote
//! - **Instruments**: [`Instrument`], [`InstrumentFamily`] bump and
//!   classification policy, [`InstrumentFilter`] selection
//! - **Calibration**: the [`Calibrator`] seam and [`SequentialBootstrapper`]
//! - **Term structures**: [`TermStructure`] queries over calibrated pillars
//! - **Curves**: the [`Curve`] build state machine over the closed
//!   [`CurveKind`] union, resolved through a [`CurveContext`]
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use strata_curves::prelude::*;
//!
//! let family = Arc::new(InstrumentFamily::zero_coupon("ZC-USD", Currency::USD));
//! let five_year = Instrument::from_family(family, "5Y", 0.04);
//!
//! let (bumped, size) = five_year.bumped();
//! assert_eq!(size, 0.0001);
//! assert!((bumped.quote() - 0.0401).abs() < 1e-15);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]

pub mod bootstrap;
pub mod curves;
pub mod instruments;
pub mod interpolation;
pub mod quote;
pub mod term_structure;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bootstrap::{CalibrationInput, Calibrator, SequentialBootstrapper};
    pub use crate::curves::{
        Curve, CurveContext, CurveDefinition, CurveKind, CurveOutput, CurveState,
    };
    pub use crate::instruments::{
        BumpConvention, Instrument, InstrumentFamily, InstrumentFilter, QuoteKind,
    };
    pub use crate::interpolation::InterpolationMethod;
    pub use crate::quote::QuoteHandle;
    pub use crate::term_structure::{PillarCurve, TermStructure};
    pub use strata_core::prelude::*;
}

pub use bootstrap::{CalibrationInput, Calibrator, SequentialBootstrapper};
pub use curves::{Curve, CurveContext, CurveDefinition, CurveKind, CurveOutput, CurveState};
pub use instruments::{
    filter_matches, BumpConvention, Instrument, InstrumentFamily, InstrumentFilter, QuoteKind,
};
pub use interpolation::InterpolationMethod;
pub use quote::QuoteHandle;
pub use term_structure::{PillarCurve, TermStructure};
