//! Instruments, their families and instrument filters.

mod family;
mod filter;
mod instrument;

pub use family::{BumpConvention, InstrumentFamily, QuoteKind, DEFAULT_BUMP};
pub use filter::{filter_matches, InstrumentFilter};
pub use instrument::Instrument;
