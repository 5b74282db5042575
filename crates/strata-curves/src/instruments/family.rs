//! Instrument families: shared quoting, bump and classification policy.

use serde::{Deserialize, Serialize};

use strata_core::types::{AssetClass, Currency, RiskType};

/// Bump size used when a family does not override it (1bp).
pub const DEFAULT_BUMP: f64 = 0.0001;

/// How a quote is interpreted by the calibrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QuoteKind {
    /// Simple money-market rate to the pillar.
    Deposit,
    /// Annually compounded zero-coupon rate to the pillar.
    ZeroCoupon,
    /// Par rate of a swap whose fixed leg pays `fixed_frequency` times a year.
    Swap {
        /// Fixed leg payments per year.
        fixed_frequency: u32,
    },
    /// Futures price quoted as `100 * (1 - r)` on the period ending at the pillar.
    FuturesPrice,
    /// Continuously compounded spread over a base curve.
    Spread,
    /// Continuously compounded flat zero rate.
    FlatRate,
}

impl QuoteKind {
    /// Risk type an instrument quoted this way contributes to by default.
    #[must_use]
    pub fn default_risk_type(&self) -> RiskType {
        match self {
            Self::Spread => RiskType::RateBasis,
            _ => RiskType::Rate,
        }
    }

    /// Bump convention matching the quoting convention.
    #[must_use]
    pub fn default_bump_convention(&self) -> BumpConvention {
        match self {
            Self::FuturesPrice => BumpConvention::FuturesPrice,
            _ => BumpConvention::Additive,
        }
    }
}

/// Finite-difference transform applied to a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BumpConvention {
    /// `old + bump`
    Additive,
    /// `old * (1 + bump)`
    Multiplicative,
    /// `old - bump * 100`, for quotes expressed as `100 * (1 - r)`.
    FuturesPrice,
}

impl BumpConvention {
    /// Applies the bump.
    #[must_use]
    pub fn apply(&self, old_quote: f64, bump_size: f64) -> f64 {
        match self {
            Self::Additive => old_quote + bump_size,
            Self::Multiplicative => old_quote * (1.0 + bump_size),
            Self::FuturesPrice => old_quote - bump_size * 100.0,
        }
    }
}

/// Family of instruments sharing conventions, e.g. "IRS-SOFR" or "FUT-CME-SR3".
///
/// Immutable once constructed; instruments share it through an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentFamily {
    name: String,
    currency: Currency,
    quote_kind: QuoteKind,
    risk_type: RiskType,
    asset_class: AssetClass,
    bump_convention: BumpConvention,
    default_bump: f64,
    #[serde(default)]
    underlying_indices: Vec<String>,
}

impl InstrumentFamily {
    /// Creates a family with the defaults implied by its quote kind.
    #[must_use]
    pub fn new(name: impl Into<String>, currency: Currency, quote_kind: QuoteKind) -> Self {
        Self {
            name: name.into(),
            currency,
            quote_kind,
            risk_type: quote_kind.default_risk_type(),
            asset_class: AssetClass::Rate,
            bump_convention: quote_kind.default_bump_convention(),
            default_bump: DEFAULT_BUMP,
            underlying_indices: Vec::new(),
        }
    }

    /// Money-market deposits.
    #[must_use]
    pub fn deposit(name: impl Into<String>, currency: Currency) -> Self {
        Self::new(name, currency, QuoteKind::Deposit)
    }

    /// Zero-coupon rates.
    #[must_use]
    pub fn zero_coupon(name: impl Into<String>, currency: Currency) -> Self {
        Self::new(name, currency, QuoteKind::ZeroCoupon)
    }

    /// Par swaps with the given fixed leg frequency.
    #[must_use]
    pub fn swap(name: impl Into<String>, currency: Currency, fixed_frequency: u32) -> Self {
        Self::new(name, currency, QuoteKind::Swap { fixed_frequency })
    }

    /// Interest rate futures quoted on price.
    #[must_use]
    pub fn future(name: impl Into<String>, currency: Currency) -> Self {
        Self::new(name, currency, QuoteKind::FuturesPrice)
    }

    /// Basis spreads over another curve.
    #[must_use]
    pub fn spread(name: impl Into<String>, currency: Currency) -> Self {
        Self::new(name, currency, QuoteKind::Spread)
    }

    /// Flat continuously compounded rates (funding and cash curves).
    #[must_use]
    pub fn flat_rate(name: impl Into<String>, currency: Currency) -> Self {
        Self::new(name, currency, QuoteKind::FlatRate)
    }

    /// Sets the risk type.
    #[must_use]
    pub fn with_risk_type(mut self, risk_type: RiskType) -> Self {
        self.risk_type = risk_type;
        self
    }

    /// Sets the asset class.
    #[must_use]
    pub fn with_asset_class(mut self, asset_class: AssetClass) -> Self {
        self.asset_class = asset_class;
        self
    }

    /// Overrides the bump convention.
    #[must_use]
    pub fn with_bump_convention(mut self, convention: BumpConvention) -> Self {
        self.bump_convention = convention;
        self
    }

    /// Overrides the default bump size.
    #[must_use]
    pub fn with_default_bump(mut self, bump: f64) -> Self {
        self.default_bump = bump;
        self
    }

    /// Adds an index the family's instruments depend on.
    #[must_use]
    pub fn with_underlying_index(mut self, index: impl Into<String>) -> Self {
        self.underlying_indices.push(index.into());
        self
    }

    /// Family name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Currency of the family's instruments.
    #[must_use]
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Quote interpretation used by calibration.
    #[must_use]
    pub fn quote_kind(&self) -> QuoteKind {
        self.quote_kind
    }

    /// Risk type.
    #[must_use]
    pub fn risk_type(&self) -> RiskType {
        self.risk_type
    }

    /// Asset class.
    #[must_use]
    pub fn asset_class(&self) -> AssetClass {
        self.asset_class
    }

    /// Bump convention.
    #[must_use]
    pub fn bump_convention(&self) -> BumpConvention {
        self.bump_convention
    }

    /// Indices the family's instruments depend on.
    #[must_use]
    pub fn underlying_indices(&self) -> &[String] {
        &self.underlying_indices
    }

    /// Bump size used for sensitivities.
    #[must_use]
    pub fn default_bump(&self) -> f64 {
        self.default_bump
    }

    /// New quote after bumping `old_quote` by `bump_size`.
    #[must_use]
    pub fn bump_quote(&self, old_quote: f64, bump_size: f64) -> f64 {
        self.bump_convention.apply(old_quote, bump_size)
    }
}
