//! Market snapshots.
//!
//! A [`MarketView`] owns the instruments, curves, FX and fixings of one
//! pricing date. Curves refer to each other and to instruments by name and
//! are resolved through the market, so a derived market can rebind names to
//! its own curve copies.
//!
//! # Rebuild-if-needed
//!
//! [`MarketView::build_curves`] walks the curve graph in dependency order and
//! builds every unbuilt curve after its prerequisites. Unknown prerequisites
//! and cycles are consistency errors.
//!
//! # Copy-on-write derivation
//!
//! [`MarketView::derive`] replaces instruments in a copy of the market:
//!
//! 1. merge the replacements into a copy of the instrument map
//! 2. copy every curve, sharing configuration but not build state
//! 3. collect each copy's transitive instrument set
//! 4. reset the copies whose set contains a replaced instrument; the others
//!    keep their calibrated output untouched
//! 5. discount and index roles are held by name and follow the new curve set
//! 6. rebuild whatever was reset
//!
//! The original market, its instruments and its curves are never modified.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, trace};

use strata_core::types::{Currency, Date};
use strata_core::{MarketError, MarketResult};
use strata_curves::instruments::filter_matches;
use strata_curves::{
    Calibrator, Curve, CurveContext, CurveOutput, Instrument, InstrumentFilter,
    SequentialBootstrapper, TermStructure,
};

use crate::fixings::Fixings;
use crate::fx::FxTable;
use crate::graph::{transitive_instruments, CurveGraph};

/// Snapshot of instruments, curves, FX and fixings for one pricing date.
#[derive(Debug, Clone)]
pub struct MarketView {
    name: String,
    pricing_date: Date,
    instruments: BTreeMap<String, Instrument>,
    curves: BTreeMap<String, Curve>,
    discount_curves: BTreeMap<String, String>,
    index_curves: BTreeMap<String, String>,
    fx: FxTable,
    fixings: Fixings,
    calibrator: Arc<dyn Calibrator>,
}

/// A market with one instrument bumped by its family's default bump.
#[derive(Debug, Clone)]
pub struct BumpedMarket {
    /// The instrument as held by the base market.
    pub instrument: Instrument,
    /// Bump size applied.
    pub bump: f64,
    /// Quote after the bump.
    pub bumped_quote: f64,
    /// Derived market holding the bumped instrument.
    pub market: MarketView,
}

impl MarketView {
    /// Creates an empty market calibrating with [`SequentialBootstrapper`].
    #[must_use]
    pub fn new(name: impl Into<String>, pricing_date: Date) -> Self {
        Self {
            name: name.into(),
            pricing_date,
            instruments: BTreeMap::new(),
            curves: BTreeMap::new(),
            discount_curves: BTreeMap::new(),
            index_curves: BTreeMap::new(),
            fx: FxTable::new(),
            fixings: Fixings::new(),
            calibrator: Arc::new(SequentialBootstrapper::new()),
        }
    }

    /// Replaces the calibrator used for bootstrapped curves.
    #[must_use]
    pub fn with_calibrator(mut self, calibrator: Arc<dyn Calibrator>) -> Self {
        self.calibrator = calibrator;
        self
    }

    /// Market name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pricing date.
    #[must_use]
    pub fn pricing_date(&self) -> Date {
        self.pricing_date
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Registers an instrument.
    ///
    /// Registering the same name again is accepted if the quote is equal, in
    /// which case the existing instrument is kept.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the name is taken with a different
    /// quote.
    pub fn add_instrument(&mut self, instrument: Instrument) -> MarketResult<()> {
        if let Some(existing) = self.instruments.get(instrument.name()) {
            if existing.quote().to_bits() != instrument.quote().to_bits() {
                return Err(MarketError::configuration(format!(
                    "instrument '{}' already registered with quote {}, got {}",
                    instrument.name(),
                    existing.quote(),
                    instrument.quote()
                )));
            }
            return Ok(());
        }
        self.instruments.insert(instrument.name().to_string(), instrument);
        Ok(())
    }

    /// Registers several instruments.
    ///
    /// # Errors
    ///
    /// See [`MarketView::add_instrument`].
    pub fn add_instruments(
        &mut self,
        instruments: impl IntoIterator<Item = Instrument>,
    ) -> MarketResult<()> {
        instruments
            .into_iter()
            .try_for_each(|instrument| self.add_instrument(instrument))
    }

    /// Registers a curve.
    ///
    /// Registering a curve with the same name and configuration again is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the name is taken by a different
    /// curve.
    pub fn add_curve(&mut self, curve: Curve) -> MarketResult<()> {
        if let Some(existing) = self.curves.get(curve.name()) {
            if existing.same_definition(&curve) {
                return Ok(());
            }
            return Err(MarketError::configuration(format!(
                "curve name '{}' already used by a different curve",
                curve.name()
            )));
        }
        self.curves.insert(curve.name().to_string(), curve);
        Ok(())
    }

    /// Registers `curve` as the discount curve for `id`, a currency code or
    /// CSA id.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `id` already has a discount curve or
    /// the curve cannot be registered.
    pub fn add_discount_curve(&mut self, id: impl Into<String>, curve: Curve) -> MarketResult<()> {
        let id = id.into();
        if self.discount_curves.contains_key(&id) {
            return Err(MarketError::configuration(format!(
                "discount curve for '{id}' already registered"
            )));
        }
        let name = curve.name().to_string();
        self.add_curve(curve)?;
        self.discount_curves.insert(id, name);
        Ok(())
    }

    /// Registers `curve` as the projection curve of `index`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `index` already has a curve or the
    /// curve cannot be registered.
    pub fn add_index_curve(&mut self, index: impl Into<String>, curve: Curve) -> MarketResult<()> {
        let index = index.into();
        if self.index_curves.contains_key(&index) {
            return Err(MarketError::configuration(format!(
                "index curve for '{index}' already registered"
            )));
        }
        let name = curve.name().to_string();
        self.add_curve(curve)?;
        self.index_curves.insert(index, name);
        Ok(())
    }

    /// Records a spot FX rate, units of `to` per unit of `from`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for equal currencies or a
    /// non-positive rate.
    pub fn add_spot_fx(&mut self, from: Currency, to: Currency, rate: f64) -> MarketResult<()> {
        self.fx.insert(from, to, rate)
    }

    /// Records fixings of `index`.
    pub fn add_index_fixings(
        &mut self,
        index: impl Into<String>,
        fixings: impl IntoIterator<Item = (Date, f64)>,
    ) {
        self.fixings.add(index, fixings);
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Instruments in name order.
    pub fn instruments(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.values()
    }

    /// Instrument by name.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Lookup` if it is not registered.
    pub fn instrument(&self, name: &str) -> MarketResult<&Instrument> {
        self.instruments
            .get(name)
            .ok_or_else(|| MarketError::lookup(format!("instrument '{name}'")))
    }

    /// Curves in name order.
    pub fn curves(&self) -> impl Iterator<Item = &Curve> {
        self.curves.values()
    }

    /// Curve by name.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Lookup` if it is not registered.
    pub fn curve(&self, name: &str) -> MarketResult<&Curve> {
        self.curves
            .get(name)
            .ok_or_else(|| MarketError::lookup(format!("curve '{name}'")))
    }

    /// Built output of a curve.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Lookup` if the curve is unknown or not built.
    pub fn curve_output(&self, name: &str) -> MarketResult<CurveOutput> {
        self.curve(name)?
            .output()
            .cloned()
            .ok_or_else(|| MarketError::lookup(format!("curve '{name}' is not built")))
    }

    /// Discount curve for a currency code or CSA id.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Lookup` if none is registered or it is not
    /// built.
    pub fn discount_curve(&self, id: &str) -> MarketResult<CurveOutput> {
        let name = self
            .discount_curves
            .get(id)
            .ok_or_else(|| MarketError::lookup(format!("discount curve for '{id}'")))?;
        self.curve_output(name)
    }

    /// Discount curve of a currency.
    ///
    /// # Errors
    ///
    /// See [`MarketView::discount_curve`].
    pub fn discount_curve_for(&self, currency: Currency) -> MarketResult<CurveOutput> {
        self.discount_curve(currency.code())
    }

    /// Projection curve of an index.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Lookup` if none is registered or it is not
    /// built.
    pub fn index_curve(&self, index: &str) -> MarketResult<CurveOutput> {
        let name = self
            .index_curves
            .get(index)
            .ok_or_else(|| MarketError::lookup(format!("index curve for '{index}'")))?;
        self.curve_output(name)
    }

    /// Discount curve roles, id to curve name.
    #[must_use]
    pub fn discount_curve_ids(&self) -> &BTreeMap<String, String> {
        &self.discount_curves
    }

    /// Index curve roles, index to curve name.
    #[must_use]
    pub fn index_curve_ids(&self) -> &BTreeMap<String, String> {
        &self.index_curves
    }

    /// Spot FX table.
    #[must_use]
    pub fn fx(&self) -> &FxTable {
        &self.fx
    }

    /// Fixings.
    #[must_use]
    pub fn fixings(&self) -> &Fixings {
        &self.fixings
    }

    /// Fixings of `index` in date order.
    #[must_use]
    pub fn index_fixings(&self, index: &str) -> Vec<(Date, f64)> {
        self.fixings.series(index)
    }

    /// Fixing of `index` on `date`.
    #[must_use]
    pub fn fixing(&self, index: &str, date: Date) -> Option<f64> {
        self.fixings.get(index, date)
    }

    /// Units of `to` per unit of `from` at spot.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Lookup` if the rate cannot be resolved.
    pub fn spot_fx(&self, from: Currency, to: Currency) -> MarketResult<f64> {
        self.fx.spot(from, to)
    }

    /// Forward FX for delivery on `date`.
    ///
    /// `spot * DF_from(date) / DF_to(date)`, where each leg discounts on the
    /// given CSA id's curve, or on its currency's curve when `None`.
    ///
    /// # Errors
    ///
    /// Propagates spot and discount curve lookup errors.
    pub fn fwd_fx(
        &self,
        date: Date,
        from: Currency,
        to: Currency,
        csa_from: Option<&str>,
        csa_to: Option<&str>,
    ) -> MarketResult<f64> {
        let spot = self.spot_fx(from, to)?;
        let df_from = self
            .discount_curve(csa_from.unwrap_or(from.code()))?
            .discount_factor(date)?;
        let df_to = self
            .discount_curve(csa_to.unwrap_or(to.code()))?
            .discount_factor(date)?;
        Ok(spot * df_from / df_to)
    }

    // ========================================================================
    // Dependency resolution
    // ========================================================================

    /// Dependency graph over the current curves.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Consistency` for unknown prerequisites.
    pub fn curve_graph(&self) -> MarketResult<CurveGraph> {
        CurveGraph::from_curves(&self.curves)
    }

    /// Curves `name` transitively depends on.
    ///
    /// # Errors
    ///
    /// Propagates graph errors.
    pub fn curve_dependencies(&self, name: &str) -> MarketResult<BTreeSet<String>> {
        self.curve_graph()?.prerequisites_of(name)
    }

    /// Instruments `name` transitively depends on.
    ///
    /// # Errors
    ///
    /// Propagates graph errors.
    pub fn curve_instruments(&self, name: &str) -> MarketResult<BTreeSet<String>> {
        transitive_instruments(&self.curve_graph()?, &self.curves, name)
    }

    /// Builds every unbuilt curve, prerequisites first.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Consistency` for an unknown prerequisite or a
    /// dependency cycle, and propagates calibration errors.
    pub fn build_curves(&mut self) -> MarketResult<()> {
        let order = self.curve_graph()?.build_order()?;
        self.build_in_order(&order)
    }

    /// Builds `name` and its prerequisites where unbuilt.
    ///
    /// # Errors
    ///
    /// See [`MarketView::build_curves`].
    pub fn rebuild_if_needed(&mut self, name: &str) -> MarketResult<()> {
        let graph = self.curve_graph()?;
        let order = graph.build_order()?;
        let needed = graph.closure_of(name)?;
        let order: Vec<String> = order.into_iter().filter(|n| needed.contains(n)).collect();
        self.build_in_order(&order)
    }

    fn build_in_order(&mut self, order: &[String]) -> MarketResult<()> {
        for name in order {
            let Some(curve) = self.curves.get(name) else {
                continue;
            };
            if curve.is_built() {
                continue;
            }
            let mut curve = curve.clone();
            curve.build(&*self)?;
            self.curves.insert(name.clone(), curve);
        }
        Ok(())
    }

    // ========================================================================
    // Derivation
    // ========================================================================

    /// New market with `replacements` substituted for the same-named
    /// instruments. See the module documentation for the algorithm.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a replacement names an unknown
    /// instrument, and propagates dependency and calibration errors.
    pub fn derive(&self, replacements: impl IntoIterator<Item = Instrument>) -> MarketResult<Self> {
        let mut instruments = self.instruments.clone();
        let mut replaced = BTreeSet::new();
        for instrument in replacements {
            if !instruments.contains_key(instrument.name()) {
                return Err(MarketError::configuration(format!(
                    "cannot replace unknown instrument '{}'",
                    instrument.name()
                )));
            }
            replaced.insert(instrument.name().to_string());
            instruments.insert(instrument.name().to_string(), instrument);
        }

        let mut curves = self.curves.clone();
        let graph = self.curve_graph()?;
        let mut reset = 0_usize;
        for name in self.curves.keys() {
            let affected = !transitive_instruments(&graph, &self.curves, name)?.is_disjoint(&replaced);
            if affected {
                if let Some(curve) = curves.get_mut(name) {
                    curve.reset();
                    reset += 1;
                }
            } else {
                trace!(curve = %name, "reused");
            }
        }

        let mut derived = Self {
            name: self.name.clone(),
            pricing_date: self.pricing_date,
            instruments,
            curves,
            discount_curves: self.discount_curves.clone(),
            index_curves: self.index_curves.clone(),
            fx: self.fx.clone(),
            fixings: self.fixings.clone(),
            calibrator: Arc::clone(&self.calibrator),
        };
        derived.build_curves()?;

        debug!(
            market = %self.name,
            replaced = replaced.len(),
            rebuilt = reset,
            "derived market"
        );
        Ok(derived)
    }

    /// One derived market per instrument matching `filter`, each with that
    /// instrument bumped by its family's default bump.
    ///
    /// # Errors
    ///
    /// Propagates derivation errors; no markets are returned on failure.
    pub fn bumped_markets(&self, filter: Option<&InstrumentFilter>) -> MarketResult<Vec<BumpedMarket>> {
        self.instruments
            .values()
            .filter(|instrument| filter_matches(filter, instrument))
            .map(|instrument| -> MarketResult<BumpedMarket> {
                let (bumped, bump) = instrument.bumped();
                let bumped_quote = bumped.quote();
                Ok(BumpedMarket {
                    instrument: instrument.clone(),
                    bump,
                    bumped_quote,
                    market: self.derive([bumped])?,
                })
            })
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        name: String,
        pricing_date: Date,
        instruments: BTreeMap<String, Instrument>,
        discount_curves: BTreeMap<String, String>,
        index_curves: BTreeMap<String, String>,
        fx: FxTable,
        fixings: Fixings,
        calibrator: Arc<dyn Calibrator>,
    ) -> Self {
        Self {
            name,
            pricing_date,
            instruments,
            curves: BTreeMap::new(),
            discount_curves,
            index_curves,
            fx,
            fixings,
            calibrator,
        }
    }

    pub(crate) fn insert_curve(&mut self, curve: Curve) {
        self.curves.insert(curve.name().to_string(), curve);
    }
}

impl CurveContext for MarketView {
    fn reference_date(&self) -> Date {
        self.pricing_date
    }

    fn instrument(&self, name: &str) -> MarketResult<&Instrument> {
        MarketView::instrument(self, name)
    }

    fn built_curve(&self, name: &str) -> MarketResult<CurveOutput> {
        let curve = self.curves.get(name).ok_or_else(|| {
            MarketError::consistency(format!("prerequisite curve '{name}' is not in the market"))
        })?;
        curve
            .output()
            .cloned()
            .ok_or_else(|| MarketError::lookup(format!("curve '{name}' is not built")))
    }

    fn calibrator(&self) -> Arc<dyn Calibrator> {
        Arc::clone(&self.calibrator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use strata_curves::InstrumentFamily;

    fn date() -> Date {
        Date::from_ymd(2024, 1, 2).unwrap()
    }

    fn market() -> MarketView {
        let usd = Arc::new(InstrumentFamily::zero_coupon("ZC-USD", Currency::USD));
        let eur = Arc::new(InstrumentFamily::zero_coupon("ZC-EUR", Currency::EUR));
        let mut m = MarketView::new("EOD", date());
        m.add_instruments([
            Instrument::from_family(Arc::clone(&usd), "1Y", 0.03),
            Instrument::from_family(usd, "5Y", 0.04),
            Instrument::from_family(eur, "5Y", 0.02),
        ])
        .unwrap();
        m.add_discount_curve("USD", Curve::bootstrapped("USD", Currency::USD, ["ZC-USD-1Y", "ZC-USD-5Y"]))
            .unwrap();
        m.add_discount_curve("EUR", Curve::bootstrapped("EUR", Currency::EUR, ["ZC-EUR-5Y"]))
            .unwrap();
        m.add_spot_fx(Currency::EUR, Currency::USD, 1.071).unwrap();
        m.build_curves().unwrap();
        m
    }

    #[test]
    fn test_duplicate_instrument() {
        let mut m = market();
        let same = m.instrument("ZC-USD-1Y").unwrap().with_quote(0.03);
        assert!(m.add_instrument(same).is_ok());
        let different = m.instrument("ZC-USD-1Y").unwrap().with_quote(0.031);
        assert!(matches!(
            m.add_instrument(different),
            Err(MarketError::Configuration { .. })
        ));
    }

    #[test]
    fn test_curve_name_collision() {
        let mut m = market();
        assert!(m
            .add_curve(Curve::bootstrapped("USD", Currency::USD, ["ZC-USD-1Y", "ZC-USD-5Y"]))
            .is_ok());
        assert!(m.add_curve(Curve::bootstrapped("USD", Currency::USD, ["ZC-USD-1Y"])).is_err());
        assert!(m
            .add_discount_curve("USD", Curve::flat("OTHER", Currency::USD, "ZC-USD-1Y"))
            .is_err());
    }

    #[test]
    fn test_discount_lookup() {
        let m = market();
        assert!(m.discount_curve_for(Currency::USD).is_ok());
        assert!(matches!(
            m.discount_curve("GBP"),
            Err(MarketError::Lookup { .. })
        ));
    }

    #[test]
    fn test_fwd_fx_uses_discount_curves() {
        let m = market();
        let d = Date::from_ymd(2029, 1, 2).unwrap();
        let df_eur = m.discount_curve("EUR").unwrap().discount_factor(d).unwrap();
        let df_usd = m.discount_curve("USD").unwrap().discount_factor(d).unwrap();
        let fwd = m.fwd_fx(d, Currency::EUR, Currency::USD, None, None).unwrap();
        assert_relative_eq!(fwd, 1.071 * df_eur / df_usd);
        assert!(fwd > 1.071);

        let csa = m.fwd_fx(d, Currency::EUR, Currency::USD, Some("USD"), None).unwrap();
        assert_relative_eq!(csa, 1.071);
    }

    #[test]
    fn test_derive_unknown_instrument() {
        let m = market();
        let family = Arc::new(InstrumentFamily::zero_coupon("ZC-GBP", Currency::GBP));
        let stranger = Instrument::from_family(family, "1Y", 0.05);
        assert!(matches!(
            m.derive([stranger]),
            Err(MarketError::Configuration { .. })
        ));
    }

    #[test]
    fn test_derive_resets_only_affected() {
        let m = market();
        let bumped = m.instrument("ZC-USD-5Y").unwrap().with_quote(0.05);
        let derived = m.derive([bumped]).unwrap();

        let eur_base = m.curve("EUR").unwrap().output().unwrap();
        let eur_derived = derived.curve("EUR").unwrap().output().unwrap();
        assert!(eur_base.ptr_eq(eur_derived));

        let usd_base = m.curve("USD").unwrap().output().unwrap();
        let usd_derived = derived.curve("USD").unwrap().output().unwrap();
        assert!(!usd_base.ptr_eq(usd_derived));
        assert_eq!(m.instrument("ZC-USD-5Y").unwrap().quote(), 0.04);
    }

    #[test]
    fn test_bumped_markets() {
        let m = market();
        let filter = InstrumentFilter::all().with_currencies([Currency::USD]);
        let bumped = m.bumped_markets(Some(&filter)).unwrap();
        assert_eq!(bumped.len(), 2);
        assert_eq!(bumped[0].instrument.name(), "ZC-USD-1Y");
        assert_relative_eq!(bumped[0].bumped_quote, 0.0301);
        assert_relative_eq!(
            bumped[0].market.instrument("ZC-USD-1Y").unwrap().quote(),
            0.0301
        );
    }

    #[test]
    fn test_fixings() {
        let mut m = market();
        m.add_index_fixings("SOFR", [(date(), 0.0531)]);
        assert_eq!(m.fixing("SOFR", date()), Some(0.0531));
        assert_eq!(m.index_fixings("SOFR").len(), 1);
    }
}
