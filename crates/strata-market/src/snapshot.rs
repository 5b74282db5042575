//! Persisted market state.
//!
//! A [`MarketSnapshot`] records everything needed to reconstruct a
//! [`MarketView`]: instrument families and quotes, curve definitions tagged
//! by kind, discount and index roles, FX, fixings, and optionally the
//! calibrated pillars of bootstrapped curves so a load can skip calibration.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use strata_core::types::Date;
use strata_core::{MarketError, MarketResult};
use strata_curves::curves::BootstrappedOutput;
use strata_curves::{
    Calibrator, Curve, CurveContext, CurveDefinition, CurveKind, CurveOutput, Instrument,
    InstrumentFamily, PillarCurve, SequentialBootstrapper,
};

use crate::fixings::Fixings;
use crate::fx::{FxQuote, FxTable};
use crate::view::MarketView;

/// How calibrated state is treated on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadMode {
    /// Reuse saved pillars where present; build the rest.
    #[default]
    Restore,
    /// Ignore saved pillars and recalibrate every curve.
    Recalibrate,
}

/// Saved instrument, referring to its family by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    /// Instrument name.
    pub name: String,
    /// Family name.
    pub family: String,
    /// Instrument specifics.
    pub specifics: String,
    /// Quote.
    pub quote: f64,
}

/// Calibrated pillars and the quotes they were calibrated from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    /// Quotes of the curve's instruments, in definition order.
    pub quotes: Vec<f64>,
    /// Calibrated pillars.
    pub pillars: PillarCurve,
}

/// Saved curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveRecord {
    /// Configuration, including the `kind` discriminator.
    #[serde(flatten)]
    pub definition: CurveDefinition,
    /// Calibrated state of a built bootstrapped curve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration: Option<CalibrationRecord>,
}

/// Serializable state of a [`MarketView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Market name.
    pub name: String,
    /// Pricing date.
    pub pricing_date: Date,
    /// Instrument families.
    pub families: Vec<InstrumentFamily>,
    /// Instruments.
    pub instruments: Vec<InstrumentRecord>,
    /// Curves.
    pub curves: Vec<CurveRecord>,
    /// Discount curve roles, id to curve name.
    #[serde(default)]
    pub discount_curves: BTreeMap<String, String>,
    /// Index curve roles, index to curve name.
    #[serde(default)]
    pub index_curves: BTreeMap<String, String>,
    /// Spot FX rates.
    #[serde(default)]
    pub fx: Vec<FxQuote>,
    /// Index fixings.
    #[serde(default)]
    pub fixings: Fixings,
}

impl MarketSnapshot {
    /// Serializes to JSON.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if serialization fails.
    pub fn to_json(&self) -> MarketResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| MarketError::configuration(format!("cannot serialize market: {e}")))
    }

    /// Parses JSON.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the document is malformed.
    pub fn from_json(json: &str) -> MarketResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| MarketError::configuration(format!("cannot parse market: {e}")))
    }
}

impl MarketView {
    /// Captures the market, including calibrated pillars of built
    /// bootstrapped curves.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if two families share a name but
    /// differ, and propagates recalibration errors of stale curves.
    pub fn to_snapshot(&self) -> MarketResult<MarketSnapshot> {
        let mut families: BTreeMap<String, InstrumentFamily> = BTreeMap::new();
        let mut instruments = Vec::new();
        for instrument in self.instruments() {
            let family = instrument.family();
            match families.get(family.name()) {
                Some(known) if known != family.as_ref() => {
                    return Err(MarketError::configuration(format!(
                        "two different families named '{}'",
                        family.name()
                    )));
                }
                Some(_) => {}
                None => {
                    families.insert(family.name().to_string(), family.as_ref().clone());
                }
            }
            instruments.push(InstrumentRecord {
                name: instrument.name().to_string(),
                family: family.name().to_string(),
                specifics: instrument.specifics().to_string(),
                quote: instrument.quote(),
            });
        }

        let curves = self
            .curves()
            .map(|curve| {
                let calibration = match curve.output() {
                    Some(CurveOutput::Bootstrapped(output)) => {
                        let (quotes, pillars) = output.pillars()?;
                        Some(CalibrationRecord { quotes, pillars })
                    }
                    _ => None,
                };
                Ok(CurveRecord {
                    definition: curve.definition().as_ref().clone(),
                    calibration,
                })
            })
            .collect::<MarketResult<Vec<_>>>()?;

        Ok(MarketSnapshot {
            name: self.name().to_string(),
            pricing_date: self.pricing_date(),
            families: families.into_values().collect(),
            instruments,
            curves,
            discount_curves: self.discount_curve_ids().clone(),
            index_curves: self.index_curve_ids().clone(),
            fx: self.fx().quotes(),
            fixings: self.fixings().clone(),
        })
    }

    /// Reconstructs a market calibrating with [`SequentialBootstrapper`] and
    /// builds every curve.
    ///
    /// With [`LoadMode::Restore`], bootstrapped curves with saved pillars are
    /// restored without calibration; everything else is built from quotes.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown families or duplicate
    /// names, and propagates dependency and calibration errors.
    pub fn from_snapshot(snapshot: MarketSnapshot, mode: LoadMode) -> MarketResult<Self> {
        Self::from_snapshot_with_calibrator(snapshot, mode, Arc::new(SequentialBootstrapper::new()))
    }

    /// Reconstructs a market that calibrates with `calibrator`.
    ///
    /// Curves are built or restored prerequisites first, so restored curves
    /// hold the outputs of their prerequisite curves.
    ///
    /// # Errors
    ///
    /// See [`MarketView::from_snapshot`].
    pub fn from_snapshot_with_calibrator(
        snapshot: MarketSnapshot,
        mode: LoadMode,
        calibrator: Arc<dyn Calibrator>,
    ) -> MarketResult<Self> {
        let families: BTreeMap<String, Arc<InstrumentFamily>> = snapshot
            .families
            .into_iter()
            .map(|f| (f.name().to_string(), Arc::new(f)))
            .collect();

        let mut instruments = BTreeMap::new();
        for record in snapshot.instruments {
            let family = families.get(&record.family).ok_or_else(|| {
                MarketError::configuration(format!(
                    "instrument '{}' refers to unknown family '{}'",
                    record.name, record.family
                ))
            })?;
            let instrument =
                Instrument::new(record.name, Arc::clone(family), record.specifics, record.quote);
            if instruments.insert(instrument.name().to_string(), instrument).is_some() {
                return Err(MarketError::configuration("duplicate instrument in snapshot"));
            }
        }

        let mut fx = FxTable::new();
        for quote in snapshot.fx {
            fx.insert(quote.from, quote.to, quote.rate)?;
        }

        let mut market = MarketView::from_parts(
            snapshot.name,
            snapshot.pricing_date,
            instruments,
            snapshot.discount_curves,
            snapshot.index_curves,
            fx,
            snapshot.fixings,
            calibrator,
        );

        let mut calibrations = BTreeMap::new();
        for record in snapshot.curves {
            let curve = Curve::new(record.definition);
            if market.curve(curve.name()).is_ok() {
                return Err(MarketError::configuration(format!(
                    "duplicate curve '{}' in snapshot",
                    curve.name()
                )));
            }
            if let (Some(calibration), LoadMode::Restore) = (record.calibration, mode) {
                calibrations.insert(curve.name().to_string(), calibration);
            }
            market.insert_curve(curve);
        }

        for (role, name) in market
            .discount_curve_ids()
            .iter()
            .chain(market.index_curve_ids())
        {
            if market.curve(name).is_err() {
                return Err(MarketError::consistency(format!(
                    "role '{role}' refers to unknown curve '{name}'"
                )));
            }
        }

        let mut restored = 0_usize;
        for name in market.curve_graph()?.build_order()? {
            match calibrations.remove(&name) {
                Some(calibration) => {
                    let definition = Arc::clone(market.curve(&name)?.definition());
                    if let Some(output) = restore_output(&market, &definition, calibration)? {
                        market.insert_curve(Curve::with_output(definition, output));
                        restored += 1;
                    } else {
                        market.rebuild_if_needed(&name)?;
                    }
                }
                None => market.rebuild_if_needed(&name)?,
            }
        }

        debug!(market = %market.name(), restored, ?mode, "loaded market");
        Ok(market)
    }
}

/// Output of a bootstrapped curve rebuilt from saved pillars, resolving its
/// instruments and built prerequisites in `market`. `None` for other kinds.
fn restore_output(
    market: &MarketView,
    definition: &CurveDefinition,
    calibration: CalibrationRecord,
) -> MarketResult<Option<CurveOutput>> {
    let CurveKind::Bootstrapped {
        instruments,
        prerequisites,
        ..
    } = &definition.kind
    else {
        return Ok(None);
    };
    let held = instruments
        .iter()
        .map(|id| CurveContext::instrument(market, id).cloned())
        .collect::<MarketResult<Vec<_>>>()?;
    let prerequisites = prerequisites
        .iter()
        .map(|id| Ok((id.clone(), market.built_curve(id)?)))
        .collect::<MarketResult<Vec<_>>>()?;
    let output = BootstrappedOutput::restore(
        definition.name.clone(),
        held,
        prerequisites,
        market.calibrator(),
        calibration.quotes,
        calibration.pillars,
    );
    Ok(Some(CurveOutput::Bootstrapped(Arc::new(output))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::types::Currency;
    use strata_curves::TermStructure;

    fn market() -> MarketView {
        let family = Arc::new(InstrumentFamily::zero_coupon("ZC-USD", Currency::USD));
        let mut m = MarketView::new("EOD", Date::from_ymd(2024, 1, 2).unwrap());
        m.add_instruments([
            Instrument::from_family(Arc::clone(&family), "1Y", 0.03),
            Instrument::from_family(family, "5Y", 0.04),
        ])
        .unwrap();
        m.add_discount_curve("USD", Curve::bootstrapped("USD", Currency::USD, ["ZC-USD-1Y", "ZC-USD-5Y"]))
            .unwrap();
        m.build_curves().unwrap();
        m
    }

    #[test]
    fn test_restore_keeps_pillars() {
        let m = market();
        let snapshot = m.to_snapshot().unwrap();
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"kind\": \"bootstrapped\""));

        let loaded = MarketView::from_snapshot(MarketSnapshot::from_json(&json).unwrap(), LoadMode::Restore)
            .unwrap();
        let d = Date::from_ymd(2027, 6, 30).unwrap();
        assert_eq!(
            loaded.discount_curve("USD").unwrap().discount_factor(d).unwrap(),
            m.discount_curve("USD").unwrap().discount_factor(d).unwrap()
        );
    }

    #[test]
    fn test_missing_family() {
        let mut snapshot = market().to_snapshot().unwrap();
        snapshot.families.clear();
        assert!(matches!(
            MarketView::from_snapshot(snapshot, LoadMode::Recalibrate),
            Err(MarketError::Configuration { .. })
        ));
    }
}
