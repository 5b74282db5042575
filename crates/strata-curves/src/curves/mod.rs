//! Buildable curves.
//!
//! A [`Curve`] pairs an immutable, shared [`CurveDefinition`] with its own
//! build state. Curves name their prerequisites (instruments and other
//! curves) and resolve them through a [`CurveContext`] when built, so a copy
//! of a curve can be rebuilt against a different market.
//!
//! ```text
//! Unbuilt --build(ctx)--> Built --reset()--> Unbuilt
//! ```

mod output;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use strata_core::types::{Currency, Date};
use strata_core::{MarketError, MarketResult};

use crate::bootstrap::Calibrator;
use crate::instruments::Instrument;
use crate::interpolation::InterpolationMethod;

pub use output::{BootstrappedOutput, CurveOutput, FlatOutput, SpreadOutput};

/// What a curve is built from. Serialized with a `kind` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CurveKind {
    /// Calibrated from its instruments by the market's calibrator.
    Bootstrapped {
        /// Calibration instruments.
        instruments: Vec<String>,
        /// Curves that must be built before this one.
        #[serde(default)]
        prerequisites: Vec<String>,
        /// Interpolation between calibrated pillars.
        #[serde(default)]
        interpolation: InterpolationMethod,
    },
    /// Spread instruments over a base curve.
    Spread {
        /// Base curve.
        base: String,
        /// Spread instruments.
        instruments: Vec<String>,
    },
    /// Flat rate taken from one instrument.
    Flat {
        /// Rate instrument.
        instrument: String,
    },
}

/// Immutable configuration of a curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveDefinition {
    /// Curve name, unique within a market.
    pub name: String,
    /// Currency of the curve.
    pub currency: Currency,
    /// Kind and its configuration.
    #[serde(flatten)]
    pub kind: CurveKind,
}

impl CurveDefinition {
    /// Instruments the curve is built from directly.
    #[must_use]
    pub fn prerequisite_instrument_ids(&self) -> BTreeSet<String> {
        match &self.kind {
            CurveKind::Bootstrapped { instruments, .. } | CurveKind::Spread { instruments, .. } => {
                instruments.iter().cloned().collect()
            }
            CurveKind::Flat { instrument } => BTreeSet::from([instrument.clone()]),
        }
    }

    /// Curves that must be built first.
    #[must_use]
    pub fn prerequisite_curve_ids(&self) -> BTreeSet<String> {
        match &self.kind {
            CurveKind::Bootstrapped { prerequisites, .. } => prerequisites.iter().cloned().collect(),
            CurveKind::Spread { base, .. } => BTreeSet::from([base.clone()]),
            CurveKind::Flat { .. } => BTreeSet::new(),
        }
    }
}

/// Name resolution a curve needs while building.
pub trait CurveContext {
    /// Date the curve is built as of.
    fn reference_date(&self) -> Date;

    /// Instrument by name.
    ///
    /// # Errors
    ///
    /// Returns an error if no such instrument is registered.
    fn instrument(&self, name: &str) -> MarketResult<&Instrument>;

    /// Output of a built curve.
    ///
    /// # Errors
    ///
    /// Returns an error if the curve is unknown or not built.
    fn built_curve(&self, name: &str) -> MarketResult<CurveOutput>;

    /// Calibrator for bootstrapped curves.
    fn calibrator(&self) -> Arc<dyn Calibrator>;
}

/// Build state of a curve.
#[derive(Debug, Clone, Default)]
pub enum CurveState {
    /// Not calibrated.
    #[default]
    Unbuilt,
    /// Calibrated.
    Built(CurveOutput),
}

/// A named, buildable term structure.
///
/// Cloning shares the definition and any calibrated output, but the copy's
/// build state is its own: resetting or building one copy never affects
/// another.
#[derive(Debug, Clone)]
pub struct Curve {
    definition: Arc<CurveDefinition>,
    state: CurveState,
}

impl Curve {
    /// Creates an unbuilt curve.
    #[must_use]
    pub fn new(definition: CurveDefinition) -> Self {
        Self {
            definition: Arc::new(definition),
            state: CurveState::Unbuilt,
        }
    }

    /// Bootstrapped curve with log-linear discount interpolation.
    #[must_use]
    pub fn bootstrapped<I, S>(name: impl Into<String>, currency: Currency, instruments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(CurveDefinition {
            name: name.into(),
            currency,
            kind: CurveKind::Bootstrapped {
                instruments: instruments.into_iter().map(Into::into).collect(),
                prerequisites: Vec::new(),
                interpolation: InterpolationMethod::default(),
            },
        })
    }

    /// Spread curve over `base`.
    #[must_use]
    pub fn spread<I, S>(
        name: impl Into<String>,
        currency: Currency,
        base: impl Into<String>,
        instruments: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(CurveDefinition {
            name: name.into(),
            currency,
            kind: CurveKind::Spread {
                base: base.into(),
                instruments: instruments.into_iter().map(Into::into).collect(),
            },
        })
    }

    /// Flat curve on one rate instrument.
    #[must_use]
    pub fn flat(name: impl Into<String>, currency: Currency, instrument: impl Into<String>) -> Self {
        Self::new(CurveDefinition {
            name: name.into(),
            currency,
            kind: CurveKind::Flat {
                instrument: instrument.into(),
            },
        })
    }

    /// Built curve carrying an already calibrated output.
    #[must_use]
    pub fn with_output(definition: Arc<CurveDefinition>, output: CurveOutput) -> Self {
        Self {
            definition,
            state: CurveState::Built(output),
        }
    }

    /// Adds curves that must be built before a bootstrapped curve.
    ///
    /// Other kinds are returned unchanged.
    #[must_use]
    pub fn with_prerequisites<I, S>(self, curves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut definition = (*self.definition).clone();
        if let CurveKind::Bootstrapped { prerequisites, .. } = &mut definition.kind {
            prerequisites.extend(curves.into_iter().map(Into::into));
        }
        Self::new(definition)
    }

    /// Sets the interpolation of a bootstrapped curve.
    #[must_use]
    pub fn with_interpolation(self, method: InterpolationMethod) -> Self {
        let mut definition = (*self.definition).clone();
        if let CurveKind::Bootstrapped { interpolation, .. } = &mut definition.kind {
            *interpolation = method;
        }
        Self::new(definition)
    }

    /// Curve name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Curve currency.
    #[must_use]
    pub fn currency(&self) -> Currency {
        self.definition.currency
    }

    /// Shared configuration.
    #[must_use]
    pub fn definition(&self) -> &Arc<CurveDefinition> {
        &self.definition
    }

    /// Returns true if both curves share one configuration.
    #[must_use]
    pub fn same_definition(&self, other: &Curve) -> bool {
        Arc::ptr_eq(&self.definition, &other.definition) || self.definition == other.definition
    }

    /// Instruments the curve is built from directly.
    #[must_use]
    pub fn prerequisite_instrument_ids(&self) -> BTreeSet<String> {
        self.definition.prerequisite_instrument_ids()
    }

    /// Curves that must be built first.
    #[must_use]
    pub fn prerequisite_curve_ids(&self) -> BTreeSet<String> {
        self.definition.prerequisite_curve_ids()
    }

    /// Returns true once built.
    #[must_use]
    pub fn is_built(&self) -> bool {
        matches!(self.state, CurveState::Built(_))
    }

    /// Build state.
    #[must_use]
    pub fn state(&self) -> &CurveState {
        &self.state
    }

    /// Calibrated output, if built.
    #[must_use]
    pub fn output(&self) -> Option<&CurveOutput> {
        match &self.state {
            CurveState::Built(output) => Some(output),
            CurveState::Unbuilt => None,
        }
    }

    /// Drops the calibrated output.
    pub fn reset(&mut self) {
        self.state = CurveState::Unbuilt;
    }

    /// Calibrates the curve against `ctx`.
    ///
    /// Prerequisite curves must already be built in `ctx`. Callers only
    /// build unbuilt curves.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::Calibration` if a referenced instrument is
    /// missing or calibration fails. Errors resolving prerequisite curves
    /// are propagated unchanged.
    pub fn build(&mut self, ctx: &dyn CurveContext) -> MarketResult<()> {
        let name = self.definition.name.clone();
        let resolve = |id: &String| {
            ctx.instrument(id)
                .cloned()
                .map_err(|e| MarketError::calibration(&name, e.to_string()))
        };

        let output = match &self.definition.kind {
            CurveKind::Bootstrapped {
                instruments,
                prerequisites,
                interpolation,
            } => {
                let prerequisites = prerequisites
                    .iter()
                    .map(|id| Ok((id.clone(), ctx.built_curve(id)?)))
                    .collect::<MarketResult<Vec<_>>>()?;
                let instruments = instruments.iter().map(resolve).collect::<MarketResult<Vec<_>>>()?;
                CurveOutput::Bootstrapped(Arc::new(BootstrappedOutput::calibrate(
                    &name,
                    ctx.reference_date(),
                    instruments,
                    prerequisites,
                    *interpolation,
                    ctx.calibrator(),
                )?))
            }
            CurveKind::Spread { base, instruments } => {
                let base = ctx.built_curve(base)?;
                let reference_date = ctx.reference_date();
                let pillars = instruments
                    .iter()
                    .map(|id| {
                        let instrument = resolve(id)?;
                        let tenor = instrument.tenor().ok_or_else(|| {
                            MarketError::calibration(
                                &name,
                                format!("Spread instrument '{id}' has no tenor"),
                            )
                        })?;
                        let time = reference_date.year_fraction(&tenor.advance(reference_date)?);
                        Ok((time, instrument))
                    })
                    .collect::<MarketResult<Vec<_>>>()?;
                CurveOutput::Spread(Arc::new(SpreadOutput::new(base, pillars)))
            }
            CurveKind::Flat { instrument } => CurveOutput::Flat(Arc::new(FlatOutput::new(
                ctx.reference_date(),
                resolve(instrument)?,
            ))),
        };

        debug!(curve = %name, "built");
        self.state = CurveState::Built(output);
        Ok(())
    }
}
