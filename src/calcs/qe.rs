//! CCQE axial-mass weights and knobs.
//!
//! The 2018 central value moves M_A from the generator's 0.99 GeV to
//! 1.04 GeV using the stored +1 sigma table (+25%). The reduced knobs then
//! vary M_A by +-5% around whichever central value is in use.

use std::sync::Arc;

use crate::error::{RwgtError, RwgtResult};
use crate::event::{EventRecord, ReactionType, ReweightKnob};
use crate::generator::{GeneratorSupport, StoredSupport};
use crate::registry::{CalculatorHandle, Registered, Registry};
use crate::rwgt::{ClampRange, GeneratorInfo, KnobInfo, SystKnob, WeightGenerator};
use crate::utils::InputVals;

const GENIE_MA: f64 = 0.99;
const TUNED_MA: f64 = 1.04;
const GENIE_MA_ERR_UP: f64 = 0.25;
const GENIE_MA_ERR_DOWN: f64 = 0.15;
const REDUCED_MA_ERR: f64 = 0.05;

/// Shifts CCQE events to M_A = 1.04 GeV.
pub struct MaqeWeight2018 {
    info: GeneratorInfo,
}

impl MaqeWeight2018 {
    pub fn new() -> Self {
        Self {
            info: GeneratorInfo::new("MAQE_2018", GeneratorSupport::single(StoredSupport::GenieV2Only)),
        }
    }
}

impl Default for MaqeWeight2018 {
    fn default() -> Self {
        Self::new()
    }
}

impl WeightGenerator for MaqeWeight2018 {
    fn info(&self) -> &GeneratorInfo {
        &self.info
    }

    fn calc_weight(&self, ev: &EventRecord, _params: &InputVals) -> RwgtResult<f64> {
        // Valid only while the generator default is 0.99 with a +25% error.
        let correction_in_sigma = (TUNED_MA - GENIE_MA) / GENIE_MA_ERR_UP;

        if !ev.is_cc || ev.reaction != ReactionType::QuasiElastic {
            return Ok(1.0);
        }
        let vals = ev
            .genie_weights
            .get_knob(ReweightKnob::MaCCQE)
            .ok_or_else(|| RwgtError::NoStoredWeights {
                knob: ReweightKnob::MaCCQE.to_string(),
            })?;
        Ok(1.0 + correction_in_sigma * (f64::from(vals.plus1) - 1.0))
    }
}

impl Registered for MaqeWeight2018 {
    type Args = ();

    fn construct(_args: &(), _registry: &Registry) -> RwgtResult<Self> {
        Ok(Self::new())
    }

    fn into_handle(this: Arc<Self>) -> CalculatorHandle {
        CalculatorHandle::Generator(this)
    }
}

/// +-5% M_A variation relative to the 2018 central value.
pub struct MaqeReducedSyst2018 {
    info: KnobInfo,
    genie_ma: Arc<dyn SystKnob>,
}

impl SystKnob for MaqeReducedSyst2018 {
    fn info(&self) -> &KnobInfo {
        &self.info
    }

    fn calc_weight(&self, sigma: f64, ev: &EventRecord, params: &InputVals) -> RwgtResult<f64> {
        let cv = self.cv_weight(ev, params)?;
        if cv <= 0.0 {
            return Ok(1.0);
        }

        // Undo the central-value shift, then move to the requested M_A in
        // units of the generator's own asymmetric error.
        let shifted_ma = TUNED_MA * (1.0 + sigma * REDUCED_MA_ERR);
        let frac_shift = (shifted_ma - GENIE_MA) / GENIE_MA;
        let err = if frac_shift > 0.0 { GENIE_MA_ERR_UP } else { GENIE_MA_ERR_DOWN };

        Ok(self.genie_ma.get_weight(frac_shift / err, ev, params)? / cv)
    }
}

impl Registered for MaqeReducedSyst2018 {
    type Args = ();

    fn construct(_args: &(), registry: &Registry) -> RwgtResult<Self> {
        let cv = registry.weighter::<MaqeWeight2018>(())?;
        Ok(Self {
            info: KnobInfo::new(
                format!("{}_reduced_2018", ReweightKnob::MaCCQE),
                GeneratorSupport::single(StoredSupport::GenieV2Only),
            )
            .with_clamp(ClampRange::new(0.0, f64::INFINITY)?)
            .with_cv_weighters(vec![cv]),
            genie_ma: registry.stored_knob(ReweightKnob::MaCCQE)?,
        })
    }

    fn into_handle(this: Arc<Self>) -> CalculatorHandle {
        CalculatorHandle::Knob(this)
    }
}

/// +-5% M_A variation around the generator default.
pub struct MaqeReducedSyst2017 {
    info: KnobInfo,
    genie_ma: Arc<dyn SystKnob>,
}

impl SystKnob for MaqeReducedSyst2017 {
    fn info(&self) -> &KnobInfo {
        &self.info
    }

    fn calc_weight(&self, sigma: f64, ev: &EventRecord, params: &InputVals) -> RwgtResult<f64> {
        let rescale = if sigma > 0.0 {
            REDUCED_MA_ERR / GENIE_MA_ERR_UP
        } else {
            REDUCED_MA_ERR / GENIE_MA_ERR_DOWN
        };
        self.genie_ma.get_weight(rescale * sigma, ev, params)
    }
}

impl Registered for MaqeReducedSyst2017 {
    type Args = ();

    fn construct(_args: &(), registry: &Registry) -> RwgtResult<Self> {
        Ok(Self {
            info: KnobInfo::new(
                format!("{}_reduced_2017", ReweightKnob::MaCCQE),
                GeneratorSupport::single(StoredSupport::GenieV2Only),
            ),
            genie_ma: registry.stored_knob(ReweightKnob::MaCCQE)?,
        })
    }

    fn into_handle(this: Arc<Self>) -> CalculatorHandle {
        CalculatorHandle::Knob(this)
    }
}
