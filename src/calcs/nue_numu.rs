//! Simple nue/numu cross-section difference knobs.

use std::sync::Arc;

use crate::error::RwgtResult;
use crate::event::EventRecord;
use crate::generator::{GeneratorSupport, StoredSupport};
use crate::registry::{CalculatorHandle, Registered, Registry};
use crate::rwgt::{KnobInfo, SystKnob};
use crate::utils::InputVals;

/// Fractional size of one sigma for both knobs.
const SIGMA_SIZE: f64 = 0.02;

const NUE_PDG: i32 = 12;

/// Radiative-correction uncertainty on CC nue (or nuebar) scattering.
pub struct RadiativeCorrSyst {
    info: KnobInfo,
    nuebar: bool,
}

impl RadiativeCorrSyst {
    pub fn new(nuebar: bool) -> Self {
        let name = if nuebar { "radcorrnuebar" } else { "radcorrnue" };
        Self {
            info: KnobInfo::new(name, GeneratorSupport::single(StoredSupport::GenieAllVersions)),
            nuebar,
        }
    }
}

impl SystKnob for RadiativeCorrSyst {
    fn info(&self) -> &KnobInfo {
        &self.info
    }

    fn calc_weight(&self, sigma: f64, ev: &EventRecord, _params: &InputVals) -> RwgtResult<f64> {
        let target = if self.nuebar { -NUE_PDG } else { NUE_PDG };
        if !ev.is_cc || ev.nu_pdg != target {
            return Ok(1.0);
        }
        Ok(1.0 + SIGMA_SIZE * sigma)
    }
}

impl Registered for RadiativeCorrSyst {
    /// `true` for the antineutrino knob.
    type Args = bool;

    fn construct(args: &bool, _registry: &Registry) -> RwgtResult<Self> {
        Ok(Self::new(*args))
    }

    fn into_handle(this: Arc<Self>) -> CalculatorHandle {
        CalculatorHandle::Knob(this)
    }
}

/// Second-class-current uncertainty; anticorrelated between nue and nuebar.
pub struct SecondClassCurrentSyst {
    info: KnobInfo,
}

impl SecondClassCurrentSyst {
    pub fn new() -> Self {
        Self {
            info: KnobInfo::new("2ndclasscurr", GeneratorSupport::single(StoredSupport::GenieAllVersions)),
        }
    }
}

impl Default for SecondClassCurrentSyst {
    fn default() -> Self {
        Self::new()
    }
}

impl SystKnob for SecondClassCurrentSyst {
    fn info(&self) -> &KnobInfo {
        &self.info
    }

    fn calc_weight(&self, sigma: f64, ev: &EventRecord, _params: &InputVals) -> RwgtResult<f64> {
        if !ev.is_cc || ev.nu_pdg.abs() != NUE_PDG {
            return Ok(1.0);
        }
        let sigma = if ev.is_antineutrino() { -sigma } else { sigma };
        Ok(1.0 + SIGMA_SIZE * sigma)
    }
}

impl Registered for SecondClassCurrentSyst {
    type Args = ();

    fn construct(_args: &(), _registry: &Registry) -> RwgtResult<Self> {
        Ok(Self::new())
    }

    fn into_handle(this: Arc<Self>) -> CalculatorHandle {
        CalculatorHandle::Knob(this)
    }
}
