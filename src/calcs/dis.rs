//! Non-resonant single-pion production in the DIS channel.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::RwgtResult;
use crate::event::{EventRecord, ReactionType};
use crate::generator::{GeneratorSupport, StoredSupport};
use crate::registry::{CalculatorHandle, Registered, Registry};
use crate::rwgt::{GeneratorInfo, WeightGenerator};
use crate::utils::InputVals;

/// Upper W edge of the region the reduction applies to, GeV.
const W_MAX: f64 = 1.7;

/// Which historical flavour of the weight to reproduce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Nonres1PiArgs {
    /// Scale every low-W DIS event, as done before pre-FSI pion counts were
    /// recorded.
    pub approx_cut: bool,
    /// Use 0.41 instead of 0.43.
    pub typo: bool,
}

/// Reduces neutrino DIS events with exactly one pre-FSI pion and W < 1.7 GeV.
pub struct Nonres1PiWeight {
    info: GeneratorInfo,
    args: Nonres1PiArgs,
}

impl Nonres1PiWeight {
    pub fn new(args: Nonres1PiArgs) -> Self {
        Self {
            info: GeneratorInfo::new("Nonres1pi", GeneratorSupport::single(StoredSupport::GenieV2Only)),
            args,
        }
    }
}

impl WeightGenerator for Nonres1PiWeight {
    fn info(&self) -> &GeneratorInfo {
        &self.info
    }

    fn calc_weight(&self, ev: &EventRecord, _params: &InputVals) -> RwgtResult<f64> {
        if ev.reaction != ReactionType::DeepInelastic {
            return Ok(1.0);
        }
        // Some records carry garbage W.
        if ev.w.is_nan() || ev.w > W_MAX || ev.w < 0.0 {
            return Ok(1.0);
        }
        // Derived from neutrino data only.
        if ev.is_antineutrino() {
            return Ok(1.0);
        }
        if self.args.approx_cut {
            return Ok(0.65);
        }
        if ev.pre_fsi_pions() != 1 {
            return Ok(1.0);
        }
        Ok(if self.args.typo { 0.41 } else { 0.43 })
    }
}

impl Registered for Nonres1PiWeight {
    type Args = Nonres1PiArgs;

    fn construct(args: &Self::Args, _registry: &Registry) -> RwgtResult<Self> {
        Ok(Self::new(*args))
    }

    fn into_handle(this: Arc<Self>) -> CalculatorHandle {
        CalculatorHandle::Generator(this)
    }
}
