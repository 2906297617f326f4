//! Stored-Table Knob
//!
//! The generic systematic knob backed by the precomputed +-1/+-2 sigma weights
//! carried on each event.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::fallback::OnTheFlyCalculator;
use super::interpolation::{interpolate_stored, InterpolationError, SigmaPolicy};
use super::{ClampRange, KnobInfo, SystKnob};
use crate::error::{RwgtError, RwgtResult};
use crate::event::{EventRecord, ReweightKnob};
use crate::generator::{GeneratorSupport, StoredSupport};
use crate::registry::{CalculatorHandle, Registered, Registry};
use crate::utils::InputVals;

/// Constructor arguments. `policy: None` takes the registry's default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoredKnobArgs {
    pub knob: ReweightKnob,
    pub policy: Option<SigmaPolicy>,
}

impl From<ReweightKnob> for StoredKnobArgs {
    fn from(knob: ReweightKnob) -> Self {
        Self { knob, policy: None }
    }
}

pub struct StoredTableKnob {
    info: KnobInfo,
    knob: ReweightKnob,
    policy: SigmaPolicy,
    fallback: Option<Arc<dyn OnTheFlyCalculator>>,
    warned_degenerate: AtomicBool,
    warned_fallback: AtomicBool,
}

impl StoredTableKnob {
    pub fn new(
        knob: ReweightKnob,
        policy: SigmaPolicy,
        fallback: Option<Arc<dyn OnTheFlyCalculator>>,
    ) -> Self {
        Self {
            info: KnobInfo::new(knob.as_str(), GeneratorSupport::single(StoredSupport::GenieAllVersions))
                .with_clamp(ClampRange { lo: 0.0, hi: 10.0 }),
            knob,
            policy,
            fallback,
            warned_degenerate: AtomicBool::new(false),
            warned_fallback: AtomicBool::new(false),
        }
    }

    pub fn knob(&self) -> ReweightKnob {
        self.knob
    }

    pub fn policy(&self) -> SigmaPolicy {
        self.policy
    }

    fn on_the_fly(&self, sigma: f64, ev: &EventRecord) -> RwgtResult<f64> {
        let calc = self.fallback.as_ref().ok_or_else(|| RwgtError::NoStoredWeights {
            knob: self.name().to_string(),
        })?;

        self.info
            .support
            .check(self.name(), calc.generator(), &calc.version(), &calc.config())?;

        if !self.warned_fallback.swap(true, Ordering::Relaxed) {
            warn!(
                knob = self.name(),
                index = self.knob.index(),
                "No stored weights found; calculating on the fly (no further warnings for this knob)"
            );
        }
        calc.weight(self.knob, ev, sigma)
    }
}

impl SystKnob for StoredTableKnob {
    fn info(&self) -> &KnobInfo {
        &self.info
    }

    fn calc_weight(&self, sigma: f64, ev: &EventRecord, _params: &InputVals) -> RwgtResult<f64> {
        if sigma == 0.0 {
            return Ok(1.0);
        }

        let Some(vals) = ev.genie_weights.get_knob(self.knob) else {
            return self.on_the_fly(sigma, ev);
        };

        match interpolate_stored(sigma, vals, self.policy) {
            Ok(weight) => Ok(weight),
            Err(InterpolationError::DegenerateValue { value, .. }) => {
                if !self.warned_degenerate.swap(true, Ordering::Relaxed) {
                    warn!(knob = self.name(), value = %value, "Non-finite stored weight, ignoring");
                } else {
                    debug!(knob = self.name(), value = %value, "Non-finite stored weight, ignoring");
                }
                Ok(1.0)
            }
            Err(source) => Err(RwgtError::Interpolation {
                knob: self.name().to_string(),
                source,
            }),
        }
    }
}

impl Registered for StoredTableKnob {
    type Args = StoredKnobArgs;

    fn construct(args: &Self::Args, registry: &Registry) -> RwgtResult<Self> {
        Ok(Self::new(
            args.knob,
            args.policy.unwrap_or(registry.sigma_policy()),
            registry.fallback(),
        ))
    }

    fn into_handle(this: Arc<Self>) -> CalculatorHandle {
        CalculatorHandle::Knob(this)
    }
}
