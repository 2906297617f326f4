//! On-the-fly weight calculation for events without stored tables.

use crate::error::RwgtResult;
use crate::event::{EventRecord, ReweightKnob};
use crate::generator::{Generator, GeneratorVersion};

/// Recomputes a stored-table knob weight directly from the event.
///
/// Implementations usually wrap the upstream generator's own reweighting
/// machinery, so they report which generator build they represent. Stored
/// knobs check that identity against their own support set on every call.
pub trait OnTheFlyCalculator: Send + Sync {
    fn generator(&self) -> Generator;

    fn version(&self) -> GeneratorVersion;

    /// Configuration label of the generator build, empty if none.
    fn config(&self) -> String {
        String::new()
    }

    fn weight(&self, knob: ReweightKnob, ev: &EventRecord, sigma: f64) -> RwgtResult<f64>;
}
