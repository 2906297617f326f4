//! Tunes
//!
//! A tune is a named set of central-value weight generators, whose product is
//! the event weight, together with the systematic knobs that vary it.

pub mod definition;
pub mod presets;

pub use definition::{GeneratorSpec, KnobSpec, TuneDefinition};

use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{RwgtError, RwgtResult};
use crate::event::EventRecord;
use crate::rwgt::{SystKnob, SystKnobSet, WeightGenerator};
use crate::utils::InputVals;

/// Weight of one tune component.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedWeight {
    pub name: String,
    pub weight: f64,
}

pub struct Tune {
    name: String,
    components: BTreeMap<String, Arc<dyn WeightGenerator>>,
    knobs: BTreeMap<String, Arc<dyn SystKnob>>,
    /// Knob names in the order they were added.
    knob_names: Vec<String>,
}

impl Tune {
    pub fn builder(name: impl Into<String>) -> TuneBuilder {
        TuneBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Product of every component's weight.
    pub fn event_weight(&self, ev: &EventRecord, params: &InputVals) -> RwgtResult<f64> {
        self.components
            .values()
            .try_fold(1.0, |acc, w| -> RwgtResult<f64> { Ok(acc * w.get_weight(ev, params)?) })
    }

    /// Per-component weights in component-name order.
    pub fn event_weight_components(&self, ev: &EventRecord, params: &InputVals) -> RwgtResult<Vec<NamedWeight>> {
        self.components
            .iter()
            .map(|(name, w)| {
                Ok(NamedWeight {
                    name: name.clone(),
                    weight: w.get_weight(ev, params)?,
                })
            })
            .collect()
    }

    /// Weight of knob `knob_name` at `sigma`. With `relative_to_cv` the
    /// weight is divided by this tune's event weight; a non-positive central
    /// value gives 0.
    pub fn event_syst_knob_weight(
        &self,
        knob_name: &str,
        sigma: f64,
        ev: &EventRecord,
        params: &InputVals,
        relative_to_cv: bool,
    ) -> RwgtResult<f64> {
        let knob = self.knobs.get(knob_name).ok_or_else(|| RwgtError::UnknownKnob {
            tune: self.name.clone(),
            knob: knob_name.to_string(),
        })?;

        let weight = knob.get_weight(sigma, ev, params)?;
        if !relative_to_cv {
            return Ok(weight);
        }

        let cv = self.event_weight(ev, params)?;
        if cv > 0.0 {
            Ok(weight / cv)
        } else {
            Ok(0.0)
        }
    }

    /// [`event_weight`](Self::event_weight) over a batch, in input order.
    pub fn event_weights(&self, events: &[EventRecord], params: &InputVals) -> RwgtResult<Vec<f64>> {
        debug!(tune = %self.name, events = events.len(), "Batch central-value weights");
        events.par_iter().map(|ev| self.event_weight(ev, params)).collect()
    }

    /// [`event_syst_knob_weight`](Self::event_syst_knob_weight) over a batch,
    /// in input order.
    pub fn syst_knob_weights(
        &self,
        knob_name: &str,
        sigma: f64,
        events: &[EventRecord],
        params: &InputVals,
        relative_to_cv: bool,
    ) -> RwgtResult<Vec<f64>> {
        if !self.knobs.contains_key(knob_name) {
            return Err(RwgtError::UnknownKnob {
                tune: self.name.clone(),
                knob: knob_name.to_string(),
            });
        }
        debug!(tune = %self.name, knob = knob_name, sigma, events = events.len(), "Batch knob weights");
        events
            .par_iter()
            .map(|ev| self.event_syst_knob_weight(knob_name, sigma, ev, params, relative_to_cv))
            .collect()
    }

    pub fn knob_names(&self) -> &[String] {
        &self.knob_names
    }

    pub fn syst_knobs(&self) -> &BTreeMap<String, Arc<dyn SystKnob>> {
        &self.knobs
    }

    /// The knobs as a set, e.g. for union with another tune's.
    pub fn knob_set(&self) -> SystKnobSet {
        self.knobs.values().cloned().collect()
    }

    pub fn components(&self) -> &BTreeMap<String, Arc<dyn WeightGenerator>> {
        &self.components
    }
}

impl fmt::Debug for Tune {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let components: BTreeMap<&str, &str> = self
            .components
            .iter()
            .map(|(k, w)| (k.as_str(), w.name()))
            .collect();
        f.debug_struct("Tune")
            .field("name", &self.name)
            .field("components", &components)
            .field("knobs", &self.knob_names)
            .finish()
    }
}

/// Incremental construction of a [`Tune`]. The first error is kept and
/// reported by [`build`](Self::build).
pub struct TuneBuilder {
    name: String,
    components: BTreeMap<String, Arc<dyn WeightGenerator>>,
    knobs: BTreeMap<String, Arc<dyn SystKnob>>,
    knob_names: Vec<String>,
    error: Option<RwgtError>,
}

impl TuneBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: BTreeMap::new(),
            knobs: BTreeMap::new(),
            knob_names: Vec::new(),
            error: None,
        }
    }

    fn fail(&mut self, msg: String) {
        if self.error.is_none() {
            self.error = Some(RwgtError::InvalidTune(msg));
        }
    }

    pub fn component(mut self, label: impl Into<String>, weighter: Arc<dyn WeightGenerator>) -> Self {
        let label = label.into();
        if self.components.contains_key(&label) {
            let msg = format!("tune '{}' has two components labelled '{}'", self.name, label);
            self.fail(msg);
            return self;
        }
        self.components.insert(label, weighter);
        self
    }

    /// Add a knob. Adding the same instance again is a no-op; a different
    /// knob with the same name is an error.
    pub fn knob(mut self, knob: Arc<dyn SystKnob>) -> Self {
        let name = knob.name().to_string();
        if let Some(existing) = self.knobs.get(&name) {
            if !std::ptr::addr_eq(Arc::as_ptr(existing), Arc::as_ptr(&knob)) {
                let msg = format!("tune '{}' has two different knobs named '{}'", self.name, name);
                self.fail(msg);
            }
            return self;
        }
        self.knob_names.push(name.clone());
        self.knobs.insert(name, knob);
        self
    }

    pub fn knobs<I>(self, knobs: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn SystKnob>>,
    {
        knobs.into_iter().fold(self, |b, k| b.knob(k))
    }

    pub fn build(self) -> RwgtResult<Tune> {
        if let Some(err) = self.error {
            return Err(err);
        }
        info!(
            tune = %self.name,
            components = self.components.len(),
            knobs = self.knobs.len(),
            "Built tune"
        );
        Ok(Tune {
            name: self.name,
            components: self.components,
            knobs: self.knobs,
            knob_names: self.knob_names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{Generator, GeneratorSupport, GeneratorVersion, StoredSupport};
    use crate::rwgt::{GeneratorInfo, KnobInfo};

    struct Fixed {
        info: GeneratorInfo,
        weight: f64,
    }

    impl WeightGenerator for Fixed {
        fn info(&self) -> &GeneratorInfo {
            &self.info
        }

        fn calc_weight(&self, _ev: &EventRecord, _params: &InputVals) -> RwgtResult<f64> {
            Ok(self.weight)
        }
    }

    fn fixed(name: &str, weight: f64) -> Arc<dyn WeightGenerator> {
        Arc::new(Fixed {
            info: GeneratorInfo::new(name, GeneratorSupport::single(StoredSupport::GenieAllVersions)),
            weight,
        })
    }

    struct Linear {
        info: KnobInfo,
    }

    impl SystKnob for Linear {
        fn info(&self) -> &KnobInfo {
            &self.info
        }

        fn calc_weight(&self, sigma: f64, _ev: &EventRecord, _params: &InputVals) -> RwgtResult<f64> {
            Ok(1.0 + 0.1 * sigma)
        }
    }

    fn linear(name: &str) -> Arc<dyn SystKnob> {
        Arc::new(Linear {
            info: KnobInfo::new(name, GeneratorSupport::single(StoredSupport::GenieAllVersions)),
        })
    }

    fn genie_event() -> EventRecord {
        EventRecord {
            generator: Generator::Genie,
            generator_version: GeneratorVersion::from([2, 12, 2]),
            ..Default::default()
        }
    }

    #[test]
    fn test_event_weight_is_product_of_components() {
        let tune = Tune::builder("t")
            .component("b", fixed("B", 0.5))
            .component("a", fixed("A", 3.0))
            .build()
            .unwrap();
        let ev = genie_event();
        let params = InputVals::new();

        assert_eq!(tune.event_weight(&ev, &params).unwrap(), 1.5);
        let parts = tune.event_weight_components(&ev, &params).unwrap();
        let names: Vec<&str> = parts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(parts.iter().map(|p| p.weight).product::<f64>(), 1.5);
    }

    #[test]
    fn test_relative_to_cv() {
        let tune = Tune::builder("t")
            .component("cv", fixed("CV", 2.0))
            .knob(linear("k"))
            .build()
            .unwrap();
        let ev = genie_event();
        let params = InputVals::new();
        let w = tune.event_syst_knob_weight("k", 1.0, &ev, &params, true).unwrap();
        assert!((w - 0.55).abs() < 1e-12);

        let zero = Tune::builder("z")
            .component("cv", fixed("CV", 0.0))
            .knob(linear("k"))
            .build()
            .unwrap();
        assert_eq!(zero.event_syst_knob_weight("k", 1.0, &ev, &params, true).unwrap(), 0.0);
    }

    #[test]
    fn test_unknown_knob() {
        let tune = Tune::builder("t").build().unwrap();
        let err = tune
            .event_syst_knob_weight("nope", 1.0, &genie_event(), &InputVals::new(), false)
            .unwrap_err();
        assert!(matches!(err, RwgtError::UnknownKnob { .. }));
    }

    #[test]
    fn test_duplicate_knobs() {
        let k = linear("k");
        let tune = Tune::builder("t").knob(k.clone()).knob(k).build().unwrap();
        assert_eq!(tune.knob_names(), ["k".to_string()]);

        let err = Tune::builder("t").knob(linear("k")).knob(linear("k")).build().unwrap_err();
        assert!(matches!(err, RwgtError::InvalidTune(_)));
    }

    #[test]
    fn test_batch_preserves_order() {
        let tune = Tune::builder("t")
            .component("cv", fixed("CV", 2.0))
            .knob(linear("k"))
            .build()
            .unwrap();
        let mut events = vec![genie_event(); 64];
        for ev in events.iter_mut().step_by(2) {
            ev.expect_no_weights = true;
        }
        let params = InputVals::new();

        let cv = tune.event_weights(&events, &params).unwrap();
        for (i, w) in cv.iter().enumerate() {
            assert_eq!(*w, if i % 2 == 0 { 1.0 } else { 2.0 });
        }

        let shifted = tune.syst_knob_weights("k", 2.0, &events, &params, false).unwrap();
        assert_eq!(shifted.len(), 64);
        assert!((shifted[1] - 1.2).abs() < 1e-12);
        assert_eq!(shifted[0], 1.0);
    }
}
