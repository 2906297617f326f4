//! Weight Calculator Module
//!
//! The two calculator contracts: plain weight generators, which return a
//! multiplicative weight for an event, and systematic knobs, which return a
//! weight for an event at a given number of standard deviations.

pub mod fallback;
pub mod interpolation;
pub mod stored_knob;

pub use fallback::OnTheFlyCalculator;
pub use interpolation::{interpolate_stored, InterpolationError, SigmaPolicy};
pub use stored_knob::{StoredKnobArgs, StoredTableKnob};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use crate::error::{RwgtError, RwgtResult};
use crate::event::EventRecord;
use crate::generator::GeneratorSupport;
use crate::utils::InputVals;

/// Inclusive bounds applied to every knob weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClampRange {
    pub lo: f64,
    pub hi: f64,
}

impl ClampRange {
    pub const UNBOUNDED: ClampRange = ClampRange {
        lo: f64::NEG_INFINITY,
        hi: f64::INFINITY,
    };

    pub fn new(lo: f64, hi: f64) -> RwgtResult<Self> {
        if lo.is_nan() || hi.is_nan() || lo > hi {
            return Err(RwgtError::InvalidClampRange { lo, hi });
        }
        Ok(Self { lo, hi })
    }

    /// NaN is returned untouched; a broken weight must not turn into a bound.
    pub fn apply(&self, weight: f64) -> f64 {
        if weight.is_nan() {
            return weight;
        }
        weight.max(self.lo).min(self.hi)
    }
}

impl Default for ClampRange {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

/// Immutable configuration shared by every weight generator.
#[derive(Debug, Clone)]
pub struct GeneratorInfo {
    pub name: String,
    pub support: GeneratorSupport,
}

impl GeneratorInfo {
    pub fn new(name: impl Into<String>, support: GeneratorSupport) -> Self {
        Self {
            name: name.into(),
            support,
        }
    }
}

/// Immutable configuration shared by every systematic knob.
#[derive(Clone)]
pub struct KnobInfo {
    pub name: String,
    pub support: GeneratorSupport,
    pub clamp: ClampRange,
    /// Generators whose product is the central value these weights are
    /// relative to.
    pub cv_weighters: Vec<Arc<dyn WeightGenerator>>,
}

impl KnobInfo {
    pub fn new(name: impl Into<String>, support: GeneratorSupport) -> Self {
        Self {
            name: name.into(),
            support,
            clamp: ClampRange::UNBOUNDED,
            cv_weighters: Vec::new(),
        }
    }

    pub fn with_clamp(mut self, clamp: ClampRange) -> Self {
        self.clamp = clamp;
        self
    }

    pub fn with_cv_weighters(mut self, cv: Vec<Arc<dyn WeightGenerator>>) -> Self {
        self.cv_weighters = cv;
        self
    }
}

impl fmt::Debug for KnobInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cv: Vec<&str> = self.cv_weighters.iter().map(|w| w.name()).collect();
        f.debug_struct("KnobInfo")
            .field("name", &self.name)
            .field("support", &self.support)
            .field("clamp", &self.clamp)
            .field("cv_weighters", &cv)
            .finish()
    }
}

/// A calculator producing a central-value weight for each event.
pub trait WeightGenerator: Send + Sync {
    fn info(&self) -> &GeneratorInfo;

    /// Compute the weight. Only called for events whose generator is
    /// supported and which carry weights.
    fn calc_weight(&self, ev: &EventRecord, params: &InputVals) -> RwgtResult<f64>;

    fn name(&self) -> &str {
        &self.info().name
    }

    fn supports(&self, ev: &EventRecord) -> bool {
        self.info().support.is_supported(ev.generator, &ev.generator_version, &ev.generator_config)
    }

    /// Public entry point: 1.0 for events flagged `expect_no_weights`,
    /// otherwise support check followed by [`calc_weight`](Self::calc_weight).
    fn get_weight(&self, ev: &EventRecord, params: &InputVals) -> RwgtResult<f64> {
        if ev.expect_no_weights {
            return Ok(1.0);
        }
        self.info().support.check_event(self.name(), ev)?;
        self.calc_weight(ev, params)
    }
}

/// A calculator producing a weight for each event at a given sigma.
pub trait SystKnob: Send + Sync {
    fn info(&self) -> &KnobInfo;

    /// Compute the unclamped weight at `sigma`.
    fn calc_weight(&self, sigma: f64, ev: &EventRecord, params: &InputVals) -> RwgtResult<f64>;

    fn name(&self) -> &str {
        &self.info().name
    }

    fn supports(&self, ev: &EventRecord) -> bool {
        self.info().support.is_supported(ev.generator, &ev.generator_version, &ev.generator_config)
    }

    /// Public entry point; the result always lies inside the clamp range
    /// unless the calculator produced NaN.
    fn get_weight(&self, sigma: f64, ev: &EventRecord, params: &InputVals) -> RwgtResult<f64> {
        if ev.expect_no_weights {
            return Ok(1.0);
        }
        self.info().support.check_event(self.name(), ev)?;
        let weight = self.calc_weight(sigma, ev, params)?;
        Ok(self.info().clamp.apply(weight))
    }

    /// Product of the configured central-value generators on `ev`.
    fn cv_weight(&self, ev: &EventRecord, params: &InputVals) -> RwgtResult<f64> {
        self.info()
            .cv_weighters
            .iter()
            .try_fold(1.0, |acc, w| -> RwgtResult<f64> {
                Ok(acc * w.get_weight(ev, params)?)
            })
    }
}

fn same_object<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Unordered collection of distinct knobs, combinable with `|`.
#[derive(Clone, Default)]
pub struct SystKnobSet {
    knobs: Vec<Arc<dyn SystKnob>>,
}

impl SystKnobSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `knob` unless this exact instance is already present.
    pub fn insert(&mut self, knob: Arc<dyn SystKnob>) -> bool {
        if self.contains(&knob) {
            return false;
        }
        self.knobs.push(knob);
        true
    }

    pub fn contains(&self, knob: &Arc<dyn SystKnob>) -> bool {
        self.knobs.iter().any(|k| same_object(k, knob))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SystKnob>> {
        self.knobs.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.knobs.iter().map(|k| k.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.knobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.knobs.is_empty()
    }
}

impl fmt::Debug for SystKnobSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

impl FromIterator<Arc<dyn SystKnob>> for SystKnobSet {
    fn from_iter<I: IntoIterator<Item = Arc<dyn SystKnob>>>(iter: I) -> Self {
        let mut set = SystKnobSet::new();
        for knob in iter {
            set.insert(knob);
        }
        set
    }
}

impl<'a> BitOr<&'a SystKnobSet> for &'a SystKnobSet {
    type Output = SystKnobSet;

    fn bitor(self, rhs: &'a SystKnobSet) -> SystKnobSet {
        self.iter().chain(rhs.iter()).cloned().collect()
    }
}

impl BitOr for SystKnobSet {
    type Output = SystKnobSet;

    fn bitor(self, rhs: SystKnobSet) -> SystKnobSet {
        &self | &rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{Generator, GeneratorVersion, StoredSupport};

    struct Fixed {
        info: GeneratorInfo,
        value: f64,
    }

    impl WeightGenerator for Fixed {
        fn info(&self) -> &GeneratorInfo {
            &self.info
        }

        fn calc_weight(&self, _ev: &EventRecord, _params: &InputVals) -> RwgtResult<f64> {
            Ok(self.value)
        }
    }

    struct Linear {
        info: KnobInfo,
    }

    impl SystKnob for Linear {
        fn info(&self) -> &KnobInfo {
            &self.info
        }

        fn calc_weight(&self, sigma: f64, _ev: &EventRecord, _params: &InputVals) -> RwgtResult<f64> {
            Ok(1.0 + sigma)
        }
    }

    fn genie_event(version: [u32; 3]) -> EventRecord {
        EventRecord {
            generator: Generator::Genie,
            generator_version: GeneratorVersion::from(version),
            ..Default::default()
        }
    }

    fn fixed(name: &str, value: f64) -> Arc<dyn WeightGenerator> {
        Arc::new(Fixed {
            info: GeneratorInfo::new(name, GeneratorSupport::single(StoredSupport::GenieAllVersions)),
            value,
        })
    }

    fn linear(clamp: ClampRange) -> Linear {
        Linear {
            info: KnobInfo::new("linear", GeneratorSupport::single(StoredSupport::GenieV2Only))
                .with_clamp(clamp),
        }
    }

    #[test]
    fn test_clamp_range_validation() {
        assert!(ClampRange::new(0.0, 10.0).is_ok());
        assert!(matches!(
            ClampRange::new(2.0, 1.0),
            Err(RwgtError::InvalidClampRange { .. })
        ));
        assert!(ClampRange::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_clamp_keeps_nan() {
        let range = ClampRange::new(0.0, 10.0).unwrap();
        assert!(range.apply(f64::NAN).is_nan());
        assert_eq!(range.apply(-3.0), 0.0);
        assert_eq!(range.apply(12.0), 10.0);
        assert_eq!(range.apply(f64::INFINITY), 10.0);
    }

    #[test]
    fn test_knob_weight_is_clamped() {
        let knob = linear(ClampRange::new(0.0, 2.0).unwrap());
        let ev = genie_event([2, 12, 2]);
        let params = InputVals::new();
        assert_eq!(knob.get_weight(5.0, &ev, &params).unwrap(), 2.0);
        assert_eq!(knob.get_weight(-5.0, &ev, &params).unwrap(), 0.0);
        assert_eq!(knob.get_weight(0.5, &ev, &params).unwrap(), 1.5);
    }

    #[test]
    fn test_expect_no_weights_skips_support_check() {
        let knob = linear(ClampRange::UNBOUNDED);
        let mut ev = genie_event([3, 0, 6]);
        assert!(knob.get_weight(1.0, &ev, &InputVals::new()).is_err());

        ev.expect_no_weights = true;
        assert_eq!(knob.get_weight(1.0, &ev, &InputVals::new()).unwrap(), 1.0);
    }

    #[test]
    fn test_unsupported_generator_names_calculator() {
        let knob = linear(ClampRange::UNBOUNDED);
        let err = knob
            .get_weight(1.0, &genie_event([3, 0, 6]), &InputVals::new())
            .unwrap_err();
        assert!(matches!(err, RwgtError::UnsupportedGenerator { ref calculator, .. } if calculator == "linear"));
    }

    #[test]
    fn test_cv_weight_is_product() {
        let mut knob = linear(ClampRange::UNBOUNDED);
        let ev = genie_event([2, 12, 2]);
        assert_eq!(knob.cv_weight(&ev, &InputVals::new()).unwrap(), 1.0);

        knob.info.cv_weighters = vec![fixed("a", 0.5), fixed("b", 3.0)];
        assert_eq!(knob.cv_weight(&ev, &InputVals::new()).unwrap(), 1.5);
    }

    #[test]
    fn test_knob_set_union_dedups_instances() {
        let a: Arc<dyn SystKnob> = Arc::new(linear(ClampRange::UNBOUNDED));
        let b: Arc<dyn SystKnob> = Arc::new(linear(ClampRange::UNBOUNDED));

        let left: SystKnobSet = [a.clone(), b.clone()].into_iter().collect();
        let right: SystKnobSet = [a.clone()].into_iter().collect();
        let union = &left | &right;
        assert_eq!(union.len(), 2);
        assert!(union.contains(&a));
        assert!(union.contains(&b));
    }
}
