//! Precomputed reweight tables carried on each event.

use serde::{Deserialize, Serialize};

use super::knobs::ReweightKnob;

/// Stored weights at -2, -1, +1 and +2 sigma.
///
/// `f32` matches the width of the upstream event summaries these are copied
/// from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReweightVals {
    pub minus2: f32,
    pub minus1: f32,
    pub plus1: f32,
    pub plus2: f32,
}

impl ReweightVals {
    /// Sentinel returned for knobs that were never set.
    pub const UNSET: ReweightVals = ReweightVals {
        minus2: f32::NAN,
        minus1: f32::NAN,
        plus1: f32::NAN,
        plus2: f32::NAN,
    };

    pub fn new(minus2: f32, minus1: f32, plus1: f32, plus2: f32) -> Self {
        Self {
            minus2,
            minus1,
            plus1,
            plus2,
        }
    }

    pub fn as_array(&self) -> [f32; 4] {
        [self.minus2, self.minus1, self.plus1, self.plus2]
    }

    pub fn is_unset(&self) -> bool {
        self.as_array().iter().all(|v| v.is_nan())
    }
}

impl Default for ReweightVals {
    fn default() -> Self {
        Self::UNSET
    }
}

impl PartialEq for ReweightVals {
    fn eq(&self, other: &Self) -> bool {
        self.as_array()
            .iter()
            .zip(other.as_array().iter())
            .all(|(a, b)| a == b || (a.is_nan() && b.is_nan()))
    }
}

/// Sparse, index-addressed stored weights with an explicit "is set" bitmap.
#[derive(Debug, Clone, Default)]
pub struct ReweightList {
    weights: Vec<ReweightVals>,
    set: Vec<bool>,
}

impl ReweightList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every slot of `values` counts as set.
    pub fn from_vec(values: Vec<ReweightVals>) -> Self {
        let set = vec![true; values.len()];
        Self {
            weights: values,
            set,
        }
    }

    /// Store `vals` at `index`, growing the list as needed. Slots skipped over
    /// by the growth stay unset.
    pub fn set(&mut self, index: usize, vals: ReweightVals) {
        if index >= self.weights.len() {
            self.resize(index + 1);
        }
        self.weights[index] = vals;
        self.set[index] = true;
    }

    pub fn set_knob(&mut self, knob: ReweightKnob, vals: ReweightVals) {
        self.set(knob.index(), vals);
    }

    pub fn is_set(&self, index: usize) -> bool {
        self.set.get(index).copied().unwrap_or(false)
    }

    pub fn get(&self, index: usize) -> Option<&ReweightVals> {
        if self.is_set(index) {
            self.weights.get(index)
        } else {
            None
        }
    }

    pub fn get_knob(&self, knob: ReweightKnob) -> Option<&ReweightVals> {
        self.get(knob.index())
    }

    /// Stored values, or [`ReweightVals::UNSET`] for an unset index.
    pub fn value(&self, index: usize) -> ReweightVals {
        self.get(index).copied().unwrap_or(ReweightVals::UNSET)
    }

    pub fn unset(&mut self, index: usize) {
        if let Some(flag) = self.set.get_mut(index) {
            *flag = false;
            self.weights[index] = ReweightVals::UNSET;
        }
    }

    pub fn resize(&mut self, len: usize) {
        self.weights.resize(len, ReweightVals::UNSET);
        self.set.resize(len, false);
    }

    pub fn clear(&mut self) {
        self.weights.clear();
        self.set.clear();
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// `(index, values)` for every set slot, in index order.
    pub fn iter_set(&self) -> impl Iterator<Item = (usize, &ReweightVals)> + '_ {
        self.weights
            .iter()
            .enumerate()
            .filter(|(i, _)| self.set[*i])
    }
}

// Only set entries take part; trailing unset capacity is irrelevant.
impl PartialEq for ReweightList {
    fn eq(&self, other: &Self) -> bool {
        self.iter_set().eq(other.iter_set())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_index_reads_sentinel() {
        let list = ReweightList::new();
        assert!(!list.is_set(3));
        assert!(list.get(3).is_none());
        assert!(list.value(3).is_unset());
    }

    #[test]
    fn test_set_grows_and_leaves_gaps_unset() {
        let mut list = ReweightList::new();
        list.set(5, ReweightVals::new(0.8, 0.9, 1.1, 1.2));
        assert_eq!(list.len(), 6);
        assert!(list.is_set(5));
        assert!(!list.is_set(2));
        assert_eq!(list.value(5).plus1, 1.1);
    }

    #[test]
    fn test_equality_ignores_unset_slots() {
        let vals = ReweightVals::new(0.7, 0.85, 1.15, 1.3);
        let mut a = ReweightList::new();
        a.set(2, vals);
        let mut b = ReweightList::new();
        b.resize(40);
        b.set(2, vals);
        assert_eq!(a, b);

        b.set(7, vals);
        assert_ne!(a, b);
    }

    #[test]
    fn test_unset_clears_flag() {
        let mut list = ReweightList::from_vec(vec![ReweightVals::new(1.0, 1.0, 1.0, 1.0); 3]);
        list.unset(1);
        assert!(list.is_set(0));
        assert!(!list.is_set(1));
        assert_eq!(list.iter_set().count(), 2);
    }

    #[test]
    fn test_knob_addressing() {
        let mut list = ReweightList::new();
        list.set_knob(ReweightKnob::MaCCQE, ReweightVals::new(0.8, 0.9, 1.1, 1.2));
        assert!(list.get_knob(ReweightKnob::MaCCQE).is_some());
        assert!(list.get_knob(ReweightKnob::MaCCRES).is_none());
    }
}
