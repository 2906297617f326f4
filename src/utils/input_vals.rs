//! Named numeric parameters passed alongside every weight request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{RwgtError, RwgtResult};

/// Map of extra inputs (`"EmpiricalMEC" -> 1.0`, ...) that are not part of
/// the event record. Missing keys surface as [`RwgtError::UnknownParameter`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputVals {
    values: BTreeMap<String, f64>,
}

impl InputVals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Value for `key`, or an error naming the missing key.
    pub fn require(&self, key: &str) -> RwgtResult<f64> {
        self.get(key)
            .ok_or_else(|| RwgtError::UnknownParameter(key.to_string()))
    }

    /// Boolean view of a parameter: present and nonzero.
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| v != 0.0)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for InputVals {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
