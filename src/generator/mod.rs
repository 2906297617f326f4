//! Generator Identification
//!
//! Which upstream simulator produced an event, and at which version.

pub mod support;

pub use support::{GeneratorSupport, GeneratorSupportConfig, StoredSupport, VersionRange};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RwgtError;

/// Upstream event generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Generator {
    #[default]
    Unknown,
    Genie,
}

impl Generator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Generator::Genie => "GENIE",
            Generator::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Generator {
    type Err = RwgtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "genie" => Ok(Generator::Genie),
            "unknown" | "" => Ok(Generator::Unknown),
            other => Err(RwgtError::Conversion(format!("unknown generator '{}'", other))),
        }
    }
}

lazy_static! {
    static ref VERSION_COMPONENT: Regex = Regex::new(r"\d+").expect("static regex");
}

/// Integer version vector, ordered lexicographically: `[2,12,2] < [2,12,10]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GeneratorVersion(Vec<u32>);

impl GeneratorVersion {
    pub fn new(components: Vec<u32>) -> Self {
        Self(components)
    }

    /// Extract every run of digits, so "2.12.2", "v2_12_2" and "R-2.12.2"
    /// all decode to `[2, 12, 2]`.
    pub fn decode(s: &str) -> Result<Self, RwgtError> {
        VERSION_COMPONENT
            .find_iter(s)
            .map(|m| {
                m.as_str()
                    .parse::<u32>()
                    .map_err(|e| RwgtError::Conversion(format!("bad version component in '{}': {}", s, e)))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GeneratorVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        f.write_str(&parts.join("."))
    }
}

impl FromStr for GeneratorVersion {
    type Err = RwgtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl TryFrom<String> for GeneratorVersion {
    type Error = RwgtError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::decode(&s)
    }
}

impl From<GeneratorVersion> for String {
    fn from(v: GeneratorVersion) -> Self {
        v.to_string()
    }
}

impl From<Vec<u32>> for GeneratorVersion {
    fn from(v: Vec<u32>) -> Self {
        Self(v)
    }
}

impl<const N: usize> From<[u32; N]> for GeneratorVersion {
    fn from(v: [u32; N]) -> Self {
        Self(v.to_vec())
    }
}
