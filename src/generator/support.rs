//! Generator Support Configuration
//!
//! Declares which generator kinds, version ranges and configuration labels a
//! calculator is valid for.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{Generator, GeneratorVersion};
use crate::error::{RwgtError, RwgtResult};
use crate::event::EventRecord;

/// Inclusive `[min, max]` version range.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VersionRange {
    pub min: GeneratorVersion,
    pub max: GeneratorVersion,
}

impl VersionRange {
    pub fn new(min: impl Into<GeneratorVersion>, max: impl Into<GeneratorVersion>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    /// A range holding exactly one version.
    pub fn exactly(version: impl Into<GeneratorVersion>) -> Self {
        let v = version.into();
        Self {
            min: v.clone(),
            max: v,
        }
    }

    pub fn contains(&self, version: &GeneratorVersion) -> bool {
        &self.min <= version && version <= &self.max
    }
}

/// One accepted (generator, versions, configuration) combination.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GeneratorSupportConfig {
    pub generator: Generator,
    /// Empty means every version of `generator` is accepted.
    #[serde(default)]
    pub ranges: BTreeSet<VersionRange>,
    /// Empty means any configuration label is accepted.
    #[serde(default)]
    pub required_config: String,
}

impl GeneratorSupportConfig {
    pub fn new(generator: Generator) -> Self {
        Self {
            generator,
            ranges: BTreeSet::new(),
            required_config: String::new(),
        }
    }

    pub fn with_range(mut self, range: VersionRange) -> Self {
        self.ranges.insert(range);
        self
    }

    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.required_config = config.into();
        self
    }

    pub fn accepts(&self, generator: Generator, version: &GeneratorVersion, config: &str) -> bool {
        if generator != self.generator {
            return false;
        }

        if !self.required_config.is_empty() && config != self.required_config {
            return false;
        }

        self.ranges.is_empty() || self.ranges.iter().any(|r| r.contains(version))
    }

    pub fn accepts_event(&self, ev: &EventRecord) -> bool {
        self.accepts(ev.generator, &ev.generator_version, &ev.generator_config)
    }
}

/// Predefined support configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoredSupport {
    GenieAllVersions,
    GenieV2Only,
    /// GENIE versions shipping the broken empirical MEC model.
    GenieBrokenEmpiricalMecOnly,
    GenieProd2Only,
    GenieProd3Only,
    GenieProd5Only,
}

impl StoredSupport {
    pub fn config(self) -> GeneratorSupportConfig {
        let genie = GeneratorSupportConfig::new(Generator::Genie);
        match self {
            StoredSupport::GenieAllVersions => genie,
            StoredSupport::GenieV2Only => genie.with_range(VersionRange::new([2, 0, 0], [2, 12, 10])),
            StoredSupport::GenieBrokenEmpiricalMecOnly => {
                genie.with_range(VersionRange::new([2, 8, 0], [2, 10, 6]))
            }
            StoredSupport::GenieProd2Only => genie.with_range(VersionRange::exactly([2, 10, 4])),
            StoredSupport::GenieProd3Only => genie.with_range(VersionRange::exactly([2, 12, 2])),
            StoredSupport::GenieProd5Only => genie
                .with_range(VersionRange::exactly([3, 0, 6]))
                .with_config("N18_10j_02_11a"),
        }
    }
}

impl From<StoredSupport> for GeneratorSupportConfig {
    fn from(s: StoredSupport) -> Self {
        s.config()
    }
}

/// The set of configurations a calculator accepts; any match suffices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratorSupport {
    configs: BTreeSet<GeneratorSupportConfig>,
}

impl GeneratorSupport {
    pub fn single(config: impl Into<GeneratorSupportConfig>) -> Self {
        std::iter::once(config.into()).collect()
    }

    pub fn configs(&self) -> impl Iterator<Item = &GeneratorSupportConfig> {
        self.configs.iter()
    }

    pub fn is_supported(&self, generator: Generator, version: &GeneratorVersion, config: &str) -> bool {
        self.configs.iter().any(|c| c.accepts(generator, version, config))
    }

    /// Fail with [`RwgtError::UnsupportedGenerator`] naming `calculator` unless
    /// some configuration accepts the given generator.
    pub fn check(
        &self,
        calculator: &str,
        generator: Generator,
        version: &GeneratorVersion,
        config: &str,
    ) -> RwgtResult<()> {
        if self.is_supported(generator, version, config) {
            return Ok(());
        }
        Err(RwgtError::UnsupportedGenerator {
            calculator: calculator.to_string(),
            generator,
            version: version.clone(),
            config: config.to_string(),
        })
    }

    pub fn check_event(&self, calculator: &str, ev: &EventRecord) -> RwgtResult<()> {
        self.check(calculator, ev.generator, &ev.generator_version, &ev.generator_config)
    }
}

impl FromIterator<GeneratorSupportConfig> for GeneratorSupport {
    fn from_iter<I: IntoIterator<Item = GeneratorSupportConfig>>(iter: I) -> Self {
        Self {
            configs: iter.into_iter().collect(),
        }
    }
}
