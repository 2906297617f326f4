//! Serializable tune definitions.
//!
//! ```yaml
//! name: my_tune
//! components:
//!   MA_QE: { type: maqe_2018 }
//!   Nonres1pi: { type: nonres_1pi, typo: true }
//! knobs:
//!   - { type: stored, knob: MaCCRES }
//!   - { type: radiative_corr, nuebar: true }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::presets::GENIE_KNOBS_2018;
use super::Tune;
use crate::calcs::{
    MaqeReducedSyst2017, MaqeReducedSyst2018, MaqeWeight2018, Nonres1PiArgs, Nonres1PiWeight, RadiativeCorrSyst,
    RpaFilter, RpaQ0Q3Args, RpaQ0Q3Weight, RpaQ2Weight, SecondClassCurrentSyst,
};
use crate::error::RwgtResult;
use crate::event::ReweightKnob;
use crate::registry::Registry;
use crate::rwgt::{SigmaPolicy, StoredKnobArgs, StoredTableKnob, SystKnob, WeightGenerator};

/// A central-value generator and its constructor arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeneratorSpec {
    #[serde(rename = "maqe_2018")]
    Maqe2018,
    #[serde(rename = "nonres_1pi")]
    Nonres1Pi(Nonres1PiArgs),
    #[serde(rename = "rpa_q0q3")]
    RpaQ0Q3(RpaQ0Q3Args),
    #[serde(rename = "rpa_q2")]
    RpaQ2(RpaFilter),
}

impl GeneratorSpec {
    pub fn obtain(&self, registry: &Registry) -> RwgtResult<Arc<dyn WeightGenerator>> {
        match self {
            GeneratorSpec::Maqe2018 => registry.weighter::<MaqeWeight2018>(()),
            GeneratorSpec::Nonres1Pi(args) => registry.weighter::<Nonres1PiWeight>(*args),
            GeneratorSpec::RpaQ0Q3(args) => registry.weighter::<RpaQ0Q3Weight>(args.clone()),
            GeneratorSpec::RpaQ2(filter) => registry.weighter::<RpaQ2Weight>(*filter),
        }
    }
}

/// One knob, or a named group of knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KnobSpec {
    Stored {
        knob: ReweightKnob,
        #[serde(default)]
        policy: Option<SigmaPolicy>,
    },
    /// Every stored-table knob of the 2018 analyses.
    #[serde(rename = "genie_2018")]
    Genie2018,
    #[serde(rename = "maqe_reduced_2017")]
    MaqeReduced2017,
    #[serde(rename = "maqe_reduced_2018")]
    MaqeReduced2018,
    RadiativeCorr {
        nuebar: bool,
    },
    SecondClassCurrents,
}

impl KnobSpec {
    pub fn obtain(&self, registry: &Registry) -> RwgtResult<Vec<Arc<dyn SystKnob>>> {
        let knob = match self {
            KnobSpec::Stored { knob, policy } => registry.knob::<StoredTableKnob>(StoredKnobArgs {
                knob: *knob,
                policy: *policy,
            })?,
            KnobSpec::Genie2018 => {
                return GENIE_KNOBS_2018.iter().map(|k| registry.stored_knob(*k)).collect();
            }
            KnobSpec::MaqeReduced2017 => registry.knob::<MaqeReducedSyst2017>(())?,
            KnobSpec::MaqeReduced2018 => registry.knob::<MaqeReducedSyst2018>(())?,
            KnobSpec::RadiativeCorr { nuebar } => registry.knob::<RadiativeCorrSyst>(*nuebar)?,
            KnobSpec::SecondClassCurrents => registry.knob::<SecondClassCurrentSyst>(())?,
        };
        Ok(vec![knob])
    }
}

impl From<ReweightKnob> for KnobSpec {
    fn from(knob: ReweightKnob) -> Self {
        KnobSpec::Stored { knob, policy: None }
    }
}

/// Declarative form of a [`Tune`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuneDefinition {
    pub name: String,
    #[serde(default)]
    pub components: BTreeMap<String, GeneratorSpec>,
    #[serde(default)]
    pub knobs: Vec<KnobSpec>,
}

impl TuneDefinition {
    /// Obtain every calculator from `registry` and assemble the tune.
    pub fn build(&self, registry: &Registry) -> RwgtResult<Tune> {
        let mut builder = Tune::builder(self.name.clone());
        for (label, spec) in &self.components {
            builder = builder.component(label.clone(), spec.obtain(registry)?);
        }
        for spec in &self.knobs {
            builder = builder.knobs(spec.obtain(registry)?);
        }
        builder.build()
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("parsing YAML tune definition")
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("parsing JSON tune definition")
    }

    /// Read a `.json` file as JSON and anything else as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading tune definition {}", path.display()))?;
        let def = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        };
        def.with_context(|| format!("loading {}", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            _ => serde_yaml::to_string(self)?,
        };
        std::fs::write(path, content).with_context(|| format!("writing tune definition {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RwgtError;

    const YAML: &str = r#"
name: small
components:
  MA_QE: { type: maqe_2018 }
  Nonres1pi: { type: nonres_1pi, typo: true }
knobs:
  - { type: stored, knob: MaCCRES }
  - { type: stored, knob: MaNCRES, policy: clamp }
  - { type: radiative_corr, nuebar: true }
  - { type: second_class_currents }
"#;

    #[test]
    fn test_parse_yaml() {
        let def = TuneDefinition::from_yaml_str(YAML).unwrap();
        assert_eq!(def.name, "small");
        assert_eq!(
            def.components["Nonres1pi"],
            GeneratorSpec::Nonres1Pi(Nonres1PiArgs {
                approx_cut: false,
                typo: true
            })
        );
        assert_eq!(
            def.knobs[1],
            KnobSpec::Stored {
                knob: ReweightKnob::MaNCRES,
                policy: Some(SigmaPolicy::Clamp)
            }
        );
    }

    #[test]
    fn test_build_from_definition() {
        let registry = Registry::new();
        let tune = TuneDefinition::from_yaml_str(YAML).unwrap().build(&registry).unwrap();
        assert_eq!(tune.components().len(), 2);
        assert_eq!(
            tune.knob_names(),
            ["MaCCRES", "MaNCRES", "radcorrnuebar", "2ndclasscurr"].map(String::from)
        );
        // Registry-shared: the same knob comes back on a second build.
        let again = TuneDefinition::from_yaml_str(YAML).unwrap().build(&registry).unwrap();
        assert!(Arc::ptr_eq(&tune.components()["MA_QE"], &again.components()["MA_QE"]));
    }

    #[test]
    fn test_unknown_stored_knob_is_rejected() {
        let err = TuneDefinition::from_yaml_str("name: x\nknobs:\n  - { type: stored, knob: NotAKnob }\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_duplicate_knob_names_rejected() {
        // Same stored knob under two sigma policies: distinct instances, same name.
        let def = TuneDefinition {
            name: "dup".into(),
            components: BTreeMap::new(),
            knobs: vec![
                KnobSpec::Stored {
                    knob: ReweightKnob::MaCCRES,
                    policy: Some(SigmaPolicy::Clamp),
                },
                KnobSpec::Stored {
                    knob: ReweightKnob::MaCCRES,
                    policy: Some(SigmaPolicy::Reject),
                },
            ],
        };
        assert!(matches!(def.build(&Registry::new()), Err(RwgtError::InvalidTune(_))));
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tune.json");
        let def = TuneDefinition::from_yaml_str(YAML).unwrap();
        def.save(&path).unwrap();
        assert_eq!(TuneDefinition::load(&path).unwrap(), def);
    }
}
