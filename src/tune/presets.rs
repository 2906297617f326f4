//! Predefined tunes.

use std::collections::BTreeMap;

use super::definition::{GeneratorSpec, KnobSpec, TuneDefinition};
use super::Tune;
use crate::calcs::{Nonres1PiArgs, RpaFilter, RpaQ0Q3Args};
use crate::error::RwgtResult;
use crate::event::{CurrentType, ReactionType, ReweightKnob};
use crate::registry::Registry;

/// Stored-table knobs used in the 2018 analyses. Not every knob: some are
/// mutually exclusive with these (e.g. `MaCCRES` vs. its shape/norm split)
/// and some are replaced by custom knobs (`MaCCQE` by the reduced one).
pub const GENIE_KNOBS_2018: &[ReweightKnob] = &[
    // QE
    ReweightKnob::MaNCEL,
    ReweightKnob::EtaNCEL,
    ReweightKnob::VecFFCCQEshape,
    // RES
    ReweightKnob::MaCCRES,
    ReweightKnob::MvCCRES,
    ReweightKnob::MaNCRES,
    ReweightKnob::MvNCRES,
    // DIS
    ReweightKnob::AhtBY,
    ReweightKnob::BhtBY,
    ReweightKnob::CV1uBY,
    ReweightKnob::CV2uBY,
    ReweightKnob::NormDISCC,
    ReweightKnob::RnubarnuCC,
    ReweightKnob::DISNuclMod,
    ReweightKnob::NC,
    // hadronization
    ReweightKnob::AGKY_xF1pi,
    ReweightKnob::AGKY_pT1pi,
    ReweightKnob::FormZone,
    // intranuclear
    ReweightKnob::MFP_pi,
    ReweightKnob::MFP_N,
    ReweightKnob::FrCEx_pi,
    ReweightKnob::FrInel_pi,
    ReweightKnob::FrAbs_pi,
    ReweightKnob::FrPiProd_pi,
    ReweightKnob::FrCEx_N,
    ReweightKnob::FrInel_N,
    ReweightKnob::FrAbs_N,
    ReweightKnob::FrPiProd_N,
    // nuclear model
    ReweightKnob::CCQEPauliSupViaKF,
    ReweightKnob::CCQEMomDistroFGtoSF,
    // resonance decays
    ReweightKnob::BR1gamma,
    ReweightKnob::BR1eta,
    ReweightKnob::Theta_Delta2Npi,
];

pub const REFERENCE_2018: &str = "reference_2018";

/// Definition of the 2018 reference tune.
///
/// Both RPA components keep the historical apply-to-hydrogen behaviour and
/// the q0/q3 one reads the GENIE 2.10 tables; the non-resonant pion weight
/// uses 0.41.
pub fn reference_2018_definition() -> TuneDefinition {
    let components = BTreeMap::from([
        ("MA_QE".to_string(), GeneratorSpec::Maqe2018),
        (
            "RPA_QE".to_string(),
            GeneratorSpec::RpaQ0Q3(RpaQ0Q3Args {
                variant: "CV".to_string(),
                reaction: ReactionType::QuasiElastic,
                apply_to_hydrogen: true,
                force_nu: false,
                genie_210: true,
            }),
        ),
        (
            "RPA_RES".to_string(),
            GeneratorSpec::RpaQ2(RpaFilter {
                current: CurrentType::Cc,
                reaction: ReactionType::Resonant,
                apply_to_hydrogen: true,
            }),
        ),
        (
            "Nonres1pi".to_string(),
            GeneratorSpec::Nonres1Pi(Nonres1PiArgs {
                approx_cut: false,
                typo: true,
            }),
        ),
    ]);

    TuneDefinition {
        name: REFERENCE_2018.to_string(),
        components,
        knobs: vec![
            KnobSpec::Genie2018,
            KnobSpec::MaqeReduced2018,
            KnobSpec::RadiativeCorr { nuebar: false },
            KnobSpec::RadiativeCorr { nuebar: true },
            KnobSpec::SecondClassCurrents,
        ],
    }
}

pub fn reference_2018(registry: &Registry) -> RwgtResult<Tune> {
    reference_2018_definition().build(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_2018_contents() {
        let registry = Registry::new();
        let tune = reference_2018(&registry).unwrap();

        let labels: Vec<&str> = tune.components().keys().map(String::as_str).collect();
        assert_eq!(labels, vec!["MA_QE", "Nonres1pi", "RPA_QE", "RPA_RES"]);

        assert_eq!(tune.knob_names().len(), GENIE_KNOBS_2018.len() + 4);
        for name in ["MaCCQE_reduced_2018", "radcorrnue", "radcorrnuebar", "2ndclasscurr", "MaCCRES"] {
            assert!(tune.syst_knobs().contains_key(name), "missing {}", name);
        }
        assert!(!tune.syst_knobs().contains_key("MaCCQE"));
    }

    #[test]
    fn test_reference_2018_shares_registry_instances() {
        let registry = Registry::new();
        let a = reference_2018(&registry).unwrap();
        let b = reference_2018(&registry).unwrap();
        assert!(a.knob_set().iter().all(|k| b.knob_set().contains(k)));
    }
}
