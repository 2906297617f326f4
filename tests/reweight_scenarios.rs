//! End-to-end reweighting scenarios
//!
//! A registry with in-memory correction tables, the 2018 reference tune and
//! one quasi-elastic carbon event.

use std::sync::Arc;

use xsec_rwgt::adapters::{read_records, write_records, FlatRecord};
use xsec_rwgt::calcs::MaqeWeight2018;
use xsec_rwgt::event::{FourMomentum, ReactionType};
use xsec_rwgt::tables::{Axis, Hist1D, Hist2D, MemoryTableSource};
use xsec_rwgt::tune::presets::reference_2018;
use xsec_rwgt::{
    EventRecord, Generator, GeneratorVersion, InputVals, Registry, ReweightKnob, ReweightVals, RwgtError,
};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

fn registry() -> Registry {
    let flat2d = |v: f64| {
        Hist2D::new(
            Axis::uniform(1, 0.0, 2.0).unwrap(),
            Axis::uniform(1, 0.0, 2.0).unwrap(),
            vec![vec![v]],
        )
        .unwrap()
    };
    let flat1d = |v: f64| Hist1D::new(Axis::uniform(1, 0.0, 2.0).unwrap(), vec![v]).unwrap();

    let tables = MemoryTableSource::new()
        .with("RPA2017.GENIE2-10.json", "RPA_CV_nu", flat2d(0.9))
        .with("RPA2017.GENIE2-10.json", "RPA_CV_nubar", flat2d(0.8))
        .with("RPA2017.GENIE2-12.json", "RPA_Q2_CV_nu", flat1d(0.95))
        .with("RPA2017.GENIE2-12.json", "RPA_Q2_CV_nubar", flat1d(0.95));
    Registry::new().with_table_source(Arc::new(tables))
}

/// CCQE on carbon, struck neutron, GENIE 2.12.2.
fn qe_event() -> EventRecord {
    let mut ev = EventRecord {
        generator: Generator::Genie,
        generator_version: GeneratorVersion::from([2, 12, 2]),
        nu_pdg: 14,
        is_cc: true,
        reaction: ReactionType::QuasiElastic,
        struck_nucleon: 2112,
        enu: 2.0,
        q: FourMomentum::new(0.2, 0.0, 0.0, 0.5),
        a: 12,
        npi_plus: 0,
        npi_zero: 0,
        npi_minus: 0,
        ..Default::default()
    };
    ev.genie_weights
        .set_knob(ReweightKnob::MaCCQE, ReweightVals::new(0.7, 0.85, 1.2, 1.4));
    ev
}

#[test]
fn test_stored_knob_at_minus_half_sigma() {
    let registry = registry();
    let knob = registry.stored_knob(ReweightKnob::MaCCQE).unwrap();
    let w = knob.get_weight(-0.5, &qe_event(), &InputVals::new()).unwrap();
    assert!(close(w, 0.925), "got {}", w);
}

#[test]
fn test_composite_weight_is_product_of_components() {
    let registry = registry();
    let tune = reference_2018(&registry).unwrap();
    let ev = qe_event();
    let params = InputVals::new();

    let total = tune.event_weight(&ev, &params).unwrap();
    let parts = tune.event_weight_components(&ev, &params).unwrap();
    let product: f64 = parts.iter().map(|p| p.weight).product();
    assert!(close(total, product));

    // MA_QE: 1 + 0.2 * (1.2 - 1); RPA_QE from the table; the rest untouched.
    assert!(close(total, 1.04 * 0.9), "got {}", total);
    let by_name = |n: &str| parts.iter().find(|p| p.name == n).map(|p| p.weight);
    assert_eq!(by_name("RPA_RES"), Some(1.0));
    assert_eq!(by_name("Nonres1pi"), Some(1.0));
}

#[test]
fn test_knob_relative_to_cv() {
    let registry = registry();
    let tune = reference_2018(&registry).unwrap();
    let ev = qe_event();
    let params = InputVals::new();

    let abs = tune
        .event_syst_knob_weight("radcorrnue", 1.0, &ev, &params, false)
        .unwrap();
    assert_eq!(abs, 1.0);

    let cv = tune.event_weight(&ev, &params).unwrap();
    let rel = tune
        .event_syst_knob_weight("MaCCQE_reduced_2018", 1.0, &ev, &params, true)
        .unwrap();
    let raw = tune
        .event_syst_knob_weight("MaCCQE_reduced_2018", 1.0, &ev, &params, false)
        .unwrap();
    assert!(close(rel, raw / cv));
}

#[test]
fn test_unsupported_generator_is_an_error() {
    let registry = registry();
    let tune = reference_2018(&registry).unwrap();
    let mut ev = qe_event();
    ev.generator_version = GeneratorVersion::from([3, 0, 6]);

    let err = tune.event_weight(&ev, &InputVals::new()).unwrap_err();
    match err {
        RwgtError::UnsupportedGenerator { calculator, version, .. } => {
            assert!(!calculator.is_empty());
            assert_eq!(version.to_string(), "3.0.6");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_events_without_weights_are_untouched() {
    let registry = registry();
    let tune = reference_2018(&registry).unwrap();
    let ev = EventRecord {
        expect_no_weights: true,
        ..Default::default()
    };
    let params = InputVals::new();

    assert_eq!(tune.event_weight(&ev, &params).unwrap(), 1.0);
    for name in tune.knob_names() {
        assert_eq!(tune.event_syst_knob_weight(name, 2.0, &ev, &params, true).unwrap(), 1.0);
    }
}

#[test]
fn test_unknown_knob_name() {
    let registry = registry();
    let tune = reference_2018(&registry).unwrap();
    let err = tune
        .event_syst_knob_weight("MaCCQE", 1.0, &qe_event(), &InputVals::new(), false)
        .unwrap_err();
    assert!(matches!(err, RwgtError::UnknownKnob { .. }));
}

#[test]
fn test_registry_returns_one_instance() {
    let registry = registry();
    let a = registry.weighter::<MaqeWeight2018>(()).unwrap();
    let tune = reference_2018(&registry).unwrap();
    assert!(Arc::ptr_eq(&a, &tune.components()["MA_QE"]));
    assert!(Arc::ptr_eq(
        &registry.stored_knob(ReweightKnob::MaCCRES).unwrap(),
        &tune.syst_knobs()["MaCCRES"]
    ));
}

#[test]
fn test_weights_survive_record_file() {
    let registry = registry();
    let tune = reference_2018(&registry).unwrap();
    let params = InputVals::new();

    let mut nubar = qe_event();
    nubar.nu_pdg = -14;
    let events = vec![qe_event(), nubar];

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    write_records(&path, &events).unwrap();
    let back = read_records(&path).unwrap();
    assert_eq!(back, events);
    assert_eq!(FlatRecord::from(&back[1]), FlatRecord::from(&events[1]));

    let before = tune.event_weights(&events, &params).unwrap();
    let after = tune.event_weights(&back, &params).unwrap();
    assert_eq!(before, after);
    assert!(close(after[1], 1.04 * 0.8));
}
