mod common;

use std::fs;

use common::snapshot;
use pathway_sbml::{convert_species, BatchOptions};

#[test]
fn failing_pathway_does_not_stop_the_batch() {
    let source = snapshot();
    let out = tempfile::tempdir().unwrap();
    let options = BatchOptions {
        threads: 2,
        cache_clear_interval: 1,
        layout: false,
    };

    let report = convert_species(&source, "Homo sapiens", out.path(), &options).unwrap();

    assert_eq!(report.converted, vec![out.path().join("R-HSA-100.sbml")]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "R-HSA-300");
    assert!(!report.is_success());

    let xml = fs::read_to_string(out.path().join("R-HSA-100.sbml")).unwrap();
    assert!(xml.contains(r#"id="model_100""#));
    assert!(!out.path().join("R-HSA-300.sbml").exists());
}

#[test]
fn unknown_species_converts_nothing() {
    let source = snapshot();
    let out = tempfile::tempdir().unwrap();
    let report =
        convert_species(&source, "Mus musculus", &out.path().join("mouse"), &BatchOptions::default())
            .unwrap();
    assert!(report.converted.is_empty());
    assert!(report.is_success());
    assert!(out.path().join("mouse").is_dir());
}
