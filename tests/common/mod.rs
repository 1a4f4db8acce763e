#![allow(dead_code)]

use pathway_sbml::{SnapshotSource, TextMeasure};
use serde_json::{json, Value};

/// Six pixels per character, one line of `font_px`.
pub struct FixedMeasure;

impl TextMeasure for FixedMeasure {
    fn measure(&self, text: &str, font_px: f64) -> (f64, f64) {
        (text.chars().count() as f64 * 6.0, font_px)
    }
}

pub const DIAGRAM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Process reactomeId="100">
  <Nodes>
    <org.gk.render.RenderableCompartment id="1" reactomeId="70" bounds="0 0 400 300">
      <Properties><displayName>cytosol</displayName></Properties>
    </org.gk.render.RenderableCompartment>
    <org.gk.render.RenderableProtein id="2" reactomeId="10" bounds="20 40 60 30">
      <Properties><displayName>A</displayName></Properties>
    </org.gk.render.RenderableProtein>
    <org.gk.render.RenderableChemical id="3" reactomeId="11" bounds="20 140 40 30">
      <Properties><displayName>ATP</displayName></Properties>
    </org.gk.render.RenderableChemical>
    <org.gk.render.RenderableComplex id="4" reactomeId="13" bounds="280 40 80 40">
      <Properties><displayName>A:B</displayName></Properties>
    </org.gk.render.RenderableComplex>
    <org.gk.render.RenderableChemical id="6" reactomeId="14" bounds="280 140 40 30">
      <Properties><displayName>ADP</displayName></Properties>
    </org.gk.render.RenderableChemical>
    <org.gk.render.RenderableProtein id="7" reactomeId="15" bounds="150 220 60 30">
      <Properties><displayName>kinase</displayName></Properties>
    </org.gk.render.RenderableProtein>
  </Nodes>
  <Edges>
    <org.gk.render.RenderableReaction id="5" reactomeId="200" points="120 100, 220 100" position="170 100">
      <Inputs><Input id="2"/><Input id="3"/></Inputs>
      <Outputs><Output id="4" points="280 60"/><Output id="6"/></Outputs>
      <Catalysts><Catalyst id="7" points="170 220"/></Catalysts>
    </org.gk.render.RenderableReaction>
  </Edges>
</Process>"#;

pub fn snapshot_value() -> Value {
    json!({
        "reference_databases": [
            {"db_id": 1, "name": "UniProt", "url": "https://www.uniprot.org/uniprot/###ID###"},
            {"db_id": 2, "name": "ChEBI", "url": "https://www.ebi.ac.uk/chebi/searchId.do?chebiId=CHEBI:###ID###"}
        ],
        "reference_entities": [
            {"db_id": 50, "identifier": "P12345", "reference_database": 1},
            {"db_id": 51, "identifier": "15422", "reference_database": 2},
            {"db_id": 52, "identifier": "P99999", "reference_database": 1},
            {"db_id": 53, "identifier": "16761", "reference_database": 2}
        ],
        "compartments": [
            {"db_id": 70, "name": "cytosol", "accession": "0005829"},
            {"db_id": 71, "name": "nucleoplasm", "accession": "0005654"}
        ],
        "persons": [
            {"db_id": 1, "surname": "Smith", "first_name": "Jo", "affiliation": "EBI"}
        ],
        "instance_edits": [
            {"db_id": 900, "date_time": "2004-11-08 21:33:52", "authors": [1]},
            {"db_id": 901, "date_time": "2012-01-01 00:00:00", "authors": [1]}
        ],
        "physical_entities": [
            {"db_id": 10, "stable_id": "R-HSA-10", "name": "A", "kind": "EntityWithAccessionedSequence",
             "compartments": [70], "reference_entity": 50, "created": 900},
            {"db_id": 11, "stable_id": "R-ALL-11", "name": "ATP", "kind": "SimpleEntity",
             "compartments": [70], "reference_entity": 51},
            {"db_id": 12, "stable_id": "R-HSA-12", "name": "B", "kind": "EntityWithAccessionedSequence",
             "compartments": [70], "reference_entity": 52},
            {"db_id": 13, "stable_id": "R-HSA-13", "name": "A:B", "kind": "Complex",
             "compartments": [70], "components": [10, {"entity": 12, "stoichiometry": 2}]},
            {"db_id": 14, "stable_id": "R-ALL-14", "name": "ADP", "kind": "SimpleEntity",
             "compartments": [70], "reference_entity": 53},
            {"db_id": 15, "stable_id": "R-HSA-15", "name": "kinase", "kind": "EntityWithAccessionedSequence",
             "compartments": [71], "reference_entity": 50}
        ],
        "events": [
            {"db_id": 100, "stable_id": "R-HSA-100", "name": "Binding pathway", "kind": "Pathway",
             "species": "Homo sapiens", "has_event": [200, 201], "summation": ["A binds B."],
             "created": 900, "diagram": DIAGRAM},
            {"db_id": 200, "stable_id": "R-HSA-200", "name": "A binds B", "kind": "Reaction",
             "species": "Homo sapiens", "inputs": [10, 11], "outputs": [13, 14], "catalysts": [15],
             "literature": ["12345"], "go_biological_process": "0006915",
             "created": 900, "modified": [901]},
            {"db_id": 201, "stable_id": "R-HSA-201", "name": "ATP hydrolysis", "kind": "BlackBoxEvent",
             "species": "Homo sapiens", "inputs": [11], "outputs": [14]},
            {"db_id": 300, "stable_id": "R-HSA-300", "name": "Broken pathway", "kind": "Pathway",
             "species": "Homo sapiens", "has_event": [301]},
            {"db_id": 301, "name": "missing input", "kind": "Reaction", "inputs": [999]}
        ]
    })
}

pub fn snapshot() -> SnapshotSource {
    SnapshotSource::from_value(snapshot_value()).expect("valid snapshot")
}
