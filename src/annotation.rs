//! Cross-references, explanatory notes and provenance attached to document objects.
//!
//! Every call is idempotent: relation groups have set semantics, notes are
//! replaced rather than appended, and creators are keyed by author.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::document::{self, Annotation, Creator, History, Qualifier};
use crate::error::Result;
use crate::model::{
    self, go_uri, reactome_uri, CrossReferences, Entity, EntityGraph, EntityKind, Provenance,
    ReactionRecord, TargetRecord,
};
use crate::resolver::{EntityResolver, ReferenceAccession};

const W3CDTF: &str = "%Y-%m-%dT%H:%M:%SZ";

pub struct AnnotationAssembler<'a> {
    resolver: EntityResolver<'a>,
}

impl<'a> AnnotationAssembler<'a> {
    pub fn new(graph: &'a EntityGraph) -> Self {
        Self {
            resolver: EntityResolver::new(graph),
        }
    }

    pub fn annotate_species(&self, species: &mut document::Species, entity: &Entity) -> Result<()> {
        let accessions = self.resolver.flatten(entity)?;
        let annotation = &mut species.annotation;
        if let Some(stable_id) = &entity.stable_id {
            annotation.add_resource(Qualifier::Is, reactome_uri(stable_id));
        }
        let qualifier = if entity.kind.is_composite() {
            Qualifier::HasPart
        } else {
            Qualifier::Is
        };
        for accession in &accessions {
            annotation.add_resource(qualifier, accession.url.as_str());
        }
        for source in &entity.inferred_from {
            annotation.add_resource(Qualifier::IsHomologTo, reactome_uri(source));
        }
        apply_provenance(&mut annotation.history, &entity.provenance);
        species.notes = vec![entity_note(entity.kind, &accessions)];
        Ok(())
    }

    pub fn annotate_reaction(&self, reaction: &mut document::Reaction, record: &ReactionRecord) {
        let annotation = &mut reaction.annotation;
        if let Some(stable_id) = &record.stable_id {
            annotation.add_resource(Qualifier::Is, reactome_uri(stable_id));
        }
        add_cross_references(annotation, &record.cross_references);
        apply_provenance(&mut annotation.history, &record.provenance);
        reaction.notes = record.summation.clone();
    }

    pub fn annotate_compartment(
        &self,
        compartment: &mut document::Compartment,
        record: &model::Compartment,
    ) {
        if let Some(accession) = &record.accession {
            compartment
                .annotation
                .add_resource(Qualifier::Is, go_uri(accession));
        }
    }

    pub fn annotate_model(&self, model: &mut document::Model, target: &TargetRecord) {
        let annotation = &mut model.annotation;
        if let Some(stable_id) = &target.stable_id {
            annotation.add_resource(Qualifier::Is, reactome_uri(stable_id));
        }
        add_cross_references(annotation, &target.cross_references);
        apply_provenance(&mut annotation.history, &target.provenance);
        model.notes = target.summation.clone();
    }
}

fn add_cross_references(annotation: &mut Annotation, refs: &CrossReferences) {
    for uri in refs.go.iter().chain(&refs.ec).chain(&refs.other) {
        annotation.add_resource(Qualifier::Is, uri.as_str());
    }
    for uri in &refs.literature {
        annotation.add_resource(Qualifier::IsDescribedBy, uri.as_str());
    }
    for uri in &refs.disease {
        annotation.add_resource(Qualifier::OccursIn, uri.as_str());
    }
    for uri in &refs.homologs {
        annotation.add_resource(Qualifier::IsHomologTo, uri.as_str());
    }
}

/// Merge authors and timestamps into `history`; the earliest creation date wins.
pub fn apply_provenance(history: &mut History, provenance: &Provenance) {
    let edits = provenance.created.iter().chain(&provenance.modified);
    for edit in edits {
        for person in &edit.authors {
            history
                .creators
                .entry(person.db_id)
                .or_insert_with(|| Creator {
                    family_name: person.surname.clone(),
                    given_name: person.first_name.clone(),
                    email: person.email.clone(),
                    organisation: person.organisation.clone(),
                });
        }
    }
    if let Some(created) = provenance
        .created
        .as_ref()
        .and_then(|edit| w3c_date(&edit.date_time))
    {
        let earlier = history
            .created
            .as_ref()
            .map_or(true, |existing| created < *existing);
        if earlier {
            history.created = Some(created);
        }
    }
    for edit in &provenance.modified {
        if let Some(date) = w3c_date(&edit.date_time) {
            history.modified.insert(date);
        }
    }
}

/// Database timestamps (`2004-11-08 21:33:52` or RFC 3339) as W3CDTF.
pub fn w3c_date(value: &str) -> Option<String> {
    let parsed = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc)));
    match parsed {
        Ok(date) => Some(date.format(W3CDTF).to_string()),
        Err(_) => {
            tracing::warn!(value, "unparsable timestamp dropped from history");
            None
        }
    }
}

fn entity_note(kind: EntityKind, accessions: &[ReferenceAccession]) -> String {
    let sentence = match kind {
        EntityKind::SimpleEntity => "This is a small compound.",
        EntityKind::ChemicalDrug => "This is a chemical drug.",
        EntityKind::EntityWithAccessionedSequence => {
            "This is a genome-encoded macromolecule with a known sequence."
        }
        EntityKind::GenomeEncodedEntity => "This is a genome-encoded entity of unknown sequence.",
        EntityKind::ProteinDrug => "This is a protein drug.",
        EntityKind::RnaDrug => "This is an RNA drug.",
        EntityKind::OtherEntity => "This is an entity of unknown or unclassified chemical nature.",
        EntityKind::Complex => {
            "Derived from a Reactome Complex. Here is the flattened structure of this complex:"
        }
        EntityKind::DefinedSet => {
            "Derived from a Reactome DefinedSet. Any of these entities can perform the given function:"
        }
        EntityKind::CandidateSet => {
            "Derived from a Reactome CandidateSet. These entities are suspected to perform the given function:"
        }
        EntityKind::OpenSet => {
            "Derived from a Reactome OpenSet. This set groups entities sharing a common property:"
        }
        EntityKind::Polymer => "Derived from a Reactome Polymer. The repeated units are:",
    };
    if !kind.is_composite() || accessions.is_empty() {
        return sentence.to_string();
    }
    let parts: Vec<String> = accessions
        .iter()
        .map(|accession| match accession.multiplicity {
            1 => accession.label(),
            n => format!("{} x{n}", accession.label()),
        })
        .collect();
    format!("{sentence} {}.", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::model::{ChildRef, InstanceEdit, Person};
    use crate::resolver::tests::{entity, protein};

    fn person(db_id: u64, surname: &str) -> Person {
        Person {
            db_id,
            surname: surname.to_string(),
            first_name: None,
            email: None,
            organisation: None,
        }
    }

    #[test]
    fn species_annotation_is_idempotent() {
        let a = protein(1, "P00001");
        let mut complex = entity(2, EntityKind::Complex);
        complex.components = vec![
            ChildRef {
                entity: 1,
                stoichiometry: 2,
            },
        ];
        let graph: EntityGraph = [a, complex.clone()].into_iter().collect();
        let assembler = AnnotationAssembler::new(&graph);

        let mut doc = Document::new("model_1", "m");
        let species = doc.create_species("species_2".into(), complex.name.clone());
        assembler.annotate_species(species, &complex).unwrap();
        assembler.annotate_species(species, &complex).unwrap();

        let annotation = &species.annotation;
        assert_eq!(annotation.resources(Qualifier::Is).count(), 1);
        assert_eq!(
            annotation.resources(Qualifier::HasPart).collect::<Vec<_>>(),
            vec!["https://www.uniprot.org/uniprot/P00001"]
        );
        assert_eq!(species.notes.len(), 1);
        assert!(species.notes[0].ends_with("UniProt:P00001 x2."));
    }

    #[test]
    fn simple_entity_note_has_no_listing() {
        let a = protein(1, "P00001");
        assert_eq!(
            entity_note(a.kind, &[]),
            "This is a genome-encoded macromolecule with a known sequence."
        );
    }

    #[test]
    fn history_dedups_authors_and_keeps_earliest() {
        let provenance = Provenance {
            created: Some(InstanceEdit {
                date_time: "2010-01-02 03:04:05".to_string(),
                authors: vec![person(1, "Smith")],
            }),
            modified: vec![
                InstanceEdit {
                    date_time: "2012-05-06 07:08:09".to_string(),
                    authors: vec![person(1, "Smith"), person(2, "Jones")],
                },
                InstanceEdit {
                    date_time: "garbage".to_string(),
                    authors: vec![],
                },
            ],
        };
        let mut history = History::default();
        apply_provenance(&mut history, &provenance);
        apply_provenance(&mut history, &provenance);
        assert_eq!(history.creators.len(), 2);
        assert_eq!(history.created.as_deref(), Some("2010-01-02T03:04:05Z"));
        assert_eq!(history.modified.len(), 1);

        let older = Provenance {
            created: Some(InstanceEdit {
                date_time: "2001-01-01T00:00:00Z".to_string(),
                authors: vec![],
            }),
            modified: vec![],
        };
        apply_provenance(&mut history, &older);
        assert_eq!(history.created.as_deref(), Some("2001-01-01T00:00:00Z"));
    }

    #[test]
    fn reaction_relations_are_grouped() {
        let graph = EntityGraph::new();
        let assembler = AnnotationAssembler::new(&graph);
        let record = ReactionRecord {
            db_id: 5,
            stable_id: Some("R-HSA-5".to_string()),
            name: "r".to_string(),
            kind: model::EventKind::Reaction,
            inputs: vec![],
            outputs: vec![],
            catalysts: vec![],
            positive_regulators: vec![],
            negative_regulators: vec![],
            cross_references: CrossReferences {
                literature: vec!["https://identifiers.org/pubmed/1".to_string()],
                go: vec![go_uri("0006915")],
                disease: vec!["https://identifiers.org/DOID:162".to_string()],
                ..CrossReferences::default()
            },
            summation: vec!["Some text.".to_string()],
            provenance: Provenance::default(),
        };
        let mut doc = Document::new("model_1", "m");
        let reaction = doc.create_reaction("reaction_5".into(), "r".into());
        assembler.annotate_reaction(reaction, &record);
        assembler.annotate_reaction(reaction, &record);
        assert_eq!(reaction.annotation.resources(Qualifier::Is).count(), 2);
        assert_eq!(reaction.annotation.resources(Qualifier::IsDescribedBy).count(), 1);
        assert_eq!(reaction.annotation.resources(Qualifier::OccursIn).count(), 1);
        assert_eq!(reaction.notes, vec!["Some text.".to_string()]);
    }
}
