//! Access to the pathway database. The converter only sees [`PathwaySource`];
//! [`SnapshotSource`] serves records from a JSON database dump.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Deserialize;

use crate::diagram::Diagram;
use crate::error::{ConvertError, Result};
use crate::model::{
    disease_uri, ec_uri, go_uri, pubmed_uri, reactome_uri, ChildRef, Compartment,
    CrossReferences, DbId, Entity, EntityGraph, EntityKind, EventKind, InstanceEdit,
    Participant, Person, Provenance, ReactionRecord, ReferenceDatabase, ReferenceEntity,
    TargetRecord,
};
use crate::resolver::resolve_url;

pub trait PathwaySource: Sync {
    /// Resolve a numeric database id or a stable id to a reaction or pathway.
    fn fetch_target(&self, id: &str) -> Result<TargetRecord>;

    /// The target itself for a reaction, every contained reaction for a pathway.
    fn fetch_reaction_set(&self, target: DbId) -> Result<Vec<ReactionRecord>>;

    /// All participants of the target's reactions and everything they contain.
    fn fetch_participants(&self, target: DbId) -> Result<EntityGraph>;

    fn fetch_diagram(&self, target: DbId) -> Result<Option<Arc<Diagram>>>;

    fn pathways_for_species(&self, species: &str) -> Result<Vec<TargetRecord>>;

    fn clear_cache(&self) {}
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    #[serde(default)]
    reference_databases: Vec<RawReferenceDatabase>,
    #[serde(default)]
    reference_entities: Vec<RawReferenceEntity>,
    #[serde(default)]
    compartments: Vec<RawCompartment>,
    #[serde(default)]
    persons: Vec<RawPerson>,
    #[serde(default)]
    instance_edits: Vec<RawInstanceEdit>,
    #[serde(default)]
    physical_entities: Vec<RawEntity>,
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawReferenceDatabase {
    db_id: DbId,
    name: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawReferenceEntity {
    db_id: DbId,
    identifier: String,
    reference_database: Option<DbId>,
}

#[derive(Debug, Deserialize)]
struct RawCompartment {
    db_id: DbId,
    name: String,
    accession: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPerson {
    db_id: DbId,
    surname: String,
    first_name: Option<String>,
    email: Option<String>,
    affiliation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawInstanceEdit {
    db_id: DbId,
    date_time: String,
    #[serde(default)]
    authors: Vec<DbId>,
}

/// Either a bare id (stoichiometry 1) or an explicit weighted reference.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(untagged)]
enum RawChild {
    Id(DbId),
    Weighted { entity: DbId, stoichiometry: u32 },
}

impl RawChild {
    fn to_child(self) -> ChildRef {
        match self {
            RawChild::Id(entity) => ChildRef {
                entity,
                stoichiometry: 1,
            },
            RawChild::Weighted {
                entity,
                stoichiometry,
            } => ChildRef {
                entity,
                stoichiometry,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    db_id: DbId,
    stable_id: Option<String>,
    name: String,
    kind: EntityKind,
    #[serde(default)]
    compartments: Vec<DbId>,
    #[serde(default)]
    components: Vec<RawChild>,
    #[serde(default)]
    members: Vec<RawChild>,
    #[serde(default)]
    candidates: Vec<RawChild>,
    #[serde(default)]
    repeated_units: Vec<RawChild>,
    reference_entity: Option<DbId>,
    #[serde(default)]
    inferred_from: Vec<DbId>,
    created: Option<DbId>,
    #[serde(default)]
    modified: Vec<DbId>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    db_id: DbId,
    stable_id: Option<String>,
    name: String,
    kind: EventKind,
    species: Option<String>,
    #[serde(default)]
    inputs: Vec<RawChild>,
    #[serde(default)]
    outputs: Vec<RawChild>,
    #[serde(default)]
    catalysts: Vec<DbId>,
    #[serde(default)]
    positive_regulators: Vec<DbId>,
    #[serde(default)]
    negative_regulators: Vec<DbId>,
    #[serde(default)]
    has_event: Vec<DbId>,
    #[serde(default)]
    literature: Vec<String>,
    go_biological_process: Option<String>,
    #[serde(default)]
    ec_numbers: Vec<String>,
    #[serde(default)]
    cross_references: Vec<DbId>,
    #[serde(default)]
    disease: Vec<String>,
    #[serde(default)]
    inferred_from: Vec<DbId>,
    #[serde(default)]
    summation: Vec<String>,
    created: Option<DbId>,
    #[serde(default)]
    modified: Vec<DbId>,
    diagram: Option<String>,
}

pub struct SnapshotSource {
    reference_databases: HashMap<DbId, RawReferenceDatabase>,
    reference_entities: HashMap<DbId, RawReferenceEntity>,
    compartments: HashMap<DbId, RawCompartment>,
    persons: HashMap<DbId, RawPerson>,
    instance_edits: HashMap<DbId, RawInstanceEdit>,
    entities: HashMap<DbId, RawEntity>,
    events: HashMap<DbId, RawEvent>,
    stable_ids: HashMap<String, DbId>,
    diagram_cache: Mutex<HashMap<DbId, Option<Arc<Diagram>>>>,
}

impl SnapshotSource {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|source| ConvertError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(Self::from_snapshot(serde_json::from_str(json)?))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(Self::from_snapshot(serde_json::from_value(value)?))
    }

    fn from_snapshot(snapshot: Snapshot) -> Self {
        fn index<T>(items: Vec<T>, key: impl Fn(&T) -> DbId) -> HashMap<DbId, T> {
            items.into_iter().map(|item| (key(&item), item)).collect()
        }

        let mut stable_ids = HashMap::new();
        for event in &snapshot.events {
            if let Some(stable_id) = &event.stable_id {
                stable_ids.insert(stable_id.clone(), event.db_id);
            }
        }
        for entity in &snapshot.physical_entities {
            if let Some(stable_id) = &entity.stable_id {
                stable_ids.insert(stable_id.clone(), entity.db_id);
            }
        }

        let source = Self {
            reference_databases: index(snapshot.reference_databases, |r| r.db_id),
            reference_entities: index(snapshot.reference_entities, |r| r.db_id),
            compartments: index(snapshot.compartments, |c| c.db_id),
            persons: index(snapshot.persons, |p| p.db_id),
            instance_edits: index(snapshot.instance_edits, |e| e.db_id),
            entities: index(snapshot.physical_entities, |e| e.db_id),
            events: index(snapshot.events, |e| e.db_id),
            stable_ids,
            diagram_cache: Mutex::new(HashMap::new()),
        };
        tracing::debug!(
            entities = source.entities.len(),
            events = source.events.len(),
            "database snapshot loaded"
        );
        source
    }

    fn event(&self, id: DbId) -> Result<&RawEvent> {
        self.events
            .get(&id)
            .ok_or_else(|| ConvertError::integrity(id, "event missing from database"))
    }

    fn cached_diagram(&self, target: DbId) -> Option<Option<Arc<Diagram>>> {
        self.diagram_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&target)
            .cloned()
    }

    fn target_record(&self, event: &RawEvent) -> Result<TargetRecord> {
        Ok(TargetRecord {
            db_id: event.db_id,
            stable_id: event.stable_id.clone(),
            name: event.name.clone(),
            kind: event.kind,
            species: event.species.clone(),
            cross_references: self.cross_references(event)?,
            summation: event.summation.clone(),
            provenance: self.provenance(event.created, &event.modified),
        })
    }

    fn reaction_record(&self, event: &RawEvent) -> Result<ReactionRecord> {
        if !event.kind.is_reaction() {
            return Err(ConvertError::integrity(
                event.db_id,
                format!("expected a reaction, found {:?}", event.kind),
            ));
        }
        Ok(ReactionRecord {
            db_id: event.db_id,
            stable_id: event.stable_id.clone(),
            name: event.name.clone(),
            kind: event.kind,
            inputs: aggregate(event.inputs.iter().map(|c| c.to_child())),
            outputs: aggregate(event.outputs.iter().map(|c| c.to_child())),
            catalysts: modifiers(&event.catalysts),
            positive_regulators: modifiers(&event.positive_regulators),
            negative_regulators: modifiers(&event.negative_regulators),
            cross_references: self.cross_references(event)?,
            summation: event.summation.clone(),
            provenance: self.provenance(event.created, &event.modified),
        })
    }

    fn cross_references(&self, event: &RawEvent) -> Result<CrossReferences> {
        let mut refs = CrossReferences {
            literature: event.literature.iter().map(|id| pubmed_uri(id)).collect(),
            go: event
                .go_biological_process
                .iter()
                .map(|acc| go_uri(acc))
                .collect(),
            ec: event.ec_numbers.iter().map(|ec| ec_uri(ec)).collect(),
            disease: event.disease.iter().map(|doid| disease_uri(doid)).collect(),
            ..CrossReferences::default()
        };
        for id in &event.cross_references {
            let (_, url) = resolve_url(&self.reference_entity(*id)?)?;
            refs.other.push(url);
        }
        for id in &event.inferred_from {
            match self.events.get(id).and_then(|e| e.stable_id.as_deref()) {
                Some(stable_id) => refs.homologs.push(reactome_uri(stable_id)),
                None => tracing::warn!(event = event.db_id, source = id, "inferred-from event unknown"),
            }
        }
        Ok(refs)
    }

    fn reference_entity(&self, id: DbId) -> Result<ReferenceEntity> {
        let raw = self
            .reference_entities
            .get(&id)
            .ok_or_else(|| ConvertError::integrity(id, "reference entity missing from database"))?;
        let database = raw
            .reference_database
            .and_then(|db| self.reference_databases.get(&db))
            .map(|db| ReferenceDatabase {
                db_id: db.db_id,
                name: db.name.clone(),
                url_template: db.url.clone(),
            });
        Ok(ReferenceEntity {
            db_id: raw.db_id,
            identifier: raw.identifier.clone(),
            database,
        })
    }

    fn provenance(&self, created: Option<DbId>, modified: &[DbId]) -> Provenance {
        Provenance {
            created: created.and_then(|id| self.instance_edit(id)),
            modified: modified
                .iter()
                .filter_map(|id| self.instance_edit(*id))
                .collect(),
        }
    }

    fn instance_edit(&self, id: DbId) -> Option<InstanceEdit> {
        let Some(raw) = self.instance_edits.get(&id) else {
            tracing::warn!(edit = id, "instance edit missing from database");
            return None;
        };
        let authors = raw
            .authors
            .iter()
            .filter_map(|author| self.persons.get(author))
            .map(|person| Person {
                db_id: person.db_id,
                surname: person.surname.clone(),
                first_name: person.first_name.clone(),
                email: person.email.clone(),
                organisation: person.affiliation.clone(),
            })
            .collect();
        Some(InstanceEdit {
            date_time: raw.date_time.clone(),
            authors,
        })
    }

    fn entity(&self, id: DbId) -> Result<Entity> {
        let raw = self
            .entities
            .get(&id)
            .ok_or_else(|| ConvertError::integrity(id, "physical entity missing from database"))?;
        let compartments = raw
            .compartments
            .iter()
            .map(|cid| {
                self.compartments
                    .get(cid)
                    .map(|c| Compartment {
                        db_id: c.db_id,
                        name: c.name.clone(),
                        accession: c.accession.clone(),
                    })
                    .ok_or_else(|| ConvertError::integrity(*cid, "compartment missing from database"))
            })
            .collect::<Result<Vec<_>>>()?;
        let reference = raw
            .reference_entity
            .map(|rid| self.reference_entity(rid))
            .transpose()?;
        let inferred_from = raw
            .inferred_from
            .iter()
            .filter_map(|source| {
                let stable_id = self.entities.get(source).and_then(|e| e.stable_id.clone());
                if stable_id.is_none() {
                    tracing::warn!(entity = id, source, "inferred-from entity unknown");
                }
                stable_id
            })
            .collect();
        let children = |list: &[RawChild]| list.iter().map(|c| c.to_child()).collect::<Vec<_>>();

        Ok(Entity {
            db_id: raw.db_id,
            stable_id: raw.stable_id.clone(),
            name: raw.name.clone(),
            kind: raw.kind,
            compartments,
            components: children(&raw.components),
            members: children(&raw.members),
            candidates: children(&raw.candidates),
            repeated_units: children(&raw.repeated_units),
            reference,
            inferred_from,
            provenance: self.provenance(raw.created, &raw.modified),
        })
    }

    /// Reactions reachable from `root` through `has_event`, first-seen order.
    fn collect_reactions(&self, root: DbId) -> Result<Vec<DbId>> {
        let mut seen = HashSet::new();
        let mut reactions = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let event = self.event(id)?;
            if event.kind.is_reaction() {
                reactions.push(id);
            }
            stack.extend(event.has_event.iter().rev().copied());
        }
        Ok(reactions)
    }
}

impl PathwaySource for SnapshotSource {
    fn fetch_target(&self, id: &str) -> Result<TargetRecord> {
        let db_id = id
            .parse::<DbId>()
            .ok()
            .or_else(|| self.stable_ids.get(id).copied())
            .filter(|db_id| self.events.contains_key(db_id))
            .ok_or_else(|| ConvertError::UnknownTarget { id: id.to_string() })?;
        self.target_record(self.event(db_id)?)
    }

    fn fetch_reaction_set(&self, target: DbId) -> Result<Vec<ReactionRecord>> {
        self.collect_reactions(target)?
            .into_iter()
            .map(|id| self.reaction_record(self.event(id)?))
            .collect()
    }

    fn fetch_participants(&self, target: DbId) -> Result<EntityGraph> {
        let mut graph = EntityGraph::new();
        let mut stack: Vec<DbId> = Vec::new();
        for id in self.collect_reactions(target)? {
            let event = self.event(id)?;
            stack.extend(event.inputs.iter().map(|c| c.to_child().entity));
            stack.extend(event.outputs.iter().map(|c| c.to_child().entity));
            stack.extend(event.catalysts.iter().copied());
            stack.extend(event.positive_regulators.iter().copied());
            stack.extend(event.negative_regulators.iter().copied());
        }
        while let Some(id) = stack.pop() {
            if graph.contains(id) {
                continue;
            }
            let entity = self.entity(id)?;
            stack.extend(entity.children().map(|child| child.entity));
            graph.insert(entity);
        }
        Ok(graph)
    }

    fn fetch_diagram(&self, target: DbId) -> Result<Option<Arc<Diagram>>> {
        if let Some(cached) = self.cached_diagram(target) {
            return Ok(cached);
        }
        // Parsed outside the lock; the first inserted result wins.
        let diagram = match &self.event(target)?.diagram {
            Some(xml) => Some(Arc::new(Diagram::parse(&target.to_string(), xml)?)),
            None => None,
        };
        let mut cache = self
            .diagram_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(cache.entry(target).or_insert(diagram).clone())
    }

    fn pathways_for_species(&self, species: &str) -> Result<Vec<TargetRecord>> {
        let in_species = |event: &RawEvent| {
            event.kind == EventKind::Pathway && event.species.as_deref() == Some(species)
        };
        let contained: HashSet<DbId> = self
            .events
            .values()
            .filter(|event| in_species(event))
            .flat_map(|event| event.has_event.iter().copied())
            .collect();
        let mut top_level: Vec<&RawEvent> = self
            .events
            .values()
            .filter(|event| in_species(event) && !contained.contains(&event.db_id))
            .collect();
        top_level.sort_by_key(|event| event.db_id);
        top_level
            .into_iter()
            .map(|event| self.target_record(event))
            .collect()
    }

    fn clear_cache(&self) {
        self.diagram_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Sum repeated references to the same entity, keeping first-seen order.
fn aggregate(children: impl Iterator<Item = ChildRef>) -> Vec<Participant> {
    let mut participants: Vec<Participant> = Vec::new();
    for child in children {
        match participants.iter_mut().find(|p| p.entity == child.entity) {
            Some(existing) => existing.stoichiometry += child.stoichiometry,
            None => participants.push(Participant {
                entity: child.entity,
                stoichiometry: child.stoichiometry,
            }),
        }
    }
    participants
}

fn modifiers(ids: &[DbId]) -> Vec<Participant> {
    let mut participants: Vec<Participant> = Vec::new();
    for id in ids {
        if participants.iter().all(|p| p.entity != *id) {
            participants.push(Participant {
                entity: *id,
                stoichiometry: 1,
            });
        }
    }
    participants
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> SnapshotSource {
        SnapshotSource::from_value(json!({
            "reference_databases": [
                {"db_id": 1, "name": "UniProt", "url": "https://www.uniprot.org/uniprot/###ID###"}
            ],
            "reference_entities": [
                {"db_id": 50, "identifier": "P12345", "reference_database": 1}
            ],
            "compartments": [{"db_id": 70, "name": "cytosol", "accession": "0005829"}],
            "physical_entities": [
                {"db_id": 10, "stable_id": "R-HSA-10", "name": "A", "kind": "EntityWithAccessionedSequence",
                 "compartments": [70], "reference_entity": 50},
                {"db_id": 11, "name": "AA", "kind": "Complex", "compartments": [70],
                 "components": [10, {"entity": 10, "stoichiometry": 2}]}
            ],
            "events": [
                {"db_id": 100, "stable_id": "R-HSA-100", "name": "top", "kind": "Pathway",
                 "species": "Homo sapiens", "has_event": [101, 102]},
                {"db_id": 101, "stable_id": "R-HSA-101", "name": "sub", "kind": "Pathway",
                 "species": "Homo sapiens", "has_event": [200]},
                {"db_id": 102, "name": "dimerise", "kind": "Reaction", "species": "Homo sapiens",
                 "inputs": [10, 10], "outputs": [11], "catalysts": [11, 11], "literature": ["123"]},
                {"db_id": 200, "name": "bind", "kind": "Reaction", "inputs": [10], "outputs": [11]}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn resolves_targets_by_either_id() {
        let source = snapshot();
        assert_eq!(source.fetch_target("R-HSA-100").unwrap().db_id, 100);
        assert_eq!(source.fetch_target("102").unwrap().name, "dimerise");
        assert!(matches!(
            source.fetch_target("R-HSA-10"),
            Err(ConvertError::UnknownTarget { .. })
        ));
    }

    #[test]
    fn pathway_reaction_set_is_recursive() {
        let source = snapshot();
        let ids: Vec<_> = source
            .fetch_reaction_set(100)
            .unwrap()
            .iter()
            .map(|r| r.db_id)
            .collect();
        assert_eq!(ids, vec![200, 102]);
    }

    #[test]
    fn repeated_participants_are_aggregated() {
        let source = snapshot();
        let reactions = source.fetch_reaction_set(102).unwrap();
        assert_eq!(
            reactions[0].inputs,
            vec![Participant {
                entity: 10,
                stoichiometry: 2
            }]
        );
        assert_eq!(reactions[0].catalysts.len(), 1);
        assert_eq!(
            reactions[0].cross_references.literature,
            vec!["https://identifiers.org/pubmed/123".to_string()]
        );
    }

    #[test]
    fn participants_include_descendants() {
        let source = snapshot();
        let graph = source.fetch_participants(200).unwrap();
        assert_eq!(graph.len(), 2);
        let complex = graph.get(11).unwrap();
        assert_eq!(complex.components[1].stoichiometry, 2);
        assert_eq!(complex.compartments[0].name, "cytosol");
    }

    #[test]
    fn top_level_pathways_only() {
        let source = snapshot();
        let pathways = source.pathways_for_species("Homo sapiens").unwrap();
        assert_eq!(pathways.len(), 1);
        assert_eq!(pathways[0].db_id, 100);
    }

    #[test]
    fn concurrent_diagram_fetches_share_one_parse_result() {
        let source = SnapshotSource::from_value(json!({
            "events": [{"db_id": 100, "name": "p", "kind": "Pathway",
                        "diagram": crate::diagram::tests::SAMPLE}]
        }))
        .unwrap();
        let fetched: Vec<Arc<Diagram>> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| source.fetch_diagram(100).unwrap().unwrap()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });
        let cached = source.fetch_diagram(100).unwrap().unwrap();
        assert!(fetched.iter().all(|d| Arc::ptr_eq(d, &cached)));

        source.clear_cache();
        let reparsed = source.fetch_diagram(100).unwrap().unwrap();
        assert!(!Arc::ptr_eq(&reparsed, &cached));
        assert_eq!(*reparsed, *cached);
    }

    #[test]
    fn missing_entity_is_an_integrity_error() {
        let source = SnapshotSource::from_value(json!({
            "events": [{"db_id": 1, "name": "r", "kind": "Reaction", "inputs": [99]}]
        }))
        .unwrap();
        assert!(matches!(
            source.fetch_participants(1),
            Err(ConvertError::DataIntegrity { .. })
        ));
    }
}
