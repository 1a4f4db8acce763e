//! Read-only records handed to the converter by a [`PathwaySource`](crate::source::PathwaySource).

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{ConvertError, Result};

pub type DbId = u64;

pub const ID_PLACEHOLDER: &str = "###ID###";

const IDENTIFIERS_ORG: &str = "https://identifiers.org";

pub fn reactome_uri(stable_id: &str) -> String {
    format!("{IDENTIFIERS_ORG}/reactome/{stable_id}")
}

pub fn pubmed_uri(pubmed_id: &str) -> String {
    format!("{IDENTIFIERS_ORG}/pubmed/{pubmed_id}")
}

pub fn go_uri(accession: &str) -> String {
    format!("{IDENTIFIERS_ORG}/GO:{}", accession.trim_start_matches("GO:"))
}

pub fn ec_uri(ec_number: &str) -> String {
    format!("{IDENTIFIERS_ORG}/ec-code/{ec_number}")
}

pub fn disease_uri(doid: &str) -> String {
    format!("{IDENTIFIERS_ORG}/DOID:{}", doid.trim_start_matches("DOID:"))
}

/// Structural kind of a physical entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
pub enum EntityKind {
    SimpleEntity,
    EntityWithAccessionedSequence,
    GenomeEncodedEntity,
    Complex,
    DefinedSet,
    CandidateSet,
    OpenSet,
    Polymer,
    ChemicalDrug,
    ProteinDrug,
    #[serde(rename = "RNADrug")]
    RnaDrug,
    OtherEntity,
}

impl EntityKind {
    pub fn is_composite(self) -> bool {
        matches!(
            self,
            EntityKind::Complex
                | EntityKind::DefinedSet
                | EntityKind::CandidateSet
                | EntityKind::OpenSet
                | EntityKind::Polymer
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::SimpleEntity => "SimpleEntity",
            EntityKind::EntityWithAccessionedSequence => "EntityWithAccessionedSequence",
            EntityKind::GenomeEncodedEntity => "GenomeEncodedEntity",
            EntityKind::Complex => "Complex",
            EntityKind::DefinedSet => "DefinedSet",
            EntityKind::CandidateSet => "CandidateSet",
            EntityKind::OpenSet => "OpenSet",
            EntityKind::Polymer => "Polymer",
            EntityKind::ChemicalDrug => "ChemicalDrug",
            EntityKind::ProteinDrug => "ProteinDrug",
            EntityKind::RnaDrug => "RNADrug",
            EntityKind::OtherEntity => "OtherEntity",
        }
    }
}

/// Kind of an event record; pathways are containers, the rest are reactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
pub enum EventKind {
    Pathway,
    Reaction,
    BlackBoxEvent,
    Polymerisation,
    Depolymerisation,
    FailedReaction,
}

impl EventKind {
    pub fn is_reaction(self) -> bool {
        !matches!(self, EventKind::Pathway)
    }
}

/// Participant role, in the order participant edges are emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Input,
    Output,
    Catalyst,
    PositiveRegulator,
    NegativeRegulator,
}

impl Role {
    pub const ORDER: [Role; 5] = [
        Role::Input,
        Role::Output,
        Role::Catalyst,
        Role::PositiveRegulator,
        Role::NegativeRegulator,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Input => "input",
            Role::Output => "output",
            Role::Catalyst => "catalyst",
            Role::PositiveRegulator => "positiveregulator",
            Role::NegativeRegulator => "negativeregulator",
        }
    }

    /// Inputs and outputs carry stoichiometry; everything else is a modifier.
    pub fn is_stoichiometric(self) -> bool {
        matches!(self, Role::Input | Role::Output)
    }

    pub fn id_prefix(self) -> &'static str {
        if self.is_stoichiometric() {
            "speciesreference"
        } else {
            "modifierspeciesreference"
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildRef {
    pub entity: DbId,
    pub stoichiometry: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceDatabase {
    pub db_id: DbId,
    pub name: String,
    pub url_template: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceEntity {
    pub db_id: DbId,
    pub identifier: String,
    pub database: Option<ReferenceDatabase>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Compartment {
    pub db_id: DbId,
    pub name: String,
    /// GO cellular component accession.
    pub accession: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Person {
    pub db_id: DbId,
    pub surname: String,
    pub first_name: Option<String>,
    pub email: Option<String>,
    pub organisation: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InstanceEdit {
    pub date_time: String,
    pub authors: Vec<Person>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Provenance {
    pub created: Option<InstanceEdit>,
    pub modified: Vec<InstanceEdit>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub db_id: DbId,
    pub stable_id: Option<String>,
    pub name: String,
    pub kind: EntityKind,
    pub compartments: Vec<Compartment>,
    pub components: Vec<ChildRef>,
    pub members: Vec<ChildRef>,
    pub candidates: Vec<ChildRef>,
    pub repeated_units: Vec<ChildRef>,
    pub reference: Option<ReferenceEntity>,
    /// Stable ids of records in other species this entity was inferred from.
    pub inferred_from: Vec<String>,
    pub provenance: Provenance,
}

impl Entity {
    pub fn has_structure(&self) -> bool {
        !(self.components.is_empty()
            && self.members.is_empty()
            && self.candidates.is_empty()
            && self.repeated_units.is_empty())
    }

    /// Children across every composite-structure edge kind.
    pub fn children(&self) -> impl Iterator<Item = &ChildRef> {
        self.components
            .iter()
            .chain(self.members.iter())
            .chain(self.candidates.iter())
            .chain(self.repeated_units.iter())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Participant {
    pub entity: DbId,
    pub stoichiometry: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CrossReferences {
    pub literature: Vec<String>,
    pub go: Vec<String>,
    pub ec: Vec<String>,
    pub other: Vec<String>,
    pub disease: Vec<String>,
    pub homologs: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReactionRecord {
    pub db_id: DbId,
    pub stable_id: Option<String>,
    pub name: String,
    pub kind: EventKind,
    pub inputs: Vec<Participant>,
    pub outputs: Vec<Participant>,
    pub catalysts: Vec<Participant>,
    pub positive_regulators: Vec<Participant>,
    pub negative_regulators: Vec<Participant>,
    pub cross_references: CrossReferences,
    pub summation: Vec<String>,
    pub provenance: Provenance,
}

impl ReactionRecord {
    pub fn participants(&self, role: Role) -> &[Participant] {
        match role {
            Role::Input => &self.inputs,
            Role::Output => &self.outputs,
            Role::Catalyst => &self.catalysts,
            Role::PositiveRegulator => &self.positive_regulators,
            Role::NegativeRegulator => &self.negative_regulators,
        }
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = DbId> + '_ {
        Role::ORDER
            .into_iter()
            .flat_map(move |role| self.participants(role).iter().map(|p| p.entity))
    }
}

/// The record a conversion was requested for: one reaction or a pathway.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetRecord {
    pub db_id: DbId,
    pub stable_id: Option<String>,
    pub name: String,
    pub kind: EventKind,
    pub species: Option<String>,
    pub cross_references: CrossReferences,
    pub summation: Vec<String>,
    pub provenance: Provenance,
}

impl TargetRecord {
    /// File-name friendly identifier.
    pub fn file_stem(&self) -> String {
        self.stable_id
            .clone()
            .unwrap_or_else(|| self.db_id.to_string())
    }
}

/// Participants of a target plus every entity reachable from them.
#[derive(Clone, Debug, Default)]
pub struct EntityGraph {
    entities: HashMap<DbId, Entity>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: Entity) {
        self.entities.insert(entity.db_id, entity);
    }

    pub fn contains(&self, id: DbId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn get(&self, id: DbId) -> Result<&Entity> {
        self.entities
            .get(&id)
            .ok_or_else(|| ConvertError::integrity(id, "entity missing from participant graph"))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl FromIterator<Entity> for EntityGraph {
    fn from_iter<T: IntoIterator<Item = Entity>>(iter: T) -> Self {
        let mut graph = EntityGraph::new();
        for entity in iter {
            graph.insert(entity);
        }
        graph
    }
}
