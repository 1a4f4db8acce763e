//! Systems Biology Ontology terms for entity kinds, event kinds and roles.

use crate::model::{EntityKind, EventKind, Role};

/// material entity of unspecified nature
pub const UNKNOWN_ENTITY_TERM: u32 = 285;
/// process
pub const UNKNOWN_EVENT_TERM: u32 = 375;

const ENTITY_TERMS: &[(EntityKind, u32)] = &[
    (EntityKind::SimpleEntity, 247),
    (EntityKind::ChemicalDrug, 247),
    (EntityKind::EntityWithAccessionedSequence, 252),
    (EntityKind::ProteinDrug, 252),
    (EntityKind::GenomeEncodedEntity, 354),
    (EntityKind::RnaDrug, 278),
    (EntityKind::Complex, 253),
    (EntityKind::Polymer, 248),
    (EntityKind::DefinedSet, 240),
    (EntityKind::CandidateSet, 240),
    (EntityKind::OpenSet, 240),
];

const EVENT_TERMS: &[(EventKind, u32)] = &[
    (EventKind::Reaction, 176),
    (EventKind::BlackBoxEvent, 397),
    (EventKind::Polymerisation, 177),
    (EventKind::Depolymerisation, 180),
];

/// Term for a species of the given kind, falling back to [`UNKNOWN_ENTITY_TERM`].
pub fn entity_term(kind: EntityKind) -> u32 {
    match ENTITY_TERMS.iter().find(|(k, _)| *k == kind) {
        Some((_, term)) => *term,
        None => {
            tracing::warn!(kind = kind.as_str(), "no SBO term mapped for entity kind");
            UNKNOWN_ENTITY_TERM
        }
    }
}

pub fn event_term(kind: EventKind) -> u32 {
    match EVENT_TERMS.iter().find(|(k, _)| *k == kind) {
        Some((_, term)) => *term,
        None => {
            tracing::warn!(kind = ?kind, "no SBO term mapped for event kind");
            UNKNOWN_EVENT_TERM
        }
    }
}

pub fn role_term(role: Role) -> u32 {
    match role {
        Role::Input => 10,
        Role::Output => 11,
        Role::Catalyst => 13,
        Role::PositiveRegulator => 459,
        Role::NegativeRegulator => 20,
    }
}

/// `SBO:0000247` style rendering.
pub fn format_term(term: u32) -> String {
    format!("SBO:{term:07}")
}
