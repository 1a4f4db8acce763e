//! One target (reaction or pathway) to one SBML document.

use std::sync::Arc;

use crate::annotation::AnnotationAssembler;
use crate::diagram::Diagram;
use crate::document::Document;
use crate::error::Result;
use crate::layout::LayoutGeometryEngine;
use crate::model::{DbId, EntityGraph, EventKind, ReactionRecord, Role, TargetRecord};
use crate::registry::IdentityRegistry;
use crate::sbo;
use crate::source::PathwaySource;
use crate::tighten::{PangoMeasure, TextMeasure};

pub fn compartment_id(db_id: DbId) -> String {
    format!("compartment_{db_id}")
}

pub fn species_id(db_id: DbId) -> String {
    format!("species_{db_id}")
}

pub fn reaction_id(db_id: DbId) -> String {
    format!("reaction_{db_id}")
}

pub fn model_id(db_id: DbId) -> String {
    format!("model_{db_id}")
}

/// Id of the edge linking `entity` to `reaction` in `role`.
pub fn participant_edge_id(role: Role, reaction: DbId, entity: DbId) -> String {
    format!("{}_{reaction}_{}_{entity}", role.id_prefix(), role.as_str())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Overlay diagram geometry when the target has a stored diagram.
    pub layout: bool,
}

pub struct ModelBuilder<'s, S: PathwaySource + ?Sized> {
    source: &'s S,
    options: ConvertOptions,
    measure: Option<Box<dyn TextMeasure + 's>>,
}

impl<'s, S: PathwaySource + ?Sized> ModelBuilder<'s, S> {
    pub fn new(source: &'s S, options: ConvertOptions) -> Self {
        Self {
            source,
            options,
            measure: None,
        }
    }

    /// Measure labels with `measure` instead of Pango during the layout pass.
    pub fn with_measure(mut self, measure: impl TextMeasure + 's) -> Self {
        self.measure = Some(Box::new(measure));
        self
    }

    pub fn convert(&self, target_id: &str) -> Result<Document> {
        let target = self.source.fetch_target(target_id)?;
        self.convert_target(&target)
    }

    pub fn convert_target(&self, target: &TargetRecord) -> Result<Document> {
        let span = tracing::info_span!("convert", target = %target.file_stem());
        let _enter = span.enter();

        // Fetched once; used both to narrow the reaction set and for layout.
        let diagram = if self.options.layout && target.kind == EventKind::Pathway {
            self.source.fetch_diagram(target.db_id)?
        } else {
            None
        };
        let reactions = self.reaction_set(target, diagram.as_deref())?;
        let graph = self.source.fetch_participants(target.db_id)?;

        let mut registry = IdentityRegistry::new();
        let mut doc = Document::new(model_id(target.db_id), target.name.clone());
        let assembler = AnnotationAssembler::new(&graph);
        assembler.annotate_model(&mut doc.model, target);

        self.emit_species(&mut doc, &mut registry, &graph, &assembler, &reactions)?;
        for reaction in &reactions {
            self.emit_reaction(&mut doc, &mut registry, &assembler, reaction);
        }

        if let Some(diagram) = diagram {
            self.overlay_layout(&mut doc, &mut registry, &diagram)?;
        }

        tracing::info!(
            species = doc.model.species.len(),
            reactions = doc.model.reactions.len(),
            participants = doc.participant_count(),
            "converted"
        );
        Ok(doc)
    }

    fn reaction_set(
        &self,
        target: &TargetRecord,
        diagram: Option<&Diagram>,
    ) -> Result<Vec<ReactionRecord>> {
        let mut reactions = self.source.fetch_reaction_set(target.db_id)?;
        if let Some(diagram) = diagram.filter(|d| !d.reactions.is_empty()) {
            let drawn: Vec<DbId> = diagram.reaction_ids().collect();
            let before = reactions.len();
            reactions.retain(|reaction| drawn.contains(&reaction.db_id));
            tracing::debug!(before, after = reactions.len(), "reaction set narrowed to diagram");
        }
        Ok(reactions)
    }

    /// Compartments and species for every distinct participant, in first-seen order.
    fn emit_species(
        &self,
        doc: &mut Document,
        registry: &mut IdentityRegistry,
        graph: &EntityGraph,
        assembler: &AnnotationAssembler<'_>,
        reactions: &[ReactionRecord],
    ) -> Result<()> {
        for entity_id in reactions.iter().flat_map(ReactionRecord::entity_ids) {
            let sid = species_id(entity_id);
            if !registry.try_claim(&sid) {
                continue;
            }
            let entity = graph.get(entity_id)?;

            // Only the first compartment is kept for multi-compartment entities.
            let compartment = match entity.compartments.first() {
                Some(record) => {
                    let cid = compartment_id(record.db_id);
                    if registry.try_claim(&cid) {
                        let compartment = doc.create_compartment(cid.clone(), record.name.clone());
                        assembler.annotate_compartment(compartment, record);
                    }
                    Some(cid)
                }
                None => {
                    tracing::warn!(entity = entity_id, "entity has no compartment");
                    None
                }
            };

            let species = doc.create_species(sid, entity.name.clone());
            species.compartment = compartment;
            species.sbo_term = Some(sbo::entity_term(entity.kind));
            assembler.annotate_species(species, entity)?;
        }
        Ok(())
    }

    fn emit_reaction(
        &self,
        doc: &mut Document,
        registry: &mut IdentityRegistry,
        assembler: &AnnotationAssembler<'_>,
        record: &ReactionRecord,
    ) {
        let rid = reaction_id(record.db_id);
        if !registry.try_claim(&rid) {
            return;
        }
        let reaction = doc.create_reaction(rid, record.name.clone());
        reaction.sbo_term = Some(sbo::event_term(record.kind));
        for role in Role::ORDER {
            for participant in record.participants(role) {
                let edge_id = participant_edge_id(role, record.db_id, participant.entity);
                if !registry.try_claim(&edge_id) {
                    continue;
                }
                let stoichiometry = if role.is_stoichiometric() {
                    f64::from(participant.stoichiometry)
                } else {
                    0.0
                };
                reaction.create_participant(
                    edge_id,
                    species_id(participant.entity),
                    role,
                    stoichiometry,
                    sbo::role_term(role),
                );
            }
        }
        assembler.annotate_reaction(reaction, record);
    }

    fn overlay_layout(
        &self,
        doc: &mut Document,
        registry: &mut IdentityRegistry,
        diagram: &Arc<Diagram>,
    ) -> Result<()> {
        let pango;
        let measure: &dyn TextMeasure = match &self.measure {
            Some(measure) => measure.as_ref(),
            None => {
                pango = PangoMeasure::new()?;
                &pango
            }
        };
        LayoutGeometryEngine::new(measure).apply(doc, registry, diagram);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_ids_are_deterministic() {
        assert_eq!(
            participant_edge_id(Role::Input, 12, 34),
            "speciesreference_12_input_34"
        );
        assert_eq!(
            participant_edge_id(Role::NegativeRegulator, 12, 34),
            "modifierspeciesreference_12_negativeregulator_34"
        );
        assert_eq!(
            participant_edge_id(Role::Catalyst, 1, 2),
            participant_edge_id(Role::Catalyst, 1, 2)
        );
        assert_ne!(
            participant_edge_id(Role::Input, 1, 2),
            participant_edge_id(Role::Output, 1, 2)
        );
    }
}
