//! Reconstruction of layout glyphs and curves from a stored diagram.
//!
//! Runs after the structural pass and only decorates objects that already
//! exist in the document. A reaction whose geometry cannot be repaired loses
//! its glyph; its structural output is untouched.

use crate::builder::{compartment_id, participant_edge_id, reaction_id, species_id};
use crate::diagram::{BBox, Branch, Diagram, NodeKind, Point, ReactionNode};
use crate::document::{Curve, Document, Layout, SpeciesReferenceGlyph};
use crate::error::{ConvertError, Result};
use crate::model::Role;
use crate::registry::IdentityRegistry;
use crate::tighten::{tighten, TextMeasure, TightenSettings};

/// Offset of a synthesized branch point from its hub, in both axes.
pub const BRANCH_SHIFT: f64 = 0.5;

pub struct LayoutGeometryEngine<'m> {
    measure: &'m dyn TextMeasure,
}

impl<'m> LayoutGeometryEngine<'m> {
    pub fn new(measure: &'m dyn TextMeasure) -> Self {
        Self { measure }
    }

    /// Tighten a copy of `diagram` and overlay its geometry on `doc`.
    pub fn apply(&self, doc: &mut Document, registry: &mut IdentityRegistry, diagram: &Diagram) {
        if diagram.is_empty() {
            tracing::debug!("empty diagram, no layout");
            return;
        }
        let mut diagram = diagram.clone();
        tighten(&mut diagram, &TightenSettings::default(), self.measure);
        tighten(&mut diagram, &TightenSettings::tight(), self.measure);

        let bounds = diagram.bounds();
        let mut layout = Layout::new(
            format!("layout_{}", doc.model.id),
            bounds.max_x.max(0.0),
            bounds.max_y.max(0.0),
        );

        for node in &diagram.nodes {
            let (object_id, glyph_id) = match node.kind {
                NodeKind::Compartment => (
                    compartment_id(node.reactome_id),
                    format!("compartmentglyph_{}", node.id),
                ),
                NodeKind::Entity => (
                    species_id(node.reactome_id),
                    format!("speciesglyph_{}", node.id),
                ),
            };
            let known = match node.kind {
                NodeKind::Compartment => doc.compartment(&object_id).is_some(),
                NodeKind::Entity => doc.species(&object_id).is_some(),
            };
            if !known {
                tracing::debug!(node = %node.id, object = %object_id, "diagram node not in model");
                continue;
            }
            if !registry.try_claim(&glyph_id) {
                continue;
            }
            match node.kind {
                NodeKind::Compartment => {
                    layout.create_compartment_glyph(glyph_id.clone(), object_id.clone(), node.bounds)
                }
                NodeKind::Entity => {
                    layout.create_species_glyph(glyph_id.clone(), object_id.clone(), node.bounds)
                }
            }
            if let Some(text_bounds) = node.text_bounds {
                let text_id = format!("textglyph_{}", node.id);
                if registry.try_claim(&text_id) {
                    layout.create_text_glyph(text_id, glyph_id, object_id, text_bounds);
                }
            }
        }

        for reaction in &diagram.reactions {
            if let Err(err) = add_reaction_glyph(doc, registry, &diagram, reaction, &mut layout) {
                tracing::warn!(error = %err, "reaction glyph skipped");
            }
        }

        // Viewers auto-place compartments without glyphs; pin them instead.
        let anchor = if bounds.is_empty() {
            Point::new(0.0, 0.0)
        } else {
            bounds.bottom_center()
        };
        for compartment in &doc.model.compartments {
            if layout.has_compartment_glyph(&compartment.id) {
                continue;
            }
            let glyph_id = format!("compartmentglyph_{}", compartment.id);
            if registry.try_claim(&glyph_id) {
                let pin = BBox {
                    x: anchor.x,
                    y: anchor.y,
                    w: 1.0,
                    h: 1.0,
                };
                layout.create_compartment_glyph(glyph_id, compartment.id.clone(), pin);
                // Dimensions must cover the pins too.
                layout.width = layout.width.max(pin.x + pin.w);
                layout.height = layout.height.max(pin.y + pin.h);
            }
        }

        tracing::debug!(
            species_glyphs = layout.species_glyphs.len(),
            reaction_glyphs = layout.reaction_glyphs.len(),
            "layout built"
        );
        doc.set_layout(layout);
    }
}

fn add_reaction_glyph(
    doc: &Document,
    registry: &mut IdentityRegistry,
    diagram: &Diagram,
    node: &ReactionNode,
    layout: &mut Layout,
) -> Result<()> {
    let reaction_sid = reaction_id(node.reactome_id);
    let Some(reaction) = doc.reaction(&reaction_sid) else {
        tracing::debug!(reaction = %reaction_sid, "diagram reaction not in model");
        return Ok(());
    };
    let mut geometry = node.clone();
    normalize_reaction(&mut geometry)?;

    let glyph_id = format!("reactionglyph_{}", node.id);
    if !registry.try_claim(&glyph_id) {
        return Ok(());
    }
    let mut reference_glyphs = Vec::new();
    for role in Role::ORDER {
        let hub = hub(&geometry, role);
        for branch in geometry.branches(role) {
            let Some(participant) = diagram.node(&branch.node) else {
                tracing::debug!(reaction = %reaction_sid, node = %branch.node, "branch to unknown node");
                continue;
            };
            let edge_id = participant_edge_id(role, node.reactome_id, participant.reactome_id);
            let species_glyph = format!("speciesglyph_{}", participant.id);
            if reaction.participant(&edge_id).is_none() || !registry.is_claimed(&species_glyph) {
                tracing::debug!(edge = %edge_id, "branch without participant edge or glyph");
                continue;
            }
            let id = format!(
                "speciesreferenceglyph_{}_{}_{}",
                node.id,
                role.as_str(),
                participant.id
            );
            if !registry.try_claim(&id) {
                continue;
            }
            reference_glyphs.push(SpeciesReferenceGlyph {
                id,
                species_reference: edge_id,
                species_glyph,
                role,
                curve: Curve::from_points(&branch_curve(role, hub, branch)),
            });
        }
    }

    let glyph = layout.create_reaction_glyph(
        glyph_id,
        reaction_sid,
        Curve::from_points(&geometry.backbone),
    );
    glyph.species_reference_glyphs = reference_glyphs;
    Ok(())
}

/// Repair degenerate reaction geometry in place.
///
/// A two-point backbone gains its midpoint; a lone input (output) takes over
/// the first (last) half-segment as its branch; empty branches get a point
/// just off their hub.
pub fn normalize_reaction(reaction: &mut ReactionNode) -> Result<()> {
    let backbone = &mut reaction.backbone;
    if backbone.len() == 2 {
        let mid = Point::midpoint(backbone[0], backbone[1]);
        backbone.insert(1, mid);
    }
    if backbone.len() < 3 {
        return Err(ConvertError::geometry(
            reaction.reactome_id,
            format!("backbone has {} points", backbone.len()),
        ));
    }

    if reaction.inputs.len() == 1 {
        let start = backbone[0];
        backbone[0] = Point::midpoint(start, backbone[1]);
        reaction.inputs[0].points = vec![start];
    }
    if reaction.outputs.len() == 1 {
        let last = backbone.len() - 1;
        let end = backbone[last];
        backbone[last] = Point::midpoint(backbone[last - 1], end);
        reaction.outputs[0].points = vec![end];
    }

    for role in Role::ORDER {
        let hub = hub(reaction, role);
        for branch in reaction.branches_mut(role) {
            if branch.points.is_empty() {
                branch.points = vec![hub.offset(BRANCH_SHIFT, BRANCH_SHIFT)];
            }
        }
    }
    Ok(())
}

/// Where branches of `role` attach: the backbone ends for inputs and outputs,
/// the reaction centre for modifiers.
pub fn hub(reaction: &ReactionNode, role: Role) -> Point {
    let backbone = &reaction.backbone;
    match role {
        Role::Input => backbone[0],
        Role::Output => backbone[backbone.len() - 1],
        _ => reaction
            .position
            .unwrap_or_else(|| backbone[backbone.len() / 2]),
    }
}

/// Curve points for one branch. Stored hub-to-node; inputs and outputs are
/// emitted node-to-hub.
pub fn branch_curve(role: Role, hub: Point, branch: &Branch) -> Vec<Point> {
    let mut points = Vec::with_capacity(branch.points.len() + 1);
    points.push(hub);
    points.extend_from_slice(&branch.points);
    if role.is_stoichiometric() {
        points.reverse();
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(node: &str, points: Vec<Point>) -> Branch {
        Branch {
            node: node.to_string(),
            points,
        }
    }

    fn reaction(backbone: Vec<Point>) -> ReactionNode {
        ReactionNode {
            id: "r".to_string(),
            reactome_id: 1,
            backbone,
            position: None,
            inputs: vec![],
            outputs: vec![],
            catalysts: vec![],
            activators: vec![],
            inhibitors: vec![],
        }
    }

    #[test]
    fn two_point_backbone_gains_midpoint() {
        let mut r = reaction(vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)]);
        normalize_reaction(&mut r).unwrap();
        assert_eq!(
            r.backbone,
            vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0), Point::new(10.0, 10.0)]
        );
    }

    #[test]
    fn single_input_takes_first_half_segment() {
        let mut r = reaction(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
        ]);
        r.inputs = vec![branch("a", vec![])];
        r.outputs = vec![branch("b", vec![]), branch("c", vec![])];
        normalize_reaction(&mut r).unwrap();
        assert_eq!(r.backbone[0], Point::new(5.0, 0.0));
        assert_eq!(r.backbone[2], Point::new(20.0, 0.0));
        assert_eq!(r.inputs[0].points, vec![Point::new(0.0, 0.0)]);
        // Two outputs keep the backbone end and get shifted stubs.
        assert_eq!(r.outputs[0].points, vec![Point::new(20.5, 0.5)]);
    }

    #[test]
    fn single_output_takes_last_half_segment() {
        let mut r = reaction(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
        ]);
        r.outputs = vec![branch("b", vec![Point::new(30.0, 30.0)])];
        normalize_reaction(&mut r).unwrap();
        assert_eq!(r.backbone[2], Point::new(15.0, 0.0));
        assert_eq!(r.outputs[0].points, vec![Point::new(20.0, 0.0)]);
    }

    #[test]
    fn modifiers_without_points_are_shifted_from_centre() {
        let mut r = reaction(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
        r.catalysts = vec![branch("k", vec![])];
        r.inhibitors = vec![branch("i", vec![Point::new(5.0, 20.0)])];
        normalize_reaction(&mut r).unwrap();
        assert_eq!(r.catalysts[0].points, vec![Point::new(5.5, 0.5)]);
        assert_eq!(r.inhibitors[0].points, vec![Point::new(5.0, 20.0)]);

        r.position = Some(Point::new(7.0, 7.0));
        assert_eq!(hub(&r, Role::Catalyst), Point::new(7.0, 7.0));
    }

    #[test]
    fn short_backbone_is_a_geometry_error() {
        let mut r = reaction(vec![Point::new(1.0, 1.0)]);
        assert!(matches!(
            normalize_reaction(&mut r),
            Err(ConvertError::Geometry { .. })
        ));
    }

    #[test]
    fn input_curves_run_node_to_hub() {
        let p1 = Point::new(1.0, 0.0);
        let p2 = Point::new(2.0, 0.0);
        let h = Point::new(0.0, 0.0);
        let b = branch("a", vec![p1, p2]);

        let input = branch_curve(Role::Input, h, &b);
        assert_eq!(input, vec![p2, p1, h]);
        assert_eq!(input.first(), b.points.last());
        assert_eq!(input.last(), Some(&h));

        assert_eq!(branch_curve(Role::Output, h, &b), vec![p2, p1, h]);
        assert_eq!(branch_curve(Role::Catalyst, h, &b), vec![h, p1, p2]);
    }
}
