//! Stored pathway diagrams: pixel-space nodes and reaction polylines.

use roxmltree::{Document, Node};

use crate::error::{ConvertError, Result};
use crate::model::{DbId, Role};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn midpoint(a: Point, b: Point) -> Point {
        Point {
            x: (a.x + b.x) / 2.0,
            y: (a.y + b.y) / 2.0,
        }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Point {
        Point {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BBox {
    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.w / 2.0,
            y: self.y + self.h / 2.0,
        }
    }

    pub fn centered_at(center: Point, w: f64, h: f64) -> BBox {
        BBox {
            x: center.x - w / 2.0,
            y: center.y - h / 2.0,
            w,
            h,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.w
            && point.y >= self.y
            && point.y <= self.y + self.h
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn include_point(&mut self, point: Point) {
        self.min_x = self.min_x.min(point.x);
        self.max_x = self.max_x.max(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_y = self.max_y.max(point.y);
    }

    pub fn include_bbox(&mut self, bbox: BBox) {
        self.include_point(Point::new(bbox.x, bbox.y));
        self.include_point(Point::new(bbox.x + bbox.w, bbox.y + bbox.h));
    }

    pub fn width(&self) -> f64 {
        (self.max_x - self.min_x).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.max_y - self.min_y).max(0.0)
    }

    pub fn bottom_center(&self) -> Point {
        Point {
            x: (self.min_x + self.max_x) / 2.0,
            y: self.max_y,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Entity,
    Compartment,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DiagramNode {
    /// Diagram-local id, unique within one diagram.
    pub id: String,
    pub reactome_id: DbId,
    pub kind: NodeKind,
    pub label: String,
    pub bounds: BBox,
    pub text_bounds: Option<BBox>,
}

/// One participant connection of a reaction. Points run from the hub outwards;
/// an empty list means the participant is drawn straight to the hub.
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    pub node: String,
    pub points: Vec<Point>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReactionNode {
    pub id: String,
    pub reactome_id: DbId,
    /// Ordered from the input hub to the output hub.
    pub backbone: Vec<Point>,
    pub position: Option<Point>,
    pub inputs: Vec<Branch>,
    pub outputs: Vec<Branch>,
    pub catalysts: Vec<Branch>,
    pub activators: Vec<Branch>,
    pub inhibitors: Vec<Branch>,
}

impl ReactionNode {
    pub fn branches(&self, role: Role) -> &[Branch] {
        match role {
            Role::Input => &self.inputs,
            Role::Output => &self.outputs,
            Role::Catalyst => &self.catalysts,
            Role::PositiveRegulator => &self.activators,
            Role::NegativeRegulator => &self.inhibitors,
        }
    }

    pub fn branches_mut(&mut self, role: Role) -> &mut Vec<Branch> {
        match role {
            Role::Input => &mut self.inputs,
            Role::Output => &mut self.outputs,
            Role::Catalyst => &mut self.catalysts,
            Role::PositiveRegulator => &mut self.activators,
            Role::NegativeRegulator => &mut self.inhibitors,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diagram {
    pub nodes: Vec<DiagramNode>,
    pub reactions: Vec<ReactionNode>,
}

impl Diagram {
    /// Parse stored diagram XML. `id` names the owner for error messages.
    pub fn parse(id: &str, xml: &str) -> Result<Diagram> {
        let doc = Document::parse(xml).map_err(|source| ConvertError::DiagramXml {
            id: id.to_string(),
            source,
        })?;
        let mut diagram = Diagram::default();

        if let Some(nodes) = doc.descendants().find(|node| node.has_tag_name("Nodes")) {
            for node in nodes.children().filter(Node::is_element) {
                if let Some(parsed) = parse_node(&node) {
                    diagram.nodes.push(parsed);
                }
            }
        }
        if let Some(edges) = doc.descendants().find(|node| node.has_tag_name("Edges")) {
            for edge in edges.children().filter(Node::is_element) {
                if !edge.tag_name().name().ends_with("RenderableReaction") {
                    continue;
                }
                if let Some(reaction) = parse_reaction(&edge) {
                    diagram.reactions.push(reaction);
                }
            }
        }
        Ok(diagram)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.reactions.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&DiagramNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn reaction_ids(&self) -> impl Iterator<Item = DbId> + '_ {
        self.reactions.iter().map(|reaction| reaction.reactome_id)
    }

    pub fn bounds(&self) -> Bounds {
        let mut bounds = Bounds::empty();
        for node in &self.nodes {
            bounds.include_bbox(node.bounds);
        }
        for reaction in &self.reactions {
            for point in &reaction.backbone {
                bounds.include_point(*point);
            }
        }
        bounds
    }
}

fn parse_node(node: &Node) -> Option<DiagramNode> {
    let tag = node.tag_name().name();
    let kind = if tag.ends_with("RenderableCompartment") {
        NodeKind::Compartment
    } else {
        NodeKind::Entity
    };
    let id = node.attribute("id")?.to_string();
    let Some(reactome_id) = node.attribute("reactomeId").and_then(|v| v.parse().ok()) else {
        tracing::debug!(node = %id, tag, "diagram node without reactomeId skipped");
        return None;
    };
    let Some(bounds) = parse_bbox(node.attribute("bounds")) else {
        tracing::warn!(node = %id, "diagram node without bounds skipped");
        return None;
    };
    let label = node
        .descendants()
        .find(|child| child.has_tag_name("displayName"))
        .and_then(|child| child.text())
        .unwrap_or_default()
        .replace('\r', "")
        .trim()
        .to_string();
    Some(DiagramNode {
        id,
        reactome_id,
        kind,
        label,
        bounds,
        text_bounds: parse_bbox(node.attribute("textBounds")),
    })
}

fn parse_reaction(edge: &Node) -> Option<ReactionNode> {
    let id = edge.attribute("id")?.to_string();
    let reactome_id = edge.attribute("reactomeId").and_then(|v| v.parse().ok())?;
    let branches = |group: &str, item: &str| -> Vec<Branch> {
        edge.children()
            .filter(|child| child.has_tag_name(group))
            .flat_map(|child| child.children().filter(move |n| n.has_tag_name(item)))
            .filter_map(|branch| {
                Some(Branch {
                    node: branch.attribute("id")?.to_string(),
                    points: parse_points(branch.attribute("points")),
                })
            })
            .collect()
    };
    Some(ReactionNode {
        id,
        reactome_id,
        backbone: parse_points(edge.attribute("points")),
        position: parse_point(edge.attribute("position")),
        inputs: branches("Inputs", "Input"),
        outputs: branches("Outputs", "Output"),
        catalysts: branches("Catalysts", "Catalyst"),
        activators: branches("Activators", "Activator"),
        inhibitors: branches("Inhibitors", "Inhibitor"),
    })
}

fn parse_bbox(value: Option<&str>) -> Option<BBox> {
    let numbers = parse_numbers(value?)?;
    match numbers.as_slice() {
        [x, y, w, h] => Some(BBox {
            x: *x,
            y: *y,
            w: *w,
            h: *h,
        }),
        _ => None,
    }
}

fn parse_point(value: Option<&str>) -> Option<Point> {
    let numbers = parse_numbers(value?)?;
    match numbers.as_slice() {
        [x, y] => Some(Point { x: *x, y: *y }),
        _ => None,
    }
}

/// `"x y, x y, ..."`; malformed pairs are dropped.
fn parse_points(value: Option<&str>) -> Vec<Point> {
    value
        .unwrap_or_default()
        .split(',')
        .filter(|pair| !pair.trim().is_empty())
        .filter_map(|pair| parse_point(Some(pair)))
        .collect()
}

fn parse_numbers(value: &str) -> Option<Vec<f64>> {
    value
        .split_whitespace()
        .map(|v| v.parse::<f64>().ok())
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Process reactomeId="100">
  <Nodes>
    <org.gk.render.RenderableCompartment id="1" reactomeId="70101" bounds="0 0 400 300">
      <Properties><displayName>cytosol</displayName></Properties>
    </org.gk.render.RenderableCompartment>
    <org.gk.render.RenderableProtein id="2" reactomeId="10" bounds="20 20 60 30" textBounds="25 25 50 20">
      <Properties><displayName>ABC1</displayName></Properties>
    </org.gk.render.RenderableProtein>
    <org.gk.render.RenderableChemical id="3" reactomeId="11" bounds="220 20 40 30"/>
    <org.gk.render.Note id="9" bounds="0 0 10 10"/>
  </Nodes>
  <Edges>
    <org.gk.render.RenderableReaction id="5" reactomeId="200" points="80 35, 220 35" position="150 35">
      <Inputs><Input id="2"/></Inputs>
      <Outputs><Output id="3" points="200 35"/></Outputs>
      <Catalysts><Catalyst id="2" points="150 60, 150 80"/></Catalysts>
    </org.gk.render.RenderableReaction>
    <org.gk.render.FlowLine id="6" points="0 0, 1 1"/>
  </Edges>
</Process>"#;

    #[test]
    fn parses_nodes_and_reactions() {
        let diagram = Diagram::parse("100", SAMPLE).unwrap();
        assert_eq!(diagram.nodes.len(), 3);
        assert_eq!(diagram.nodes[0].kind, NodeKind::Compartment);
        assert_eq!(diagram.nodes[0].label, "cytosol");
        let protein = diagram.node("2").unwrap();
        assert_eq!(protein.reactome_id, 10);
        assert_eq!(
            protein.text_bounds,
            Some(BBox {
                x: 25.0,
                y: 25.0,
                w: 50.0,
                h: 20.0
            })
        );

        assert_eq!(diagram.reactions.len(), 1);
        let reaction = &diagram.reactions[0];
        assert_eq!(reaction.backbone, vec![Point::new(80.0, 35.0), Point::new(220.0, 35.0)]);
        assert_eq!(reaction.position, Some(Point::new(150.0, 35.0)));
        assert!(reaction.inputs[0].points.is_empty());
        assert_eq!(reaction.outputs[0].points, vec![Point::new(200.0, 35.0)]);
        assert_eq!(reaction.catalysts[0].points.len(), 2);
        assert_eq!(diagram.reaction_ids().collect::<Vec<_>>(), vec![200]);
    }

    #[test]
    fn bounds_cover_nodes() {
        let diagram = Diagram::parse("100", SAMPLE).unwrap();
        let bounds = diagram.bounds();
        assert_eq!(bounds.width(), 400.0);
        assert_eq!(bounds.height(), 300.0);
        assert_eq!(bounds.bottom_center(), Point::new(200.0, 300.0));
    }

    #[test]
    fn malformed_xml_is_reported() {
        let err = Diagram::parse("7", "<Process><Nodes>").unwrap_err();
        assert!(matches!(err, ConvertError::DiagramXml { .. }));
    }
}
