//! In-memory SBML Level 3 document with the layout package objects the
//! converter needs. Objects are created through `create_*` calls and then
//! decorated in place; serialization lives in [`crate::writer`].

use indexmap::{IndexMap, IndexSet};

use crate::diagram::{BBox, Point};
use crate::model::{DbId, Role};

pub const SBML_LEVEL: u32 = 3;
pub const SBML_VERSION: u32 = 1;

/// Biology/model qualifier grouping annotation URIs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Qualifier {
    Is,
    HasPart,
    IsDescribedBy,
    IsHomologTo,
    OccursIn,
}

impl Qualifier {
    pub fn local_name(self) -> &'static str {
        match self {
            Qualifier::Is => "is",
            Qualifier::HasPart => "hasPart",
            Qualifier::IsDescribedBy => "isDescribedBy",
            Qualifier::IsHomologTo => "isHomologTo",
            Qualifier::OccursIn => "occursIn",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Creator {
    pub family_name: String,
    pub given_name: Option<String>,
    pub email: Option<String>,
    pub organisation: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct History {
    /// Keyed by author identity so repeated authors collapse.
    pub creators: IndexMap<DbId, Creator>,
    pub created: Option<String>,
    pub modified: IndexSet<String>,
}

impl History {
    pub fn is_empty(&self) -> bool {
        self.creators.is_empty() && self.created.is_none() && self.modified.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Annotation {
    relations: IndexMap<Qualifier, IndexSet<String>>,
    pub history: History,
}

impl Annotation {
    /// Adds `uri` under `qualifier`; returns false if it was already present.
    pub fn add_resource(&mut self, qualifier: Qualifier, uri: impl Into<String>) -> bool {
        self.relations.entry(qualifier).or_default().insert(uri.into())
    }

    pub fn resources(&self, qualifier: Qualifier) -> impl Iterator<Item = &str> {
        self.relations
            .get(&qualifier)
            .into_iter()
            .flat_map(|uris| uris.iter().map(String::as_str))
    }

    pub fn relations(&self) -> impl Iterator<Item = (Qualifier, &IndexSet<String>)> {
        self.relations
            .iter()
            .filter(|(_, uris)| !uris.is_empty())
            .map(|(qualifier, uris)| (*qualifier, uris))
    }

    pub fn is_empty(&self) -> bool {
        self.relations.values().all(IndexSet::is_empty) && self.history.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Compartment {
    pub id: String,
    pub metaid: String,
    pub name: String,
    pub constant: bool,
    pub annotation: Annotation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Species {
    pub id: String,
    pub metaid: String,
    pub name: String,
    pub compartment: Option<String>,
    pub sbo_term: Option<u32>,
    pub boundary_condition: bool,
    pub constant: bool,
    pub has_only_substance_units: bool,
    pub annotation: Annotation,
    pub notes: Vec<String>,
}

/// Role-tagged link between a reaction and a species.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticipantEdge {
    pub id: String,
    pub species: String,
    pub role: Role,
    /// Zero for non-stoichiometric (modifier) participation.
    pub stoichiometry: f64,
    pub sbo_term: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Reaction {
    pub id: String,
    pub metaid: String,
    pub name: String,
    pub sbo_term: Option<u32>,
    pub reversible: bool,
    pub fast: bool,
    pub participants: Vec<ParticipantEdge>,
    pub annotation: Annotation,
    pub notes: Vec<String>,
}

impl Reaction {
    pub fn create_participant(
        &mut self,
        id: impl Into<String>,
        species: impl Into<String>,
        role: Role,
        stoichiometry: f64,
        sbo_term: u32,
    ) -> &mut ParticipantEdge {
        self.participants.push(ParticipantEdge {
            id: id.into(),
            species: species.into(),
            role,
            stoichiometry,
            sbo_term,
        });
        let last = self.participants.len() - 1;
        &mut self.participants[last]
    }

    pub fn participants_with(&self, role: Role) -> impl Iterator<Item = &ParticipantEdge> {
        self.participants.iter().filter(move |edge| edge.role == role)
    }

    pub fn participant(&self, id: &str) -> Option<&ParticipantEdge> {
        self.participants.iter().find(|edge| edge.id == id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSegment {
    pub start: Point,
    pub end: Point,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Curve {
    pub segments: Vec<LineSegment>,
}

impl Curve {
    pub fn from_points(points: &[Point]) -> Self {
        Self {
            segments: points
                .windows(2)
                .map(|pair| LineSegment {
                    start: pair[0],
                    end: pair[1],
                })
                .collect(),
        }
    }

    /// Ordered points along the curve, assuming connected segments.
    pub fn points(&self) -> Vec<Point> {
        let mut points = Vec::with_capacity(self.segments.len() + 1);
        if let Some(first) = self.segments.first() {
            points.push(first.start);
        }
        points.extend(self.segments.iter().map(|segment| segment.end));
        points
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompartmentGlyph {
    pub id: String,
    pub compartment: String,
    pub bbox: BBox,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpeciesGlyph {
    pub id: String,
    pub species: String,
    pub bbox: BBox,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextGlyph {
    pub id: String,
    pub graphical_object: String,
    pub origin_of_text: String,
    pub bbox: BBox,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpeciesReferenceGlyph {
    pub id: String,
    pub species_reference: String,
    pub species_glyph: String,
    pub role: Role,
    pub curve: Curve,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReactionGlyph {
    pub id: String,
    pub reaction: String,
    pub curve: Curve,
    pub species_reference_glyphs: Vec<SpeciesReferenceGlyph>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    pub id: String,
    pub width: f64,
    pub height: f64,
    pub compartment_glyphs: Vec<CompartmentGlyph>,
    pub species_glyphs: Vec<SpeciesGlyph>,
    pub reaction_glyphs: Vec<ReactionGlyph>,
    pub text_glyphs: Vec<TextGlyph>,
}

impl Layout {
    pub fn new(id: String, width: f64, height: f64) -> Self {
        Self {
            id,
            width,
            height,
            compartment_glyphs: Vec::new(),
            species_glyphs: Vec::new(),
            reaction_glyphs: Vec::new(),
            text_glyphs: Vec::new(),
        }
    }

    pub fn create_compartment_glyph(&mut self, id: String, compartment: String, bbox: BBox) {
        self.compartment_glyphs.push(CompartmentGlyph {
            id,
            compartment,
            bbox,
        });
    }

    pub fn create_species_glyph(&mut self, id: String, species: String, bbox: BBox) {
        self.species_glyphs.push(SpeciesGlyph { id, species, bbox });
    }

    pub fn create_text_glyph(
        &mut self,
        id: String,
        graphical_object: String,
        origin_of_text: String,
        bbox: BBox,
    ) {
        self.text_glyphs.push(TextGlyph {
            id,
            graphical_object,
            origin_of_text,
            bbox,
        });
    }

    pub fn create_reaction_glyph(
        &mut self,
        id: String,
        reaction: String,
        curve: Curve,
    ) -> &mut ReactionGlyph {
        self.reaction_glyphs.push(ReactionGlyph {
            id,
            reaction,
            curve,
            species_reference_glyphs: Vec::new(),
        });
        let last = self.reaction_glyphs.len() - 1;
        &mut self.reaction_glyphs[last]
    }

    pub fn has_compartment_glyph(&self, compartment: &str) -> bool {
        self.compartment_glyphs
            .iter()
            .any(|glyph| glyph.compartment == compartment)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Model {
    pub id: String,
    pub metaid: String,
    pub name: String,
    pub annotation: Annotation,
    pub notes: Vec<String>,
    pub compartments: Vec<Compartment>,
    pub species: Vec<Species>,
    pub reactions: Vec<Reaction>,
    pub layout: Option<Layout>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub model: Model,
    metaid_counter: usize,
}

impl Document {
    pub fn new(model_id: impl Into<String>, name: impl Into<String>) -> Self {
        let mut doc = Self::default();
        doc.model.id = model_id.into();
        doc.model.name = name.into();
        doc.model.metaid = doc.next_metaid();
        doc
    }

    pub fn next_metaid(&mut self) -> String {
        self.metaid_counter += 1;
        format!("metaid_{}", self.metaid_counter)
    }

    pub fn create_compartment(&mut self, id: String, name: String) -> &mut Compartment {
        let metaid = self.next_metaid();
        self.model.compartments.push(Compartment {
            id,
            metaid,
            name,
            constant: true,
            annotation: Annotation::default(),
        });
        let last = self.model.compartments.len() - 1;
        &mut self.model.compartments[last]
    }

    pub fn create_species(&mut self, id: String, name: String) -> &mut Species {
        let metaid = self.next_metaid();
        self.model.species.push(Species {
            id,
            metaid,
            name,
            compartment: None,
            sbo_term: None,
            boundary_condition: false,
            constant: false,
            has_only_substance_units: false,
            annotation: Annotation::default(),
            notes: Vec::new(),
        });
        let last = self.model.species.len() - 1;
        &mut self.model.species[last]
    }

    pub fn create_reaction(&mut self, id: String, name: String) -> &mut Reaction {
        let metaid = self.next_metaid();
        self.model.reactions.push(Reaction {
            id,
            metaid,
            name,
            sbo_term: None,
            reversible: false,
            fast: false,
            participants: Vec::new(),
            annotation: Annotation::default(),
            notes: Vec::new(),
        });
        let last = self.model.reactions.len() - 1;
        &mut self.model.reactions[last]
    }

    pub fn set_layout(&mut self, layout: Layout) {
        self.model.layout = Some(layout);
    }

    pub fn species(&self, id: &str) -> Option<&Species> {
        self.model.species.iter().find(|species| species.id == id)
    }

    pub fn species_mut(&mut self, id: &str) -> Option<&mut Species> {
        self.model.species.iter_mut().find(|species| species.id == id)
    }

    pub fn compartment(&self, id: &str) -> Option<&Compartment> {
        self.model.compartments.iter().find(|c| c.id == id)
    }

    pub fn reaction(&self, id: &str) -> Option<&Reaction> {
        self.model.reactions.iter().find(|reaction| reaction.id == id)
    }

    pub fn reaction_mut(&mut self, id: &str) -> Option<&mut Reaction> {
        self.model
            .reactions
            .iter_mut()
            .find(|reaction| reaction.id == id)
    }

    pub fn participant_count(&self) -> usize {
        self.model
            .reactions
            .iter()
            .map(|reaction| reaction.participants.len())
            .sum()
    }
}
