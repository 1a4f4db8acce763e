//! SBML Level 3 Version 1 serialization with the layout package.

use std::borrow::Cow;
use std::fmt::Display;
use std::fs;
use std::io::Write;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::diagram::BBox;
use crate::document::{
    Annotation, Compartment, Curve, Document, Layout, Model, Qualifier, Reaction, Species,
    SBML_LEVEL, SBML_VERSION,
};
use crate::error::{ConvertError, Result};
use crate::model::Role;
use crate::sbo::format_term;

const SBML_NS: &str = "http://www.sbml.org/sbml/level3/version1/core";
const LAYOUT_NS: &str = "http://www.sbml.org/sbml/level3/version1/layout/version1";
const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
const VCARD4_NS: &str = "http://www.w3.org/2006/vcard/ns#";
const BQBIOL_NS: &str = "http://biomodels.net/biology-qualifiers/";
const BQMODEL_NS: &str = "http://biomodels.net/model-qualifiers/";

pub fn to_sbml_string(doc: &Document) -> Result<String> {
    let bytes = write_sbml(doc, Vec::new())?;
    Ok(String::from_utf8(bytes)?)
}

pub fn write_sbml_file(doc: &Document, path: &Path) -> Result<()> {
    let bytes = write_sbml(doc, Vec::new())?;
    fs::write(path, bytes).map_err(|source| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "sbml written");
    Ok(())
}

/// Serializes `doc` into `out` and hands the sink back.
pub fn write_sbml<W: Write>(doc: &Document, out: W) -> Result<W> {
    let mut xml = Writer::new_with_indent(out, b' ', 2);
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let sbml = BytesStart::new("sbml")
        .attr("xmlns", SBML_NS)
        .attr("xmlns:layout", LAYOUT_NS)
        .attr("level", SBML_LEVEL)
        .attr("version", SBML_VERSION)
        .attr("layout:required", false);
    xml.write_event(Event::Start(sbml))?;
    write_model(&doc.model, &mut xml)?;
    close(&mut xml, "sbml")?;
    Ok(xml.into_inner())
}

trait Attrs: Sized {
    fn attr(self, key: &str, value: impl Display) -> Self;
}

impl Attrs for BytesStart<'_> {
    fn attr(mut self, key: &str, value: impl Display) -> Self {
        let value = value.to_string();
        let value = xml_chars(&value);
        self.push_attribute((key, &*value));
        self
    }
}

/// Drops code points outside the XML 1.0 `Char` production.
fn xml_chars(s: &str) -> Cow<'_, str> {
    if s.chars().all(is_xml_char) {
        return Cow::Borrowed(s);
    }
    tracing::warn!(value = %s.escape_debug(), "dropping characters not allowed in XML");
    Cow::Owned(s.chars().filter(|c| is_xml_char(*c)).collect())
}

fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

fn open<W: Write>(xml: &mut Writer<W>, start: BytesStart<'_>) -> Result<()> {
    xml.write_event(Event::Start(start))?;
    Ok(())
}

fn close<W: Write>(xml: &mut Writer<W>, name: &str) -> Result<()> {
    xml.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn empty<W: Write>(xml: &mut Writer<W>, start: BytesStart<'_>) -> Result<()> {
    xml.write_event(Event::Empty(start))?;
    Ok(())
}

fn text_element<W: Write>(xml: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    open(xml, BytesStart::new(name))?;
    xml.write_event(Event::Text(BytesText::new(&xml_chars(text))))?;
    close(xml, name)
}

fn write_model<W: Write>(model: &Model, xml: &mut Writer<W>) -> Result<()> {
    let start = BytesStart::new("model")
        .attr("metaid", &model.metaid)
        .attr("id", &model.id)
        .attr("name", &model.name);
    open(xml, start)?;
    write_notes(&model.notes, xml)?;
    write_annotation(&model.metaid, &model.annotation, true, xml)?;

    if !model.compartments.is_empty() {
        open(xml, BytesStart::new("listOfCompartments"))?;
        for compartment in &model.compartments {
            write_compartment(compartment, xml)?;
        }
        close(xml, "listOfCompartments")?;
    }
    if !model.species.is_empty() {
        open(xml, BytesStart::new("listOfSpecies"))?;
        for species in &model.species {
            write_species(species, xml)?;
        }
        close(xml, "listOfSpecies")?;
    }
    if !model.reactions.is_empty() {
        open(xml, BytesStart::new("listOfReactions"))?;
        for reaction in &model.reactions {
            write_reaction(reaction, xml)?;
        }
        close(xml, "listOfReactions")?;
    }
    if let Some(layout) = &model.layout {
        open(xml, BytesStart::new("layout:listOfLayouts").attr("xmlns:xsi", XSI_NS))?;
        write_layout(layout, xml)?;
        close(xml, "layout:listOfLayouts")?;
    }
    close(xml, "model")
}

fn write_compartment<W: Write>(compartment: &Compartment, xml: &mut Writer<W>) -> Result<()> {
    let start = BytesStart::new("compartment")
        .attr("metaid", &compartment.metaid)
        .attr("id", &compartment.id)
        .attr("name", &compartment.name)
        .attr("constant", compartment.constant);
    if compartment.annotation.is_empty() {
        return empty(xml, start);
    }
    open(xml, start)?;
    write_annotation(&compartment.metaid, &compartment.annotation, false, xml)?;
    close(xml, "compartment")
}

fn write_species<W: Write>(species: &Species, xml: &mut Writer<W>) -> Result<()> {
    let mut start = BytesStart::new("species")
        .attr("metaid", &species.metaid)
        .attr("id", &species.id)
        .attr("name", &species.name);
    if let Some(compartment) = &species.compartment {
        start = start.attr("compartment", compartment);
    }
    if let Some(term) = species.sbo_term {
        start = start.attr("sboTerm", format_term(term));
    }
    let start = start
        .attr("hasOnlySubstanceUnits", species.has_only_substance_units)
        .attr("boundaryCondition", species.boundary_condition)
        .attr("constant", species.constant);
    open(xml, start)?;
    write_notes(&species.notes, xml)?;
    write_annotation(&species.metaid, &species.annotation, false, xml)?;
    close(xml, "species")
}

fn write_reaction<W: Write>(reaction: &Reaction, xml: &mut Writer<W>) -> Result<()> {
    let mut start = BytesStart::new("reaction")
        .attr("metaid", &reaction.metaid)
        .attr("id", &reaction.id)
        .attr("name", &reaction.name);
    if let Some(term) = reaction.sbo_term {
        start = start.attr("sboTerm", format_term(term));
    }
    let start = start
        .attr("reversible", reaction.reversible)
        .attr("fast", reaction.fast);
    open(xml, start)?;
    write_notes(&reaction.notes, xml)?;
    write_annotation(&reaction.metaid, &reaction.annotation, false, xml)?;

    let lists = [
        ("listOfReactants", &[Role::Input][..]),
        ("listOfProducts", &[Role::Output][..]),
        (
            "listOfModifiers",
            &[Role::Catalyst, Role::PositiveRegulator, Role::NegativeRegulator][..],
        ),
    ];
    for (list, roles) in lists {
        let mut edges = reaction
            .participants
            .iter()
            .filter(|edge| roles.contains(&edge.role))
            .peekable();
        if edges.peek().is_none() {
            continue;
        }
        open(xml, BytesStart::new(list))?;
        for edge in edges {
            let element = if edge.role.is_stoichiometric() {
                "speciesReference"
            } else {
                "modifierSpeciesReference"
            };
            let mut reference = BytesStart::new(element)
                .attr("id", &edge.id)
                .attr("species", &edge.species)
                .attr("sboTerm", format_term(edge.sbo_term));
            if edge.role.is_stoichiometric() {
                reference = reference
                    .attr("stoichiometry", edge.stoichiometry)
                    .attr("constant", true);
            }
            empty(xml, reference)?;
        }
        close(xml, list)?;
    }
    close(xml, "reaction")
}

fn write_notes<W: Write>(paragraphs: &[String], xml: &mut Writer<W>) -> Result<()> {
    if paragraphs.is_empty() {
        return Ok(());
    }
    open(xml, BytesStart::new("notes"))?;
    open(xml, BytesStart::new("body").attr("xmlns", XHTML_NS))?;
    for paragraph in paragraphs {
        text_element(xml, "p", paragraph)?;
    }
    close(xml, "body")?;
    close(xml, "notes")
}

/// Model qualifiers apply to the model element itself; everything else is biological.
fn qualifier_prefix(qualifier: Qualifier, on_model: bool) -> &'static str {
    match qualifier {
        Qualifier::Is | Qualifier::IsDescribedBy if on_model => "bqmodel",
        _ => "bqbiol",
    }
}

fn write_annotation<W: Write>(
    metaid: &str,
    annotation: &Annotation,
    on_model: bool,
    xml: &mut Writer<W>,
) -> Result<()> {
    if annotation.is_empty() {
        return Ok(());
    }
    open(xml, BytesStart::new("annotation"))?;
    let rdf = BytesStart::new("rdf:RDF")
        .attr("xmlns:rdf", RDF_NS)
        .attr("xmlns:dcterms", DCTERMS_NS)
        .attr("xmlns:vCard4", VCARD4_NS)
        .attr("xmlns:bqbiol", BQBIOL_NS)
        .attr("xmlns:bqmodel", BQMODEL_NS);
    open(xml, rdf)?;
    open(
        xml,
        BytesStart::new("rdf:Description").attr("rdf:about", format!("#{metaid}")),
    )?;

    let history = &annotation.history;
    if !history.creators.is_empty() {
        open(xml, BytesStart::new("dcterms:creator"))?;
        open(xml, BytesStart::new("rdf:Bag"))?;
        for creator in history.creators.values() {
            open(xml, BytesStart::new("rdf:li").attr("rdf:parseType", "Resource"))?;
            open(
                xml,
                BytesStart::new("vCard4:hasName").attr("rdf:parseType", "Resource"),
            )?;
            text_element(xml, "vCard4:family-name", &creator.family_name)?;
            if let Some(given) = &creator.given_name {
                text_element(xml, "vCard4:given-name", given)?;
            }
            close(xml, "vCard4:hasName")?;
            if let Some(email) = &creator.email {
                text_element(xml, "vCard4:hasEmail", email)?;
            }
            if let Some(organisation) = &creator.organisation {
                text_element(xml, "vCard4:organization-name", organisation)?;
            }
            close(xml, "rdf:li")?;
        }
        close(xml, "rdf:Bag")?;
        close(xml, "dcterms:creator")?;
    }
    if let Some(created) = &history.created {
        write_date(xml, "dcterms:created", created)?;
    }
    for modified in &history.modified {
        write_date(xml, "dcterms:modified", modified)?;
    }

    for (qualifier, uris) in annotation.relations() {
        let element = format!(
            "{}:{}",
            qualifier_prefix(qualifier, on_model),
            qualifier.local_name()
        );
        open(xml, BytesStart::new(element.as_str()))?;
        open(xml, BytesStart::new("rdf:Bag"))?;
        for uri in uris {
            empty(xml, BytesStart::new("rdf:li").attr("rdf:resource", uri))?;
        }
        close(xml, "rdf:Bag")?;
        close(xml, &element)?;
    }

    close(xml, "rdf:Description")?;
    close(xml, "rdf:RDF")?;
    close(xml, "annotation")
}

fn write_date<W: Write>(xml: &mut Writer<W>, element: &str, date: &str) -> Result<()> {
    open(xml, BytesStart::new(element).attr("rdf:parseType", "Resource"))?;
    text_element(xml, "dcterms:W3CDTF", date)?;
    close(xml, element)
}

fn layout_role(role: Role) -> &'static str {
    match role {
        Role::Input => "substrate",
        Role::Output => "product",
        Role::Catalyst => "modifier",
        Role::PositiveRegulator => "activator",
        Role::NegativeRegulator => "inhibitor",
    }
}

fn write_layout<W: Write>(layout: &Layout, xml: &mut Writer<W>) -> Result<()> {
    open(xml, BytesStart::new("layout:layout").attr("layout:id", &layout.id))?;
    empty(xml, dimensions(layout.width, layout.height))?;

    if !layout.compartment_glyphs.is_empty() {
        open(xml, BytesStart::new("layout:listOfCompartmentGlyphs"))?;
        for glyph in &layout.compartment_glyphs {
            let start = BytesStart::new("layout:compartmentGlyph")
                .attr("layout:id", &glyph.id)
                .attr("layout:compartment", &glyph.compartment);
            open(xml, start)?;
            write_bbox(&glyph.bbox, xml)?;
            close(xml, "layout:compartmentGlyph")?;
        }
        close(xml, "layout:listOfCompartmentGlyphs")?;
    }

    if !layout.species_glyphs.is_empty() {
        open(xml, BytesStart::new("layout:listOfSpeciesGlyphs"))?;
        for glyph in &layout.species_glyphs {
            let start = BytesStart::new("layout:speciesGlyph")
                .attr("layout:id", &glyph.id)
                .attr("layout:species", &glyph.species);
            open(xml, start)?;
            write_bbox(&glyph.bbox, xml)?;
            close(xml, "layout:speciesGlyph")?;
        }
        close(xml, "layout:listOfSpeciesGlyphs")?;
    }

    if !layout.reaction_glyphs.is_empty() {
        open(xml, BytesStart::new("layout:listOfReactionGlyphs"))?;
        for glyph in &layout.reaction_glyphs {
            let start = BytesStart::new("layout:reactionGlyph")
                .attr("layout:id", &glyph.id)
                .attr("layout:reaction", &glyph.reaction);
            open(xml, start)?;
            write_curve(&glyph.curve, xml)?;
            if !glyph.species_reference_glyphs.is_empty() {
                open(xml, BytesStart::new("layout:listOfSpeciesReferenceGlyphs"))?;
                for reference in &glyph.species_reference_glyphs {
                    let start = BytesStart::new("layout:speciesReferenceGlyph")
                        .attr("layout:id", &reference.id)
                        .attr("layout:speciesReference", &reference.species_reference)
                        .attr("layout:speciesGlyph", &reference.species_glyph)
                        .attr("layout:role", layout_role(reference.role));
                    open(xml, start)?;
                    write_curve(&reference.curve, xml)?;
                    close(xml, "layout:speciesReferenceGlyph")?;
                }
                close(xml, "layout:listOfSpeciesReferenceGlyphs")?;
            }
            close(xml, "layout:reactionGlyph")?;
        }
        close(xml, "layout:listOfReactionGlyphs")?;
    }

    if !layout.text_glyphs.is_empty() {
        open(xml, BytesStart::new("layout:listOfTextGlyphs"))?;
        for glyph in &layout.text_glyphs {
            let start = BytesStart::new("layout:textGlyph")
                .attr("layout:id", &glyph.id)
                .attr("layout:graphicalObject", &glyph.graphical_object)
                .attr("layout:originOfText", &glyph.origin_of_text);
            open(xml, start)?;
            write_bbox(&glyph.bbox, xml)?;
            close(xml, "layout:textGlyph")?;
        }
        close(xml, "layout:listOfTextGlyphs")?;
    }

    close(xml, "layout:layout")
}

fn dimensions(width: f64, height: f64) -> BytesStart<'static> {
    BytesStart::new("layout:dimensions")
        .attr("layout:width", width)
        .attr("layout:height", height)
}

fn point(element: &str, x: f64, y: f64) -> BytesStart<'_> {
    BytesStart::new(element)
        .attr("layout:x", x)
        .attr("layout:y", y)
}

fn write_bbox<W: Write>(bbox: &BBox, xml: &mut Writer<W>) -> Result<()> {
    open(xml, BytesStart::new("layout:boundingBox"))?;
    empty(xml, point("layout:position", bbox.x, bbox.y))?;
    empty(xml, dimensions(bbox.w, bbox.h))?;
    close(xml, "layout:boundingBox")
}

fn write_curve<W: Write>(curve: &Curve, xml: &mut Writer<W>) -> Result<()> {
    open(xml, BytesStart::new("layout:curve"))?;
    open(xml, BytesStart::new("layout:listOfCurveSegments"))?;
    for segment in &curve.segments {
        open(
            xml,
            BytesStart::new("layout:curveSegment").attr("xsi:type", "LineSegment"),
        )?;
        empty(xml, point("layout:start", segment.start.x, segment.start.y))?;
        empty(xml, point("layout:end", segment.end.x, segment.end.y))?;
        close(xml, "layout:curveSegment")?;
    }
    close(xml, "layout:listOfCurveSegments")?;
    close(xml, "layout:curve")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::Point;
    use crate::document::{Creator, Layout, SpeciesReferenceGlyph};

    fn sample() -> Document {
        let mut doc = Document::new("model_1", "A & B <pathway>");
        doc.model
            .annotation
            .add_resource(Qualifier::Is, "https://identifiers.org/reactome/R-HSA-1");
        doc.model.annotation.history.creators.insert(
            9,
            Creator {
                family_name: "Smith".to_string(),
                given_name: Some("Jo".to_string()),
                email: None,
                organisation: Some("EBI".to_string()),
            },
        );
        doc.model.annotation.history.created = Some("2010-01-02T03:04:05Z".to_string());
        doc.model.notes = vec!["Uses 5 < 6.".to_string()];

        doc.create_compartment("compartment_70".into(), "cytosol".into());
        let species = doc.create_species("species_10".into(), "A".into());
        species.compartment = Some("compartment_70".to_string());
        species.sbo_term = Some(252);
        species
            .annotation
            .add_resource(Qualifier::HasPart, "https://www.uniprot.org/uniprot/P1");
        doc.create_species("species_11".into(), "B".into());

        let reaction = doc.create_reaction("reaction_5".into(), "bind".into());
        reaction.sbo_term = Some(176);
        reaction.create_participant("speciesreference_5_input_10", "species_10", Role::Input, 2.0, 10);
        reaction.create_participant("speciesreference_5_output_11", "species_11", Role::Output, 1.0, 11);
        reaction.create_participant(
            "modifierspeciesreference_5_catalyst_10",
            "species_10",
            Role::Catalyst,
            0.0,
            13,
        );

        let mut layout = Layout::new("layout_model_1".to_string(), 200.0, 100.0);
        layout.create_species_glyph(
            "speciesglyph_2".to_string(),
            "species_10".to_string(),
            BBox { x: 1.0, y: 2.0, w: 3.0, h: 4.0 },
        );
        let glyph = layout.create_reaction_glyph(
            "reactionglyph_5".to_string(),
            "reaction_5".to_string(),
            Curve::from_points(&[Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(10.0, 0.0)]),
        );
        glyph.species_reference_glyphs.push(SpeciesReferenceGlyph {
            id: "speciesreferenceglyph_5_input_2".to_string(),
            species_reference: "speciesreference_5_input_10".to_string(),
            species_glyph: "speciesglyph_2".to_string(),
            role: Role::Input,
            curve: Curve::from_points(&[Point::new(-5.0, 0.0), Point::new(0.0, 0.0)]),
        });
        doc.set_layout(layout);
        doc
    }

    #[test]
    fn output_is_well_formed_sbml() {
        let xml = to_sbml_string(&sample()).unwrap();
        let parsed = roxmltree::Document::parse(&xml).unwrap();
        let root = parsed.root_element();
        assert_eq!(root.tag_name().name(), "sbml");
        assert_eq!(root.tag_name().namespace(), Some(SBML_NS));
        assert_eq!(root.attribute("level"), Some("3"));

        let model = root.first_element_child().unwrap();
        assert_eq!(model.attribute("name"), Some("A & B <pathway>"));

        let count = |name: &str| {
            parsed
                .descendants()
                .filter(|n| n.tag_name().name() == name)
                .count()
        };
        assert_eq!(count("species"), 2);
        assert_eq!(count("speciesReference"), 2);
        assert_eq!(count("modifierSpeciesReference"), 1);
        assert_eq!(count("curveSegment"), 3);
        assert_eq!(count("creator"), 1);
    }

    #[test]
    fn participants_are_grouped_by_list() {
        let xml = to_sbml_string(&sample()).unwrap();
        let parsed = roxmltree::Document::parse(&xml).unwrap();
        let reactants = parsed
            .descendants()
            .find(|n| n.has_tag_name((SBML_NS, "listOfReactants")))
            .unwrap();
        let reference = reactants.first_element_child().unwrap();
        assert_eq!(reference.attribute("stoichiometry"), Some("2"));
        assert_eq!(reference.attribute("sboTerm"), Some("SBO:0000010"));
        let modifier = parsed
            .descendants()
            .find(|n| n.has_tag_name((SBML_NS, "modifierSpeciesReference")))
            .unwrap();
        assert_eq!(modifier.attribute("stoichiometry"), None);
    }

    #[test]
    fn model_annotation_uses_model_qualifiers() {
        let xml = to_sbml_string(&sample()).unwrap();
        let parsed = roxmltree::Document::parse(&xml).unwrap();
        assert!(parsed
            .descendants()
            .any(|n| n.has_tag_name((BQMODEL_NS, "is"))));
        assert!(parsed
            .descendants()
            .any(|n| n.has_tag_name((BQBIOL_NS, "hasPart"))));
        let about = parsed
            .descendants()
            .find(|n| n.has_tag_name((RDF_NS, "Description")))
            .and_then(|n| n.attribute((RDF_NS, "about")));
        assert_eq!(about, Some("#metaid_1"));
    }

    #[test]
    fn layout_roles_and_segments() {
        let xml = to_sbml_string(&sample()).unwrap();
        let parsed = roxmltree::Document::parse(&xml).unwrap();
        let reference = parsed
            .descendants()
            .find(|n| n.has_tag_name((LAYOUT_NS, "speciesReferenceGlyph")))
            .unwrap();
        assert_eq!(reference.attribute((LAYOUT_NS, "role")), Some("substrate"));
        let segment = parsed
            .descendants()
            .find(|n| n.has_tag_name((LAYOUT_NS, "curveSegment")))
            .unwrap();
        assert_eq!(segment.attribute((XSI_NS, "type")), Some("LineSegment"));
    }

    #[test]
    fn forbidden_characters_are_dropped() {
        let mut doc = sample();
        doc.model.species[1].name = "A\u{1}B\u{FFFE}".to_string();
        doc.model.notes = vec!["line\u{8} one".to_string()];
        let xml = to_sbml_string(&doc).unwrap();
        let parsed = roxmltree::Document::parse(&xml).unwrap();
        let b = parsed
            .descendants()
            .find(|n| n.attribute("id") == Some("species_11"))
            .unwrap();
        assert_eq!(b.attribute("name"), Some("AB"));
        let note = parsed
            .descendants()
            .find(|n| n.has_tag_name((XHTML_NS, "p")))
            .and_then(|n| n.text());
        assert_eq!(note, Some("line one"));
    }

    #[test]
    fn species_without_compartment_omits_attribute() {
        let xml = to_sbml_string(&sample()).unwrap();
        let parsed = roxmltree::Document::parse(&xml).unwrap();
        let b = parsed
            .descendants()
            .find(|n| n.attribute("id") == Some("species_11"))
            .unwrap();
        assert_eq!(b.attribute("compartment"), None);
        assert_eq!(b.attribute("constant"), Some("false"));
    }
}
