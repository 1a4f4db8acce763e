//! Layout normalization run before geometry extraction. Stored coordinates
//! predate label rendering, so node bounds are refitted to measured labels.

use cairo::{Context as CairoContext, Format, ImageSurface};
use pango::FontDescription;
use pangocairo::functions as pangocairo;

use crate::diagram::{BBox, Diagram, NodeKind};
use crate::error::Result;

pub const FONT_FAMILY: &str = "Liberation Sans";
pub const FONT_PX: f64 = 12.0;

pub trait TextMeasure {
    /// Pixel width and height of `text` rendered at `font_px`.
    fn measure(&self, text: &str, font_px: f64) -> (f64, f64);
}

/// Measures labels with Pango on a scratch Cairo surface.
pub struct PangoMeasure {
    ctx: CairoContext,
}

impl PangoMeasure {
    pub fn new() -> Result<Self> {
        let surface = ImageSurface::create(Format::ARgb32, 1, 1)?;
        let ctx = CairoContext::new(&surface)?;
        Ok(Self { ctx })
    }
}

impl TextMeasure for PangoMeasure {
    fn measure(&self, text: &str, font_px: f64) -> (f64, f64) {
        let layout = pangocairo::create_layout(&self.ctx);
        let mut font_desc = FontDescription::from_string(FONT_FAMILY);
        font_desc.set_absolute_size(font_px * pango::SCALE as f64);
        layout.set_font_description(Some(&font_desc));
        layout.set_text(text);
        let (width, height) = layout.pixel_size();
        (width as f64, height as f64)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TightenSettings {
    /// Fit entity nodes to their label instead of only growing them.
    pub tight_nodes: bool,
    pub padding: f64,
    pub min_width: f64,
    pub min_height: f64,
    pub font_px: f64,
}

impl Default for TightenSettings {
    fn default() -> Self {
        Self {
            tight_nodes: false,
            padding: 5.0,
            min_width: 20.0,
            min_height: 14.0,
            font_px: FONT_PX,
        }
    }
}

impl TightenSettings {
    pub fn tight() -> Self {
        Self {
            tight_nodes: true,
            ..Self::default()
        }
    }
}

pub fn tighten(diagram: &mut Diagram, settings: &TightenSettings, measure: &dyn TextMeasure) {
    for node in diagram
        .nodes
        .iter_mut()
        .filter(|node| node.kind == NodeKind::Entity)
    {
        let center = node.bounds.center();
        let (text_w, text_h) = label_size(&node.label, settings, measure);
        let need_w = text_w + 2.0 * settings.padding;
        let need_h = text_h + 2.0 * settings.padding;
        let (w, h) = if settings.tight_nodes {
            (need_w.max(settings.min_width), need_h.max(settings.min_height))
        } else {
            (node.bounds.w.max(need_w), node.bounds.h.max(need_h))
        };
        node.bounds = BBox::centered_at(center, w, h);
        if !node.label.is_empty() {
            node.text_bounds = Some(BBox::centered_at(center, text_w, text_h));
        }
    }

    // Smallest compartments first so nested ones are settled before their parents.
    let mut order: Vec<usize> = diagram
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| node.kind == NodeKind::Compartment)
        .map(|(index, _)| index)
        .collect();
    order.sort_by(|a, b| {
        let area = |i: usize| diagram.nodes[i].bounds.w * diagram.nodes[i].bounds.h;
        area(*a).total_cmp(&area(*b))
    });

    for index in order {
        let mut bounds = diagram.nodes[index].bounds;
        let own_area = bounds.w * bounds.h;
        for (other_index, other) in diagram.nodes.iter().enumerate() {
            if other_index == index || !bounds.contains(other.bounds.center()) {
                continue;
            }
            if other.kind == NodeKind::Compartment && other.bounds.w * other.bounds.h >= own_area {
                continue;
            }
            bounds = enclose(bounds, other.bounds, settings.padding);
        }
        let (text_w, text_h) = label_size(&diagram.nodes[index].label, settings, measure);
        let compartment = &mut diagram.nodes[index];
        compartment.bounds = bounds;
        if !compartment.label.is_empty() {
            compartment.text_bounds = Some(BBox {
                x: bounds.x + settings.padding,
                y: bounds.y + settings.padding,
                w: text_w,
                h: text_h,
            });
        }
    }
}

fn label_size(label: &str, settings: &TightenSettings, measure: &dyn TextMeasure) -> (f64, f64) {
    if label.trim().is_empty() {
        (0.0, 0.0)
    } else {
        measure.measure(label, settings.font_px)
    }
}

fn enclose(outer: BBox, inner: BBox, padding: f64) -> BBox {
    let min_x = outer.x.min(inner.x - padding);
    let min_y = outer.y.min(inner.y - padding);
    let max_x = (outer.x + outer.w).max(inner.x + inner.w + padding);
    let max_y = (outer.y + outer.h).max(inner.y + inner.h + padding);
    BBox {
        x: min_x,
        y: min_y,
        w: max_x - min_x,
        h: max_y - min_y,
    }
}
