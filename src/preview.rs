//! Raster and vector previews of a document's layout.

use std::fs;
use std::path::{Path, PathBuf};

use cairo::{Context as CairoContext, Format, ImageSurface, LineCap, SvgSurface};
use pango::{Alignment, FontDescription};
use pangocairo::functions as pangocairo;

use crate::diagram::{BBox, Bounds, Point};
use crate::document::{Curve, Document, Layout};
use crate::error::{ConvertError, Result};
use crate::model::Role;
use crate::tighten::{FONT_FAMILY, FONT_PX};

const DEFAULT_PADDING_PX: f64 = 10.0;
const DEFAULT_LINE_WIDTH: f64 = 1.5;
const TEXT_OUTLINE_WIDTH: f64 = 0.75;
const ARROW_SIZE: f64 = 8.0;
const BAR_LENGTH: f64 = 12.0;
const PROCESS_SIZE: f64 = 8.0;
const CORNER_RADIUS: f64 = 6.0;
const CATALYSIS_OVERLAP_RATIO: f64 = 0.5;
const BORDER_COLOR: (f64, f64, f64) = (0x55 as f64 / 255.0, 0x55 as f64 / 255.0, 0x55 as f64 / 255.0);
const DEFAULT_FILL_COLOR: (f64, f64, f64) = (0xF6 as f64 / 255.0, 0xF6 as f64 / 255.0, 0xF6 as f64 / 255.0);
const COMPARTMENT_FILL_COLOR: (f64, f64, f64) = (0xFF as f64 / 255.0, 0xFB as f64 / 255.0, 0xEB as f64 / 255.0);

#[derive(Clone, Copy, Debug)]
struct Transform {
    min_x: f64,
    min_y: f64,
}

impl Transform {
    fn map_point(&self, point: Point) -> Point {
        Point::new(point.x - self.min_x, point.y - self.min_y)
    }

    fn map_bbox(&self, bbox: BBox) -> BBox {
        let origin = self.map_point(Point::new(bbox.x, bbox.y));
        BBox {
            x: origin.x,
            y: origin.y,
            w: bbox.w,
            h: bbox.h,
        }
    }
}

/// Sibling `.svg` path for a `.png` output.
pub fn default_svg_output_path(output: &Path) -> PathBuf {
    let mut svg_path = output.to_path_buf();
    svg_path.set_extension("svg");
    svg_path
}

/// Render `doc`'s layout to a PNG at `output` and an SVG next to it.
pub fn render_preview(doc: &Document, output: &Path) -> Result<()> {
    let Some(layout) = &doc.model.layout else {
        tracing::warn!(model = %doc.model.id, "no layout to preview");
        return Ok(());
    };
    let (transform, width, height) = transform_with_padding(layout_bounds(layout), DEFAULT_PADDING_PX);

    let (surface, ctx) = create_png_surface(width.ceil() as i32, height.ceil() as i32)?;
    render_layout(&ctx, &transform, doc, layout)?;
    drop(ctx);
    let mut file = fs::File::create(output).map_err(|source| ConvertError::Io {
        path: output.to_path_buf(),
        source,
    })?;
    surface.write_to_png(&mut file)?;

    let svg_path = default_svg_output_path(output);
    render_svg(&svg_path, width, height, |ctx| {
        render_layout(ctx, &transform, doc, layout)
    })?;
    tracing::info!(png = %output.display(), svg = %svg_path.display(), "preview written");
    Ok(())
}

fn setup_context(ctx: &CairoContext) -> Result<()> {
    ctx.set_source_rgb(1.0, 1.0, 1.0);
    ctx.paint()?;
    ctx.set_source_rgb(BORDER_COLOR.0, BORDER_COLOR.1, BORDER_COLOR.2);
    ctx.set_line_width(DEFAULT_LINE_WIDTH);
    ctx.set_line_cap(LineCap::Square);
    Ok(())
}

fn create_png_surface(width: i32, height: i32) -> Result<(ImageSurface, CairoContext)> {
    let surface = ImageSurface::create(Format::ARgb32, width.max(1), height.max(1))?;
    let ctx = CairoContext::new(&surface)?;
    setup_context(&ctx)?;
    Ok((surface, ctx))
}

fn render_svg<F>(svg_path: &Path, width: f64, height: f64, render: F) -> Result<()>
where
    F: FnOnce(&CairoContext) -> Result<()>,
{
    let surface = SvgSurface::new(width, height, Some(svg_path))?;
    let ctx = CairoContext::new(&surface)?;
    setup_context(&ctx)?;
    render(&ctx)?;
    drop(ctx);
    surface.finish();
    Ok(())
}

fn layout_bounds(layout: &Layout) -> Bounds {
    let mut bounds = Bounds::empty();
    let boxes = layout
        .compartment_glyphs
        .iter()
        .map(|glyph| glyph.bbox)
        .chain(layout.species_glyphs.iter().map(|glyph| glyph.bbox));
    for bbox in boxes {
        bounds.include_bbox(bbox);
    }
    for glyph in &layout.reaction_glyphs {
        let curves = std::iter::once(&glyph.curve)
            .chain(glyph.species_reference_glyphs.iter().map(|r| &r.curve));
        for point in curves.flat_map(Curve::points) {
            bounds.include_point(point);
        }
    }
    if bounds.is_empty() {
        bounds.include_point(Point::new(0.0, 0.0));
        bounds.include_point(Point::new(layout.width, layout.height));
    }
    bounds
}

/// Compute a padded transform and canvas size from data bounds.
fn transform_with_padding(bounds: Bounds, padding: f64) -> (Transform, f64, f64) {
    let min_x = bounds.min_x - padding;
    let min_y = bounds.min_y - padding;
    let width = (bounds.max_x + padding - min_x).abs().max(1.0);
    let height = (bounds.max_y + padding - min_y).abs().max(1.0);
    (Transform { min_x, min_y }, width, height)
}

fn render_layout(
    ctx: &CairoContext,
    transform: &Transform,
    doc: &Document,
    layout: &Layout,
) -> Result<()> {
    // Largest compartments first so nested ones paint on top.
    let mut compartments: Vec<_> = layout.compartment_glyphs.iter().collect();
    compartments.sort_by(|a, b| (b.bbox.w * b.bbox.h).total_cmp(&(a.bbox.w * a.bbox.h)));
    for glyph in compartments {
        let rect = transform.map_bbox(glyph.bbox);
        path_round_rect(ctx, rect, CORNER_RADIUS * 2.0);
        fill_and_stroke(ctx, COMPARTMENT_FILL_COLOR)?;
    }

    for glyph in &layout.reaction_glyphs {
        let backbone: Vec<Point> = glyph
            .curve
            .points()
            .into_iter()
            .map(|p| transform.map_point(p))
            .collect();
        stroke_polyline(ctx, &backbone)?;
        for reference in &glyph.species_reference_glyphs {
            let mut points: Vec<Point> = reference
                .curve
                .points()
                .into_iter()
                .map(|p| transform.map_point(p))
                .collect();
            // Curves other than inputs start at the end that carries the marker.
            if reference.role != Role::Input {
                points.reverse();
            }
            draw_arc(ctx, &points, reference.role)?;
        }
        if !backbone.is_empty() {
            draw_process_node(ctx, backbone[backbone.len() / 2])?;
        }
    }

    for glyph in &layout.species_glyphs {
        let rect = transform.map_bbox(glyph.bbox);
        path_round_rect(ctx, rect, CORNER_RADIUS);
        fill_and_stroke(ctx, DEFAULT_FILL_COLOR)?;
    }

    for glyph in &layout.text_glyphs {
        let label = doc
            .species(&glyph.origin_of_text)
            .map(|species| species.name.as_str())
            .or_else(|| {
                doc.compartment(&glyph.origin_of_text)
                    .map(|compartment| compartment.name.as_str())
            })
            .unwrap_or_default();
        let rect = transform.map_bbox(glyph.bbox);
        draw_text_centered(ctx, rect.center(), label, FONT_PX)?;
    }
    Ok(())
}

fn fill_and_stroke(ctx: &CairoContext, fill: (f64, f64, f64)) -> Result<()> {
    ctx.set_source_rgb(fill.0, fill.1, fill.2);
    ctx.fill_preserve()?;
    ctx.set_source_rgb(BORDER_COLOR.0, BORDER_COLOR.1, BORDER_COLOR.2);
    ctx.set_line_width(DEFAULT_LINE_WIDTH);
    ctx.stroke()?;
    Ok(())
}

fn stroke_polyline(ctx: &CairoContext, points: &[Point]) -> Result<()> {
    ctx.set_source_rgb(BORDER_COLOR.0, BORDER_COLOR.1, BORDER_COLOR.2);
    ctx.set_line_width(DEFAULT_LINE_WIDTH);
    for pair in points.windows(2) {
        ctx.move_to(pair[0].x, pair[0].y);
        ctx.line_to(pair[1].x, pair[1].y);
        ctx.stroke()?;
    }
    Ok(())
}

fn draw_process_node(ctx: &CairoContext, center: Point) -> Result<()> {
    let half = PROCESS_SIZE / 2.0;
    ctx.new_path();
    ctx.rectangle(center.x - half, center.y - half, PROCESS_SIZE, PROCESS_SIZE);
    fill_and_stroke(ctx, (1.0, 1.0, 1.0))
}

/// Stroke `points` and decorate the final segment according to `role`.
fn draw_arc(ctx: &CairoContext, points: &[Point], role: Role) -> Result<()> {
    if points.len() < 2 {
        return Ok(());
    }
    stroke_polyline(ctx, points)?;

    let end = points[points.len() - 1];
    let prev = points[points.len() - 2];
    match role {
        Role::Input => {}
        Role::Output => draw_filled_triangle(ctx, end, prev, ARROW_SIZE)?,
        Role::Catalyst => draw_filled_circle_tangent(ctx, end, prev, ARROW_SIZE * 0.4)?,
        Role::PositiveRegulator => draw_open_triangle_opaque(ctx, end, prev, ARROW_SIZE)?,
        Role::NegativeRegulator => draw_inhibition_bar(ctx, end, prev, BAR_LENGTH)?,
    }
    Ok(())
}

fn path_round_rect(ctx: &CairoContext, rect: BBox, radius: f64) {
    use std::f64::consts::{FRAC_PI_2, PI};

    let radius = radius.min(rect.w / 2.0).min(rect.h / 2.0).max(0.0);
    let (x, y) = (rect.x, rect.y);
    let right = x + rect.w;
    let bottom = y + rect.h;

    ctx.new_path();
    ctx.move_to(x + radius, y);
    ctx.line_to(right - radius, y);
    ctx.arc(right - radius, y + radius, radius, -FRAC_PI_2, 0.0);
    ctx.line_to(right, bottom - radius);
    ctx.arc(right - radius, bottom - radius, radius, 0.0, FRAC_PI_2);
    ctx.line_to(x + radius, bottom);
    ctx.arc(x + radius, bottom - radius, radius, FRAC_PI_2, PI);
    ctx.line_to(x, y + radius);
    ctx.arc(x + radius, y + radius, radius, PI, FRAC_PI_2 * 3.0);
    ctx.close_path();
}

fn draw_filled_circle(ctx: &CairoContext, center: Point, radius: f64) -> Result<()> {
    ctx.new_path();
    ctx.arc(center.x, center.y, radius.max(1.0), 0.0, std::f64::consts::TAU);
    fill_and_stroke(ctx, (1.0, 1.0, 1.0))
}

fn draw_filled_circle_tangent(ctx: &CairoContext, end: Point, prev: Point, radius: f64) -> Result<()> {
    let Some((ux, uy)) = unit(end, prev) else {
        return draw_filled_circle(ctx, end, radius);
    };
    let offset = (radius - (radius * CATALYSIS_OVERLAP_RATIO).max(0.0)).max(0.0);
    draw_filled_circle(ctx, end.offset(-ux * offset, -uy * offset), radius)
}

fn draw_open_triangle_opaque(ctx: &CairoContext, end: Point, prev: Point, size: f64) -> Result<()> {
    let Some((p1, p2, tip)) = triangle_points(end, prev, size) else {
        return Ok(());
    };
    ctx.move_to(p1.x, p1.y);
    ctx.line_to(p2.x, p2.y);
    ctx.line_to(tip.x, tip.y);
    ctx.close_path();
    fill_and_stroke(ctx, (1.0, 1.0, 1.0))
}

fn draw_filled_triangle(ctx: &CairoContext, end: Point, prev: Point, size: f64) -> Result<()> {
    let Some((p1, p2, tip)) = triangle_points(end, prev, size) else {
        return Ok(());
    };
    ctx.move_to(p1.x, p1.y);
    ctx.line_to(p2.x, p2.y);
    ctx.line_to(tip.x, tip.y);
    ctx.close_path();
    ctx.fill()?;
    Ok(())
}

fn unit(end: Point, prev: Point) -> Option<(f64, f64)> {
    let dx = end.x - prev.x;
    let dy = end.y - prev.y;
    let length = (dx * dx + dy * dy).sqrt();
    (length > 0.0).then(|| (dx / length, dy / length))
}

fn triangle_points(end: Point, prev: Point, size: f64) -> Option<(Point, Point, Point)> {
    let (ux, uy) = unit(end, prev)?;
    let base = end.offset(-ux * size, -uy * size);
    let half_width = size * 0.6;
    let p1 = base.offset(-uy * half_width, ux * half_width);
    let p2 = base.offset(uy * half_width, -ux * half_width);
    Some((p1, p2, end))
}

fn draw_inhibition_bar(ctx: &CairoContext, end: Point, prev: Point, length: f64) -> Result<()> {
    let Some((ux, uy)) = unit(end, prev) else {
        return Ok(());
    };
    let half = length / 2.0;
    let p0 = end.offset(uy * half, -ux * half);
    let p1 = end.offset(-uy * half, ux * half);
    ctx.move_to(p0.x, p0.y);
    ctx.line_to(p1.x, p1.y);
    ctx.stroke()?;
    Ok(())
}

fn draw_text_centered(ctx: &CairoContext, center: Point, text: &str, font_px: f64) -> Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }
    let layout = pangocairo::create_layout(ctx);
    let mut font_desc = FontDescription::from_string(FONT_FAMILY);
    font_desc.set_absolute_size(font_px * pango::SCALE as f64);
    layout.set_font_description(Some(&font_desc));
    layout.set_alignment(Alignment::Center);
    layout.set_text(text);

    let (width, height) = layout.pixel_size();
    ctx.move_to(center.x - width as f64 / 2.0, center.y - height as f64 / 2.0);
    pangocairo::layout_path(ctx, &layout);
    if TEXT_OUTLINE_WIDTH > 0.0 {
        ctx.set_source_rgb(1.0, 1.0, 1.0);
        ctx.set_line_width(TEXT_OUTLINE_WIDTH);
        ctx.stroke_preserve()?;
    }
    ctx.set_source_rgb(BORDER_COLOR.0, BORDER_COLOR.1, BORDER_COLOR.2);
    ctx.fill()?;
    ctx.set_line_width(DEFAULT_LINE_WIDTH);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svg_path_replaces_extension() {
        assert_eq!(
            default_svg_output_path(Path::new("out/R-HSA-1.png")),
            PathBuf::from("out/R-HSA-1.svg")
        );
    }

    #[test]
    fn padding_shifts_origin() {
        let mut bounds = Bounds::empty();
        bounds.include_bbox(BBox {
            x: 10.0,
            y: 20.0,
            w: 100.0,
            h: 50.0,
        });
        let (transform, width, height) = transform_with_padding(bounds, 10.0);
        assert_eq!(width, 120.0);
        assert_eq!(height, 70.0);
        assert_eq!(transform.map_point(Point::new(10.0, 20.0)), Point::new(10.0, 10.0));
    }

    #[test]
    fn triangle_tip_is_segment_end() {
        let (p1, p2, tip) =
            triangle_points(Point::new(10.0, 0.0), Point::new(0.0, 0.0), 5.0).unwrap();
        assert_eq!(tip, Point::new(10.0, 0.0));
        assert_eq!(p1.x, 5.0);
        assert_eq!(p2.x, 5.0);
        assert_eq!(p1.y, -p2.y);
        assert!(triangle_points(Point::new(1.0, 1.0), Point::new(1.0, 1.0), 5.0).is_none());
    }
}
