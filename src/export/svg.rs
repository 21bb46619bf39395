//! SVG export: one SVG document per page.

use super::archive::Archive;
use super::paint::{display_list, Paint};
use super::{xml_escape, ExportOptions};
use crate::error::Result;
use crate::model::{Color, Document, Rect, Rotation, TextStyle};
use base64::Engine;
use rayon::prelude::*;

/// Ascent used to place a text baseline below its top edge.
const ASCENT: f32 = 0.8;

fn rgb(color: Color) -> String {
    format!("rgb({},{},{})", color.r, color.g, color.b)
}

/// Render the page at `idx` as a standalone SVG document.
pub fn page_to_svg(doc: &Document, idx: usize) -> String {
    let page = &doc.pages[idx];
    let (w, h) = (page.width, page.height);
    let (dw, dh) = page.display_dimensions();

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{dw}pt" height="{dh}pt" viewBox="0 0 {dw} {dh}">"#,
        dw = dw,
        dh = dh
    );
    svg.push_str(&format!(
        r#"<rect x="0" y="0" width="{}" height="{}" fill="white"/>"#,
        dw, dh
    ));

    // clockwise page rotation
    let transform = match page.rotation {
        Rotation::R0 => None,
        Rotation::R90 => Some(format!("translate({} 0) rotate(90)", h)),
        Rotation::R180 => Some(format!("translate({} {}) rotate(180)", w, h)),
        Rotation::R270 => Some(format!("translate(0 {}) rotate(270)", w)),
    };
    match &transform {
        Some(t) => svg.push_str(&format!(r#"<g transform="{}">"#, t)),
        None => svg.push_str("<g>"),
    }

    for op in display_list(page, doc.context(idx)) {
        match op {
            Paint::Fill {
                rect,
                color,
                opacity,
            } => {
                svg.push_str(&format!(
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}"{}/>"#,
                    rect.x,
                    rect.y,
                    rect.width,
                    rect.height,
                    rgb(color),
                    opacity_attr(opacity)
                ));
            }
            Paint::Outline { rect, color } => {
                svg.push_str(&format!(
                    r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="{}" stroke-width="0.5"/>"#,
                    rect.x,
                    rect.y,
                    rect.width,
                    rect.height,
                    rgb(color)
                ));
            }
            Paint::Text {
                text,
                x,
                y,
                style,
                angle,
                opacity,
            } => text_element(&mut svg, &text, x, y, style, angle, opacity),
            Paint::Image {
                resource_id,
                rect,
                alt,
            } => image_element(&mut svg, doc, resource_id, rect, alt),
        }
    }

    svg.push_str("</g></svg>");
    svg
}

fn opacity_attr(opacity: f32) -> String {
    if opacity < 1.0 {
        format!(r#" opacity="{}""#, opacity)
    } else {
        String::new()
    }
}

fn text_element(
    svg: &mut String,
    text: &str,
    x: f32,
    y: f32,
    style: &TextStyle,
    angle: f32,
    opacity: f32,
) {
    let size = style.font_size;
    let mut attrs = format!(
        r#"x="{}" y="{}" font-size="{}" fill="{}""#,
        x,
        y + size * ASCENT,
        size,
        rgb(style.color)
    );
    attrs.push_str(&format!(
        r#" font-family="{}""#,
        xml_escape(style.font_name.as_deref().unwrap_or("Helvetica"))
    ));
    if style.bold {
        attrs.push_str(r#" font-weight="bold""#);
    }
    if style.italic {
        attrs.push_str(r#" font-style="italic""#);
    }
    if style.underline {
        attrs.push_str(r#" text-decoration="underline""#);
    }
    if angle != 0.0 {
        // SVG rotates clockwise
        attrs.push_str(&format!(r#" transform="rotate({} {} {})""#, -angle, x, y));
    }
    attrs.push_str(&opacity_attr(opacity));

    svg.push_str(&format!(r#"<text {} xml:space="preserve">"#, attrs));
    for (i, line) in text.lines().enumerate() {
        if i == 0 {
            svg.push_str(&format!(r#"<tspan x="{}">{}</tspan>"#, x, xml_escape(line)));
        } else {
            svg.push_str(&format!(
                r#"<tspan x="{}" dy="{}">{}</tspan>"#,
                x,
                size * 1.2,
                xml_escape(line)
            ));
        }
    }
    svg.push_str("</text>");
}

fn image_element(svg: &mut String, doc: &Document, resource_id: &str, rect: Rect, alt: Option<&str>) {
    let Some(resource) = doc.get_resource(resource_id) else {
        log::warn!("image {} has no resource; skipped", resource_id);
        return;
    };
    let data = base64::engine::general_purpose::STANDARD.encode(&resource.data);
    svg.push_str(&format!(
        r#"<image x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="none" href="data:{};base64,{}">"#,
        rect.x, rect.y, rect.width, rect.height, resource.mime_type, data
    ));
    if let Some(alt) = alt {
        svg.push_str(&format!("<title>{}</title>", xml_escape(alt)));
    }
    svg.push_str("</image>");
}

/// Zip archive holding `page-N.svg` for every page.
pub(crate) fn to_svg_zip(doc: &Document, _options: &ExportOptions) -> Result<Vec<u8>> {
    let pages: Vec<String> = (0..doc.pages.len())
        .into_par_iter()
        .map(|idx| page_to_svg(doc, idx))
        .collect();

    let mut archive = Archive::new();
    for (i, svg) in pages.iter().enumerate() {
        archive.add(&format!("page-{}.svg", i + 1), svg)?;
    }
    archive.finish()
}
