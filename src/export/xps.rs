//! OpenXPS fixed-layout export.
//!
//! Each page becomes a FixedPage drawn from the shared display list. XPS
//! measures in 1/96 inch. Text is written as `Glyphs` when the document
//! carries the font program; otherwise the glyphs are drawn as boxes, the
//! same way the rasterizer draws them.

use super::archive::Archive;
use super::office::{
    add_doc_props, content_types, doc_prop_overrides, media_file_name, package_rels, NS_PKG_REL, XML_DECL,
};
use super::paint::{display_list, glyph_boxes, Paint};
use super::{xml_escape, ExportOptions};
use crate::error::Result;
use crate::model::{Color, Document, Page, PageContext, Rect, Rotation, TextStyle};
use crate::ops::font_resource_id;
use std::collections::BTreeMap;
use std::io::Cursor;

const NS_XPS: &str = "http://schemas.openxps.org/oxps/v1.0";
const REL_FIXED_REPRESENTATION: &str = "http://schemas.openxps.org/oxps/v1.0/fixedrepresentation";
const REL_REQUIRED_RESOURCE: &str = "http://schemas.openxps.org/oxps/v1.0/required-resource";
const ASCENT: f32 = 0.8;

/// Points to XPS units.
fn units(pt: f32) -> f32 {
    pt * 96.0 / 72.0
}

fn argb(color: Color) -> String {
    format!("#FF{:02X}{:02X}{:02X}", color.r, color.g, color.b)
}

fn rect_data(rect: Rect) -> String {
    format!(
        "M {},{} H {} V {} H {} Z",
        units(rect.x),
        units(rect.y),
        units(rect.right()),
        units(rect.bottom()),
        units(rect.x)
    )
}

/// Fonts and images a page needs, keyed by part name.
#[derive(Default)]
struct PageResources {
    parts: BTreeMap<String, &'static str>,
}

/// Part name of the embedded font program for `font_name`, when present.
fn font_part(doc: &Document, font_name: &str) -> Option<String> {
    let id = font_resource_id(font_name);
    let resource = doc.get_resource(&id)?;
    (resource.is_font() && !resource.data.is_empty())
        .then(|| format!("/Resources/Fonts/{}", media_file_name(&id, resource.extension())))
}

/// Image part name and its pixel size.
fn image_part(doc: &Document, resource_id: &str) -> Option<(String, u32, u32)> {
    let resource = doc.get_resource(resource_id).filter(|r| r.is_image())?;
    let (w, h) = match (resource.width, resource.height) {
        (Some(w), Some(h)) => (w, h),
        _ => image::ImageReader::new(Cursor::new(&resource.data))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()?,
    };
    Some((
        format!("/Resources/Images/{}", media_file_name(resource_id, resource.extension())),
        w,
        h,
    ))
}

fn fixed_page(doc: &Document, page: &Page, ctx: PageContext, res: &mut PageResources) -> String {
    let (w, h) = (units(page.width), units(page.height));
    let (dw, dh) = page.display_dimensions();
    let mut xml = format!(
        r#"{}<FixedPage xmlns="{}" Width="{}" Height="{}" xml:lang="und">"#,
        XML_DECL,
        NS_XPS,
        units(dw),
        units(dh)
    );

    // clockwise page rotation
    let matrix = match page.rotation {
        Rotation::R0 => None,
        Rotation::R90 => Some(format!("0,1,-1,0,{},0", h)),
        Rotation::R180 => Some(format!("-1,0,0,-1,{},{}", w, h)),
        Rotation::R270 => Some(format!("0,-1,1,0,0,{}", w)),
    };
    match &matrix {
        Some(m) => xml.push_str(&format!(r#"<Canvas RenderTransform="{}">"#, m)),
        None => xml.push_str("<Canvas>"),
    }

    for op in display_list(page, ctx) {
        match op {
            Paint::Fill {
                rect,
                color,
                opacity,
            } => xml.push_str(&format!(
                r#"<Path Data="{}" Fill="{}" Opacity="{}"/>"#,
                rect_data(rect),
                argb(color),
                opacity
            )),
            Paint::Outline { rect, color } => xml.push_str(&format!(
                r#"<Path Data="{}" Stroke="{}" StrokeThickness="0.75"/>"#,
                rect_data(rect),
                argb(color)
            )),
            Paint::Text {
                text,
                x,
                y,
                style,
                angle,
                opacity,
            } => text_xml(&mut xml, doc, res, &text, x, y, style, angle, opacity),
            Paint::Image {
                resource_id, rect, ..
            } => match image_part(doc, resource_id) {
                Some((part, pw, ph)) => {
                    xml.push_str(&format!(
                        r#"<Path Data="{}"><Path.Fill><ImageBrush ImageSource="{}" Viewbox="0,0,{},{}" ViewboxUnits="Absolute" Viewport="{},{},{},{}" ViewportUnits="Absolute"/></Path.Fill></Path>"#,
                        rect_data(rect),
                        part,
                        pw,
                        ph,
                        units(rect.x),
                        units(rect.y),
                        units(rect.width),
                        units(rect.height)
                    ));
                    res.parts.insert(part, "image");
                }
                None => log::warn!("image {} has no usable resource; skipped", resource_id),
            },
        }
    }

    xml.push_str("</Canvas></FixedPage>");
    xml
}

#[allow(clippy::too_many_arguments)]
fn text_xml(
    xml: &mut String,
    doc: &Document,
    res: &mut PageResources,
    text: &str,
    x: f32,
    y: f32,
    style: &TextStyle,
    angle: f32,
    opacity: f32,
) {
    let transform = if angle == 0.0 {
        String::new()
    } else {
        let (sin, cos) = angle.to_radians().sin_cos();
        let (ux, uy) = (units(x), units(y));
        format!(
            r#" RenderTransform="{},{},{},{},{},{}""#,
            cos,
            -sin,
            sin,
            cos,
            ux - ux * cos - uy * sin,
            uy + ux * sin - uy * cos
        )
    };
    let font = style.font_name.as_deref().unwrap_or("Helvetica");

    match font_part(doc, font) {
        Some(part) => {
            xml.push_str(&format!(r#"<Canvas Opacity="{}"{}>"#, opacity, transform));
            for (l, line) in text.lines().enumerate() {
                if line.is_empty() {
                    continue;
                }
                // a leading brace must be escaped
                let escaped = if line.starts_with('{') {
                    format!("{{}}{}", line)
                } else {
                    line.to_string()
                };
                xml.push_str(&format!(
                    r#"<Glyphs Fill="{}" FontUri="{}" FontRenderingEmSize="{}" OriginX="{}" OriginY="{}" UnicodeString="{}"/>"#,
                    argb(style.color),
                    part,
                    units(style.font_size),
                    units(x),
                    units(y + style.font_size * (ASCENT + 1.2 * l as f32)),
                    xml_escape(&escaped)
                ));
            }
            xml.push_str("</Canvas>");
            res.parts.insert(part, "font");
        }
        None => {
            let data: Vec<String> = glyph_boxes(text, x, y, style.font_size)
                .into_iter()
                .map(rect_data)
                .collect();
            if !data.is_empty() {
                xml.push_str(&format!(
                    r#"<Path Data="{}" Fill="{}" Opacity="{}"{}/>"#,
                    data.join(" "),
                    argb(style.color),
                    opacity,
                    transform
                ));
            }
        }
    }
}

/// Render the document as an OpenXPS package.
pub(crate) fn to_xps(doc: &Document, _options: &ExportOptions) -> Result<Vec<u8>> {
    let mut archive = Archive::new();
    let mut overrides = vec![
        (
            "/FixedDocumentSequence.fdseq".to_string(),
            "application/vnd.ms-package.xps-fixeddocumentsequence+xml",
        ),
        (
            "/Documents/1/FixedDocument.fdoc".to_string(),
            "application/vnd.ms-package.xps-fixeddocument+xml",
        ),
    ];
    overrides.extend(doc_prop_overrides());

    let mut page_refs = String::new();
    let mut pages = Vec::with_capacity(doc.pages.len());
    let mut used = BTreeMap::new();
    for (i, page) in doc.pages.iter().enumerate() {
        let n = i + 1;
        let (dw, dh) = page.display_dimensions();
        page_refs.push_str(&format!(
            r#"<PageContent Source="Pages/{}.fpage" Width="{}" Height="{}"/>"#,
            n,
            units(dw),
            units(dh)
        ));
        overrides.push((
            format!("/Documents/1/Pages/{}.fpage", n),
            "application/vnd.ms-package.xps-fixedpage+xml",
        ));

        let mut res = PageResources::default();
        let xml = fixed_page(doc, page, doc.context(i), &mut res);
        let rels: String = res
            .parts
            .keys()
            .enumerate()
            .map(|(r, part)| {
                format!(
                    r#"<Relationship Id="R{}" Type="{}" Target="{}"/>"#,
                    r + 1,
                    REL_REQUIRED_RESOURCE,
                    xml_escape(part)
                )
            })
            .collect();
        used.extend(res.parts);
        pages.push((xml, rels));
    }

    for (part, kind) in &used {
        if *kind == "font" {
            overrides.push((part.clone(), "application/vnd.ms-opentype"));
        }
    }

    archive.add("[Content_Types].xml", content_types(&overrides))?;
    archive.add("_rels/.rels", package_rels(REL_FIXED_REPRESENTATION, "FixedDocumentSequence.fdseq"))?;
    add_doc_props(&mut archive, doc)?;
    archive.add(
        "FixedDocumentSequence.fdseq",
        format!(
            r#"{}<FixedDocumentSequence xmlns="{}"><DocumentReference Source="/Documents/1/FixedDocument.fdoc"/></FixedDocumentSequence>"#,
            XML_DECL, NS_XPS
        ),
    )?;
    archive.add(
        "Documents/1/FixedDocument.fdoc",
        format!(r#"{}<FixedDocument xmlns="{}">{}</FixedDocument>"#, XML_DECL, NS_XPS, page_refs),
    )?;
    for (i, (xml, rels)) in pages.into_iter().enumerate() {
        archive.add(&format!("Documents/1/Pages/{}.fpage", i + 1), xml)?;
        if !rels.is_empty() {
            archive.add(
                &format!("Documents/1/Pages/_rels/{}.fpage.rels", i + 1),
                format!(r#"{}<Relationships xmlns="{}">{}</Relationships>"#, XML_DECL, NS_PKG_REL, rels),
            )?;
        }
    }

    // resource parts are written once, whatever page first used them
    for (id, resource) in &doc.resources {
        let folder = if resource.is_font() { "Fonts" } else { "Images" };
        let part = format!("/Resources/{}/{}", folder, media_file_name(id, resource.extension()));
        if used.contains_key(&part) {
            archive.add(&part[1..], &resource.data)?;
        }
    }
    archive.finish()
}
