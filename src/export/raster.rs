//! Page rasterization and raster encoders.
//!
//! Pages are drawn from the shared display list onto an RGBA canvas at
//! `dpi / 72` pixels per point. There is no font rasterizer: every glyph is
//! drawn as a solid box in the text color. Page rotation is applied to the
//! finished canvas.

use super::paint::{display_list, glyph_boxes, Paint};
use super::{dicom, ExportOptions, PageFormat, DEFAULT_TIFF_DPI};
use crate::error::{Error, Result};
use crate::model::{Color, Document, Rect, Rotation};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbImage, Rgba, RgbaImage};
use rayon::prelude::*;
use std::io::Cursor;
use tiff::encoder::{colortype, Rational, TiffEncoder};
use tiff::tags::ResolutionUnit;

/// Largest raster edge, in pixels.
pub const MAX_RASTER_PIXELS: u32 = 20_000;

const PLACEHOLDER: Color = Color::rgb(220, 220, 220);

/// Render page `page_num` (1-indexed) at `dpi`.
pub fn render_page(doc: &Document, page_num: u32, dpi: u32) -> Result<RgbImage> {
    let idx = doc.index_of(page_num)?;
    render_index(doc, idx, dpi)
}

pub(crate) fn render_index(doc: &Document, idx: usize, dpi: u32) -> Result<RgbImage> {
    if dpi == 0 {
        return Err(Error::InvalidArgument("resolution must be positive".into()));
    }
    let page = &doc.pages[idx];
    if !page.has_valid_dimensions() {
        return Err(Error::InvalidArgument(format!(
            "page {} has invalid dimensions {}x{}",
            idx + 1,
            page.width,
            page.height
        )));
    }

    let scale = dpi as f32 / 72.0;
    let width = (page.width * scale).round();
    let height = (page.height * scale).round();
    let limit = MAX_RASTER_PIXELS as f32;
    if width < 1.0 || height < 1.0 || width > limit || height > limit {
        return Err(Error::InvalidArgument(format!(
            "raster of {}x{} pixels exceeds the {} pixel limit",
            width, height, MAX_RASTER_PIXELS
        )));
    }

    let mut canvas = RgbaImage::from_pixel(width as u32, height as u32, Rgba([255, 255, 255, 255]));
    for op in display_list(page, doc.context(idx)) {
        match op {
            Paint::Fill {
                rect,
                color,
                opacity,
            } => fill(&mut canvas, scaled(rect, scale), color, opacity),
            Paint::Outline { rect, color } => outline(&mut canvas, scaled(rect, scale), color),
            Paint::Text {
                text,
                x,
                y,
                style,
                angle,
                opacity,
            } => {
                let (sin, cos) = angle.to_radians().sin_cos();
                for glyph in glyph_boxes(&text, x, y, style.font_size) {
                    let glyph = if angle == 0.0 {
                        glyph
                    } else {
                        // move the box center around the anchor; y grows downward
                        let dx = glyph.x + glyph.width / 2.0 - x;
                        let dy = glyph.y + glyph.height / 2.0 - y;
                        let cx = x + dx * cos + dy * sin;
                        let cy = y - dx * sin + dy * cos;
                        Rect::new(
                            cx - glyph.width / 2.0,
                            cy - glyph.height / 2.0,
                            glyph.width,
                            glyph.height,
                        )
                    };
                    fill(&mut canvas, scaled(glyph, scale), style.color, opacity);
                }
            }
            Paint::Image {
                resource_id, rect, ..
            } => draw_image(&mut canvas, doc, resource_id, scaled(rect, scale)),
        }
    }

    let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
    Ok(match page.rotation {
        Rotation::R0 => rgb,
        Rotation::R90 => imageops::rotate90(&rgb),
        Rotation::R180 => imageops::rotate180(&rgb),
        Rotation::R270 => imageops::rotate270(&rgb),
    })
}

fn scaled(rect: Rect, scale: f32) -> Rect {
    Rect::new(
        rect.x * scale,
        rect.y * scale,
        rect.width * scale,
        rect.height * scale,
    )
}

/// Pixel span of `rect` clipped to the canvas, as `(x0, y0, x1, y1)`.
fn pixel_span(canvas: &RgbaImage, rect: Rect) -> Option<(u32, u32, u32, u32)> {
    if !rect.is_finite() {
        return None;
    }
    let x0 = rect.x.round().max(0.0) as u32;
    let y0 = rect.y.round().max(0.0) as u32;
    let x1 = (rect.right().round().max(0.0) as u32).min(canvas.width());
    let y1 = (rect.bottom().round().max(0.0) as u32).min(canvas.height());
    (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
}

fn fill(canvas: &mut RgbaImage, rect: Rect, color: Color, opacity: f32) {
    let Some((x0, y0, x1, y1)) = pixel_span(canvas, rect) else {
        return;
    };
    let alpha = opacity.clamp(0.0, 1.0);
    let src = [color.r, color.g, color.b];
    for y in y0..y1 {
        for x in x0..x1 {
            let px = canvas.get_pixel_mut(x, y);
            for c in 0..3 {
                px.0[c] = (px.0[c] as f32 * (1.0 - alpha) + src[c] as f32 * alpha).round() as u8;
            }
        }
    }
}

fn outline(canvas: &mut RgbaImage, rect: Rect, color: Color) {
    let Some((x0, y0, x1, y1)) = pixel_span(canvas, rect) else {
        return;
    };
    let px = Rgba([color.r, color.g, color.b, 255]);
    for x in x0..x1 {
        canvas.put_pixel(x, y0, px);
        canvas.put_pixel(x, y1 - 1, px);
    }
    for y in y0..y1 {
        canvas.put_pixel(x0, y, px);
        canvas.put_pixel(x1 - 1, y, px);
    }
}

fn draw_image(canvas: &mut RgbaImage, doc: &Document, resource_id: &str, rect: Rect) {
    let Some((x0, y0, x1, y1)) = pixel_span(canvas, rect) else {
        return;
    };
    let decoded = match doc.get_resource(resource_id) {
        Some(resource) => image::load_from_memory(&resource.data).map_err(|e| e.to_string()),
        None => Err("missing resource".to_string()),
    };
    match decoded {
        Ok(img) => {
            let src = img.to_rgba8();
            let (sx, sy, sw, sh) = visible_source(&src, rect, (x0, y0, x1, y1));
            let crop = imageops::crop_imm(&src, sx, sy, sw, sh).to_image();
            let resized = imageops::resize(&crop, x1 - x0, y1 - y0, FilterType::Triangle);
            imageops::overlay(canvas, &resized, i64::from(x0), i64::from(y0));
        }
        Err(reason) => {
            log::warn!("image {} not drawn: {}", resource_id, reason);
            let span = Rect::new(x0 as f32, y0 as f32, (x1 - x0) as f32, (y1 - y0) as f32);
            fill(canvas, span, PLACEHOLDER, 1.0);
        }
    }
}

/// Region of `src` that lands on the visible pixel span of `rect`.
///
/// Only the visible span is ever resampled, so the work stays bounded by the
/// canvas however large the rectangle is.
fn visible_source(src: &RgbaImage, rect: Rect, span: (u32, u32, u32, u32)) -> (u32, u32, u32, u32) {
    let (x0, y0, x1, y1) = span;
    let map = |px: u32, origin: f32, extent: f32, size: u32| -> f64 {
        let t = (f64::from(px) - f64::from(origin)) / f64::from(extent.max(f32::MIN_POSITIVE));
        (t * f64::from(size)).clamp(0.0, f64::from(size))
    };
    let (w, h) = src.dimensions();
    let sx0 = map(x0, rect.x, rect.width, w).floor() as u32;
    let sx1 = map(x1, rect.x, rect.width, w).ceil() as u32;
    let sy0 = map(y0, rect.y, rect.height, h).floor() as u32;
    let sy1 = map(y1, rect.y, rect.height, h).ceil() as u32;
    let sx0 = sx0.min(w.saturating_sub(1));
    let sy0 = sy0.min(h.saturating_sub(1));
    (sx0, sy0, sx1.saturating_sub(sx0).max(1), sy1.saturating_sub(sy0).max(1))
}

/// Render and encode one page.
pub(crate) fn encode_page(
    doc: &Document,
    idx: usize,
    format: PageFormat,
    dpi: u32,
    jpeg_quality: u8,
) -> Result<Vec<u8>> {
    let img = render_index(doc, idx, dpi)?;
    let mut buf = Vec::new();
    match format {
        PageFormat::Png => DynamicImage::ImageRgb8(img).write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?,
        PageFormat::Bmp => DynamicImage::ImageRgb8(img).write_to(&mut Cursor::new(&mut buf), ImageFormat::Bmp)?,
        PageFormat::Jpeg => {
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, jpeg_quality).encode_image(&img)?
        }
        PageFormat::Tiff => buf = write_tiff(&[img], dpi)?,
        PageFormat::Dicom => {
            let gray = DynamicImage::ImageRgb8(img).to_luma8();
            buf = dicom::encode(&gray, dpi, &doc.metadata)?;
        }
        PageFormat::Svg | PageFormat::Native => {
            return Err(Error::Internal(format!("{} is not a raster format", format.extension())))
        }
    }
    Ok(buf)
}

/// Every page as one frame of a TIFF file.
pub(crate) fn to_multipage_tiff(doc: &Document, options: &ExportOptions) -> Result<Vec<u8>> {
    let dpi = options.resolution_or(DEFAULT_TIFF_DPI)?;
    if doc.pages.is_empty() {
        return Err(Error::Export("cannot write a TIFF without pages".into()));
    }
    let frames = (0..doc.pages.len())
        .into_par_iter()
        .map(|idx| render_index(doc, idx, dpi))
        .collect::<Result<Vec<_>>>()?;
    write_tiff(&frames, dpi)
}

fn write_tiff(frames: &[RgbImage], dpi: u32) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut cursor)?;
        for frame in frames {
            let mut image = encoder.new_image::<colortype::RGB8>(frame.width(), frame.height())?;
            image.resolution(ResolutionUnit::Inch, Rational { n: dpi, d: 1 });
            image.write_data(frame.as_raw())?;
        }
    }
    Ok(cursor.into_inner())
}
