//! Display list shared by the SVG writer and the rasterizer.

use crate::model::{AnnotationKind, Color, Element, Page, PageContext, Rect, TextStyle};
use std::borrow::Cow;

static CELL_STYLE: TextStyle = TextStyle {
    bold: false,
    italic: false,
    underline: false,
    font_name: None,
    font_size: 10.0,
    color: Color::BLACK,
};

const HIGHLIGHT: Color = Color::rgb(255, 235, 59);
const CELL_PADDING: f32 = 2.0;

/// One drawing operation in page coordinates (points, origin top-left).
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Paint<'a> {
    Fill {
        rect: Rect,
        color: Color,
        opacity: f32,
    },
    Outline {
        rect: Rect,
        color: Color,
    },
    Text {
        text: Cow<'a, str>,
        x: f32,
        y: f32,
        style: &'a TextStyle,
        /// Counter-clockwise degrees about (x, y)
        angle: f32,
        opacity: f32,
    },
    Image {
        resource_id: &'a str,
        rect: Rect,
        alt: Option<&'a str>,
    },
}

impl<'a> Paint<'a> {
    fn text(text: impl Into<Cow<'a, str>>, x: f32, y: f32, style: &'a TextStyle) -> Self {
        Paint::Text {
            text: text.into(),
            x,
            y,
            style,
            angle: 0.0,
            opacity: 1.0,
        }
    }
}

/// Paint operations for a page in paint order. Hidden text, scripts and
/// bookmarks paint nothing.
pub(crate) fn display_list(page: &Page, ctx: PageContext) -> Vec<Paint<'_>> {
    let mut ops = Vec::new();
    if let Some(color) = page.background {
        ops.push(Paint::Fill {
            rect: page.bounds(),
            color,
            opacity: 1.0,
        });
    }

    for element in &page.elements {
        match element {
            Element::Text(run) => ops.push(Paint::text(run.text.as_str(), run.x, run.y, &run.style)),
            Element::PageNumber(stamp) => {
                ops.push(Paint::text(stamp.resolve(ctx), stamp.x, stamp.y, &stamp.style))
            }
            Element::Watermark(w) => ops.push(Paint::Text {
                text: Cow::Borrowed(w.text.as_str()),
                x: w.x,
                y: w.y,
                style: &w.style,
                angle: w.angle,
                opacity: w.opacity.clamp(0.0, 1.0),
            }),
            Element::Image(img) => ops.push(Paint::Image {
                resource_id: &img.resource_id,
                rect: img.rect,
                alt: img.alt_text.as_deref(),
            }),
            Element::Table(table) => {
                let rows = table.row_count();
                let columns = table.column_count();
                if rows == 0 || columns == 0 {
                    continue;
                }
                let row_h = table.rect.height / rows as f32;
                let col_w = table.rect.width / columns as f32;
                for (r, row) in table.rows.iter().enumerate() {
                    let mut c = 0usize;
                    for cell in &row.cells {
                        let span = cell.colspan.max(1) as usize;
                        let rect = Rect::new(
                            table.rect.x + c as f32 * col_w,
                            table.rect.y + r as f32 * row_h,
                            col_w * span as f32,
                            row_h,
                        );
                        ops.push(Paint::Outline {
                            rect,
                            color: Color::BLACK,
                        });
                        if !cell.is_empty() {
                            ops.push(Paint::text(
                                cell.content.as_str(),
                                rect.x + CELL_PADDING,
                                rect.y + CELL_PADDING,
                                &CELL_STYLE,
                            ));
                        }
                        c += span;
                    }
                }
            }
            Element::Annotation(a) => match &a.kind {
                AnnotationKind::Highlight => ops.push(Paint::Fill {
                    rect: a.rect,
                    color: a.color.unwrap_or(HIGHLIGHT),
                    opacity: 0.4,
                }),
                AnnotationKind::FreeText => {
                    if let Some(contents) = &a.contents {
                        ops.push(Paint::text(contents.as_str(), a.rect.x, a.rect.y, &CELL_STYLE));
                    }
                }
                AnnotationKind::Widget { value, .. } => {
                    ops.push(Paint::Outline {
                        rect: a.rect,
                        color: a.color.unwrap_or(Color::rgb(128, 128, 128)),
                    });
                    if !value.is_empty() {
                        ops.push(Paint::text(
                            value.as_str(),
                            a.rect.x + CELL_PADDING,
                            a.rect.y + CELL_PADDING,
                            &CELL_STYLE,
                        ));
                    }
                }
                AnnotationKind::Note | AnnotationKind::Link { .. } => {}
            },
            Element::HiddenText(_)
            | Element::Script(_)
            | Element::Attachment(_)
            | Element::Bookmark(_) => {}
        }
    }
    ops
}

/// Solid boxes standing in for the glyphs of `text`, one per non-space
/// character, before rotation.
pub(crate) fn glyph_boxes(text: &str, x: f32, y: f32, font_size: f32) -> Vec<Rect> {
    let advance = font_size * 0.5;
    let line_height = font_size * 1.2;
    let mut boxes = Vec::new();
    for (l, line) in text.lines().enumerate() {
        for (i, c) in line.chars().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            boxes.push(Rect::new(
                x + i as f32 * advance + advance * 0.1,
                y + l as f32 * line_height + font_size * 0.2,
                advance * 0.8,
                font_size * 0.8,
            ));
        }
    }
    boxes
}
