//! Content elements and their geometry.
//!
//! Coordinates are in points (1/72 inch) with the origin at the top-left
//! corner of the unrotated page and `y` growing downwards.

use super::Table;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Default font size for injected text, in points.
pub const DEFAULT_FONT_SIZE: f32 = 12.0;

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Whether every coordinate is a finite number.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Clamp the rectangle into a `width` x `height` area.
    pub fn clamped(&self, width: f32, height: f32) -> Rect {
        let w = self.width.clamp(0.0, width);
        let h = self.height.clamp(0.0, height);
        Rect {
            x: self.x.clamp(0.0, width - w),
            y: self.y.clamp(0.0, height - h),
            width: w,
            height: h,
        }
    }

    /// Whether the rectangle lies inside a `width` x `height` area.
    pub fn fits_within(&self, width: f32, height: f32) -> bool {
        self.x >= 0.0 && self.y >= 0.0 && self.right() <= width && self.bottom() <= height
    }
}

/// Scale-then-translate transform applied to element geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub sx: f32,
    pub sy: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Transform {
    /// Pure scale.
    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            sx,
            sy,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Uniform scale followed by a translation.
    pub fn scale_translate(s: f32, tx: f32, ty: f32) -> Self {
        Self {
            sx: s,
            sy: s,
            tx,
            ty,
        }
    }

    pub fn apply_point(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.sx + self.tx, y * self.sy + self.ty)
    }

    pub fn apply_rect(&self, rect: &Rect) -> Rect {
        let (x, y) = self.apply_point(rect.x, rect.y);
        Rect::new(x, y, rect.width * self.sx, rect.height * self.sy)
    }

    /// Factor applied to lengths that have no axis, such as font sizes.
    pub fn length_factor(&self) -> f32 {
        self.sx.min(self.sy)
    }
}

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Format as `#RRGGBB`.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Rec. 601 luma.
    pub fn luminance(&self) -> u8 {
        let y = 0.299 * f32::from(self.r) + 0.587 * f32::from(self.g) + 0.114 * f32::from(self.b);
        y.round().clamp(0.0, 255.0) as u8
    }

    /// The gray color with the same luminance.
    pub fn to_gray(&self) -> Color {
        let y = self.luminance();
        Color::rgb(y, y, y)
    }

    pub fn is_gray(&self) -> bool {
        self.r == self.g && self.g == self.b
    }
}

/// Text styling properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Bold text
    pub bold: bool,

    /// Italic text
    pub italic: bool,

    /// Underlined text
    pub underline: bool,

    /// Font name
    pub font_name: Option<String>,

    /// Font size in points
    pub font_size: f32,

    /// Fill color
    pub color: Color,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            underline: false,
            font_name: None,
            font_size: DEFAULT_FONT_SIZE,
            color: Color::BLACK,
        }
    }
}

/// A run of text with consistent styling, anchored at its top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// The text content
    pub text: String,

    /// Text styling
    pub style: TextStyle,

    pub x: f32,
    pub y: f32,
}

impl TextRun {
    /// Create a new text run with default style at the given position.
    pub fn new(text: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            text: text.into(),
            style: TextStyle::default(),
            x,
            y,
        }
    }

    /// Set the style.
    pub fn with_style(mut self, style: TextStyle) -> Self {
        self.style = style;
        self
    }

    /// Check if this run is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Approximate bounding box using an average glyph width of half the
    /// font size.
    pub fn bounds(&self) -> Rect {
        text_bounds(&self.text, self.x, self.y, self.style.font_size)
    }

    fn transform(&mut self, t: &Transform) {
        let (x, y) = t.apply_point(self.x, self.y);
        self.x = x;
        self.y = y;
        self.style.font_size *= t.length_factor();
    }
}

pub(crate) fn text_bounds(text: &str, x: f32, y: f32, font_size: f32) -> Rect {
    let longest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
    let lines = text.lines().count().max(1);
    Rect::new(
        x,
        y,
        longest as f32 * font_size * 0.5,
        lines as f32 * font_size * 1.2,
    )
}

/// Estimated width of `text` at `font_size`.
pub(crate) fn text_width(text: &str, font_size: f32) -> f32 {
    text_bounds(text, 0.0, 0.0, font_size).width
}

/// A placed image referencing a document resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageElement {
    /// Resource ID for the image
    pub resource_id: String,

    /// Placement on the page
    pub rect: Rect,

    /// Alternative text
    pub alt_text: Option<String>,
}

impl ImageElement {
    pub fn new(resource_id: impl Into<String>, rect: Rect) -> Self {
        Self {
            resource_id: resource_id.into(),
            rect,
            alt_text: None,
        }
    }
}

/// Annotation subtype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum AnnotationKind {
    /// Sticky note
    Note,
    /// Hyperlink area
    Link { uri: String },
    /// Text highlight
    Highlight,
    /// Free-text callout
    FreeText,
    /// Interactive form field
    Widget { field_name: String, value: String },
}

/// An annotation placed over page content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub rect: Rect,
    pub contents: Option<String>,
    pub color: Option<Color>,
}

impl Annotation {
    pub fn new(kind: AnnotationKind, rect: Rect) -> Self {
        Self {
            kind,
            rect,
            contents: None,
            color: None,
        }
    }

    /// Create a form field widget.
    pub fn widget(field_name: impl Into<String>, value: impl Into<String>, rect: Rect) -> Self {
        Self::new(
            AnnotationKind::Widget {
                field_name: field_name.into(),
                value: value.into(),
            },
            rect,
        )
    }

    pub fn with_contents(mut self, contents: impl Into<String>) -> Self {
        self.contents = Some(contents.into());
        self
    }

    pub fn is_widget(&self) -> bool {
        matches!(self.kind, AnnotationKind::Widget { .. })
    }
}

/// Embedded script attached to a page action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub name: Option<String>,
    pub source: String,
}

/// Embedded file attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub description: Option<String>,
    pub data: Vec<u8>,
    /// Icon position on the page
    pub rect: Rect,
}

/// A bookmark targeting the page that holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub title: String,
    /// Nesting level (0 = top level)
    pub level: u8,
    /// Vertical target on the page
    pub y: f32,
}

impl Bookmark {
    pub fn new(title: impl Into<String>, level: u8) -> Self {
        Self {
            title: title.into(),
            level,
            y: 0.0,
        }
    }
}

/// Page number stamp whose text is resolved from the page's current position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageNumberStamp {
    /// Text template; `{n}` is the page position and `{total}` the page count.
    pub template: String,
    pub style: TextStyle,
    pub x: f32,
    pub y: f32,
}

impl PageNumberStamp {
    pub const DEFAULT_TEMPLATE: &'static str = "{n}";

    pub fn resolve(&self, ctx: PageContext) -> String {
        self.template
            .replace("{n}", &ctx.number.to_string())
            .replace("{total}", &ctx.total.to_string())
    }
}

/// A text watermark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watermark {
    pub text: String,
    pub style: TextStyle,
    pub x: f32,
    pub y: f32,
    /// Rotation angle in degrees, counter-clockwise
    pub angle: f32,
    /// Drawn behind page content
    pub background: bool,
    /// 0.0 (transparent) to 1.0 (opaque)
    pub opacity: f32,
}

/// Position of a page within its document, used to resolve dynamic text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageContext {
    /// 1-based position
    pub number: u32,
    /// Page count of the owning document
    pub total: u32,
}

/// Variant tag of an [`Element`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Text,
    HiddenText,
    Image,
    Annotation,
    Script,
    Attachment,
    Bookmark,
    Table,
    PageNumber,
    Watermark,
}

/// A unit of page content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    /// Visible text
    Text(TextRun),
    /// Text present in the content but not painted
    HiddenText(TextRun),
    Image(ImageElement),
    Annotation(Annotation),
    Script(Script),
    Attachment(Attachment),
    Bookmark(Bookmark),
    Table(Table),
    PageNumber(PageNumberStamp),
    Watermark(Watermark),
}

impl Element {
    /// Create a visible text element.
    pub fn text(text: impl Into<String>, x: f32, y: f32) -> Self {
        Element::Text(TextRun::new(text, x, y))
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Text(_) => ElementKind::Text,
            Element::HiddenText(_) => ElementKind::HiddenText,
            Element::Image(_) => ElementKind::Image,
            Element::Annotation(_) => ElementKind::Annotation,
            Element::Script(_) => ElementKind::Script,
            Element::Attachment(_) => ElementKind::Attachment,
            Element::Bookmark(_) => ElementKind::Bookmark,
            Element::Table(_) => ElementKind::Table,
            Element::PageNumber(_) => ElementKind::PageNumber,
            Element::Watermark(_) => ElementKind::Watermark,
        }
    }

    /// Text this element contributes to the visible page text.
    pub fn visible_text(&self, ctx: PageContext) -> Option<Cow<'_, str>> {
        match self {
            Element::Text(run) => Some(Cow::Borrowed(run.text.as_str())),
            Element::PageNumber(stamp) => Some(Cow::Owned(stamp.resolve(ctx))),
            Element::Table(table) => Some(Cow::Owned(table.plain_text())),
            _ => None,
        }
    }

    /// Whether the element paints non-text marks on the page.
    pub fn is_visible_graphic(&self) -> bool {
        match self {
            Element::Image(_) | Element::Watermark(_) => true,
            Element::Table(table) => !table.plain_text().trim().is_empty(),
            _ => false,
        }
    }

    /// Bounding box on the page, if the element has one.
    pub fn bounds(&self) -> Option<Rect> {
        match self {
            Element::Text(run) | Element::HiddenText(run) => Some(run.bounds()),
            Element::Image(img) => Some(img.rect),
            Element::Annotation(a) => Some(a.rect),
            Element::Attachment(a) => Some(a.rect),
            Element::Table(t) => Some(t.rect),
            Element::PageNumber(s) => {
                let text = s.template.replace("{total}", "00").replace("{n}", "00");
                Some(text_bounds(&text, s.x, s.y, s.style.font_size))
            }
            Element::Watermark(w) => Some(text_bounds(&w.text, w.x, w.y, w.style.font_size)),
            Element::Script(_) | Element::Bookmark(_) => None,
        }
    }

    /// Apply a geometric transform in place.
    pub fn transform(&mut self, t: &Transform) {
        match self {
            Element::Text(run) | Element::HiddenText(run) => run.transform(t),
            Element::Image(img) => img.rect = t.apply_rect(&img.rect),
            Element::Annotation(a) => a.rect = t.apply_rect(&a.rect),
            Element::Attachment(a) => a.rect = t.apply_rect(&a.rect),
            Element::Table(table) => table.rect = t.apply_rect(&table.rect),
            Element::Bookmark(b) => b.y = b.y * t.sy + t.ty,
            Element::PageNumber(s) => {
                let (x, y) = t.apply_point(s.x, s.y);
                s.x = x;
                s.y = y;
                s.style.font_size *= t.length_factor();
            }
            Element::Watermark(w) => {
                let (x, y) = t.apply_point(w.x, w.y);
                w.x = x;
                w.y = y;
                w.style.font_size *= t.length_factor();
            }
            Element::Script(_) => {}
        }
    }

    /// Every color this element carries.
    pub fn colors_mut(&mut self) -> Vec<&mut Color> {
        match self {
            Element::Text(run) | Element::HiddenText(run) => vec![&mut run.style.color],
            Element::PageNumber(s) => vec![&mut s.style.color],
            Element::Watermark(w) => vec![&mut w.style.color],
            Element::Annotation(a) => a.color.iter_mut().collect(),
            _ => Vec::new(),
        }
    }

    /// Resource id referenced by this element.
    pub fn resource_ref(&self) -> Option<&str> {
        match self {
            Element::Image(img) => Some(&img.resource_id),
            _ => None,
        }
    }

    /// Font name used by this element.
    pub fn font_name(&self) -> Option<&str> {
        match self {
            Element::Text(run) | Element::HiddenText(run) => run.style.font_name.as_deref(),
            Element::PageNumber(s) => s.style.font_name.as_deref(),
            Element::Watermark(w) => w.style.font_name.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTX: PageContext = PageContext {
        number: 2,
        total: 5,
    };

    #[test]
    fn test_color_hex() {
        assert_eq!(Color::from_hex("#010203"), Some(Color::rgb(1, 2, 3)));
        assert_eq!(Color::from_hex("ff0000"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(Color::from_hex("#12345"), None);
        assert_eq!(Color::from_hex("#GG0000"), None);
        assert_eq!(Color::rgb(10, 200, 255).to_hex(), "#0AC8FF");
    }

    #[test]
    fn test_color_gray() {
        assert_eq!(Color::rgb(255, 0, 0).luminance(), 76);
        assert_eq!(Color::WHITE.to_gray(), Color::WHITE);
        assert!(Color::rgb(0, 128, 0).to_gray().is_gray());
    }

    #[test]
    fn test_page_number_resolution() {
        let stamp = PageNumberStamp {
            template: "Page {n} of {total}".to_string(),
            style: TextStyle::default(),
            x: 0.0,
            y: 0.0,
        };
        assert_eq!(stamp.resolve(CTX), "Page 2 of 5");
    }

    #[test]
    fn test_visible_text_variants() {
        assert_eq!(
            Element::text("hello", 0.0, 0.0).visible_text(CTX).as_deref(),
            Some("hello")
        );
        let hidden = Element::HiddenText(TextRun::new("secret", 0.0, 0.0));
        assert!(hidden.visible_text(CTX).is_none());
        let note = Element::Annotation(
            Annotation::new(AnnotationKind::Note, Rect::default()).with_contents("memo"),
        );
        assert!(note.visible_text(CTX).is_none());
    }

    #[test]
    fn test_transform_scales_geometry_and_font() {
        let mut el = Element::text("abc", 10.0, 20.0);
        el.transform(&Transform::scale(2.0, 3.0));
        match el {
            Element::Text(run) => {
                assert_eq!((run.x, run.y), (20.0, 60.0));
                assert_eq!(run.style.font_size, DEFAULT_FONT_SIZE * 2.0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_rect_clamp() {
        let r = Rect::new(-5.0, 90.0, 20.0, 20.0).clamped(100.0, 100.0);
        assert_eq!(r, Rect::new(0.0, 80.0, 20.0, 20.0));
        assert!(r.fits_within(100.0, 100.0));
    }

    #[test]
    fn test_element_serde_tag() {
        let json = serde_json::to_string(&Element::text("x", 1.0, 2.0)).unwrap();
        assert!(json.contains("\"type\":\"text\""));
        let back: Element = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), ElementKind::Text);
    }
}
