//! Page-level types.

use super::{Color, Element, ElementKind, PageContext, Rect, TextRun, TextStats};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Left and top margin used for injected body text, in points.
pub const BODY_MARGIN: f32 = 72.0;

/// Standard page sizes. Discriminants are the stable numeric codes used
/// across the C boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageSize {
    A0 = 0,
    A1 = 1,
    A2 = 2,
    A3 = 3,
    A4 = 4,
    A5 = 5,
    A6 = 6,
    B5 = 7,
    Letter = 8,
    Legal = 9,
    Ledger = 10,
    P11x17 = 11,
}

impl PageSize {
    /// All sizes in code order.
    pub const ALL: [PageSize; 12] = [
        PageSize::A0,
        PageSize::A1,
        PageSize::A2,
        PageSize::A3,
        PageSize::A4,
        PageSize::A5,
        PageSize::A6,
        PageSize::B5,
        PageSize::Letter,
        PageSize::Legal,
        PageSize::Ledger,
        PageSize::P11x17,
    ];

    /// Look up a size by its numeric code.
    pub fn from_code(code: i32) -> Result<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or_else(|| Error::InvalidArgument(format!("unknown page size code {}", code)))
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    /// Width and height in points, portrait unless the size is defined as landscape.
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            PageSize::A0 => (2384.0, 3370.0),
            PageSize::A1 => (1684.0, 2384.0),
            PageSize::A2 => (1191.0, 1684.0),
            PageSize::A3 => (842.0, 1191.0),
            PageSize::A4 => (595.0, 842.0),
            PageSize::A5 => (420.0, 595.0),
            PageSize::A6 => (298.0, 420.0),
            PageSize::B5 => (499.0, 709.0),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Ledger => (1224.0, 792.0),
            PageSize::P11x17 => (792.0, 1224.0),
        }
    }
}

/// Page rotation, clockwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// Convert an angle in degrees. Negative multiples of 90 wrap around.
    pub fn from_degrees(degrees: i32) -> Result<Self> {
        if degrees % 90 != 0 {
            return Err(Error::InvalidArgument(format!(
                "rotation must be a multiple of 90 degrees, got {}",
                degrees
            )));
        }
        Ok(match degrees.rem_euclid(360) {
            0 => Rotation::R0,
            90 => Rotation::R90,
            180 => Rotation::R180,
            _ => Rotation::R270,
        })
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Add another rotation, mod 360.
    pub fn add(self, other: Rotation) -> Rotation {
        let sum = (self.degrees() + other.degrees()) % 360;
        // sum is always a multiple of 90 below 360
        Rotation::from_degrees(i32::from(sum)).unwrap_or_default()
    }

    /// Whether width and height swap when displayed.
    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Rotation::R90 | Rotation::R270)
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(value: u16) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Rotation::R0),
            90 => Ok(Rotation::R90),
            180 => Ok(Rotation::R180),
            270 => Ok(Rotation::R270),
            other => Err(format!("invalid stored rotation {}", other)),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(r: Rotation) -> u16 {
        r.degrees()
    }
}

/// A single page in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Standard size the page was created or resized to
    pub size: Option<PageSize>,

    /// Page rotation
    pub rotation: Rotation,

    /// Page-wide fill color
    pub background: Option<Color>,

    /// Content elements in paint order
    pub elements: Vec<Element>,
}

impl Page {
    /// Create a new page with the given dimensions.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            size: None,
            rotation: Rotation::R0,
            background: None,
            elements: Vec::new(),
        }
    }

    /// Create a page of a standard size.
    pub fn with_size(size: PageSize) -> Self {
        let (w, h) = size.dimensions();
        Self {
            size: Some(size),
            ..Self::new(w, h)
        }
    }

    /// Create a new page with standard Letter size (8.5 x 11 inches).
    pub fn letter() -> Self {
        Self::with_size(PageSize::Letter)
    }

    /// Create a new page with standard A4 size (210 x 297 mm).
    pub fn a4() -> Self {
        Self::with_size(PageSize::A4)
    }

    /// Add an element to the page.
    pub fn add_element(&mut self, element: Element) {
        self.elements.push(element);
    }

    /// Append a text run below the existing content.
    pub fn add_text(&mut self, text: impl Into<String>) {
        let y = self
            .elements
            .iter()
            .filter(|e| {
                matches!(
                    e.kind(),
                    ElementKind::Text | ElementKind::Image | ElementKind::Table
                )
            })
            .filter_map(|e| e.bounds())
            .map(|r| r.bottom())
            .fold(BODY_MARGIN, f32::max);
        self.elements
            .push(Element::Text(TextRun::new(text, BODY_MARGIN, y)));
    }

    /// Visible text of the page, one element per line.
    pub fn text(&self, ctx: PageContext) -> String {
        self.elements
            .iter()
            .filter_map(|e| e.visible_text(ctx))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Word and character counts of the visible text.
    pub fn stats(&self, ctx: PageContext) -> TextStats {
        let mut stats = TextStats::new();
        for text in self.elements.iter().filter_map(|e| e.visible_text(ctx)) {
            stats.count_text(&text);
        }
        stats
    }

    /// A page is blank when it has no visible text and no visible graphics.
    pub fn is_blank(&self, ctx: PageContext) -> bool {
        self.elements.iter().all(|e| {
            !e.is_visible_graphic()
                && e.visible_text(ctx)
                    .map_or(true, |t| t.chars().all(char::is_whitespace))
        })
    }

    /// Number of elements of the given kind.
    pub fn count(&self, kind: ElementKind) -> usize {
        self.elements.iter().filter(|e| e.kind() == kind).count()
    }

    /// Check if the page has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Get page dimensions as (width, height) tuple.
    pub fn dimensions(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    /// Dimensions after rotation is applied.
    pub fn display_dimensions(&self) -> (f32, f32) {
        if self.rotation.is_quarter_turn() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    /// Check if the page is in landscape orientation as displayed.
    pub fn is_landscape(&self) -> bool {
        let (w, h) = self.display_dimensions();
        w > h
    }

    /// Whether the page dimensions are usable.
    pub fn has_valid_dimensions(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Full page rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::letter()
    }
}
