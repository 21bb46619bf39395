//! Text operations: find/replace and injected text.

use super::{commit, Scope};
use crate::error::{Error, Result};
use crate::model::{
    text_width, Color, Document, Element, Page, PageNumberStamp, TextRun, TextStyle, Watermark,
    DEFAULT_FONT_SIZE,
};

/// Distance of headers, footers and page numbers from the page edge, in points.
pub const EDGE_MARGIN: f32 = 36.0;

/// Watermark settings, validated when the watermark is applied.
///
/// # Example
/// ```
/// use folio::{Document, WatermarkOptions};
///
/// let mut doc = Document::with_blank_page();
/// let mark = WatermarkOptions::new("DRAFT")
///     .with_font("Helvetica", 48.0)
///     .with_color("#FF0000")
///     .with_rotation(45.0)
///     .with_opacity(0.3);
/// doc.add_watermark(&mark).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkOptions {
    pub text: String,
    pub font_name: Option<String>,
    pub font_size: f32,
    /// `#RRGGBB`
    pub color: String,
    /// Top-left position; centered on the page when `None`
    pub position: Option<(f32, f32)>,
    pub angle: f32,
    pub background: bool,
    pub opacity: f32,
}

impl WatermarkOptions {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_name: None,
            font_size: 36.0,
            color: "#808080".to_string(),
            position: None,
            angle: 0.0,
            background: false,
            opacity: 0.5,
        }
    }

    pub fn with_font(mut self, name: impl Into<String>, size: f32) -> Self {
        self.font_name = Some(name.into());
        self.font_size = size;
        self
    }

    pub fn with_color(mut self, hex: impl Into<String>) -> Self {
        self.color = hex.into();
        self
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = Some((x, y));
        self
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.angle = degrees;
        self
    }

    pub fn behind_content(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    fn validate(&self) -> Result<(TextStyle, f32)> {
        if self.text.trim().is_empty() {
            return Err(Error::InvalidArgument("watermark text is empty".into()));
        }
        let color = Color::from_hex(&self.color).ok_or_else(|| {
            Error::InvalidArgument(format!("watermark color '{}' is not #RRGGBB", self.color))
        })?;
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(Error::InvalidArgument(format!(
                "watermark opacity {} is outside 0.0..=1.0",
                self.opacity
            )));
        }
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "watermark font size {} must be positive",
                self.font_size
            )));
        }
        if !self.angle.is_finite() {
            return Err(Error::InvalidArgument("watermark angle is not finite".into()));
        }
        let style = TextStyle {
            font_name: self.font_name.clone(),
            font_size: self.font_size,
            color,
            ..TextStyle::default()
        };
        Ok((style, self.opacity))
    }

    fn place(&self, style: &TextStyle, opacity: f32, page: &Page) -> Watermark {
        let (x, y) = self.position.unwrap_or_else(|| {
            (
                (page.width - text_width(&self.text, style.font_size)) / 2.0,
                (page.height - style.font_size) / 2.0,
            )
        });
        Watermark {
            text: self.text.clone(),
            style: style.clone(),
            x,
            y,
            angle: self.angle,
            background: self.background,
            opacity,
        }
    }
}

#[derive(Clone, Copy)]
enum Edge {
    Top,
    Bottom,
}

impl Edge {
    fn y(self, page: &Page, font_size: f32) -> f32 {
        match self {
            Edge::Top => EDGE_MARGIN,
            Edge::Bottom => page.height - EDGE_MARGIN - font_size * 1.2,
        }
    }
}

fn centered_x(page: &Page, text: &str, font_size: f32) -> f32 {
    ((page.width - text_width(text, font_size)) / 2.0).max(0.0)
}

impl Document {
    /// Replace every occurrence of `find` in visible text runs.
    ///
    /// Matching is literal and case-sensitive. Returns the number of
    /// replacements. Either all matches are replaced or none.
    pub fn replace_text(&mut self, find: &str, replace: &str) -> Result<usize> {
        self.replace_text_scope(Scope::Document, find, replace)
    }

    /// Replace text on page `n` only.
    pub fn page_replace_text(&mut self, n: u32, find: &str, replace: &str) -> Result<usize> {
        self.replace_text_scope(Scope::Page(n), find, replace)
    }

    fn replace_text_scope(&mut self, scope: Scope, find: &str, replace: &str) -> Result<usize> {
        if find.is_empty() {
            return Err(Error::InvalidArgument("search text is empty".into()));
        }
        let range = scope.indices(self)?;

        let mut pending = Vec::new();
        let mut count = 0;
        for page_idx in range {
            for (el_idx, element) in self.pages[page_idx].elements.iter().enumerate() {
                if let Element::Text(run) = element {
                    let hits = run.text.matches(find).count();
                    if hits > 0 {
                        count += hits;
                        pending.push((page_idx, el_idx, run.text.replace(find, replace)));
                    }
                }
            }
        }

        for (page_idx, el_idx, text) in pending {
            if let Element::Text(run) = &mut self.pages[page_idx].elements[el_idx] {
                run.text = text;
            }
        }
        commit(self, "replace_text", scope);
        Ok(count)
    }

    /// Append a text run below the existing content of page `n`.
    pub fn page_add_text(&mut self, n: u32, text: &str) -> Result<()> {
        let idx = self.index_of(n)?;
        self.pages[idx].add_text(text);
        commit(self, "add_text", Scope::Page(n));
        Ok(())
    }

    /// Add a centered header to every page.
    pub fn add_text_header(&mut self, text: &str) -> Result<()> {
        self.add_edge_text(Scope::Document, text, Edge::Top)
    }

    /// Add a centered footer to every page.
    pub fn add_text_footer(&mut self, text: &str) -> Result<()> {
        self.add_edge_text(Scope::Document, text, Edge::Bottom)
    }

    pub fn page_add_text_header(&mut self, n: u32, text: &str) -> Result<()> {
        self.add_edge_text(Scope::Page(n), text, Edge::Top)
    }

    pub fn page_add_text_footer(&mut self, n: u32, text: &str) -> Result<()> {
        self.add_edge_text(Scope::Page(n), text, Edge::Bottom)
    }

    fn add_edge_text(&mut self, scope: Scope, text: &str, edge: Edge) -> Result<()> {
        let range = scope.indices(self)?;
        for page in &mut self.pages[range] {
            let x = centered_x(page, text, DEFAULT_FONT_SIZE);
            let y = edge.y(page, DEFAULT_FONT_SIZE);
            page.add_element(Element::Text(TextRun::new(text, x, y)));
        }
        let name = match edge {
            Edge::Top => "add_text_header",
            Edge::Bottom => "add_text_footer",
        };
        commit(self, name, scope);
        Ok(())
    }

    /// Stamp every page with its page number.
    pub fn add_page_numbers(&mut self) -> Result<()> {
        self.add_page_numbers_with(PageNumberStamp::DEFAULT_TEMPLATE)
    }

    /// Stamp every page using a template such as `"Page {n} of {total}"`.
    pub fn add_page_numbers_with(&mut self, template: &str) -> Result<()> {
        self.add_page_number_scope(Scope::Document, template)
    }

    /// Stamp page `n` with its page number.
    pub fn page_add_page_number(&mut self, n: u32) -> Result<()> {
        self.add_page_number_scope(Scope::Page(n), PageNumberStamp::DEFAULT_TEMPLATE)
    }

    fn add_page_number_scope(&mut self, scope: Scope, template: &str) -> Result<()> {
        if !template.contains("{n}") && !template.contains("{total}") {
            return Err(Error::InvalidArgument(format!(
                "page number template '{}' has no {{n}} or {{total}}",
                template
            )));
        }
        let range = scope.indices(self)?;
        let sample = template.replace("{n}", "00").replace("{total}", "00");
        for page in &mut self.pages[range] {
            let style = TextStyle::default();
            let stamp = PageNumberStamp {
                template: template.to_string(),
                x: centered_x(page, &sample, style.font_size),
                y: Edge::Bottom.y(page, style.font_size),
                style,
            };
            page.add_element(Element::PageNumber(stamp));
        }
        commit(self, "add_page_numbers", scope);
        Ok(())
    }

    /// Add a watermark to every page.
    pub fn add_watermark(&mut self, options: &WatermarkOptions) -> Result<()> {
        self.add_watermark_scope(Scope::Document, options)
    }

    /// Add a watermark to page `n`.
    pub fn page_add_watermark(&mut self, n: u32, options: &WatermarkOptions) -> Result<()> {
        self.add_watermark_scope(Scope::Page(n), options)
    }

    fn add_watermark_scope(&mut self, scope: Scope, options: &WatermarkOptions) -> Result<()> {
        let (style, opacity) = options.validate()?;
        let range = scope.indices(self)?;
        for page in &mut self.pages[range] {
            let mark = Element::Watermark(options.place(&style, opacity, page));
            if options.background {
                page.elements.insert(0, mark);
            } else {
                page.elements.push(mark);
            }
        }
        commit(self, "add_watermark", scope);
        Ok(())
    }
}
