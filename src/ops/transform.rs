//! Whole-document transforms: grayscale, background, flatten, optimize,
//! repair and font embedding.

use super::{commit, font_resource_id, referenced_resources, retarget_images, Scope};
use crate::error::{Error, Result};
use crate::model::{
    AnnotationKind, Color, Document, Element, Rect, Resource, ResourceType, TextRun,
    DEFAULT_FONT_SIZE,
};
use image::{DynamicImage, ImageFormat};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;

/// Summary of what [`Document::repair`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Pages whose size was restored from their standard size
    pub pages_resized: usize,
    /// Image elements whose resource was missing
    pub dangling_images_removed: usize,
    /// Elements with non-finite coordinates moved to the origin
    pub geometry_reset: usize,
    /// Annotations, attachments and bookmarks moved inside their page
    pub positions_clamped: usize,
}

impl RepairReport {
    /// Whether the document needed no changes.
    pub fn is_clean(&self) -> bool {
        *self == RepairReport::default()
    }

    /// Number of fixes applied.
    pub fn total(&self) -> usize {
        self.pages_resized + self.dangling_images_removed + self.geometry_reset + self.positions_clamped
    }
}

impl Document {
    /// Convert the whole document to grayscale.
    pub fn grayscale(&mut self) -> Result<()> {
        self.grayscale_scope(Scope::Document)
    }

    /// Convert page `n` to grayscale.
    pub fn page_grayscale(&mut self, n: u32) -> Result<()> {
        self.grayscale_scope(Scope::Page(n))
    }

    fn grayscale_scope(&mut self, scope: Scope) -> Result<()> {
        let range = scope.indices(self)?;
        let inside = referenced_resources(&self.pages[range.clone()]);
        let outside = referenced_resources(
            self.pages
                .iter()
                .enumerate()
                .filter(|(i, _)| !range.contains(i))
                .map(|(_, p)| p),
        );

        // Decode everything before changing anything.
        let mut converted = Vec::new();
        for id in &inside {
            let Some(resource) = self.resources.get(id) else {
                continue;
            };
            if !resource.is_image() {
                continue;
            }
            converted.push((id.clone(), to_gray_png(resource)?));
        }

        for (id, gray) in converted {
            if outside.contains(&id) {
                let copy = self.next_resource_id(&format!("{}-gray", id));
                retarget_images(&mut self.pages[range.clone()], &id, &copy);
                self.resources.insert(copy, gray);
            } else {
                self.resources.insert(id, gray);
            }
        }

        for page in &mut self.pages[range] {
            if let Some(bg) = page.background.as_mut() {
                *bg = bg.to_gray();
            }
            for element in &mut page.elements {
                for color in element.colors_mut() {
                    *color = color.to_gray();
                }
            }
        }

        commit(self, "grayscale", scope);
        Ok(())
    }

    /// Fill every page with an RGB background. Each component must be 0..=255.
    pub fn set_background(&mut self, r: i32, g: i32, b: i32) -> Result<()> {
        let channel = |name: &str, v: i32| {
            u8::try_from(v).map_err(|_| {
                Error::InvalidArgument(format!(
                    "background {} component {} is outside 0..=255",
                    name, v
                ))
            })
        };
        let color = Color::rgb(channel("red", r)?, channel("green", g)?, channel("blue", b)?);
        for page in &mut self.pages {
            page.background = Some(color);
        }
        commit(self, "set_background", Scope::Document);
        Ok(())
    }

    /// Turn interactive content into static text.
    ///
    /// Form fields become text holding their value and free-text callouts
    /// become text holding their contents. Other annotations are dropped.
    pub fn flatten(&mut self) -> Result<()> {
        for page in &mut self.pages {
            let elements = std::mem::take(&mut page.elements);
            page.elements = elements
                .into_iter()
                .filter_map(|element| match element {
                    Element::Annotation(annotation) => {
                        let text = match annotation.kind {
                            AnnotationKind::Widget { value, .. } => Some(value),
                            AnnotationKind::FreeText => annotation.contents,
                            _ => None,
                        }?;
                        if text.trim().is_empty() {
                            return None;
                        }
                        let mut run = TextRun::new(text, annotation.rect.x, annotation.rect.y);
                        if annotation.rect.height > 0.0 {
                            run.style.font_size = annotation.rect.height.min(DEFAULT_FONT_SIZE);
                        }
                        if let Some(color) = annotation.color {
                            run.style.color = color;
                        }
                        Some(Element::Text(run))
                    }
                    Element::Script(_) => None,
                    other => Some(other),
                })
                .collect();
        }
        commit(self, "flatten", Scope::Document);
        Ok(())
    }

    /// Drop empty text runs, empty tables and unreferenced resources.
    pub fn optimize(&mut self) -> Result<()> {
        let mut dropped = 0;
        for page in &mut self.pages {
            let before = page.elements.len();
            page.elements.retain(|e| match e {
                Element::Text(run) | Element::HiddenText(run) => !run.text.trim().is_empty(),
                Element::Table(table) => !table.is_empty(),
                _ => true,
            });
            dropped += before - page.elements.len();
            page.elements.shrink_to_fit();
        }
        let unused = self.drop_unreferenced_resources();
        log::debug!(
            "optimize dropped {} empty elements and {} resources",
            dropped,
            unused
        );
        commit(self, "optimize", Scope::Document);
        Ok(())
    }

    /// Merge resources with identical bytes and drop unreferenced ones.
    pub fn optimize_resources(&mut self) -> Result<()> {
        let mut by_digest: BTreeMap<(ResourceType, String), String> = BTreeMap::new();
        let mut duplicates = Vec::new();
        for (id, resource) in &self.resources {
            if resource.is_font() {
                continue;
            }
            let key = (resource.resource_type, resource.digest());
            match by_digest.get(&key) {
                Some(keep) => duplicates.push((id.clone(), keep.clone())),
                None => {
                    by_digest.insert(key, id.clone());
                }
            }
        }

        for (duplicate, keep) in &duplicates {
            retarget_images(&mut self.pages, duplicate, keep);
            self.resources.remove(duplicate);
        }
        let unused = self.drop_unreferenced_resources();
        log::debug!(
            "optimize_resources merged {} duplicates and dropped {} resources",
            duplicates.len(),
            unused
        );
        commit(self, "optimize_resources", Scope::Document);
        Ok(())
    }

    fn drop_unreferenced_resources(&mut self) -> usize {
        let used = referenced_resources(&self.pages);
        let before = self.resources.len();
        self.resources.retain(|id, _| used.contains(id));
        before - self.resources.len()
    }

    /// Fix structural damage.
    ///
    /// Every problem is checked first. If any cannot be fixed the document
    /// is left untouched and [`Error::Unrecoverable`] is returned.
    pub fn repair(&mut self) -> Result<RepairReport> {
        for (i, page) in self.pages.iter().enumerate() {
            if !page.has_valid_dimensions() && page.size.is_none() {
                return Err(Error::Unrecoverable(format!(
                    "page {} has size {}x{} and no standard size to restore",
                    i + 1,
                    page.width,
                    page.height
                )));
            }
        }

        let mut report = RepairReport::default();
        let resources: BTreeSet<&String> = self.resources.keys().collect();

        for page in &mut self.pages {
            if !page.has_valid_dimensions() {
                if let Some(size) = page.size {
                    (page.width, page.height) = size.dimensions();
                    report.pages_resized += 1;
                }
            }
            let (width, height) = (page.width, page.height);

            let before = page.elements.len();
            page.elements.retain(|e| match e {
                Element::Image(img) => resources.contains(&img.resource_id),
                _ => true,
            });
            report.dangling_images_removed += before - page.elements.len();

            for element in &mut page.elements {
                if reset_non_finite(element) {
                    report.geometry_reset += 1;
                }
                if clamp_into(element, width, height) {
                    report.positions_clamped += 1;
                }
            }
        }

        if !report.is_clean() {
            commit(self, "repair", Scope::Document);
        }
        log::debug!("repair: {:?}", report);
        Ok(report)
    }

    /// Register a font resource for every font name in use that has none.
    pub fn embed_fonts(&mut self) -> Result<usize> {
        let names: BTreeSet<String> = self
            .pages
            .iter()
            .flat_map(|p| &p.elements)
            .filter_map(|e| e.font_name())
            .map(str::to_string)
            .collect();

        let mut added = 0;
        for name in names {
            let id = font_resource_id(&name);
            if !self.resources.contains_key(&id) {
                self.resources.insert(id, Resource::font(name, Vec::new()));
                added += 1;
            }
        }
        commit(self, "embed_fonts", Scope::Document);
        Ok(added)
    }
}

fn to_gray_png(resource: &Resource) -> Result<Resource> {
    let img = image::load_from_memory(&resource.data)
        .map_err(|e| Error::Internal(format!("cannot decode image for grayscale: {}", e)))?;
    let gray = DynamicImage::ImageLuma8(img.to_luma8());
    let mut buf = Vec::new();
    gray.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;

    let mut out = Resource::png(buf)
        .with_dimensions(gray.width(), gray.height())
        .with_color_space("Gray");
    out.filename = resource.filename.clone();
    Ok(out)
}

/// Move an element with non-finite coordinates to the origin.
fn reset_non_finite(element: &mut Element) -> bool {
    let finite = |r: Rect| r.is_finite();
    match element {
        Element::Text(run) | Element::HiddenText(run) => {
            if run.x.is_finite() && run.y.is_finite() && run.style.font_size.is_finite() {
                return false;
            }
            run.x = 0.0;
            run.y = 0.0;
            if !run.style.font_size.is_finite() {
                run.style.font_size = DEFAULT_FONT_SIZE;
            }
            true
        }
        Element::Image(img) if !finite(img.rect) => {
            img.rect = Rect::default();
            true
        }
        Element::Annotation(a) if !finite(a.rect) => {
            a.rect = Rect::default();
            true
        }
        Element::Attachment(a) if !finite(a.rect) => {
            a.rect = Rect::default();
            true
        }
        Element::Table(t) if !finite(t.rect) => {
            t.rect = Rect::default();
            true
        }
        Element::Bookmark(b) if !b.y.is_finite() => {
            b.y = 0.0;
            true
        }
        Element::PageNumber(s)
            if !(s.x.is_finite() && s.y.is_finite() && s.style.font_size.is_finite()) =>
        {
            s.x = 0.0;
            s.y = 0.0;
            s.style.font_size = DEFAULT_FONT_SIZE;
            true
        }
        Element::Watermark(w)
            if !(w.x.is_finite() && w.y.is_finite() && w.style.font_size.is_finite()) =>
        {
            w.x = 0.0;
            w.y = 0.0;
            w.style.font_size = DEFAULT_FONT_SIZE;
            true
        }
        _ => false,
    }
}

/// Clamp annotation, attachment and bookmark positions into the page.
fn clamp_into(element: &mut Element, width: f32, height: f32) -> bool {
    let clamp = |rect: &mut Rect| {
        if rect.fits_within(width, height) {
            false
        } else {
            *rect = rect.clamped(width, height);
            true
        }
    };
    match element {
        Element::Annotation(a) => clamp(&mut a.rect),
        Element::Attachment(a) => clamp(&mut a.rect),
        Element::Bookmark(b) if !(0.0..=height).contains(&b.y) => {
            b.y = b.y.clamp(0.0, height);
            true
        }
        _ => false,
    }
}
