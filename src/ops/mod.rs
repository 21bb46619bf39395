//! Mutation engine.
//!
//! Every operation validates its arguments and the addressed pages before
//! touching the document. A failed operation leaves the document unchanged.
//! A successful one marks it dirty.

mod pages;
mod strip;
mod text;
mod transform;

pub use pages::{merge, split, split_at};
pub use strip::Strip;
pub use text::WatermarkOptions;
pub use transform::RepairReport;

use crate::error::Result;
use crate::model::{Document, Element, Page};
use std::collections::BTreeSet;
use std::ops::Range;

/// Pages an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every page
    Document,
    /// One page, 1-indexed
    Page(u32),
}

impl Scope {
    /// Page indices covered by this scope.
    pub(crate) fn indices(self, doc: &Document) -> Result<Range<usize>> {
        match self {
            Scope::Document => Ok(0..doc.pages.len()),
            Scope::Page(n) => {
                let idx = doc.index_of(n)?;
                Ok(idx..idx + 1)
            }
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Document => write!(f, "document"),
            Scope::Page(n) => write!(f, "page {}", n),
        }
    }
}

/// Resource id under which a font program is stored.
pub fn font_resource_id(font_name: &str) -> String {
    format!("font:{}", font_name)
}

/// Ids of every resource referenced by `pages`, including fonts.
pub(crate) fn referenced_resources<'a>(
    pages: impl IntoIterator<Item = &'a Page>,
) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    for element in pages.into_iter().flat_map(|p| &p.elements) {
        if let Some(id) = element.resource_ref() {
            ids.insert(id.to_string());
        }
        if let Some(font) = element.font_name() {
            ids.insert(font_resource_id(font));
        }
    }
    ids
}

/// Point every image reference named `from` at `to`.
pub(crate) fn retarget_images(pages: &mut [Page], from: &str, to: &str) {
    for element in pages.iter_mut().flat_map(|p| &mut p.elements) {
        if let Element::Image(img) = element {
            if img.resource_id == from {
                img.resource_id = to.to_string();
            }
        }
    }
}

/// Record a successful mutation.
pub(crate) fn commit(doc: &mut Document, operation: &str, scope: Scope) {
    doc.mark_dirty();
    log::debug!("{} applied to {}", operation, scope);
}
