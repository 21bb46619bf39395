//! Content stripping.

use super::{commit, Scope};
use crate::error::Result;
use crate::model::{Document, ElementKind};

/// Category of content removed by [`Document::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strip {
    Annotations,
    Attachments,
    Bookmarks,
    HiddenText,
    Images,
    Scripts,
    Tables,
}

impl Strip {
    fn kind(self) -> ElementKind {
        match self {
            Strip::Annotations => ElementKind::Annotation,
            Strip::Attachments => ElementKind::Attachment,
            Strip::Bookmarks => ElementKind::Bookmark,
            Strip::HiddenText => ElementKind::HiddenText,
            Strip::Images => ElementKind::Image,
            Strip::Scripts => ElementKind::Script,
            Strip::Tables => ElementKind::Table,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Strip::Annotations => "remove_annotations",
            Strip::Attachments => "remove_attachments",
            Strip::Bookmarks => "remove_bookmarks",
            Strip::HiddenText => "remove_hidden_text",
            Strip::Images => "remove_images",
            Strip::Scripts => "remove_scripts",
            Strip::Tables => "remove_tables",
        }
    }
}

impl Document {
    /// Remove every element of one category from `scope` and return how
    /// many were removed. Removing nothing is not an error.
    pub fn remove(&mut self, what: Strip, scope: Scope) -> Result<usize> {
        let range = scope.indices(self)?;
        let kind = what.kind();
        let mut removed = 0;
        for page in &mut self.pages[range] {
            let before = page.elements.len();
            page.elements.retain(|e| e.kind() != kind);
            removed += before - page.elements.len();
        }
        commit(self, what.name(), scope);
        Ok(removed)
    }

    pub fn remove_annotations(&mut self) -> Result<usize> {
        self.remove(Strip::Annotations, Scope::Document)
    }

    pub fn remove_attachments(&mut self) -> Result<usize> {
        self.remove(Strip::Attachments, Scope::Document)
    }

    pub fn remove_bookmarks(&mut self) -> Result<usize> {
        self.remove(Strip::Bookmarks, Scope::Document)
    }

    pub fn remove_hidden_text(&mut self) -> Result<usize> {
        self.remove(Strip::HiddenText, Scope::Document)
    }

    /// Remove placed images. Their resources stay until the next optimize.
    pub fn remove_images(&mut self) -> Result<usize> {
        self.remove(Strip::Images, Scope::Document)
    }

    pub fn remove_scripts(&mut self) -> Result<usize> {
        self.remove(Strip::Scripts, Scope::Document)
    }

    pub fn remove_tables(&mut self) -> Result<usize> {
        self.remove(Strip::Tables, Scope::Document)
    }

    pub fn page_remove_annotations(&mut self, n: u32) -> Result<usize> {
        self.remove(Strip::Annotations, Scope::Page(n))
    }

    pub fn page_remove_hidden_text(&mut self, n: u32) -> Result<usize> {
        self.remove(Strip::HiddenText, Scope::Page(n))
    }

    pub fn page_remove_images(&mut self, n: u32) -> Result<usize> {
        self.remove(Strip::Images, Scope::Page(n))
    }

    pub fn page_remove_tables(&mut self, n: u32) -> Result<usize> {
        self.remove(Strip::Tables, Scope::Page(n))
    }
}
