//! Document-level types.

use super::{Bookmark, Element, Page, PageContext, Resource, TextStats};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Current native container version.
pub const CONTAINER_VERSION: &str = "1.0";

/// An in-memory document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document metadata (title, author, etc.)
    pub metadata: Metadata,

    /// Pages in the document
    pub pages: Vec<Page>,

    /// Embedded resources (images, fonts, etc.), keyed by id
    pub resources: BTreeMap<String, Resource>,

    /// Path the document was opened from or last saved to
    #[serde(skip)]
    origin: Option<PathBuf>,

    /// Set by every successful mutation, cleared on save
    #[serde(skip)]
    dirty: bool,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self {
            metadata: Metadata::default(),
            pages: Vec::new(),
            resources: BTreeMap::new(),
            origin: None,
            dirty: false,
        }
    }

    /// Create a document holding one blank Letter page.
    pub fn with_blank_page() -> Self {
        let mut doc = Self::new();
        doc.pages.push(Page::letter());
        doc
    }

    /// Get the number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Convert a 1-based page number into an index.
    pub fn index_of(&self, page_num: u32) -> Result<usize> {
        if page_num == 0 || page_num > self.page_count() {
            return Err(Error::PageOutOfRange(page_num, self.page_count()));
        }
        Ok((page_num - 1) as usize)
    }

    /// Get a page by number (1-indexed).
    pub fn page(&self, page_num: u32) -> Result<&Page> {
        let idx = self.index_of(page_num)?;
        Ok(&self.pages[idx])
    }

    /// Get a mutable page by number (1-indexed).
    pub fn page_mut(&mut self, page_num: u32) -> Result<&mut Page> {
        let idx = self.index_of(page_num)?;
        Ok(&mut self.pages[idx])
    }

    /// Position context for the page at `idx`.
    pub fn context(&self, idx: usize) -> PageContext {
        PageContext {
            number: idx as u32 + 1,
            total: self.page_count(),
        }
    }

    /// Add a resource to the document.
    pub fn add_resource(&mut self, id: impl Into<String>, resource: Resource) {
        self.resources.insert(id.into(), resource);
    }

    /// Get a resource by ID.
    pub fn get_resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    /// A resource id with the given prefix that is not yet taken.
    pub fn next_resource_id(&self, prefix: &str) -> String {
        (1..)
            .map(|i| format!("{}{}", prefix, i))
            .find(|id| !self.resources.contains_key(id))
            .unwrap_or_else(|| prefix.to_string())
    }

    /// Check if the document has any pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Visible text of one page.
    pub fn page_text(&self, page_num: u32) -> Result<String> {
        let idx = self.index_of(page_num)?;
        Ok(self.pages[idx].text(self.context(idx)))
    }

    /// Visible text of every page, pages separated by a blank line.
    pub fn extract_text(&self) -> String {
        self.pages
            .iter()
            .enumerate()
            .map(|(i, page)| page.text(self.context(i)))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Word and character counts of one page.
    pub fn page_stats(&self, page_num: u32) -> Result<TextStats> {
        let idx = self.index_of(page_num)?;
        Ok(self.pages[idx].stats(self.context(idx)))
    }

    /// Word and character counts summed over every page.
    pub fn stats(&self) -> TextStats {
        let mut total = TextStats::new();
        for (i, page) in self.pages.iter().enumerate() {
            total.merge(&page.stats(self.context(i)));
        }
        total
    }

    pub fn word_count(&self) -> u32 {
        self.stats().word_count
    }

    pub fn character_count(&self) -> u32 {
        self.stats().char_count
    }

    pub fn page_word_count(&self, page_num: u32) -> Result<u32> {
        Ok(self.page_stats(page_num)?.word_count)
    }

    pub fn page_character_count(&self, page_num: u32) -> Result<u32> {
        Ok(self.page_stats(page_num)?.char_count)
    }

    /// Whether the page has no visible text and no visible graphics.
    pub fn is_page_blank(&self, page_num: u32) -> Result<bool> {
        let idx = self.index_of(page_num)?;
        Ok(self.pages[idx].is_blank(self.context(idx)))
    }

    /// Bookmarks with the page number they target, in document order.
    pub fn bookmarks(&self) -> Vec<(u32, &Bookmark)> {
        self.pages
            .iter()
            .enumerate()
            .flat_map(|(i, page)| {
                page.elements.iter().filter_map(move |e| match e {
                    Element::Bookmark(b) => Some((i as u32 + 1, b)),
                    _ => None,
                })
            })
            .collect()
    }

    /// Path the document was opened from or last saved to.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    pub fn set_origin(&mut self, path: impl Into<PathBuf>) {
        self.origin = Some(path.into());
    }

    /// Whether the document changed since it was opened or saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Document metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title
    pub title: Option<String>,

    /// Document author
    pub author: Option<String>,

    /// Document subject
    pub subject: Option<String>,

    /// Keywords
    pub keywords: Option<String>,

    /// Creator application
    pub creator: Option<String>,

    /// Producer of the last save
    pub producer: Option<String>,

    /// Creation date
    pub created: Option<DateTime<Utc>>,

    /// Last modification date
    pub modified: Option<DateTime<Utc>>,

    /// Container version (e.g., "1.0")
    pub version: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            title: None,
            author: None,
            subject: None,
            keywords: None,
            creator: None,
            producer: None,
            created: None,
            modified: None,
            version: CONTAINER_VERSION.to_string(),
        }
    }
}

impl Metadata {
    /// Convert metadata to YAML frontmatter format.
    pub fn to_yaml_frontmatter(&self, page_count: u32) -> String {
        let mut lines = vec!["---".to_string()];

        let fields = [
            ("title", &self.title),
            ("author", &self.author),
            ("subject", &self.subject),
            ("keywords", &self.keywords),
            ("creator", &self.creator),
            ("producer", &self.producer),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                lines.push(format!("{}: \"{}\"", name, escape_yaml(value)));
            }
        }
        if let Some(ref created) = self.created {
            lines.push(format!("created: {}", created.to_rfc3339()));
        }
        if let Some(ref modified) = self.modified {
            lines.push(format!("modified: {}", modified.to_rfc3339()));
        }

        lines.push(format!("version: \"{}\"", self.version));
        lines.push(format!("pages: {}", page_count));

        lines.push("---".to_string());
        lines.push(String::new());

        lines.join("\n")
    }
}

/// Escape special characters for YAML strings.
fn escape_yaml(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Bookmark;

    #[test]
    fn test_document_new() {
        let doc = Document::new();
        assert!(doc.is_empty());
        assert_eq!(doc.page_count(), 0);
        assert!(!doc.is_dirty());
    }

    #[test]
    fn test_blank_page_document() {
        let doc = Document::with_blank_page();
        assert_eq!(doc.page_count(), 1);
        assert!(doc.is_page_blank(1).unwrap());
        assert_eq!(doc.word_count(), 0);
    }

    #[test]
    fn test_page_addressing() {
        let doc = Document::with_blank_page();
        assert!(doc.page(1).is_ok());
        assert!(matches!(doc.page(0), Err(Error::PageOutOfRange(0, 1))));
        assert!(matches!(doc.page(2), Err(Error::PageOutOfRange(2, 1))));
    }

    #[test]
    fn test_counts_sum_pages() {
        let mut doc = Document::new();
        let mut p1 = Page::letter();
        p1.add_text("hello world");
        let mut p2 = Page::letter();
        p2.add_text("again");
        doc.pages = vec![p1, p2];

        assert_eq!(doc.word_count(), 3);
        assert_eq!(doc.character_count(), 15);
        assert_eq!(doc.page_word_count(2).unwrap(), 1);
        assert_eq!(doc.extract_text(), "hello world\n\nagain");
    }

    #[test]
    fn test_bookmarks_follow_page_position() {
        let mut doc = Document::new();
        doc.pages = vec![Page::letter(), Page::letter()];
        doc.pages[1].add_element(Element::Bookmark(Bookmark::new("Intro", 0)));
        assert_eq!(doc.bookmarks()[0].0, 2);

        doc.pages.remove(0);
        assert_eq!(doc.bookmarks()[0].0, 1);
    }

    #[test]
    fn test_next_resource_id() {
        let mut doc = Document::new();
        assert_eq!(doc.next_resource_id("img"), "img1");
        doc.add_resource("img1", Resource::png(vec![]));
        assert_eq!(doc.next_resource_id("img"), "img2");
    }

    #[test]
    fn test_metadata_frontmatter() {
        let metadata = Metadata {
            title: Some("Test Document".to_string()),
            author: Some("John Doe".to_string()),
            ..Default::default()
        };

        let yaml = metadata.to_yaml_frontmatter(10);
        assert!(yaml.contains("title: \"Test Document\""));
        assert!(yaml.contains("author: \"John Doe\""));
        assert!(yaml.contains("version: \"1.0\""));
        assert!(yaml.contains("pages: 10"));
    }
}
