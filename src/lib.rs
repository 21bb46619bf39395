//! # folio
//!
//! Document engine core: an in-memory document model, a mutation engine,
//! an export pipeline and a handle registry with a C interface.
//!
//! ## Quick Start
//!
//! ```
//! use folio::{export, Destination, Document, ExportFormat, ExportOptions};
//!
//! fn main() -> folio::Result<()> {
//!     let mut doc = Document::with_blank_page();
//!     doc.page_add_text(1, "Quarterly report")?;
//!     doc.add_page_numbers()?;
//!
//!     let markdown = export(&doc, ExportFormat::Markdown, &ExportOptions::default(), &Destination::Memory)?;
//!     assert!(markdown.is_some());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Page model**: dense 1-indexed pages, position-resolved page numbers
//! - **Mutations**: removals, text replacement, watermarks, rotation, repair
//! - **Export**: office formats, XPS, EPUB, LaTeX, Markdown, JSON, rasters, SVG
//! - **Parallel rendering**: multi-page rasters render with Rayon
//! - **C ABI**: numeric handles and an error slot (`ffi` feature)

pub mod codec;
pub mod detect;
pub mod error;
pub mod export;
pub mod license;
pub mod model;
pub mod ops;
pub mod range;
pub mod registry;

#[cfg(feature = "ffi")]
pub mod ffi;

// Re-export commonly used types
pub use codec::{Codec, ErrorMode, NativeCodec, OpenOptions};
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_container, ContainerFormat};
pub use error::{Error, ErrorKind, Result};
pub use export::{
    export, export_page, Destination, ExportFormat, ExportOptions, Exporter, ExporterRegistry,
    JsonFormat, MarkdownOptions, PageFormat, TextOptions,
};
pub use license::{about, set_license, ProductInfo};
pub use model::{
    Annotation, AnnotationKind, Attachment, Bookmark, Color, Document, Element, ImageElement, Metadata,
    Page, PageSize, Rect, Resource, ResourceType, Rotation, Script, Table, TableCell, TableRow,
    TextRun, TextStyle, Watermark,
};
pub use ops::{split_at, RepairReport, Scope, Strip, WatermarkOptions};
pub use range::PageRange;
pub use registry::{Handle, Registry};

use std::path::Path;

/// Open a native document file.
///
/// # Example
///
/// ```no_run
/// use folio::open_file;
///
/// let doc = open_file("report.folio").unwrap();
/// println!("Pages: {}", doc.page_count());
/// ```
pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    codec::read_file(path, &OpenOptions::default())
}

/// Open a native document from bytes.
pub fn open_bytes(data: &[u8]) -> Result<Document> {
    codec::decode(data, &OpenOptions::default())
}

/// Concatenate documents into a new one.
pub fn merge_documents(docs: &[&Document]) -> Document {
    ops::merge(docs)
}

/// Split a document by `;`-separated page ranges, e.g. `"1-2;3;4-"`.
pub fn split_document(doc: &Document, spec: &str) -> Result<Vec<Document>> {
    ops::split(doc, spec)
}

/// Builder for opening documents.
///
/// # Example
///
/// ```no_run
/// use folio::Folio;
///
/// let text = Folio::new()
///     .lenient()
///     .open("report.folio")?
///     .extract_text();
/// # Ok::<(), folio::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Folio {
    open_options: OpenOptions,
}

impl Folio {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept newer minor container versions with a warning.
    pub fn lenient(mut self) -> Self {
        self.open_options = self.open_options.lenient();
        self
    }

    /// Open a file.
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<Document> {
        codec::read_file(path, &self.open_options)
    }

    /// Open from bytes.
    pub fn open_bytes(&self, data: &[u8]) -> Result<Document> {
        codec::decode(data, &self.open_options)
    }

    /// Open a file into a registry and return its handle.
    pub fn open_into(&self, registry: &Registry, path: impl AsRef<Path>) -> Result<Handle> {
        Ok(registry.insert(self.open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_pages() -> Document {
        let mut doc = Document::with_blank_page();
        doc.page_add_text(1, "first").unwrap();
        doc.add_page();
        doc.page_add_text(2, "second").unwrap();
        doc
    }

    #[test]
    fn test_open_bytes_round_trip() {
        let doc = two_pages();
        let back = open_bytes(&doc.to_bytes().unwrap()).unwrap();
        assert_eq!(back.page_count(), 2);
        assert_eq!(back.extract_text(), doc.extract_text());
    }

    #[test]
    fn test_open_bytes_rejects_garbage() {
        assert_eq!(open_bytes(b"").unwrap_err().kind(), ErrorKind::ParseFailure);
        assert_eq!(open_bytes(b"%PDF-1.7\n").unwrap_err().kind(), ErrorKind::ParseFailure);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_file(dir.path().join("absent.folio")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }

    #[test]
    fn test_merge_and_split() {
        let a = two_pages();
        let b = two_pages();
        let merged = merge_documents(&[&a, &b]);
        assert_eq!(merged.page_count(), 4);

        let parts = split_document(&merged, "1-2;3;4-").unwrap();
        let counts: Vec<u32> = parts.iter().map(Document::page_count).collect();
        assert_eq!(counts, vec![2, 1, 1]);

        let (head, tail) = split_at(&merged, 2).unwrap();
        assert_eq!((head.page_count(), tail.page_count()), (2, 2));
    }

    #[test]
    fn test_builder_opens_into_registry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.folio");
        two_pages().save_as(&path).unwrap();

        let registry = Registry::new();
        let handle = Folio::new().lenient().open_into(&registry, &path).unwrap();
        assert_eq!(registry.with(handle, |d| Ok(d.page_count())).unwrap(), 2);
        assert_eq!(
            registry.with(handle, |d| Ok(d.origin().map(Path::to_path_buf))).unwrap(),
            Some(path)
        );
    }

    #[test]
    fn test_about() {
        let info = about();
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    }
}
