//! Document object model.
//!
//! A [`Document`] owns an ordered list of [`Page`]s and a resource table.
//! Pages own their [`Element`]s. A page has no stored number: its position
//! is its index in the document, so numbering stays dense through inserts
//! and deletes.

mod document;
mod element;
mod page;
mod resource;
mod stats;
mod table;

pub use document::{Document, Metadata, CONTAINER_VERSION};
pub(crate) use element::text_width;
pub use element::{
    Annotation, AnnotationKind, Attachment, Bookmark, Color, Element, ElementKind, ImageElement,
    PageContext, PageNumberStamp, Rect, Script, TextRun, TextStyle, Transform, Watermark,
    DEFAULT_FONT_SIZE,
};
pub use page::{Page, PageSize, Rotation, BODY_MARGIN};
pub use resource::{Resource, ResourceType};
pub use stats::TextStats;
pub use table::{Alignment, Table, TableCell, TableRow, VerticalAlignment};
