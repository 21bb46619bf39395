//! Export pipeline.
//!
//! Exporters turn a borrowed [`Document`] into bytes. They are looked up by
//! [`ExportFormat`] in an [`ExporterRegistry`], which can be extended with
//! custom implementations.
//!
//! # Example
//!
//! ```
//! use folio::{export, Destination, Document, ExportFormat, ExportOptions};
//!
//! let mut doc = Document::with_blank_page();
//! doc.page_add_text(1, "Hello").unwrap();
//!
//! let bytes = export(&doc, ExportFormat::Txt, &ExportOptions::default(), &Destination::Memory)
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(bytes, b"Hello");
//! ```

mod archive;
mod dicom;
mod epub;
mod forms;
mod json;
mod layout;
mod markdown;
mod office;
mod paint;
mod raster;
mod rtf;
mod svg;
mod tex;
mod text;
mod xps;

pub use json::{to_json, JsonFormat};
pub use markdown::{to_markdown, MarkdownOptions};
pub use raster::{render_page, MAX_RASTER_PIXELS};
pub use svg::page_to_svg;
pub use text::{to_text, TextOptions};

use crate::codec;
use crate::error::{Error, Result};
use crate::model::Document;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Whole-document export targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Native container (round trip)
    Native,
    /// Word processing document, flowing text
    Docx,
    /// Word processing document, absolutely positioned frames
    DocxEnhanced,
    /// Legacy word processing document (RTF body)
    Doc,
    /// Spreadsheet
    Xlsx,
    /// Presentation
    Pptx,
    /// Fixed-layout XML paper specification
    Xps,
    /// Plain text
    Txt,
    /// E-book
    Epub,
    /// LaTeX source
    Tex,
    Markdown,
    Json,
    /// Multi-frame raster image
    Tiff,
    /// One SVG per page in a zip archive
    SvgZip,
    /// Two pages per sheet in booklet order
    Booklet,
    /// Grid of pages per sheet
    NUp,
    /// Form data, FDF syntax
    Fdf,
    /// Form data, XFDF syntax
    Xfdf,
    /// Form data, plain XML
    Xml,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 19] = [
        ExportFormat::Native,
        ExportFormat::Docx,
        ExportFormat::DocxEnhanced,
        ExportFormat::Doc,
        ExportFormat::Xlsx,
        ExportFormat::Pptx,
        ExportFormat::Xps,
        ExportFormat::Txt,
        ExportFormat::Epub,
        ExportFormat::Tex,
        ExportFormat::Markdown,
        ExportFormat::Json,
        ExportFormat::Tiff,
        ExportFormat::SvgZip,
        ExportFormat::Booklet,
        ExportFormat::NUp,
        ExportFormat::Fdf,
        ExportFormat::Xfdf,
        ExportFormat::Xml,
    ];

    /// Lowercase name, also accepted by [`str::parse`].
    pub fn name(self) -> &'static str {
        match self {
            ExportFormat::Native => "native",
            ExportFormat::Docx => "docx",
            ExportFormat::DocxEnhanced => "docx-enhanced",
            ExportFormat::Doc => "doc",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pptx => "pptx",
            ExportFormat::Xps => "xps",
            ExportFormat::Txt => "txt",
            ExportFormat::Epub => "epub",
            ExportFormat::Tex => "tex",
            ExportFormat::Markdown => "markdown",
            ExportFormat::Json => "json",
            ExportFormat::Tiff => "tiff",
            ExportFormat::SvgZip => "svg-zip",
            ExportFormat::Booklet => "booklet",
            ExportFormat::NUp => "n-up",
            ExportFormat::Fdf => "fdf",
            ExportFormat::Xfdf => "xfdf",
            ExportFormat::Xml => "xml",
        }
    }

    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Native | ExportFormat::Booklet | ExportFormat::NUp => "folio",
            ExportFormat::Docx | ExportFormat::DocxEnhanced => "docx",
            ExportFormat::Doc => "doc",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pptx => "pptx",
            ExportFormat::Xps => "xps",
            ExportFormat::Txt => "txt",
            ExportFormat::Epub => "epub",
            ExportFormat::Tex => "tex",
            ExportFormat::Markdown => "md",
            ExportFormat::Json => "json",
            ExportFormat::Tiff => "tiff",
            ExportFormat::SvgZip => "zip",
            ExportFormat::Fdf => "fdf",
            ExportFormat::Xfdf => "xfdf",
            ExportFormat::Xml => "xml",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == lower || (f.extension() == lower && *f != ExportFormat::Booklet && *f != ExportFormat::NUp))
            .ok_or_else(|| Error::InvalidArgument(format!("unknown export format '{}'", s)))
    }
}

/// Single-page export targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageFormat {
    Jpeg,
    Png,
    Bmp,
    Tiff,
    /// DICOM secondary capture image
    Dicom,
    Svg,
    /// Single-page native container
    Native,
}

impl PageFormat {
    pub const ALL: [PageFormat; 7] = [
        PageFormat::Jpeg,
        PageFormat::Png,
        PageFormat::Bmp,
        PageFormat::Tiff,
        PageFormat::Dicom,
        PageFormat::Svg,
        PageFormat::Native,
    ];

    /// Whether the format needs a resolution.
    pub fn is_raster(self) -> bool {
        !matches!(self, PageFormat::Svg | PageFormat::Native)
    }

    pub fn extension(self) -> &'static str {
        match self {
            PageFormat::Jpeg => "jpg",
            PageFormat::Png => "png",
            PageFormat::Bmp => "bmp",
            PageFormat::Tiff => "tiff",
            PageFormat::Dicom => "dcm",
            PageFormat::Svg => "svg",
            PageFormat::Native => "folio",
        }
    }
}

impl std::str::FromStr for PageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        let lower = match lower.as_str() {
            "jpeg" => "jpg",
            "tif" => "tiff",
            "dicom" => "dcm",
            "native" => "folio",
            other => other,
        };
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.extension() == lower)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown page format '{}'", s)))
    }
}

/// Where exported bytes go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Write to a file; the export returns `None`
    File(PathBuf),
    /// Return the bytes
    Memory,
}

impl Destination {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Destination::File(path.into())
    }
}

/// Default resolution for multi-frame TIFF export.
pub const DEFAULT_TIFF_DPI: u32 = 150;

/// Options for export.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Raster resolution in dots per inch
    pub resolution: Option<u32>,

    /// Columns and rows per sheet for N-up layout
    pub grid: Option<(u32, u32)>,

    /// JPEG quality (1-100)
    pub jpeg_quality: u8,

    /// JSON output format
    pub json_format: JsonFormat,

    /// Markdown rendering options
    pub markdown: MarkdownOptions,

    /// Plain text options
    pub text: TextOptions,
}

impl ExportOptions {
    /// Create new export options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the raster resolution.
    pub fn with_resolution(mut self, dpi: u32) -> Self {
        self.resolution = Some(dpi);
        self
    }

    /// Set the N-up grid.
    pub fn with_grid(mut self, columns: u32, rows: u32) -> Self {
        self.grid = Some((columns, rows));
        self
    }

    /// Set the JPEG quality.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set JSON output format.
    pub fn with_json_format(mut self, format: JsonFormat) -> Self {
        self.json_format = format;
        self
    }

    /// Set Markdown options.
    pub fn with_markdown(mut self, options: MarkdownOptions) -> Self {
        self.markdown = options;
        self
    }

    /// Set plain text options.
    pub fn with_text(mut self, options: TextOptions) -> Self {
        self.text = options;
        self
    }

    /// Resolution for formats that cannot work without one.
    pub(crate) fn required_resolution(&self) -> Result<u32> {
        let dpi = self
            .resolution
            .ok_or_else(|| Error::MissingParameter("resolution is required for raster output".into()))?;
        check_resolution(dpi)
    }

    /// Resolution with a fallback for formats where it is optional.
    pub(crate) fn resolution_or(&self, default: u32) -> Result<u32> {
        check_resolution(self.resolution.unwrap_or(default))
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            resolution: None,
            grid: None,
            jpeg_quality: 90,
            json_format: JsonFormat::default(),
            markdown: MarkdownOptions::default(),
            text: TextOptions::default(),
        }
    }
}

fn check_resolution(dpi: u32) -> Result<u32> {
    if dpi == 0 {
        return Err(Error::InvalidArgument("resolution must be positive".into()));
    }
    Ok(dpi)
}

/// Trait for document exporters.
///
/// Implement this trait to add or replace an export format.
pub trait Exporter: Send + Sync {
    /// The format this exporter produces.
    fn format(&self) -> ExportFormat;

    /// Get the name of this exporter.
    fn name(&self) -> &str {
        self.format().name()
    }

    /// MIME type of the output.
    fn mime_type(&self) -> &'static str;

    /// Produce the output bytes. Must not change the document.
    fn export(&self, doc: &Document, options: &ExportOptions) -> Result<Vec<u8>>;
}

/// Exporter built from a function.
struct FnExporter {
    format: ExportFormat,
    mime_type: &'static str,
    run: fn(&Document, &ExportOptions) -> Result<Vec<u8>>,
}

impl Exporter for FnExporter {
    fn format(&self) -> ExportFormat {
        self.format
    }

    fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    fn export(&self, doc: &Document, options: &ExportOptions) -> Result<Vec<u8>> {
        (self.run)(doc, options)
    }
}

/// Registry for exporters.
pub struct ExporterRegistry {
    exporters: HashMap<ExportFormat, Arc<dyn Exporter>>,
}

impl ExporterRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            exporters: HashMap::new(),
        }
    }

    /// Create a registry with every built-in format.
    pub fn with_defaults() -> Self {
        let builtins: [(ExportFormat, &'static str, fn(&Document, &ExportOptions) -> Result<Vec<u8>>); 19] = [
            (ExportFormat::Native, "application/x-folio", |d, _| codec::encode(d)),
            (ExportFormat::Docx, office::DOCX_MIME, office::to_docx),
            (ExportFormat::DocxEnhanced, office::DOCX_MIME, office::to_docx_enhanced),
            (ExportFormat::Doc, "application/msword", rtf::to_rtf),
            (ExportFormat::Xlsx, office::XLSX_MIME, office::to_xlsx),
            (ExportFormat::Pptx, office::PPTX_MIME, office::to_pptx),
            (ExportFormat::Xps, "application/oxps", xps::to_xps),
            (ExportFormat::Txt, "text/plain", |d, o| Ok(to_text(d, &o.text).into_bytes())),
            (ExportFormat::Epub, "application/epub+zip", epub::to_epub),
            (ExportFormat::Tex, "application/x-tex", tex::to_tex),
            (ExportFormat::Markdown, "text/markdown", |d, o| Ok(to_markdown(d, &o.markdown).into_bytes())),
            (ExportFormat::Json, "application/json", |d, o| Ok(to_json(d, o.json_format)?.into_bytes())),
            (ExportFormat::Tiff, "image/tiff", raster::to_multipage_tiff),
            (ExportFormat::SvgZip, "application/zip", svg::to_svg_zip),
            (ExportFormat::Booklet, "application/x-folio", layout::to_booklet),
            (ExportFormat::NUp, "application/x-folio", layout::to_n_up),
            (ExportFormat::Fdf, "application/vnd.fdf", forms::to_fdf),
            (ExportFormat::Xfdf, "application/vnd.adobe.xfdf", forms::to_xfdf),
            (ExportFormat::Xml, "application/xml", forms::to_xml),
        ];

        let mut registry = Self::new();
        for (format, mime_type, run) in builtins {
            registry.register(Arc::new(FnExporter {
                format,
                mime_type,
                run,
            }));
        }
        registry
    }

    /// Register an exporter, replacing any previous one for its format.
    pub fn register(&mut self, exporter: Arc<dyn Exporter>) {
        self.exporters.insert(exporter.format(), exporter);
    }

    /// Get the exporter for a format.
    pub fn get(&self, format: ExportFormat) -> Option<Arc<dyn Exporter>> {
        self.exporters.get(&format).cloned()
    }

    /// Check if a format is supported.
    pub fn supports(&self, format: ExportFormat) -> bool {
        self.exporters.contains_key(&format)
    }

    /// Export a document and deliver it to `dest`.
    pub fn export(
        &self,
        doc: &Document,
        format: ExportFormat,
        options: &ExportOptions,
        dest: &Destination,
    ) -> Result<Option<Vec<u8>>> {
        let exporter = self
            .get(format)
            .ok_or_else(|| Error::InvalidArgument(format!("no exporter for {}", format)))?;
        let bytes = exporter.export(doc, options)?;
        log::info!(
            "exported {} pages as {} ({} bytes)",
            doc.page_count(),
            exporter.name(),
            bytes.len()
        );
        deliver(bytes, dest)
    }
}

impl Default for ExporterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

lazy_static::lazy_static! {
    static ref DEFAULT_REGISTRY: ExporterRegistry = ExporterRegistry::with_defaults();
}

/// Export a document with the built-in exporters.
pub fn export(
    doc: &Document,
    format: ExportFormat,
    options: &ExportOptions,
    dest: &Destination,
) -> Result<Option<Vec<u8>>> {
    DEFAULT_REGISTRY.export(doc, format, options, dest)
}

/// Export one page (1-indexed).
pub fn export_page(
    doc: &Document,
    page_num: u32,
    format: PageFormat,
    options: &ExportOptions,
    dest: &Destination,
) -> Result<Option<Vec<u8>>> {
    let idx = doc.index_of(page_num)?;
    let bytes = match format {
        PageFormat::Svg => page_to_svg(doc, idx).into_bytes(),
        PageFormat::Native => codec::encode(&doc.extract(&[page_num]))?,
        raster_format => {
            let dpi = options.required_resolution()?;
            raster::encode_page(doc, idx, raster_format, dpi, options.jpeg_quality)?
        }
    };
    log::info!(
        "exported page {} as {} ({} bytes)",
        page_num,
        format.extension(),
        bytes.len()
    );
    deliver(bytes, dest)
}

/// Hand bytes to their destination.
fn deliver(bytes: Vec<u8>, dest: &Destination) -> Result<Option<Vec<u8>>> {
    match dest {
        Destination::Memory => Ok(Some(bytes)),
        Destination::File(path) => {
            std::fs::write(path, &bytes)?;
            Ok(None)
        }
    }
}

/// Escape text for XML content and attribute values.
pub(crate) fn xml_escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) && !text.chars().any(is_xml_invalid) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if is_xml_invalid(c) => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn is_xml_invalid(c: char) -> bool {
    (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r')
}
