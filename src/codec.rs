//! Native container encoding and decoding.
//!
//! Layout:
//!
//! ```text
//! %FOLIO-1.0\n
//! u64 LE   body length
//! u32 LE   CRC-32 of the body
//! body     zlib stream of the compact JSON document
//! \n%%EOF\n
//! ```

use crate::detect::{detect_format_from_bytes, HEADER_LEN};
use crate::error::{Error, Result};
use crate::license;
use crate::model::{Document, Metadata, Page, Resource, CONTAINER_VERSION};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::{Compression, Crc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

const TRAILER: &[u8] = b"\n%%EOF\n";
const LENGTH_LEN: usize = 8;
const CRC_LEN: usize = 4;

/// Options for opening documents.
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Error handling mode
    pub error_mode: ErrorMode,
}

impl OpenOptions {
    /// Create new open options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Enable lenient mode.
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }
}

/// Error handling mode when opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Reject anything unexpected
    #[default]
    Strict,
    /// Accept newer minor versions and a missing trailer, with a warning
    Lenient,
}

/// Converts documents to and from a byte format.
pub trait Codec: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Decode a document.
    fn decode(&self, data: &[u8], options: &OpenOptions) -> Result<Document>;

    /// Encode a document.
    fn encode(&self, doc: &Document) -> Result<Vec<u8>>;
}

/// The native container format.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCodec;

#[derive(Serialize)]
struct Body<'a> {
    metadata: Metadata,
    pages: &'a [Page],
    resources: &'a BTreeMap<String, Resource>,
}

impl Codec for NativeCodec {
    fn name(&self) -> &'static str {
        "native"
    }

    fn decode(&self, data: &[u8], options: &OpenOptions) -> Result<Document> {
        let format = detect_format_from_bytes(data)?;
        check_version(&format.version, format.major(), options.error_mode)?;

        if data.len() < HEADER_LEN || data[HEADER_LEN - 1] != b'\n' {
            return Err(Error::Parse("header line is not terminated".into()));
        }
        let rest = &data[HEADER_LEN..];
        if rest.len() < LENGTH_LEN + CRC_LEN {
            return Err(Error::Parse("truncated container header".into()));
        }

        let (len_bytes, rest) = rest.split_at(LENGTH_LEN);
        let (crc_bytes, rest) = rest.split_at(CRC_LEN);
        let body_len = u64::from_le_bytes(to_array(len_bytes)?);
        let expected_crc = u32::from_le_bytes(to_array(crc_bytes)?);

        let body_len = usize::try_from(body_len)
            .ok()
            .filter(|&n| n <= rest.len())
            .ok_or_else(|| {
                Error::Parse(format!(
                    "body length {} exceeds the {} bytes available",
                    body_len,
                    rest.len()
                ))
            })?;
        let (body, trailer) = rest.split_at(body_len);

        if trailer != TRAILER {
            match options.error_mode {
                ErrorMode::Strict => return Err(Error::Parse("missing or damaged trailer".into())),
                ErrorMode::Lenient => log::warn!("container trailer is missing or damaged"),
            }
        }

        let mut crc = Crc::new();
        crc.update(body);
        if crc.sum() != expected_crc {
            return Err(Error::Parse(format!(
                "checksum mismatch: stored {:08x}, computed {:08x}",
                expected_crc,
                crc.sum()
            )));
        }

        let mut json = String::new();
        ZlibDecoder::new(body)
            .read_to_string(&mut json)
            .map_err(|e| Error::Parse(format!("cannot decompress body: {}", e)))?;

        let doc: Document = serde_json::from_str(&json)
            .map_err(|e| Error::Parse(format!("malformed document structure: {}", e)))?;

        log::debug!(
            "decoded {} container with {} pages",
            self.name(),
            doc.page_count()
        );
        Ok(doc)
    }

    fn encode(&self, doc: &Document) -> Result<Vec<u8>> {
        let mut metadata = doc.metadata.clone();
        metadata.version = CONTAINER_VERSION.to_string();
        metadata.producer = Some(license::producer());

        let body = Body {
            metadata,
            pages: &doc.pages,
            resources: &doc.resources,
        };
        let json = serde_json::to_vec(&body)?;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        let compressed = encoder.finish()?;

        let mut crc = Crc::new();
        crc.update(&compressed);

        let mut out = Vec::with_capacity(HEADER_LEN + 12 + compressed.len() + TRAILER.len());
        out.extend_from_slice(format!("%FOLIO-{}\n", CONTAINER_VERSION).as_bytes());
        out.extend_from_slice(&(compressed.len() as u64).to_le_bytes());
        out.extend_from_slice(&crc.sum().to_le_bytes());
        out.extend_from_slice(&compressed);
        out.extend_from_slice(TRAILER);
        Ok(out)
    }
}

fn check_version(version: &str, major: u8, mode: ErrorMode) -> Result<()> {
    if version == CONTAINER_VERSION {
        return Ok(());
    }
    let supported_major = CONTAINER_VERSION.as_bytes()[0] - b'0';
    match mode {
        ErrorMode::Lenient if major == supported_major => {
            log::warn!(
                "opening container version {} with a {} reader",
                version,
                CONTAINER_VERSION
            );
            Ok(())
        }
        _ => Err(Error::UnsupportedVersion(version.to_string())),
    }
}

fn to_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| Error::Parse("truncated container header".into()))
}

/// Decode a native container from memory.
pub fn decode(data: &[u8], options: &OpenOptions) -> Result<Document> {
    NativeCodec.decode(data, options)
}

/// Encode a document as a native container.
pub fn encode(doc: &Document) -> Result<Vec<u8>> {
    NativeCodec.encode(doc)
}

/// Read and decode a native container file, recording its path as the origin.
pub fn read_file<P: AsRef<Path>>(path: P, options: &OpenOptions) -> Result<Document> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let mut doc = decode(&data, options)?;
    doc.set_origin(path);
    log::info!("opened {} ({} pages)", path.display(), doc.page_count());
    Ok(doc)
}

impl Document {
    /// Encode the document as a native container.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    /// Write the document back to the file it was opened from or last saved to.
    pub fn save(&mut self) -> Result<()> {
        let path = self
            .origin()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::MissingParameter("document has no file to save to; use save_as".into()))?;
        self.write_to(&path)
    }

    /// Write the document to `path`, which becomes its origin.
    pub fn save_as<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.write_to(path)?;
        self.set_origin(path);
        Ok(())
    }

    fn write_to(&mut self, path: &Path) -> Result<()> {
        let bytes = encode(self)?;
        std::fs::write(path, &bytes)?;
        self.mark_clean();
        log::info!("saved {} ({} pages, {} bytes)", path.display(), self.page_count(), bytes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{Element, PageSize};

    fn sample() -> Document {
        let mut doc = Document::with_blank_page();
        doc.metadata.title = Some("Report".into());
        doc.pages[0].add_text("hello world");
        let mut second = Page::with_size(PageSize::A4);
        second.add_element(Element::text("second", 10.0, 10.0));
        doc.pages.push(second);
        doc.add_resource("img1", Resource::png(vec![1, 2, 3]));
        doc
    }

    #[test]
    fn test_round_trip() {
        let doc = sample();
        let bytes = encode(&doc).unwrap();
        assert!(bytes.starts_with(b"%FOLIO-1.0\n"));
        assert!(bytes.ends_with(TRAILER));

        let back = decode(&bytes, &OpenOptions::default()).unwrap();
        assert_eq!(back.pages, doc.pages);
        assert_eq!(back.resources, doc.resources);
        assert_eq!(back.metadata.title.as_deref(), Some("Report"));
        assert!(back.metadata.producer.is_some());
    }

    #[test]
    fn test_rejects_garbage() {
        let err = decode(b"not a container", &OpenOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
    }

    #[test]
    fn test_rejects_truncation() {
        let bytes = encode(&sample()).unwrap();
        for cut in [HEADER_LEN, HEADER_LEN + 6, bytes.len() - 20] {
            let err = decode(&bytes[..cut], &OpenOptions::default()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ParseFailure, "cut at {}", cut);
        }
    }

    #[test]
    fn test_rejects_corruption() {
        let mut bytes = encode(&sample()).unwrap();
        let mid = HEADER_LEN + 12 + 4;
        bytes[mid] ^= 0xFF;
        let err = decode(&bytes, &OpenOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Parse(ref m) if m.contains("checksum")));
    }

    #[test]
    fn test_lenient_accepts_newer_minor_version() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[9] = b'3';
        assert!(matches!(
            decode(&bytes, &OpenOptions::default()),
            Err(Error::UnsupportedVersion(_))
        ));
        assert!(decode(&bytes, &OpenOptions::new().lenient()).is_ok());

        bytes[7] = b'2';
        assert!(decode(&bytes, &OpenOptions::new().lenient()).is_err());
    }

    #[test]
    fn test_lenient_accepts_missing_trailer() {
        let bytes = encode(&sample()).unwrap();
        let cut = &bytes[..bytes.len() - TRAILER.len()];
        assert!(decode(cut, &OpenOptions::default()).is_err());
        assert_eq!(
            decode(cut, &OpenOptions::new().lenient()).unwrap().page_count(),
            2
        );
    }

    #[test]
    fn test_read_file_records_origin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.folio");
        std::fs::write(&path, encode(&sample()).unwrap()).unwrap();

        let doc = read_file(&path, &OpenOptions::default()).unwrap();
        assert_eq!(doc.origin(), Some(path.as_path()));

        let missing = read_file(dir.path().join("nope.folio"), &OpenOptions::default());
        assert_eq!(missing.unwrap_err().kind(), ErrorKind::IoFailure);
    }

    #[test]
    fn test_save_needs_a_path() {
        let mut doc = sample();
        assert_eq!(doc.save().unwrap_err().kind(), ErrorKind::MissingParameter);
    }

    #[test]
    fn test_save_as_then_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.folio");
        let mut doc = sample();
        doc.page_add_text(1, "more").unwrap();
        assert!(doc.is_dirty());

        doc.save_as(&path).unwrap();
        assert!(!doc.is_dirty());
        assert_eq!(doc.origin(), Some(path.as_path()));

        doc.delete_page(2).unwrap();
        doc.save().unwrap();
        let back = read_file(&path, &OpenOptions::default()).unwrap();
        assert_eq!(back.page_count(), 1);
    }

    #[test]
    fn test_save_as_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = sample();
        let err = doc.save_as(dir.path().join("missing").join("out.folio")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert!(doc.origin().is_none());
    }
}
