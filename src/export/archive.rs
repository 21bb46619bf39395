//! Zip packaging shared by the container-based formats.

use crate::error::Result;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Builds a zip archive in memory.
pub(crate) struct Archive {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    deflated: SimpleFileOptions,
    stored: SimpleFileOptions,
}

impl Archive {
    pub(crate) fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            deflated: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            stored: SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
        }
    }

    /// Add a compressed entry.
    pub(crate) fn add(&mut self, name: &str, data: impl AsRef<[u8]>) -> Result<()> {
        self.zip.start_file(name, self.deflated)?;
        self.zip.write_all(data.as_ref())?;
        Ok(())
    }

    /// Add an uncompressed entry.
    pub(crate) fn add_stored(&mut self, name: &str, data: impl AsRef<[u8]>) -> Result<()> {
        self.zip.start_file(name, self.stored)?;
        self.zip.write_all(data.as_ref())?;
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<Vec<u8>> {
        Ok(self.zip.finish()?.into_inner())
    }
}
