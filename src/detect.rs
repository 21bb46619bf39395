//! Native container detection and validation.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Container format information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerFormat {
    /// Container version (e.g., "1.0")
    pub version: String,
}

impl ContainerFormat {
    /// Major version digit.
    pub fn major(&self) -> u8 {
        self.version.as_bytes()[0] - b'0'
    }

    /// Minor version digit.
    pub fn minor(&self) -> u8 {
        self.version.as_bytes()[2] - b'0'
    }
}

impl std::fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "folio {}", self.version)
    }
}

/// Container magic bytes: %FOLIO-
pub(crate) const MAGIC: &[u8] = b"%FOLIO-";
const MAGIC_LEN: usize = 7;
const VERSION_LEN: usize = 3; // e.g., "1.0"

/// Length of the header line, including the trailing newline.
pub(crate) const HEADER_LEN: usize = MAGIC_LEN + VERSION_LEN + 1;

/// Detect the container format from a file path.
///
/// # Example
/// ```no_run
/// use folio::detect::detect_format_from_path;
///
/// let format = detect_format_from_path("report.folio").unwrap();
/// println!("container version: {}", format.version);
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<ContainerFormat> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => Error::UnknownFormat,
        _ => Error::Io(e),
    })?;
    detect_format_from_bytes(&header)
}

/// Detect the container format from bytes.
///
/// Returns `Err(Error::UnknownFormat)` if the data does not start with the
/// container magic.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<ContainerFormat> {
    if data.len() < MAGIC_LEN + VERSION_LEN {
        return Err(Error::UnknownFormat);
    }

    if !data.starts_with(MAGIC) {
        return Err(Error::UnknownFormat);
    }

    let version_bytes = &data[MAGIC_LEN..MAGIC_LEN + VERSION_LEN];
    let version = String::from_utf8_lossy(version_bytes).to_string();

    if !is_valid_version(&version) {
        return Err(Error::UnsupportedVersion(version));
    }

    Ok(ContainerFormat { version })
}

/// Check if a version string is valid.
fn is_valid_version(version: &str) -> bool {
    if version.len() != 3 {
        return false;
    }

    let chars: Vec<char> = version.chars().collect();
    chars[0].is_ascii_digit() && chars[1] == '.' && chars[2].is_ascii_digit()
}

/// Check if a file is a native container.
pub fn is_container<P: AsRef<Path>>(path: P) -> bool {
    detect_format_from_path(path).is_ok()
}

/// Check if bytes start with a native container header.
pub fn is_container_bytes(data: &[u8]) -> bool {
    detect_format_from_bytes(data).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_valid_container() {
        let data = b"%FOLIO-1.0\n\x00\x00";
        let format = detect_format_from_bytes(data).unwrap();
        assert_eq!(format.version, "1.0");
        assert_eq!(format.major(), 1);
        assert_eq!(format.minor(), 0);
    }

    #[test]
    fn test_detect_invalid_format() {
        let data = b"<!DOCTYPE html>";
        let result = detect_format_from_bytes(data);
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_detect_too_short() {
        let data = b"%FOLIO";
        let result = detect_format_from_bytes(data);
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_detect_garbled_version() {
        let result = detect_format_from_bytes(b"%FOLIO-x.y\n");
        assert!(matches!(result, Err(Error::UnsupportedVersion(_))));
    }

    #[test]
    fn test_is_container_bytes() {
        assert!(is_container_bytes(b"%FOLIO-1.0\n"));
        assert!(!is_container_bytes(b"%PDF-1.7\n"));
    }

    #[test]
    fn test_version_validation() {
        assert!(is_valid_version("1.0"));
        assert!(is_valid_version("2.3"));
        assert!(!is_valid_version("10.0"));
        assert!(!is_valid_version("abc"));
    }
}
